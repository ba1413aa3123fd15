//! Operational analytics over a municipal service-request log.
//!
//! Data flows one way:
//!   store → cleaning → FactTable → {aggregate, rank, timeseries, anomaly}
//!   → reports → caller

pub mod aggregate;
pub mod anomaly;
pub mod cleaning;
pub mod config;
pub mod engine;
pub mod error;
pub mod fact_table;
pub mod rank;
pub mod record;
pub mod report;
pub mod reports;
pub mod rng;
pub mod store;
pub mod synthetic;
pub mod timeseries;
pub mod types;
