//! report-runner: headless report runner for the service-request analytics.
//!
//! Usage:
//!   report-runner --db requests.db --report all
//!   report-runner --seed-demo 5000 --seed 42 --report monthly_volume_anomalies
//!   report-runner --db requests.db --config report_config.json --save

use anyhow::Result;
use civic_core::{
    config::ReportConfig, engine::ReportEngine, report::ReportTable, store::RequestStore,
    synthetic::SyntheticLog,
};
use std::env;
use std::io::{self, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let report = string_arg(&args, "--report").unwrap_or("all");
    let seed = parse_arg(&args, "--seed", 42u64);
    let seed_demo = parse_arg(&args, "--seed-demo", 0usize);
    let save = args.iter().any(|a| a == "--save");

    let config = match string_arg(&args, "--config") {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };

    let store = RequestStore::open(db)?;
    store.migrate()?;

    if seed_demo > 0 {
        let rows = SyntheticLog::new(seed, seed_demo).generate();
        store.seed_if_empty(&rows)?;
    }

    let (table, dropped) = store.load_fact_table()?;
    log::info!(
        "report-runner: {} requests in fact table, {} dropped by cleaning",
        table.len(),
        dropped.total()
    );

    let engine = ReportEngine::build(config)?;
    let tables = if report == "all" {
        let mut tables = Vec::new();
        for (name, result) in engine.run_all(&table) {
            match result {
                Ok(t) => tables.push(t),
                Err(e) => log::error!("report-runner: {name} failed: {e}"),
            }
        }
        tables
    } else {
        vec![engine.run_one(&table, report)?]
    };

    if save {
        let run_id = format!("run-{}", unix_seconds());
        for t in &tables {
            store.save_report(&run_id, t)?;
        }
        log::info!("report-runner: saved {} reports under {run_id}", tables.len());
    }

    print_tables(&tables, engine.config().decimal_places)?;
    Ok(())
}

fn print_tables(tables: &[ReportTable], places: u32) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for t in tables {
        writeln!(stdout, "{}", serde_json::to_string(&t.rounded(places))?)?;
    }
    stdout.flush()?;
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_seconds() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
