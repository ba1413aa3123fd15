//! SQLite store tests: loading the fact table and persisting report output.

use civic_core::{
    config::ReportConfig,
    engine::ReportEngine,
    report::{Cell, ReportTable},
    rng::{SeededRng, Stream},
    store::RequestStore,
    synthetic::SyntheticLog,
};

fn seeded_store(seed: u64, n: usize) -> RequestStore {
    let store = RequestStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
        .insert_requests(&SyntheticLog::new(seed, n).generate())
        .expect("insert requests");
    store
}

#[test]
fn raw_rows_round_trip_through_sqlite() {
    let rows = SyntheticLog::new(8, 150).generate();
    let store = RequestStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_requests(&rows).unwrap();

    assert_eq!(store.request_count().unwrap(), 150);
    let mut expected = rows.clone();
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(store.load_raw_requests().unwrap(), expected);
}

#[test]
fn load_fact_table_drops_defective_rows() {
    let store = seeded_store(17, 1_000);
    let (table, dropped) = store.load_fact_table().unwrap();

    assert_eq!(table.len() + dropped.total(), 1_000);
    assert!(dropped.total() > 0, "synthetic log should contain defective rows");
    assert!(table.rows().iter().all(|r| r.neighborhood().is_some()));
}

#[test]
fn migrate_is_idempotent() {
    let store = RequestStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.migrate().unwrap();
    assert_eq!(store.request_count().unwrap(), 0);
}

#[test]
fn saved_reports_read_back_identically() {
    let store = seeded_store(4, 800);
    let (table, _) = store.load_fact_table().unwrap();
    let engine = ReportEngine::build(ReportConfig::default_test()).unwrap();
    let tables = engine.run_all_strict(&table).unwrap();

    for t in &tables {
        store.save_report("run-a", t).unwrap();
    }
    assert_eq!(store.report_count("run-a").unwrap(), tables.len() as i64);

    let trend = store
        .load_report("run-a", "monthly_trend_by_department")
        .unwrap()
        .expect("saved report");
    let original = tables
        .iter()
        .find(|t| t.report == "monthly_trend_by_department")
        .unwrap();
    assert_eq!(&trend, original);
    assert!(store.load_report("run-b", "monthly_trend_by_department").unwrap().is_none());
}

/// Every report, float-heavy ones included, reads back exactly as saved.
#[test]
fn every_saved_report_reads_back_identically() {
    let engine = ReportEngine::build(ReportConfig::default_test()).unwrap();
    for seed in [3u64, 21, 99] {
        let store = seeded_store(seed, 1_200);
        let (table, _) = store.load_fact_table().unwrap();
        let run_id = format!("run-{seed}");
        for (name, result) in engine.run_all(&table) {
            // Flat monthly series are legitimately unscorable; nothing to save.
            let Ok(saved) = result else { continue };
            store.save_report(&run_id, &saved).unwrap();
            let loaded = store.load_report(&run_id, name).unwrap().expect("saved report");
            assert_eq!(loaded, saved, "report {name} (seed {seed}) changed in storage");
        }
    }
}

/// Arbitrary f64 values survive the JSON payload bit for bit.
#[test]
fn float_cells_survive_storage_exactly() {
    let store = RequestStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut rng = SeededRng::new(0xF10A7, Stream::Resolution);

    let mut saved = ReportTable::new("float_cells", &["value"]);
    for i in 0..20_000 {
        let scale = 10f64.powi((i % 13) as i32 - 6);
        saved.push_row(vec![Cell::Float(rng.next_f64() * 100.0 * scale + 0.5)]);
    }
    store.save_report("run-f", &saved).unwrap();
    let loaded = store.load_report("run-f", "float_cells").unwrap().expect("saved report");

    let mismatches = (0..saved.len())
        .filter(|&i| {
            let a = saved.cell(i, "value").and_then(Cell::as_f64);
            let b = loaded.cell(i, "value").and_then(Cell::as_f64);
            a.map(f64::to_bits) != b.map(f64::to_bits)
        })
        .count();
    assert_eq!(mismatches, 0);
}

/// Seeding twice with the same deterministic ids must not hit the primary key.
#[test]
fn seeding_a_populated_store_is_a_no_op() {
    let store = RequestStore::in_memory().unwrap();
    store.migrate().unwrap();
    let rows = SyntheticLog::new(42, 300).generate();

    assert_eq!(store.seed_if_empty(&rows).unwrap(), 300);
    assert_eq!(store.seed_if_empty(&rows).unwrap(), 0);
    assert_eq!(store.request_count().unwrap(), 300);
}
