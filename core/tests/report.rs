use chrono::NaiveDateTime;
use shoplytics_core::classifier::{CustomerType, Segment};
use shoplytics_core::config::AnalyticsConfig;
use shoplytics_core::demo;
use shoplytics_core::engine::AnalyticsEngine;
use shoplytics_core::records::{CustomerRecord, OrderLineRecord, Snapshot};
use shoplytics_core::store::MetricsStore;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn line(customer: &str, n: u32, purchased_at: &str, price: f64) -> OrderLineRecord {
    OrderLineRecord {
        line_item_id: format!("li-{customer}-{n}"),
        customer_id: customer.into(),
        purchased_at: Some(ts(purchased_at)),
        product_name: "Espresso Beans 1kg".into(),
        unit_price: price,
    }
}

fn customer(id: &str, created_on: &str) -> CustomerRecord {
    CustomerRecord {
        customer_id: id.into(),
        created_on: ts(created_on),
    }
}

/// One-timer with a two-item basket, a repeater with two orders, and a
/// signed-up customer who never ordered.
fn small_snapshot() -> Snapshot {
    Snapshot {
        order_lines: vec![
            line("one-timer", 1, "2024-03-01 10:00:00", 10.0),
            line("one-timer", 2, "2024-03-01 10:00:00", 20.0),
            line("repeater", 1, "2024-02-01 09:00:00", 30.0),
            line("repeater", 2, "2024-06-01 09:00:00", 40.0),
        ],
        customers: vec![
            customer("one-timer", "2024-02-20 08:00:00"),
            customer("repeater", "2024-01-15 08:00:00"),
            customer("lurker", "2024-01-01 08:00:00"),
        ],
        deliveries: vec![],
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Segmentation counts: distinct orders, line items, and revenue per
/// customer type, with ratio rows derived from the same volumes.
#[test]
fn summaries_from_small_snapshot() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    let report = engine.run(&small_snapshot()).unwrap();

    assert_eq!(report.segmentation.len(), 2);
    let new_row = &report.segmentation[0];
    assert_eq!(new_row.customer_type, CustomerType::New);
    assert_eq!(new_row.num_customers, 1);
    assert_eq!(new_row.num_orders, 1, "the two-item basket is one order");
    assert_eq!(new_row.num_items, 2);
    assert_eq!(new_row.total_revenue, 30.0);

    let ret_row = &report.segmentation[1];
    assert_eq!(ret_row.customer_type, CustomerType::Returning);
    assert_eq!(ret_row.num_orders, 2);
    assert_eq!(ret_row.num_items, 2);
    assert_eq!(ret_row.total_revenue, 70.0);

    let new_metrics = &report.metrics[0];
    assert_eq!(new_metrics.average_order_value, 30.0);
    assert_eq!(new_metrics.orders_per_customer, 1.0);
    assert_eq!(new_metrics.items_per_order, 2.0);
    let ret_metrics = &report.metrics[1];
    assert_eq!(ret_metrics.average_order_value, 35.0);
    assert_eq!(ret_metrics.orders_per_customer, 2.0);
    assert_eq!(ret_metrics.items_per_order, 1.0);
}

/// Customer types with no customers produce no summary row at all.
#[test]
fn absent_customer_type_has_no_row() {
    let snapshot = Snapshot {
        order_lines: vec![line("solo", 1, "2024-03-01 10:00:00", 10.0)],
        customers: vec![customer("solo", "2024-02-01 08:00:00")],
        deliveries: vec![],
    };
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    let report = engine.run(&snapshot).unwrap();

    assert_eq!(report.segmentation.len(), 1);
    assert_eq!(report.segmentation[0].customer_type, CustomerType::New);
    assert_eq!(report.metrics.len(), 1);
}

/// Data-quality counts: source totals and customers who never ordered.
#[test]
fn data_quality_counts() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    let report = engine.run(&small_snapshot()).unwrap();

    let dq = &report.data_quality;
    assert_eq!(dq.total_order_lines, 4);
    assert_eq!(dq.total_customers, 3);
    assert_eq!(dq.customers_without_orders, 1, "only the lurker never ordered");
    assert_eq!(dq.identity.missing_timestamp_lines, 0);
}

/// The report carries the three product partitions in fixed order.
#[test]
fn product_partitions_are_fixed() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    let report = engine.run(&small_snapshot()).unwrap();

    let labels: Vec<(String, String)> = report
        .products
        .iter()
        .map(|b| (b.segment.label().into(), b.stage.label().into()))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("one_time".into(), "first".into()),
            ("returning".into(), "first".into()),
            ("returning".into(), "subsequent".into()),
        ]
    );
}

/// Same snapshot and config, same report. The engine holds no hidden
/// state between runs.
#[test]
fn engine_is_deterministic() {
    let snapshot = demo::generate(4242, 120);
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());

    let a = engine.run(&snapshot).unwrap();
    let b = engine.run(&snapshot).unwrap();
    assert_eq!(a, b, "repeated runs over one snapshot must agree");
}

/// Demo pipeline end to end: generated anomalies surface in the report's
/// exclusion counters rather than breaking any stage.
#[test]
fn demo_snapshot_reports_cleanly() {
    let snapshot = demo::generate(7, 400);
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    let report = engine.run(&snapshot).unwrap();

    assert!(!report.segmentation.is_empty());
    assert!(
        report.data_quality.identity.missing_timestamp_lines > 0,
        "demo data includes untimestamped lines"
    );
    assert!(
        report.delivery.unmatched_status_rows > 0,
        "demo data includes ghost status rows"
    );
    assert!(
        report.retention.cells.iter().any(|c| c.quarter_offset > 0),
        "some returning customers span quarters"
    );
    for cell in &report.retention.cells {
        assert!(
            (0.0..=100.0).contains(&cell.retention_pct),
            "retention_pct out of range: {}",
            cell.retention_pct
        );
    }
}

/// Snapshot round-trip through SQLite preserves every row and field.
#[test]
fn store_snapshot_round_trip() {
    let snapshot = demo::generate(99, 60);
    let mut store = MetricsStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_snapshot(&snapshot).unwrap();

    let loaded = store.load_snapshot().unwrap();

    // The store orders by primary key, so compare sorted copies.
    let mut want = snapshot.clone();
    want.order_lines.sort_by(|a, b| a.line_item_id.cmp(&b.line_item_id));
    want.customers.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
    want.deliveries.sort_by(|a, b| a.line_item_id.cmp(&b.line_item_id));
    assert_eq!(loaded, want);

    assert_eq!(store.order_line_count().unwrap(), snapshot.order_lines.len() as u64);
    assert_eq!(store.customer_count().unwrap(), snapshot.customers.len() as u64);
}

/// A file-backed store accepts rows one at a time, and a reopened
/// connection to the same file sees all of them.
#[test]
fn file_backed_store_survives_reopen() {
    let path = std::env::temp_dir().join(format!("shoplytics-reopen-{}.db", std::process::id()));
    let path = path.to_string_lossy().into_owned();
    let cleanup = |p: &str| {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{p}{suffix}"));
        }
    };
    cleanup(&path);

    let snapshot = demo::generate(31, 20);
    let store = MetricsStore::open(&path).unwrap();
    store.migrate().unwrap();
    for c in &snapshot.customers {
        store.insert_customer(c).unwrap();
    }
    for l in &snapshot.order_lines {
        store.insert_order_line(l).unwrap();
    }
    for d in &snapshot.deliveries {
        store.insert_delivery(d).unwrap();
    }

    let reopened = store.reopen().unwrap();
    assert_eq!(
        reopened.customer_count().unwrap(),
        snapshot.customers.len() as u64
    );
    assert_eq!(
        reopened.order_line_count().unwrap(),
        snapshot.order_lines.len() as u64
    );
    assert_eq!(
        reopened.load_snapshot().unwrap().deliveries.len(),
        snapshot.deliveries.len(),
        "row-at-a-time inserts and the reopened handle must agree"
    );

    drop(reopened);
    drop(store);
    cleanup(&path);
}

/// Saved report values read back through the store accessors.
#[test]
fn store_report_round_trip() {
    let snapshot = demo::generate(2024, 300);
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    let report = engine.run(&snapshot).unwrap();

    let mut store = MetricsStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.save_report(&report).unwrap();

    assert_eq!(store.retention_cells().unwrap(), report.retention.cells);
    assert_eq!(store.segment_summary_rows().unwrap(), report.segmentation);
    assert_eq!(
        store.metric_scalar("purchase_gap_mean").unwrap(),
        report.purchase_gap.mean_days
    );
    assert_eq!(
        store.metric_scalar("total_order_lines").unwrap(),
        Some(report.data_quality.total_order_lines as f64)
    );
    assert_eq!(
        store.metric_scalar("fallback_customers").unwrap(),
        Some(report.data_quality.identity.fallback_customers as f64)
    );
    assert_eq!(
        store.metric_scalar("potential_collapses").unwrap(),
        Some(report.data_quality.identity.potential_collapses as f64)
    );
    assert_eq!(
        store.metric_scalar("delivery_unmatched_status_rows").unwrap(),
        Some(report.delivery.unmatched_status_rows as f64)
    );
    assert_eq!(
        store.metric_scalar("retention_skipped_missing_timestamp").unwrap(),
        Some(report.retention.skipped_missing_timestamp as f64)
    );
    assert_eq!(store.metric_scalar("no_such_metric").unwrap(), None);
}

/// Saving a newer report replaces the previous results wholesale.
#[test]
fn save_report_replaces_previous_results() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    let big = engine.run(&demo::generate(5, 200)).unwrap();
    let small = engine.run(&small_snapshot()).unwrap();

    let mut store = MetricsStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.save_report(&big).unwrap();
    store.save_report(&small).unwrap();

    assert_eq!(
        store.retention_cells().unwrap(),
        small.retention.cells,
        "no stale cells from the first report may survive"
    );
    assert_eq!(store.segment_summary_rows().unwrap(), small.segmentation);
}

/// The engine exposes the config it was built with, so callers can echo
/// the effective settings.
#[test]
fn engine_exposes_effective_config() {
    let engine = AnalyticsEngine::new(AnalyticsConfig::default_test());
    assert_eq!(engine.config().max_quarter_offset, 8);
    assert_eq!(engine.config().delivery_segment, Segment::OneTime);
}

/// The interval and cohort segments come from config; switching them
/// changes which customers the metrics cover.
#[test]
fn config_segments_select_population() {
    let snapshot = small_snapshot();

    let mut config = AnalyticsConfig::default_test();
    config.interval_segment = Segment::Returning;
    let report = AnalyticsEngine::new(config).run(&snapshot).unwrap();
    // repeater signed up 2024-01-15, first order 2024-02-01: 17 days.
    assert_eq!(report.days_to_first_purchase.mean_days, Some(17.0));

    let mut config = AnalyticsConfig::default_test();
    config.interval_segment = Segment::OneTime;
    let report = AnalyticsEngine::new(config).run(&snapshot).unwrap();
    // one-timer signed up 2024-02-20, ordered 2024-03-01: 10 days.
    assert_eq!(report.days_to_first_purchase.mean_days, Some(10.0));
}

/// A wider observation window admits older cohorts' far offsets.
#[test]
fn config_window_bound_is_respected() {
    let snapshot = Snapshot {
        order_lines: vec![
            line("c-1", 1, "2021-01-10 10:00:00", 5.0),
            line("c-1", 2, "2024-01-10 10:00:00", 5.0), // offset 12
        ],
        customers: vec![customer("c-1", "2021-01-01 08:00:00")],
        deliveries: vec![],
    };

    let mut config = AnalyticsConfig::default_test();
    config.max_quarter_offset = 4;
    let narrow = AnalyticsEngine::new(config).run(&snapshot).unwrap();
    assert!(narrow.retention.cells.iter().all(|c| c.quarter_offset <= 4));

    let mut config = AnalyticsConfig::default_test();
    config.max_quarter_offset = 12;
    let wide = AnalyticsEngine::new(config).run(&snapshot).unwrap();
    assert!(wide.retention.cells.iter().any(|c| c.quarter_offset == 12));
}
