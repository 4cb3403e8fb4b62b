//! report-runner: headless analytics report runner.
//!
//! Usage:
//!   report-runner --demo --seed 42 --customers 500 --db shop.db
//!   report-runner --db shop.db --json

use anyhow::Result;
use shoplytics_core::{
    config::AnalyticsConfig,
    demo,
    engine::{AnalyticsEngine, AnalyticsReport},
    store::MetricsStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let customers = parse_arg(&args, "--customers", 500u32);
    let demo_mode = args.iter().any(|a| a == "--demo");
    let json_mode = args.iter().any(|a| a == "--json");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    if !json_mode {
        println!("shoplytics report-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        if demo_mode {
            println!("  demo seed: {seed}, customers: {customers}");
        }
        println!();
    }

    let mut store = MetricsStore::open(db)?;
    store.migrate()?;

    let snapshot = if demo_mode {
        let snapshot = demo::generate(seed, customers);
        store.insert_snapshot(&snapshot)?;
        snapshot
    } else {
        store.load_snapshot()?
    };
    if snapshot.is_empty() {
        anyhow::bail!("database {db} holds no snapshot; run with --demo to generate one");
    }

    let config = AnalyticsConfig::load(data_dir)?;
    let engine = AnalyticsEngine::new(config);
    let cfg = engine.config();
    log::info!(
        "config: window={}q cohort={} intervals={} delivery={}",
        cfg.max_quarter_offset,
        cfg.cohort_segment.label(),
        cfg.interval_segment.label(),
        cfg.delivery_segment.label()
    );
    let report = engine.run(&snapshot)?;
    store.save_report(&report)?;
    log::info!("report saved to {db}");

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &AnalyticsReport) {
    let dq = &report.data_quality;
    println!("=== REPORT SUMMARY ===");
    println!("  order lines:     {}", dq.total_order_lines);
    println!(
        "  customers:       {} ({} never ordered)",
        dq.total_customers, dq.customers_without_orders
    );
    println!(
        "  missing ts:      {} lines on {} customers",
        dq.identity.missing_timestamp_lines, dq.identity.fallback_customers
    );
    println!();

    for row in &report.segmentation {
        println!(
            "  [{}] customers={} orders={} items={} revenue={:.2}",
            row.customer_type.label(),
            row.num_customers,
            row.num_orders,
            row.num_items,
            row.total_revenue
        );
    }
    for row in &report.metrics {
        println!(
            "  [{}] aov={:.2} orders/cust={:.2} items/order={:.2} revenue/cust={:.2}",
            row.customer_type.label(),
            row.average_order_value,
            row.orders_per_customer,
            row.items_per_order,
            row.revenue_per_customer
        );
    }
    println!();

    println!(
        "  first purchase:  mean {} days over {} customers ({} negative excluded)",
        fmt_mean(report.days_to_first_purchase.mean_days),
        report.days_to_first_purchase.customers,
        report.days_to_first_purchase.excluded_negative
    );
    println!(
        "  purchase gap:    mean {} days over {} customers ({} single-order)",
        fmt_mean(report.purchase_gap.mean_days),
        report.purchase_gap.customers,
        report.purchase_gap.single_order_customers
    );
    println!(
        "  delivery lag:    mean {} days over {} lines ({} same-day excluded)",
        fmt_mean(report.delivery.mean_days),
        report.delivery.delivered_lines,
        report.delivery.excluded_non_positive
    );
    println!();

    let cohorts = report
        .retention
        .cells
        .iter()
        .filter(|c| c.quarter_offset == 0)
        .count();
    println!(
        "  retention:       {} cells across {} cohorts",
        report.retention.cells.len(),
        cohorts
    );
    for cell in report.retention.cells.iter().take(12) {
        println!(
            "    {} +{}q: {} active ({:.1}%)",
            cell.cohort_quarter, cell.quarter_offset, cell.active_customers, cell.retention_pct
        );
    }

    println!();
    for breakdown in &report.products {
        println!(
            "  products [{} / {}]: {} rows",
            breakdown.segment.label(),
            breakdown.stage.label(),
            breakdown.rows.len()
        );
        for row in breakdown.rows.iter().take(5) {
            println!(
                "    {:<24} items={} revenue={:.2} avg={:.2}",
                row.product_name, row.items_purchased, row.total_revenue, row.average_price
            );
        }
    }
}

fn fmt_mean(mean: Option<f64>) -> String {
    match mean {
        Some(v) => format!("{v:.1}"),
        None => "n/a".to_string(),
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
