use super::MetricsStore;
use crate::{
    classifier::CustomerType,
    cohort::{Quarter, RetentionCell},
    engine::AnalyticsReport,
    error::AnalyticsResult,
    summary::SegmentationRow,
};
use rusqlite::{params, OptionalExtension};

fn customer_type_from_sql(idx: usize, value: String) -> rusqlite::Result<CustomerType> {
    match value.as_str() {
        "new" => Ok(CustomerType::New),
        "returning" => Ok(CustomerType::Returning),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown customer type: {other}").into(),
        )),
    }
}

impl MetricsStore {
    // ── Report persistence ────────────────────────────────────────

    /// Replace the stored results with this report's. Matrix and summary
    /// tables are cleared first so cells from an earlier snapshot cannot
    /// survive into the new results.
    pub fn save_report(&mut self, report: &AnalyticsReport) -> AnalyticsResult<()> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM retention_cell", [])?;
        for cell in &report.retention.cells {
            tx.execute(
                "INSERT INTO retention_cell (
                    cohort_year, cohort_quarter, quarter_offset,
                    active_customers, retention_pct
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    cell.cohort_quarter.year,
                    cell.cohort_quarter.quarter,
                    cell.quarter_offset,
                    cell.active_customers as i64,
                    cell.retention_pct,
                ],
            )?;
        }

        tx.execute("DELETE FROM segment_summary", [])?;
        for row in &report.segmentation {
            tx.execute(
                "INSERT INTO segment_summary (
                    customer_type, num_customers, num_orders, num_items, total_revenue
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.customer_type.label(),
                    row.num_customers as i64,
                    row.num_orders as i64,
                    row.num_items as i64,
                    row.total_revenue,
                ],
            )?;
        }

        let scalars: [(&str, Option<f64>); 17] = [
            ("days_to_first_purchase_mean", report.days_to_first_purchase.mean_days),
            (
                "days_to_first_purchase_customers",
                Some(report.days_to_first_purchase.customers as f64),
            ),
            (
                "days_to_first_purchase_excluded_negative",
                Some(report.days_to_first_purchase.excluded_negative as f64),
            ),
            ("purchase_gap_mean", report.purchase_gap.mean_days),
            ("purchase_gap_customers", Some(report.purchase_gap.customers as f64)),
            (
                "purchase_gap_single_order_customers",
                Some(report.purchase_gap.single_order_customers as f64),
            ),
            ("delivery_lag_mean", report.delivery.mean_days),
            ("delivery_delivered_lines", Some(report.delivery.delivered_lines as f64)),
            (
                "delivery_excluded_non_positive",
                Some(report.delivery.excluded_non_positive as f64),
            ),
            (
                "delivery_unmatched_status_rows",
                Some(report.delivery.unmatched_status_rows as f64),
            ),
            (
                "retention_skipped_missing_timestamp",
                Some(report.retention.skipped_missing_timestamp as f64),
            ),
            ("total_order_lines", Some(report.data_quality.total_order_lines as f64)),
            ("total_customers", Some(report.data_quality.total_customers as f64)),
            (
                "customers_without_orders",
                Some(report.data_quality.customers_without_orders as f64),
            ),
            (
                "missing_timestamp_lines",
                Some(report.data_quality.identity.missing_timestamp_lines as f64),
            ),
            (
                "fallback_customers",
                Some(report.data_quality.identity.fallback_customers as f64),
            ),
            (
                "potential_collapses",
                Some(report.data_quality.identity.potential_collapses as f64),
            ),
        ];
        for (name, value) in scalars {
            tx.execute(
                "INSERT INTO metric_scalar (name, value) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                params![name, value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // ── Report read-back ──────────────────────────────────────────

    pub fn retention_cells(&self) -> AnalyticsResult<Vec<RetentionCell>> {
        let mut stmt = self.conn.prepare(
            "SELECT cohort_year, cohort_quarter, quarter_offset, active_customers, retention_pct
             FROM retention_cell
             ORDER BY cohort_year, cohort_quarter, quarter_offset",
        )?;
        let cells = stmt
            .query_map([], |row| {
                Ok(RetentionCell {
                    cohort_quarter: Quarter {
                        year: row.get(0)?,
                        quarter: row.get::<_, i64>(1)? as u8,
                    },
                    quarter_offset: row.get::<_, i64>(2)? as u32,
                    active_customers: row.get::<_, i64>(3)? as u64,
                    retention_pct: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cells)
    }

    pub fn segment_summary_rows(&self) -> AnalyticsResult<Vec<SegmentationRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_type, num_customers, num_orders, num_items, total_revenue
             FROM segment_summary ORDER BY customer_type",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SegmentationRow {
                    customer_type: customer_type_from_sql(0, row.get(0)?)?,
                    num_customers: row.get::<_, i64>(1)? as u64,
                    num_orders: row.get::<_, i64>(2)? as u64,
                    num_items: row.get::<_, i64>(3)? as u64,
                    total_revenue: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// A stored scalar. Missing rows and stored NULLs both read as None.
    pub fn metric_scalar(&self, name: &str) -> AnalyticsResult<Option<f64>> {
        let value: Option<Option<f64>> = self
            .conn
            .query_row(
                "SELECT value FROM metric_scalar WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }
}
