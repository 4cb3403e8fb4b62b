//! The analytics engine: one batch pass over an immutable snapshot.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Identity diagnostics
//!   2. Customer classification
//!   3. Segmentation and metrics summaries
//!   4. Product breakdowns
//!   5. Interval metrics
//!   6. Cohort retention
//!   7. Delivery lag
//!
//! RULES:
//!   - Stages read the snapshot and earlier stage outputs, never later ones.
//!   - Anomalous rows are excluded and counted, never corrected in place.
//!   - Every stage logs its outcome so a silent report is impossible.

use crate::{
    classifier::{classify_customers, CustomerType, Segment},
    cohort::{retention_matrix, RetentionMatrix},
    config::AnalyticsConfig,
    delivery::{delivery_lag, DeliveryOutcome},
    error::AnalyticsResult,
    identity::{diagnose, IdentityDiagnostics},
    intervals::{
        days_between_first_and_second, days_to_first_purchase, DaysToFirstPurchase, PurchaseGap,
    },
    products::{product_breakdown, ProductBreakdown},
    ranking::PurchaseStage,
    records::Snapshot,
    summary::{metrics_rows, segmentation_rows, MetricsRow, SegmentationRow},
    types::CustomerId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row-level source counts and identity diagnostics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_order_lines: u64,
    pub total_customers: u64,
    /// Customer-source rows that never appear in the order log.
    pub customers_without_orders: u64,
    pub identity: IdentityDiagnostics,
}

/// Everything one engine run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub segmentation: Vec<SegmentationRow>,
    pub metrics: Vec<MetricsRow>,
    pub products: Vec<ProductBreakdown>,
    pub days_to_first_purchase: DaysToFirstPurchase,
    pub purchase_gap: PurchaseGap,
    pub retention: RetentionMatrix,
    pub delivery: DeliveryOutcome,
    pub data_quality: DataQualityReport,
}

pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Run every stage over `snapshot` and assemble the report.
    pub fn run(&self, snapshot: &Snapshot) -> AnalyticsResult<AnalyticsReport> {
        log::info!(
            "run: {} order lines, {} customers, {} status rows",
            snapshot.order_lines.len(),
            snapshot.customers.len(),
            snapshot.deliveries.len()
        );

        let identity = diagnose(&snapshot.order_lines);
        if identity.potential_collapses > 0 {
            log::warn!(
                "identity: {} customers with multiple untimestamped lines, \
                 their distinct orders may be collapsed",
                identity.potential_collapses
            );
        }

        let classification = classify_customers(&snapshot.order_lines);
        let new = classification
            .values()
            .filter(|t| **t == CustomerType::New)
            .count();
        log::info!(
            "classify: {} new, {} returning",
            new,
            classification.len() - new
        );

        let segmentation = segmentation_rows(&snapshot.order_lines, &classification);
        let metrics = metrics_rows(&segmentation);
        log::debug!("summary: {} customer-type rows", segmentation.len());

        // The three partitions a merchandising review asks for. A one-time
        // customer has no subsequent stage by definition.
        let products = vec![
            self.products_for(snapshot, &classification, Segment::OneTime, PurchaseStage::First),
            self.products_for(snapshot, &classification, Segment::Returning, PurchaseStage::First),
            self.products_for(
                snapshot,
                &classification,
                Segment::Returning,
                PurchaseStage::Subsequent,
            ),
        ];

        let days_to_first = days_to_first_purchase(
            &snapshot.order_lines,
            &snapshot.customers,
            &classification,
            self.config.interval_segment,
        );
        let gap = days_between_first_and_second(
            &snapshot.order_lines,
            &classification,
            self.config.interval_segment,
        );
        log::info!(
            "intervals: first-purchase mean {:?} over {} customers, gap mean {:?} over {}",
            days_to_first.mean_days,
            days_to_first.customers,
            gap.mean_days,
            gap.customers
        );

        let retention = retention_matrix(
            &snapshot.order_lines,
            &classification,
            self.config.cohort_segment,
            self.config.max_quarter_offset,
        )?;
        log::info!("retention: {} matrix cells", retention.cells.len());

        let delivery = delivery_lag(
            &snapshot.order_lines,
            &snapshot.deliveries,
            &classification,
            self.config.delivery_segment,
        );
        if delivery.unmatched_status_rows > 0 {
            log::warn!(
                "delivery: {} status rows with no matching order line",
                delivery.unmatched_status_rows
            );
        }

        let customers_without_orders = snapshot
            .customers
            .iter()
            .filter(|c| !classification.contains_key(&c.customer_id))
            .count() as u64;
        let data_quality = DataQualityReport {
            total_order_lines: snapshot.order_lines.len() as u64,
            total_customers: snapshot.customers.len() as u64,
            customers_without_orders,
            identity,
        };

        Ok(AnalyticsReport {
            segmentation,
            metrics,
            products,
            days_to_first_purchase: days_to_first,
            purchase_gap: gap,
            retention,
            delivery,
            data_quality,
        })
    }

    fn products_for(
        &self,
        snapshot: &Snapshot,
        classification: &BTreeMap<CustomerId, CustomerType>,
        segment: Segment,
        stage: PurchaseStage,
    ) -> ProductBreakdown {
        product_breakdown(
            &snapshot.order_lines,
            classification,
            &self.config,
            segment,
            stage,
        )
    }
}
