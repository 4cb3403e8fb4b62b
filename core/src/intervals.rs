//! Elapsed-time interval metrics with data-quality filtering.
//!
//! Both metrics exclude anomalous rows instead of correcting them, and both
//! report how many rows each filter dropped so analysts can judge
//! materiality. An empty result is `None` ("no data"), never zero.

use crate::classifier::{CustomerType, Segment};
use crate::ranking::{keyed_timestamps_by_customer, rank, timestamp_at_dense_rank, RankDiscipline};
use crate::records::{CustomerRecord, OrderLineRecord};
use crate::types::CustomerId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean days from signup to first purchase over the selected segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DaysToFirstPurchase {
    pub mean_days: Option<f64>,
    /// Customers contributing to the mean.
    pub customers: u64,
    /// Purchase recorded before signup: a data-entry anomaly, dropped.
    pub excluded_negative: u64,
    /// Order-log customers absent from the customer source.
    pub missing_signup: u64,
    /// Selected customers with no timestamped purchase at all.
    pub missing_timestamp: u64,
}

/// Mean days between the first and second distinct order events over the
/// selected segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PurchaseGap {
    pub mean_days: Option<f64>,
    pub customers: u64,
    /// No second distinct order event; dropped from the mean, never
    /// treated as a zero-day gap.
    pub single_order_customers: u64,
    pub missing_timestamp: u64,
}

/// Signup to first purchase, using the sequential-rank-1 purchase.
/// Negative differences (purchase before recorded signup) are excluded
/// before averaging.
pub fn days_to_first_purchase(
    lines: &[OrderLineRecord],
    customers: &[CustomerRecord],
    classification: &BTreeMap<CustomerId, CustomerType>,
    segment: Segment,
) -> DaysToFirstPurchase {
    let created_on: BTreeMap<&str, NaiveDateTime> = customers
        .iter()
        .map(|c| (c.customer_id.as_str(), c.created_on))
        .collect();
    let timestamps = keyed_timestamps_by_customer(lines);

    let mut out = DaysToFirstPurchase::default();
    let mut total_days = 0i64;

    for (customer_id, customer_type) in classification {
        if !segment.matches(*customer_type) {
            continue;
        }
        let Some(events) = timestamps.get(customer_id) else {
            out.missing_timestamp += 1;
            continue;
        };
        let Some(first) = rank(customer_id, events, RankDiscipline::Sequential)
            .into_iter()
            .find(|r| r.rank == 1)
        else {
            out.missing_timestamp += 1;
            continue;
        };
        let Some(signup) = created_on.get(customer_id.as_str()) else {
            out.missing_signup += 1;
            continue;
        };
        let days = (first.purchased_at.date() - signup.date()).num_days();
        if days < 0 {
            out.excluded_negative += 1;
            continue;
        }
        total_days += days;
        out.customers += 1;
    }

    if out.customers > 0 {
        out.mean_days = Some(total_days as f64 / out.customers as f64);
    }
    out
}

/// First to second purchase, using tie-sharing rank so a multi-item first
/// order never masquerades as the second purchase.
pub fn days_between_first_and_second(
    lines: &[OrderLineRecord],
    classification: &BTreeMap<CustomerId, CustomerType>,
    segment: Segment,
) -> PurchaseGap {
    let timestamps = keyed_timestamps_by_customer(lines);

    let mut out = PurchaseGap::default();
    let mut total_days = 0i64;

    for (customer_id, customer_type) in classification {
        if !segment.matches(*customer_type) {
            continue;
        }
        let Some(events) = timestamps.get(customer_id) else {
            out.missing_timestamp += 1;
            continue;
        };
        let Some(first) = timestamp_at_dense_rank(events, 1) else {
            out.missing_timestamp += 1;
            continue;
        };
        let Some(second) = timestamp_at_dense_rank(events, 2) else {
            out.single_order_customers += 1;
            continue;
        };
        total_days += (second.date() - first.date()).num_days();
        out.customers += 1;
    }

    if out.customers > 0 {
        out.mean_days = Some(total_days as f64 / out.customers as f64);
    }
    out
}
