//! Fulfilment lag: mean days from purchase to delivery.
//!
//! Elapsed time comes from the status feed's own pair of timestamps, not
//! from the order log, because the two sources can disagree on the purchase
//! instant. The filter keeps strictly positive lags only: a same-day
//! delivery counts as an exclusion, unlike the interval metrics which keep
//! zero-day gaps.

use crate::classifier::{CustomerType, Segment};
use crate::records::{DeliveryRecord, OrderLineRecord};
use crate::types::CustomerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean fulfilment lag over the selected segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub mean_days: Option<f64>,
    /// Status rows contributing to the mean.
    pub delivered_lines: u64,
    /// Zero-day or negative lag, dropped.
    pub excluded_non_positive: u64,
    /// Status rows missing either timestamp.
    pub missing_timestamp: u64,
    /// Status rows whose line item never appears in the order log; these
    /// cannot be attributed to a segment and are dropped.
    pub unmatched_status_rows: u64,
}

/// Mean purchase-to-delivery lag for status rows whose owning customer
/// falls in `segment`. Lags of zero days or less are excluded and counted.
pub fn delivery_lag(
    lines: &[OrderLineRecord],
    deliveries: &[DeliveryRecord],
    classification: &BTreeMap<CustomerId, CustomerType>,
    segment: Segment,
) -> DeliveryOutcome {
    let owner_by_line: BTreeMap<&str, &str> = lines
        .iter()
        .map(|l| (l.line_item_id.as_str(), l.customer_id.as_str()))
        .collect();

    let mut out = DeliveryOutcome::default();
    let mut total_days = 0i64;

    for row in deliveries {
        let Some(customer_id) = owner_by_line.get(row.line_item_id.as_str()) else {
            out.unmatched_status_rows += 1;
            continue;
        };
        let in_segment = classification
            .get(*customer_id)
            .is_some_and(|t| segment.matches(*t));
        if !in_segment {
            continue;
        }
        let (Some(purchased), Some(delivered)) = (row.purchased_at, row.delivered_at) else {
            out.missing_timestamp += 1;
            continue;
        };
        let days = (delivered.date() - purchased.date()).num_days();
        if days <= 0 {
            out.excluded_non_positive += 1;
            continue;
        }
        total_days += days;
        out.delivered_lines += 1;
    }

    if out.delivered_lines > 0 {
        out.mean_days = Some(total_days as f64 / out.delivered_lines as f64);
    }
    out
}
