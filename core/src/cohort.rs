//! Quarterly cohort retention.
//!
//! Customers are bucketed by the calendar quarter of their first order; the
//! matrix then counts, per cohort and per quarter offset, how many of them
//! placed an order that many quarters later. Percentages are always relative
//! to the same cohort's offset-0 count, which contains every cohort member
//! by construction (the first order sits at offset 0).
//!
//! RULE: Multi-item orders are collapsed to single order events before any
//! counting. Line-item noise must never inflate order or active-customer
//! counts.

use crate::classifier::{CustomerType, Segment};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::records::OrderLineRecord;
use crate::types::CustomerId;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A calendar quarter, the cohort bucketing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    /// 1 through 4.
    pub quarter: u8,
}

impl Quarter {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month0() / 3 + 1) as u8,
        }
    }

    /// Whole calendar quarters elapsed from `earlier` to `self`. Negative
    /// when `self` precedes `earlier`.
    pub fn offset_from(self, earlier: Quarter) -> i32 {
        (self.year - earlier.year) * 4 + i32::from(self.quarter) - i32::from(earlier.quarter)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

/// One cell of the retention matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionCell {
    pub cohort_quarter: Quarter,
    pub quarter_offset: u32,
    pub active_customers: u64,
    /// Percent of the cohort's offset-0 count, rounded to one decimal.
    /// Exactly 100.0 at offset 0.
    pub retention_pct: f64,
}

/// The computed matrix plus its data-quality tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionMatrix {
    /// Ordered by (cohort_quarter asc, quarter_offset asc).
    pub cells: Vec<RetentionCell>,
    /// Lines in the selected segment that carried no timestamp and could
    /// not be placed in any quarter.
    pub skipped_missing_timestamp: u64,
}

/// Build the retention matrix for the selected segment.
///
/// `max_quarter_offset` is the observation window (8 quarters in the
/// default configuration); events past it are dropped, not errors.
pub fn retention_matrix(
    lines: &[OrderLineRecord],
    classification: &BTreeMap<CustomerId, CustomerType>,
    segment: Segment,
    max_quarter_offset: u32,
) -> AnalyticsResult<RetentionMatrix> {
    // Step 1: collapse lines to unique (customer, timestamp) order events.
    let mut events_by_customer: BTreeMap<&str, BTreeSet<NaiveDate>> = BTreeMap::new();
    let mut skipped_missing_timestamp = 0u64;
    for line in lines {
        let Some(customer_type) = classification.get(&line.customer_id) else {
            continue;
        };
        if !segment.matches(*customer_type) {
            continue;
        }
        match line.purchased_at {
            Some(ts) => {
                events_by_customer
                    .entry(line.customer_id.as_str())
                    .or_default()
                    .insert(ts.date());
            }
            None => skipped_missing_timestamp += 1,
        }
    }

    // Steps 2 and 3: cohort quarter from the first order, quarter offset
    // per event, bounded by the observation window.
    let mut counted: BTreeMap<(Quarter, u32), BTreeSet<&str>> = BTreeMap::new();
    for (customer_id, order_dates) in &events_by_customer {
        // BTreeSet iteration is ascending, so the first date is the minimum.
        let Some(first) = order_dates.iter().next().copied() else {
            continue;
        };
        let cohort = Quarter::containing(first);
        for date in order_dates {
            let offset = Quarter::containing(*date).offset_from(cohort);
            debug_assert!(offset >= 0, "order predates the customer's first order");
            let offset = offset as u32;
            if offset > max_quarter_offset {
                continue;
            }
            counted
                .entry((cohort, offset))
                .or_default()
                .insert(customer_id);
        }
    }

    // Steps 5 and 6: distinct-customer counts and percentages against the
    // cohort's offset-0 base. The base must be the per-cohort maximum; a
    // larger count at any later offset means the denominator is wrong and
    // the run is reported as broken rather than silently scaled.
    let mut bases: BTreeMap<Quarter, u64> = BTreeMap::new();
    for ((cohort, offset), customers) in &counted {
        if *offset == 0 {
            bases.insert(*cohort, customers.len() as u64);
        }
    }

    let mut cells = Vec::with_capacity(counted.len());
    for ((cohort, offset), customers) in &counted {
        let count = customers.len() as u64;
        let base = bases.get(cohort).copied().unwrap_or(0);
        if count > base {
            return Err(AnalyticsError::RetentionInvariant {
                cohort: cohort.to_string(),
                offset: *offset,
                count,
                base,
            });
        }
        let retention_pct = if *offset == 0 {
            100.0
        } else {
            round1(count as f64 * 100.0 / base as f64)
        };
        cells.push(RetentionCell {
            cohort_quarter: *cohort,
            quarter_offset: *offset,
            active_customers: count,
            retention_pct,
        });
    }

    Ok(RetentionMatrix {
        cells,
        skipped_missing_timestamp,
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
