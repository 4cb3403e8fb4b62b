//! Chronological purchase ranking with two tie disciplines.
//!
//! Sequential gives every line a distinct rank; ties at identical
//! timestamps are broken by input order (deterministic for a given input
//! ordering, otherwise unspecified). Tie-sharing is a dense rank: all lines
//! at one timestamp share a rank and the next distinct timestamp continues
//! without a gap.
//!
//! RULE: Any metric that joins product-level line items back in must use
//! tie-sharing rank. A multi-item order is several lines at one timestamp;
//! sequential ranking would count it as several purchases.

use crate::records::OrderLineRecord;
use crate::types::CustomerId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDiscipline {
    /// Strict 1, 2, 3, ... per line.
    Sequential,
    /// Dense: equal timestamps share a rank, no gaps.
    TieSharing,
}

/// Stage selector for metrics that split a customer's history at the first
/// order. Stage is a property of the order, not the line, so it is always
/// derived from tie-sharing rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStage {
    First,
    Subsequent,
}

impl PurchaseStage {
    pub fn matches(self, dense_rank: u32) -> bool {
        match self {
            Self::First => dense_rank == 1,
            Self::Subsequent => dense_rank >= 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Subsequent => "subsequent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPurchase {
    pub customer_id: CustomerId,
    pub purchased_at: NaiveDateTime,
    pub rank: u32,
}

/// Rank one customer's purchase timestamps under the given discipline.
/// Output is in chronological order; within one timestamp, input order is
/// preserved (stable sort).
pub fn rank(
    customer_id: &str,
    timestamps: &[NaiveDateTime],
    discipline: RankDiscipline,
) -> Vec<RankedPurchase> {
    let mut sorted: Vec<NaiveDateTime> = timestamps.to_vec();
    sorted.sort();

    match discipline {
        RankDiscipline::Sequential => sorted
            .into_iter()
            .enumerate()
            .map(|(i, purchased_at)| RankedPurchase {
                customer_id: customer_id.to_string(),
                purchased_at,
                rank: i as u32 + 1,
            })
            .collect(),
        RankDiscipline::TieSharing => {
            let dense = dense_rank_by_timestamp(timestamps);
            sorted
                .into_iter()
                .map(|purchased_at| RankedPurchase {
                    customer_id: customer_id.to_string(),
                    purchased_at,
                    rank: dense[&purchased_at],
                })
                .collect()
        }
    }
}

/// The tie-sharing discipline as a lookup: dense rank per distinct
/// timestamp. Joining a product line back to its order ordinal is a map
/// lookup on the line's timestamp.
pub fn dense_rank_by_timestamp(timestamps: &[NaiveDateTime]) -> BTreeMap<NaiveDateTime, u32> {
    let distinct: BTreeMap<NaiveDateTime, u32> = timestamps
        .iter()
        .map(|ts| (*ts, 0))
        .collect();
    distinct
        .into_iter()
        .enumerate()
        .map(|(i, (ts, _))| (ts, i as u32 + 1))
        .collect()
}

/// Timestamp at a given dense rank, if the customer reached it. Rank 1 is
/// the first order, rank 2 the second distinct order event, and so on.
pub fn timestamp_at_dense_rank(
    timestamps: &[NaiveDateTime],
    wanted: u32,
) -> Option<NaiveDateTime> {
    dense_rank_by_timestamp(timestamps)
        .into_iter()
        .find(|(_, rank)| *rank == wanted)
        .map(|(ts, _)| ts)
}

/// Keyed purchase timestamps per customer, in input order. Untimestamped
/// lines are skipped here; identity.rs counts them.
pub fn keyed_timestamps_by_customer(
    lines: &[OrderLineRecord],
) -> BTreeMap<CustomerId, Vec<NaiveDateTime>> {
    let mut map: BTreeMap<CustomerId, Vec<NaiveDateTime>> = BTreeMap::new();
    for line in lines {
        if let Some(ts) = line.purchased_at {
            map.entry(line.customer_id.clone()).or_default().push(ts);
        }
    }
    map
}
