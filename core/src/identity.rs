//! Order identity derivation: the stable logical key for one checkout event.
//!
//! Raw lines carry no order id. All lines of one physical order share the
//! same (customer_id, purchased_at), so that pair is the derived key. A line
//! with no timestamp falls back to the bare customer id, which collapses
//! every untimestamped order of that customer into one identity and can
//! undercount their distinct orders.
//!
//! RULE: The collapse is a known data-quality limitation of the source log.
//! It is counted and reported, never corrected.

use crate::records::OrderLineRecord;
use crate::types::CustomerId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The derived key identifying one checkout event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderIdentity {
    /// Normal case: the line carried a purchase timestamp.
    Keyed {
        customer_id: CustomerId,
        purchased_at: NaiveDateTime,
    },
    /// The line had no timestamp. All such lines of one customer share
    /// this identity.
    Fallback { customer_id: CustomerId },
}

impl OrderIdentity {
    /// Derive the identity for one raw line. Total and deterministic:
    /// identical inputs always yield identical identities, and two lines
    /// with equal (customer_id, purchased_at) always share one identity.
    pub fn resolve(line: &OrderLineRecord) -> Self {
        match line.purchased_at {
            Some(purchased_at) => Self::Keyed {
                customer_id: line.customer_id.clone(),
                purchased_at,
            },
            None => Self::Fallback {
                customer_id: line.customer_id.clone(),
            },
        }
    }

    pub fn customer_id(&self) -> &str {
        match self {
            Self::Keyed { customer_id, .. } | Self::Fallback { customer_id } => customer_id,
        }
    }

    /// Display form of the identity:
    /// `customer_id + "_" + timestamp`, or the bare customer id.
    pub fn key(&self) -> String {
        match self {
            Self::Keyed {
                customer_id,
                purchased_at,
            } => format!("{customer_id}_{purchased_at}"),
            Self::Fallback { customer_id } => customer_id.clone(),
        }
    }
}

/// Distinct order identities per customer, over the full snapshot.
/// Customers with zero lines do not appear.
pub fn identities_by_customer(
    lines: &[OrderLineRecord],
) -> BTreeMap<CustomerId, BTreeSet<OrderIdentity>> {
    let mut map: BTreeMap<CustomerId, BTreeSet<OrderIdentity>> = BTreeMap::new();
    for line in lines {
        map.entry(line.customer_id.clone())
            .or_default()
            .insert(OrderIdentity::resolve(line));
    }
    map
}

/// Missing-key anomaly counts. The fallback derivation keeps every line
/// countable, but analysts need to know how often it fired and how many
/// customers may be undercounted by it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDiagnostics {
    /// Raw lines with no purchase timestamp.
    pub missing_timestamp_lines: u64,
    /// Customers holding at least one fallback identity.
    pub fallback_customers: u64,
    /// Customers with two or more untimestamped lines. Several distinct
    /// untimestamped orders are indistinguishable from one multi-item
    /// order, so these customers' distinct-order counts may be too low.
    pub potential_collapses: u64,
}

pub fn diagnose(lines: &[OrderLineRecord]) -> IdentityDiagnostics {
    let mut missing_per_customer: BTreeMap<&str, u64> = BTreeMap::new();
    let mut missing_lines = 0u64;
    for line in lines {
        if line.purchased_at.is_none() {
            missing_lines += 1;
            *missing_per_customer.entry(line.customer_id.as_str()).or_default() += 1;
        }
    }

    IdentityDiagnostics {
        missing_timestamp_lines: missing_lines,
        fallback_customers: missing_per_customer.len() as u64,
        potential_collapses: missing_per_customer.values().filter(|&&n| n >= 2).count() as u64,
    }
}
