//! Customer classification by purchase cardinality.
//!
//! RULE: CustomerType is derived, never stored. It is recomputed from the
//! full historical record set on every run; classifying over a windowed
//! subset would flip customers between types as the window moves.

use crate::identity::identities_by_customer;
use crate::records::OrderLineRecord;
use crate::types::CustomerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exactly one distinct order identity makes a customer `New`; more than
/// one makes them `Returning`. Customers with zero orders are outside the
/// classifier's domain and are absent from its output; they must never
/// default to either type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    New,
    Returning,
}

impl CustomerType {
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Returning => "returning",
        }
    }
}

/// Segment selector passed into each metric. One parameterized engine per
/// metric replaces the near-duplicate one-time/returning variants the
/// source queries carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    OneTime,
    Returning,
}

impl Segment {
    pub fn matches(self, customer_type: CustomerType) -> bool {
        match self {
            Self::OneTime => customer_type == CustomerType::New,
            Self::Returning => customer_type == CustomerType::Returning,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OneTime => "one_time",
            Self::Returning => "returning",
        }
    }
}

/// Classify every customer that appears in the order log.
pub fn classify_customers(lines: &[OrderLineRecord]) -> BTreeMap<CustomerId, CustomerType> {
    identities_by_customer(lines)
        .into_iter()
        .map(|(customer_id, identities)| {
            let customer_type = if identities.len() == 1 {
                CustomerType::New
            } else {
                CustomerType::Returning
            };
            (customer_id, customer_type)
        })
        .collect()
}
