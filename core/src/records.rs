//! Raw input records: the immutable snapshot the engine computes over.
//!
//! RULE: The engine never mutates these. Every derived table is recomputed
//! from the snapshot on each invocation, so repeated runs over the same
//! snapshot always produce the same report.

use crate::types::{CustomerId, LineItemId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One purchased item. A single checkout with several items produces
/// several lines sharing the same (customer_id, purchased_at) pair; the
/// raw log carries no order id of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub line_item_id: LineItemId,
    pub customer_id: CustomerId,
    /// Missing in a small fraction of source rows. See identity.rs for
    /// how untimestamped lines are keyed.
    pub purchased_at: Option<NaiveDateTime>,
    pub product_name: String,
    pub unit_price: f64,
}

/// Immutable reference entity from the customer source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub created_on: NaiveDateTime,
}

/// Delivery companion to an order line. Sparse: not every line has one,
/// and rows may lack either timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub line_item_id: LineItemId,
    pub purchased_at: Option<NaiveDateTime>,
    pub delivered_at: Option<NaiveDateTime>,
}

/// The full input snapshot: the three record streams the engine consumes.
/// Retrieval is the store's job; the engine treats this as already
/// materialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub order_lines: Vec<OrderLineRecord>,
    pub customers: Vec<CustomerRecord>,
    pub deliveries: Vec<DeliveryRecord>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.order_lines.is_empty() && self.customers.is_empty() && self.deliveries.is_empty()
    }
}
