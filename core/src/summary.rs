//! Per-customer-type volume and ratio summaries.
//!
//! RULE: order counts are distinct order events, not line items. A basket
//! of five items priced separately is five rows in the order log but one
//! order here, which is why AOV divides revenue by events.
//!
//! A customer type with no classified customers produces no row at all, so
//! ratio rows can never hold NaN or division-by-zero artifacts.

use crate::classifier::CustomerType;
use crate::identity::OrderIdentity;
use crate::records::OrderLineRecord;
use crate::types::CustomerId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Raw volumes for one customer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationRow {
    pub customer_type: CustomerType,
    pub num_customers: u64,
    /// Distinct order events.
    pub num_orders: u64,
    /// Order-log line items.
    pub num_items: u64,
    pub total_revenue: f64,
}

/// Ratios derived from one [`SegmentationRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub customer_type: CustomerType,
    pub average_order_value: f64,
    pub orders_per_customer: f64,
    pub items_per_order: f64,
    pub revenue_per_customer: f64,
}

/// Volumes per customer type, rows in type order, present types only.
pub fn segmentation_rows(
    lines: &[OrderLineRecord],
    classification: &BTreeMap<CustomerId, CustomerType>,
) -> Vec<SegmentationRow> {
    #[derive(Default)]
    struct Acc {
        customers: BTreeSet<CustomerId>,
        orders: BTreeSet<OrderIdentity>,
        items: u64,
        revenue: f64,
    }

    let mut by_type: BTreeMap<CustomerType, Acc> = BTreeMap::new();
    for (customer_id, customer_type) in classification {
        by_type
            .entry(*customer_type)
            .or_default()
            .customers
            .insert(customer_id.clone());
    }
    for line in lines {
        let Some(customer_type) = classification.get(&line.customer_id) else {
            continue;
        };
        let acc = by_type.entry(*customer_type).or_default();
        acc.orders.insert(OrderIdentity::resolve(line));
        acc.items += 1;
        acc.revenue += line.unit_price;
    }

    by_type
        .into_iter()
        .map(|(customer_type, acc)| SegmentationRow {
            customer_type,
            num_customers: acc.customers.len() as u64,
            num_orders: acc.orders.len() as u64,
            num_items: acc.items,
            total_revenue: acc.revenue,
        })
        .collect()
}

/// Ratio view over [`segmentation_rows`] output. Every input row has at
/// least one customer and one order by construction, so the divisions are
/// safe.
pub fn metrics_rows(segmentation: &[SegmentationRow]) -> Vec<MetricsRow> {
    segmentation
        .iter()
        .filter(|row| row.num_customers > 0 && row.num_orders > 0)
        .map(|row| MetricsRow {
            customer_type: row.customer_type,
            average_order_value: row.total_revenue / row.num_orders as f64,
            orders_per_customer: row.num_orders as f64 / row.num_customers as f64,
            items_per_order: row.num_items as f64 / row.num_orders as f64,
            revenue_per_customer: row.total_revenue / row.num_customers as f64,
        })
        .collect()
}
