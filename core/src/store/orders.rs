use super::{ts_from_sql, ts_required, ts_to_sql, MetricsStore, TS_FORMAT};
use crate::{
    error::AnalyticsResult,
    records::{CustomerRecord, DeliveryRecord, OrderLineRecord, Snapshot},
};
use rusqlite::params;

impl MetricsStore {
    // ── Source rows ───────────────────────────────────────────────

    pub fn insert_customer(&self, c: &CustomerRecord) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO customer (customer_id, created_on) VALUES (?1, ?2)",
            params![&c.customer_id, c.created_on.format(TS_FORMAT).to_string()],
        )?;
        Ok(())
    }

    pub fn insert_order_line(&self, line: &OrderLineRecord) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO order_line (line_item_id, customer_id, purchased_at, product_name, unit_price)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &line.line_item_id,
                &line.customer_id,
                ts_to_sql(line.purchased_at),
                &line.product_name,
                line.unit_price,
            ],
        )?;
        Ok(())
    }

    pub fn insert_delivery(&self, row: &DeliveryRecord) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO order_status (line_item_id, purchased_at, delivered_at)
             VALUES (?1, ?2, ?3)",
            params![
                &row.line_item_id,
                ts_to_sql(row.purchased_at),
                ts_to_sql(row.delivered_at),
            ],
        )?;
        Ok(())
    }

    /// Bulk-insert a whole snapshot inside one transaction.
    pub fn insert_snapshot(&mut self, snapshot: &Snapshot) -> AnalyticsResult<()> {
        let tx = self.conn.transaction()?;
        for c in &snapshot.customers {
            tx.execute(
                "INSERT INTO customer (customer_id, created_on) VALUES (?1, ?2)",
                params![&c.customer_id, c.created_on.format(TS_FORMAT).to_string()],
            )?;
        }
        for line in &snapshot.order_lines {
            tx.execute(
                "INSERT INTO order_line (line_item_id, customer_id, purchased_at, product_name, unit_price)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &line.line_item_id,
                    &line.customer_id,
                    ts_to_sql(line.purchased_at),
                    &line.product_name,
                    line.unit_price,
                ],
            )?;
        }
        for row in &snapshot.deliveries {
            tx.execute(
                "INSERT INTO order_status (line_item_id, purchased_at, delivered_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    &row.line_item_id,
                    ts_to_sql(row.purchased_at),
                    ts_to_sql(row.delivered_at),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Read the whole snapshot back, each table in primary-key order.
    pub fn load_snapshot(&self) -> AnalyticsResult<Snapshot> {
        let mut stmt = self.conn.prepare(
            "SELECT line_item_id, customer_id, purchased_at, product_name, unit_price
             FROM order_line ORDER BY line_item_id",
        )?;
        let order_lines = stmt
            .query_map([], |row| {
                Ok(OrderLineRecord {
                    line_item_id: row.get(0)?,
                    customer_id: row.get(1)?,
                    purchased_at: ts_from_sql(2, row.get(2)?)?,
                    product_name: row.get(3)?,
                    unit_price: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT customer_id, created_on FROM customer ORDER BY customer_id",
        )?;
        let customers = stmt
            .query_map([], |row| {
                Ok(CustomerRecord {
                    customer_id: row.get(0)?,
                    created_on: ts_required(1, row.get(1)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT line_item_id, purchased_at, delivered_at
             FROM order_status ORDER BY line_item_id",
        )?;
        let deliveries = stmt
            .query_map([], |row| {
                Ok(DeliveryRecord {
                    line_item_id: row.get(0)?,
                    purchased_at: ts_from_sql(1, row.get(1)?)?,
                    delivered_at: ts_from_sql(2, row.get(2)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Snapshot {
            order_lines,
            customers,
            deliveries,
        })
    }

    pub fn order_line_count(&self) -> AnalyticsResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM order_line", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    pub fn customer_count(&self) -> AnalyticsResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}
