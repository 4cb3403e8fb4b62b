//! Customer-behavior analytics over retail order snapshots.
//!
//! The engine ingests three record streams (order lines, customers,
//! delivery status), derives order identities, classifies customers, and
//! produces segmentation summaries, product breakdowns, interval metrics,
//! quarterly cohort retention, and delivery-lag metrics in one batch pass.
//!
//! RULES:
//!   - The snapshot is immutable. Every derived table is recomputed per
//!     run; the same snapshot and config always produce the same report.
//!   - Anomalous rows are excluded and counted, never corrected in place.
//!   - Only the store talks to the database.
//!   - Iteration orders are deterministic everywhere results are built.

pub mod classifier;
pub mod cohort;
pub mod config;
pub mod delivery;
pub mod demo;
pub mod engine;
pub mod error;
pub mod identity;
pub mod intervals;
pub mod products;
pub mod ranking;
pub mod records;
pub mod store;
pub mod summary;
pub mod types;
