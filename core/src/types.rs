//! Shared primitive types used across the entire engine.

/// A stable customer identifier as it appears in the raw order log.
pub type CustomerId = String;

/// A unique identifier for one purchased line item.
pub type LineItemId = String;

/// A whole-day interval between two calendar dates.
pub type Days = i64;
