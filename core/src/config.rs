//! Engine configuration loaded from the data/ directory.
//!
//! Two files: data/analytics/analytics.json holds the tuning knobs, and
//! data/products/product_names.json holds the raw-to-canonical product
//! alias table. Aliases exist because upstream feeds spell the same
//! product several ways; reports group on the canonical name.

use crate::classifier::Segment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One raw spelling mapped to its canonical product name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAlias {
    pub raw: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ProductNamesFile {
    aliases: Vec<ProductAlias>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnalyticsFile {
    max_quarter_offset: u32,
    cohort_segment: Segment,
    interval_segment: Segment,
    delivery_segment: Segment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Retention matrix columns run from offset 0 to this bound inclusive.
    pub max_quarter_offset: u32,
    pub cohort_segment: Segment,
    pub interval_segment: Segment,
    pub delivery_segment: Segment,
    /// Raw product name to canonical product name.
    pub product_names: HashMap<String, String>,
}

impl AnalyticsConfig {
    /// Load from the data/ directory.
    /// In tests, use AnalyticsConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/analytics/analytics.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: AnalyticsFile = serde_json::from_str(&content)?;

        let names_path = format!("{data_dir}/products/product_names.json");
        let names_content = std::fs::read_to_string(&names_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {names_path}: {e}"))?;
        let names_file: ProductNamesFile = serde_json::from_str(&names_content)?;
        let product_names = names_file
            .aliases
            .into_iter()
            .map(|a| (a.raw, a.canonical))
            .collect();

        Ok(Self {
            max_quarter_offset: file.max_quarter_offset,
            cohort_segment: file.cohort_segment,
            interval_segment: file.interval_segment,
            delivery_segment: file.delivery_segment,
            product_names,
        })
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            max_quarter_offset: 8,
            cohort_segment: Segment::Returning,
            interval_segment: Segment::Returning,
            delivery_segment: Segment::OneTime,
            product_names: [
                ("gift-card-25".into(), "Gift Card".into()),
                ("giftcard 25".into(), "Gift Card".into()),
            ]
            .into(),
        }
    }

    /// Canonical product name for a raw spelling. Unknown names pass
    /// through unchanged.
    pub fn normalize<'a>(&'a self, raw: &'a str) -> &'a str {
        self.product_names.get(raw).map(String::as_str).unwrap_or(raw)
    }
}
