use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabled::Tabled;

/// File name of the dataset, resolved next to the running executable.
pub const DATA_FILE_NAME: &str = "data.csv";
pub const REVENUE_COLUMN: &str = "Revenue";
pub const REGION_COLUMN: &str = "Region";
pub const PRODUCT_COLUMN: &str = "Product";

/// One CSV row as it appears on disk. Any of the three columns may be
/// absent from the header; csv deserializes those (and blank cells) as `None`.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "Product")]
    pub product: Option<String>,
    #[serde(rename = "Revenue")]
    pub revenue: Option<String>,
}

/// Loaded but not yet coerced table.
#[derive(Debug)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl Dataset {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub region: Option<String>,
    pub product: Option<String>,
    /// `None` marks a blank or unparseable cell; it never means zero.
    pub revenue: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoerceReport {
    pub total_rows: usize,
    pub blank_revenue: usize,
    pub unparsed_revenue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueReport {
    pub total_revenue: Option<f64>,
    pub avg_revenue_by_region: BTreeMap<String, f64>,
    pub avg_revenue_by_product: BTreeMap<String, f64>,
    pub top_region: Option<String>,
    pub total_records: usize,
}

/// Per-group breakdown shown in debug diagnostics.
#[derive(Debug, Tabled, Clone)]
pub struct GroupPreviewRow {
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Records")]
    pub records: usize,
    #[tabled(rename = "WithRevenue")]
    pub with_revenue: usize,
    #[tabled(rename = "TotalRevenue")]
    pub total_revenue: String,
    #[tabled(rename = "AvgRevenue")]
    pub avg_revenue: String,
}
