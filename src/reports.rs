use crate::types::{GroupPreviewRow, RevenueReport, SalesRecord};
use crate::util::{average, format_number};
use std::collections::BTreeMap;
use tracing::warn;

/// Running totals for one group key.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GroupAcc {
    pub records: usize,
    pub with_revenue: usize,
    pub sum: f64,
    /// Incremental mean; stays finite when `sum` overflows.
    pub running_mean: f64,
}

impl GroupAcc {
    fn push(&mut self, revenue: Option<f64>) {
        self.records += 1;
        if let Some(v) = revenue {
            self.with_revenue += 1;
            self.sum += v;
            self.running_mean += (v - self.running_mean) / self.with_revenue as f64;
        }
    }

    /// `None` for a group without revenue, or one whose mean is not a
    /// finite number even after falling back to the running mean.
    pub fn mean(&self) -> Option<f64> {
        let mean = if self.sum.is_finite() {
            average(self.sum, self.with_revenue)
        } else {
            (self.with_revenue > 0).then_some(self.running_mean)
        };
        mean.filter(|m| m.is_finite())
    }
}

/// Group records by a categorical key. Rows without a key are left out;
/// keys iterate in lexicographic order.
pub fn group_by<F>(data: &[SalesRecord], key: F) -> BTreeMap<String, GroupAcc>
where
    F: Fn(&SalesRecord) -> Option<&str>,
{
    let mut map: BTreeMap<String, GroupAcc> = BTreeMap::new();
    for r in data {
        if let Some(k) = key(r) {
            map.entry(k.to_string()).or_default().push(r.revenue);
        }
    }
    map
}

pub fn by_region(data: &[SalesRecord]) -> BTreeMap<String, GroupAcc> {
    group_by(data, |r| r.region.as_deref())
}

pub fn by_product(data: &[SalesRecord]) -> BTreeMap<String, GroupAcc> {
    group_by(data, |r| r.product.as_deref())
}

/// Groups without a finite mean are dropped.
fn averages(groups: &BTreeMap<String, GroupAcc>) -> BTreeMap<String, f64> {
    groups
        .iter()
        .filter_map(|(k, acc)| acc.mean().map(|m| (k.clone(), m)))
        .collect()
}

/// Ranking used to pick the top key: larger sum first, then the larger
/// mean (the same total earned from fewer rows). Groups without any
/// revenue have no mean and lose that second comparison.
fn outranks(a: &GroupAcc, b: &GroupAcc) -> bool {
    if a.sum != b.sum {
        return a.sum > b.sum;
    }
    match (a.mean(), b.mean()) {
        (Some(x), Some(y)) => x > y,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Key with the largest summed revenue. The map is walked in key order and
/// only a strictly better group replaces the leader, so full ties go to the
/// lexicographically smallest key.
pub fn top_by_sum(groups: &BTreeMap<String, GroupAcc>) -> Option<String> {
    let mut best: Option<(&String, &GroupAcc)> = None;
    for (k, acc) in groups {
        match best {
            Some((_, leader)) if !outranks(acc, leader) => {}
            _ => best = Some((k, acc)),
        }
    }
    best.map(|(k, _)| k.clone())
}

pub fn generate_report(data: &[SalesRecord]) -> RevenueReport {
    let values: Vec<f64> = data.iter().filter_map(|r| r.revenue).collect();
    let total_records = data.len();

    if values.is_empty() {
        return RevenueReport {
            total_revenue: None,
            avg_revenue_by_region: BTreeMap::new(),
            avg_revenue_by_product: BTreeMap::new(),
            top_region: None,
            total_records,
        };
    }

    let total: f64 = values.iter().sum();
    if !total.is_finite() {
        warn!(values = values.len(), "revenue total overflows; reporting it as null");
    }

    let regions = by_region(data);
    let products = by_product(data);
    RevenueReport {
        total_revenue: Some(total).filter(|t| t.is_finite()),
        avg_revenue_by_region: averages(&regions),
        avg_revenue_by_product: averages(&products),
        top_region: top_by_sum(&regions),
        total_records,
    }
}

/// Flatten both groupings into rows for the diagnostic table.
pub fn group_preview(data: &[SalesRecord]) -> Vec<GroupPreviewRow> {
    let mut rows = Vec::new();
    for (group, groups) in [("Region", by_region(data)), ("Product", by_product(data))] {
        for (key, acc) in groups {
            rows.push(GroupPreviewRow {
                group: group.to_string(),
                key,
                records: acc.records,
                with_revenue: acc.with_revenue,
                total_revenue: format_number(acc.sum, 2),
                avg_revenue: acc
                    .mean()
                    .map(|m| format_number(m, 2))
                    .unwrap_or_else(|| "-".to_string()),
            });
        }
    }
    rows
}
