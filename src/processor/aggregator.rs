//! Group-by / average / "Other" bucketing over filtered listings.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::processor::{
    Field, Filter, ProcessorError, column::ColumnType, listing_table::ListingTable,
};

/// Groups smaller than this are folded into [`OTHER_KEY`] by the drill-down views
pub const DEFAULT_BUCKET_THRESHOLD: usize = 50;

/// Key of the catch-all bucket
pub const OTHER_KEY: &str = "Other";

/// One pie slice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    pub key: String,
    pub count: usize,
    pub average_price: f64,
    /// Share of all returned listings, 0..=100
    pub percentage: f64,
}

/// Running count and price mass of one group
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct GroupTotals {
    pub count: usize,
    pub price_sum: f64,
}

impl GroupTotals {
    pub fn add(&mut self, price: f64) {
        self.count += 1;
        self.price_sum += price;
    }

    pub fn merge(self, other: GroupTotals) -> GroupTotals {
        GroupTotals {
            count: self.count + other.count,
            price_sum: self.price_sum + other.price_sum,
        }
    }

    pub fn average(&self) -> f64 {
        self.price_sum / self.count as f64
    }
}

/// Filter, group and bucket listings.
///
/// Rows must satisfy every filter and carry a parseable price to be counted.
/// Groups with fewer than `bucket_threshold` rows are merged into a single
/// `"Other"` record; a threshold of 0 disables bucketing.
///
/// Records come back by descending count (ties by key) with `"Other"` last.
/// An empty selection yields an empty vector.
pub fn aggregate(
    table: &ListingTable,
    filters: &[Filter],
    group_by: Field,
    bucket_threshold: usize,
) -> Result<Vec<AggregateRecord>, ProcessorError> {
    let keys = table.field(group_by)?;
    if keys.column_type() != ColumnType::Str {
        return Err(ProcessorError::TypeMismatch {
            column: group_by.column_name().to_string(),
            operation: "group by".into(),
        });
    }
    let prices = table.field(Field::Price)?;

    let mut all_filters = filters.to_vec();
    all_filters.push(Filter::present(Field::Price));
    let rows = table.apply_filters(&all_filters)?;

    let mut groups: BTreeMap<&str, GroupTotals> = BTreeMap::new();
    for row in rows {
        let (Some(key), Some(price)) = (keys.str_at(row), prices.f64_at(row)) else {
            continue;
        };
        groups.entry(key).or_default().add(price);
    }

    Ok(finish(bucket(groups, bucket_threshold)))
}

/// Fold every group below `threshold` into `"Other"`.
///
/// Small groups are summed in key order so the result does not depend on
/// how the groups were discovered.
fn bucket(groups: BTreeMap<&str, GroupTotals>, threshold: usize) -> Vec<(String, GroupTotals)> {
    let mut kept = Vec::with_capacity(groups.len());
    let mut other = GroupTotals::default();

    for (key, totals) in groups {
        if totals.count < threshold {
            other = other.merge(totals);
        } else {
            kept.push((key.to_string(), totals));
        }
    }

    if other.count > 0 {
        match kept.iter_mut().find(|(key, _)| key == OTHER_KEY) {
            Some((_, existing)) => *existing = existing.merge(other),
            None => kept.push((OTHER_KEY.to_string(), other)),
        }
    }

    kept
}

fn finish(mut groups: Vec<(String, GroupTotals)>) -> Vec<AggregateRecord> {
    groups.sort_by(|(ka, a), (kb, b)| {
        (ka == OTHER_KEY)
            .cmp(&(kb == OTHER_KEY))
            .then(b.count.cmp(&a.count))
            .then(ka.cmp(kb))
    });

    let total: usize = groups.iter().map(|(_, t)| t.count).sum();

    groups
        .into_iter()
        .map(|(key, totals)| AggregateRecord {
            key,
            count: totals.count,
            average_price: totals.average(),
            percentage: 100.0 * totals.count as f64 / total as f64,
        })
        .collect()
}
