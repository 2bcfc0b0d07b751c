//! Reporting group totals.
//!
//! Every row is credited in full to each reporting group it belongs to.
//! Two sentinel buckets keep the grand total exact:
//!
//! - [`NONE_BUCKET`] collects rows without any reporting group;
//! - [`MULTIPLE_BUCKET`] is debited `(k - 1) x stats` for a row credited to
//!   `k > 1` groups.
//!
//! So the sum over all buckets equals the sum over all rows.

use crate::models::ReportRow;
use serde::Serialize;
use std::collections::BTreeMap;

pub const NONE_BUCKET: &str = "#None";
pub const MULTIPLE_BUCKET: &str = "#Multiple";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BucketTotals {
    /// Signed because the correction bucket goes negative.
    pub hits: i64,
    #[serde(rename = "gb")]
    pub bytes: f64,
}

impl BucketTotals {
    fn add(&mut self, hits: i64, bytes: f64) {
        self.hits += hits;
        self.bytes += bytes;
    }

    pub fn million_hits(&self) -> f64 {
        self.hits as f64 / 1_000_000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryBucket {
    pub name: String,
    #[serde(flatten)]
    pub totals: BucketTotals,
}

#[derive(Debug, Clone, Default)]
pub struct SummaryAggregator {
    buckets: BTreeMap<String, BucketTotals>,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a ReportRow>) -> Self {
        let mut aggregator = Self::new();
        for row in rows {
            aggregator.add_row(row);
        }
        aggregator
    }

    pub fn add_row(&mut self, row: &ReportRow) {
        let hits = row.hits_or_zero() as i64;
        let bytes = row.bytes_or_zero();

        for group in &row.rep_groups {
            self.bucket(group).add(hits, bytes);
        }

        match row.rep_groups.len() {
            0 => self.bucket(NONE_BUCKET).add(hits, bytes),
            1 => {}
            k => {
                let extra = (k - 1) as i64;
                self.bucket(MULTIPLE_BUCKET)
                    .add(-hits * extra, -bytes * extra as f64);
            }
        }
    }

    fn bucket(&mut self, name: &str) -> &mut BucketTotals {
        self.buckets.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&BucketTotals> {
        self.buckets.get(name)
    }

    /// Buckets sorted by name.
    pub fn buckets(&self) -> Vec<SummaryBucket> {
        self.buckets
            .iter()
            .map(|(name, totals)| SummaryBucket {
                name: name.clone(),
                totals: *totals,
            })
            .collect()
    }

    pub fn total(&self) -> BucketTotals {
        self.buckets
            .values()
            .fold(BucketTotals::default(), |mut acc, t| {
                acc.add(t.hits, t.bytes);
                acc
            })
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
