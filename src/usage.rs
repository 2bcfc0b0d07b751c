//! Per-contract usage retrieval.

use crate::error::ReportResult;
use crate::models::{UsageRecord, UsageSummary};
use crate::month::Month;
use crate::source::BillingSource;
use tracing::debug;

pub const STAT_BYTES: &str = "Bytes";
pub const STAT_HITS: &str = "Hits";

/// Per-CP code statistics for one contract, product and month. A 204 from
/// the usage API yields an empty list.
pub async fn cpcode_statistics<S: BillingSource + ?Sized>(
    source: &S,
    contract_id: &str,
    product_id: &str,
    month: Month,
) -> ReportResult<Vec<UsageRecord>> {
    let summary = source
        .usage_by_cpcode(contract_id, product_id, month, month.window_end()?)
        .await?;

    match summary {
        Some(summary) => {
            let records = extract_records(&summary);
            debug!(contract = contract_id, records = records.len(), "Fetched usage");
            Ok(records)
        }
        None => {
            debug!(contract = contract_id, "No usage for contract");
            Ok(Vec::new())
        }
    }
}

/// Flatten usage periods into one record per reported CP code entry.
pub fn extract_records(summary: &UsageSummary) -> Vec<UsageRecord> {
    summary
        .usage_periods
        .iter()
        .flat_map(|period| period.cp_code_stats.iter())
        .map(|stat| {
            let mut record = UsageRecord {
                cpcode: stat.cp_code,
                hits: None,
                bytes: None,
            };
            for s in &stat.stats {
                match s.stat_type.as_str() {
                    STAT_BYTES => record.bytes = Some(s.value.max(0.0)),
                    STAT_HITS => record.hits = Some(s.value.max(0.0).round() as u64),
                    _ => {}
                }
            }
            record
        })
        .collect()
}
