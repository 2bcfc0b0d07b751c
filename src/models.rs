//! Core Data Models
//!
//! Two families of types live here:
//!
//! 1. **API payloads**: the shapes returned by the contract, CP code, group,
//!    reporting group and billing usage endpoints. Only the fields the report
//!    needs are modelled; everything else is ignored by serde.
//! 2. **Report types**: [`UsageRecord`] (one CP code's statistics for a
//!    contract/product/month) and [`ReportRow`] (one output line).
//!
//! Identifiers are kept as the API returns them. Normalization into map keys
//! happens in [`crate::identifiers`].

use serde::{Deserialize, Serialize};

// Contracts: GET /papi/v1/contracts

#[derive(Debug, Clone, Deserialize)]
pub struct ContractsResponse {
    pub contracts: Items<Contract>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contract {
    #[serde(rename = "contractId")]
    pub contract_id: String,
    #[serde(rename = "contractTypeName", default)]
    pub contract_type_name: Option<String>,
}

// Billing catalog: GET /cprg/v1/cpcodes

#[derive(Debug, Clone, Deserialize)]
pub struct CpCodesResponse {
    pub cpcodes: Vec<CatalogCpCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogCpCode {
    #[serde(rename = "cpcodeId")]
    pub cpcode_id: u64,
    #[serde(rename = "cpcodeName")]
    pub cpcode_name: String,
    #[serde(rename = "accessGroup")]
    pub access_group: AccessGroup,
    #[serde(default)]
    pub contracts: Vec<CpCodeContract>,
    #[serde(default)]
    pub products: Vec<CpCodeProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessGroup {
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    /// Always null in this API; group membership comes from the property
    /// manager instead.
    #[serde(rename = "groupId", default)]
    pub group_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CpCodeContract {
    #[serde(rename = "contractId")]
    pub contract_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CpCodeProduct {
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(rename = "productName", default)]
    pub product_name: Option<String>,
}

pub const ONGOING_STATUS: &str = "ongoing";

impl CatalogCpCode {
    pub fn has_ongoing_contract(&self) -> bool {
        self.contracts.iter().any(|c| c.status == ONGOING_STATUS)
    }

    pub fn has_product_in(&self, allow_list: &[String]) -> bool {
        self.products
            .iter()
            .any(|p| allow_list.iter().any(|allowed| *allowed == p.product_id))
    }
}

// Access group view: GET /papi/v1/cpcodes?contractId=..&groupId=..

#[derive(Debug, Clone, Deserialize)]
pub struct GroupCpCodesResponse {
    pub cpcodes: Items<GroupCpCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupCpCode {
    #[serde(rename = "cpcodeId")]
    pub cpcode_id: String,
    #[serde(rename = "cpcodeName", default)]
    pub cpcode_name: Option<String>,
}

// Account groups: GET /papi/v1/groups

#[derive(Debug, Clone, Deserialize)]
pub struct GroupsResponse {
    pub groups: Items<AccountGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountGroup {
    #[serde(rename = "groupId")]
    pub group_id: String,
    #[serde(rename = "groupName")]
    pub group_name: String,
    #[serde(rename = "parentGroupId", default)]
    pub parent_group_id: Option<String>,
    #[serde(rename = "contractIds", default)]
    pub contract_ids: Vec<String>,
}

// Reporting groups: GET /cprg/v1/reporting-groups

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingGroupsResponse {
    pub groups: Vec<ReportingGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportingGroup {
    #[serde(rename = "reportingGroupId", default)]
    pub reporting_group_id: Option<u64>,
    #[serde(rename = "reportingGroupName")]
    pub reporting_group_name: String,
    #[serde(default)]
    pub contracts: Vec<ReportingGroupContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportingGroupContract {
    #[serde(rename = "contractId")]
    pub contract_id: String,
    #[serde(default)]
    pub cpcodes: Vec<ReportingGroupCpCode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportingGroupCpCode {
    #[serde(rename = "cpcodeId")]
    pub cpcode_id: u64,
    #[serde(rename = "cpcodeName", default)]
    pub cpcode_name: Option<String>,
}

// Usage: GET /billing/v1/contracts/{c}/products/{p}/usage/by-cp-code/monthly-summary

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    #[serde(rename = "usagePeriods", default)]
    pub usage_periods: Vec<UsagePeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePeriod {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(rename = "cpCodeStats", default)]
    pub cp_code_stats: Vec<CpCodeStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpCodeStat {
    #[serde(rename = "cpCode")]
    pub cp_code: u64,
    #[serde(default)]
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stat {
    #[serde(rename = "statType")]
    pub stat_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

// Report types

/// Statistics for one CP code under one contract/product/month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageRecord {
    pub cpcode: u64,
    pub hits: Option<u64>,
    pub bytes: Option<f64>,
}

/// One line of the traffic report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    /// Authoritative contract from the billing catalog, prefix stripped.
    pub contract: Option<String>,
    pub cpcode: u64,
    pub name: String,
    /// First-level account group names.
    #[serde(rename = "groupPath")]
    pub group_path: Vec<String>,
    #[serde(rename = "repGroups")]
    pub rep_groups: Vec<String>,
    pub hits: Option<u64>,
    /// Byte volume as reported by the usage API (GB).
    #[serde(rename = "gb")]
    pub bytes: Option<f64>,
}

impl ReportRow {
    /// Fold another usage record for the same CP code into this row.
    pub fn merge_usage(&mut self, hits: Option<u64>, bytes: Option<f64>) {
        self.hits = match (self.hits, hits) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.bytes = match (self.bytes, bytes) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }

    pub fn hits_or_zero(&self) -> u64 {
        self.hits.unwrap_or(0)
    }

    pub fn bytes_or_zero(&self) -> f64 {
        self.bytes.unwrap_or(0.0)
    }
}
