//! Read-only view of the catalog and usage APIs consumed by the report.
//!
//! [`crate::client::AkamaiClient`] is the production implementation. Tests
//! drive the reconciliation engine through in-memory implementations.

use crate::error::ReportResult;
use crate::models::{
    AccountGroup, CatalogCpCode, Contract, GroupCpCode, ReportingGroup, UsageSummary,
};
use crate::month::Month;
use async_trait::async_trait;

#[async_trait]
pub trait BillingSource: Send + Sync {
    async fn list_contracts(&self) -> ReportResult<Vec<Contract>>;

    /// Billing catalog view of every CP code in the account.
    async fn list_cpcodes(&self) -> ReportResult<Vec<CatalogCpCode>>;

    /// CP codes whose access group is `group_id` under `contract_id`. Both
    /// ids are passed without prefixes.
    async fn list_group_cpcodes(
        &self,
        contract_id: &str,
        group_id: u64,
    ) -> ReportResult<Vec<GroupCpCode>>;

    async fn list_groups(&self) -> ReportResult<Vec<AccountGroup>>;

    async fn list_reporting_groups(&self) -> ReportResult<Vec<ReportingGroup>>;

    /// Monthly usage by CP code for `[start, end)`. `None` when the API
    /// answers 204 No Content.
    async fn usage_by_cpcode(
        &self,
        contract_id: &str,
        product_id: &str,
        start: Month,
        end: Month,
    ) -> ReportResult<Option<UsageSummary>>;
}
