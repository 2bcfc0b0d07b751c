//! Reconciliation Engine
//!
//! Joins the usage feed of every contract with the cross-reference maps and
//! produces one [`ReportRow`] per CP code for a product and month.
//!
//! ## Pipeline
//!
//! 1. List contracts and the billing catalog.
//! 2. Resolve the account group hierarchy and fetch each group's CP codes.
//! 3. Map CP codes to reporting groups.
//! 4. Fetch usage per contract (optionally several contracts at a time) and
//!    emit a row for every reported CP code, attributed to its catalog
//!    contract rather than the contract the usage was fetched under.
//! 5. Unless `include_no_traffic` is set, add rows without statistics for
//!    catalog CP codes that had no usage but still hold an ongoing contract
//!    and a delivery product.
//!
//! Unresolvable references never abort the run. A CP code the catalog does
//! not know is still reported, just without contract and name.

use crate::crossref::{self, CrossReference};
use crate::error::ReportResult;
use crate::hierarchy::{GroupHierarchy, ResolvedGroup};
use crate::identifiers;
use crate::models::{CatalogCpCode, ReportRow, UsageRecord};
use crate::month::Month;
use crate::source::BillingSource;
use crate::usage;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Products that mark a CP code as a delivery CP code.
pub const DEFAULT_DELIVERY_PRODUCTS: &[&str] = &["Site_Accel::Site_Accel"];

/// Path length of the groups that carry first-level attribution.
pub const DEFAULT_ATTRIBUTION_DEPTH: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPolicy {
    pub delivery_products: Vec<String>,
    pub attribution_depth: usize,
    /// Contracts whose usage is fetched concurrently.
    pub usage_concurrency: usize,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            delivery_products: DEFAULT_DELIVERY_PRODUCTS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            attribution_depth: DEFAULT_ATTRIBUTION_DEPTH,
            usage_concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub product_id: String,
    pub month: Month,
    /// When set, CP codes without usage are not synthesized at all.
    pub include_no_traffic: bool,
}

/// Group and reporting group attribution for CP codes.
#[derive(Debug, Clone)]
pub struct Attribution {
    crossref: CrossReference,
    groups: HashMap<u64, ResolvedGroup>,
    depth: usize,
}

impl Attribution {
    pub fn new(crossref: CrossReference, groups: Vec<ResolvedGroup>, depth: usize) -> Self {
        Self {
            crossref,
            groups: groups.into_iter().map(|g| (g.id, g)).collect(),
            depth,
        }
    }

    pub fn contract_of(&self, cpcode: u64) -> Option<&str> {
        self.crossref.contract_of(cpcode)
    }

    /// Names of the first-level groups the CP code belongs to. Memberships
    /// at any other depth are dropped.
    pub fn first_level_names(&self, cpcode: u64) -> Vec<String> {
        self.crossref
            .groups_of(cpcode)
            .iter()
            .filter_map(|gid| match self.groups.get(gid) {
                Some(group) => group.first_level_name(self.depth),
                None => {
                    debug!(cpcode, group_id = gid, "Membership references unknown group");
                    None
                }
            })
            .map(str::to_string)
            .collect()
    }

    pub fn reporting_group_names(&self, cpcode: u64) -> Vec<String> {
        self.crossref.reporting_groups_of(cpcode).to_vec()
    }
}

pub struct ReconciliationEngine<'a, S: BillingSource + ?Sized> {
    source: &'a S,
    policy: ReportPolicy,
}

impl<'a, S: BillingSource + ?Sized> ReconciliationEngine<'a, S> {
    pub fn new(source: &'a S, policy: ReportPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &ReportPolicy {
        &self.policy
    }

    pub async fn run(&self, request: &ReportRequest) -> ReportResult<Vec<ReportRow>> {
        let contracts = self.contract_ids().await?;
        let catalog: BTreeMap<u64, CatalogCpCode> = self
            .source
            .list_cpcodes()
            .await?
            .into_iter()
            .map(|cp| (cp.cpcode_id, cp))
            .collect();
        info!(contracts = contracts.len(), cpcodes = catalog.len(), "Loaded catalog");

        let attribution = self.build_attribution(&catalog).await?;
        let usage = self.fetch_usage(&contracts, request).await?;

        let mut rows = RowSet::default();
        for (contract, records) in contracts.iter().zip(usage) {
            for record in records {
                rows.add_usage(&record, contract, &catalog, &attribution);
            }
        }
        let with_usage = rows.len();

        if !request.include_no_traffic {
            for (id, cpcode) in &catalog {
                if rows.contains(*id) || !self.is_reportable_without_traffic(cpcode) {
                    continue;
                }
                rows.push(ReportRow {
                    contract: attribution.contract_of(*id).map(str::to_string),
                    cpcode: *id,
                    name: cpcode.cpcode_name.clone(),
                    group_path: attribution.first_level_names(*id),
                    rep_groups: attribution.reporting_group_names(*id),
                    hits: None,
                    bytes: None,
                });
            }
        }

        info!(
            rows = rows.len(),
            with_usage,
            without_usage = rows.len() - with_usage,
            "Reconciled usage"
        );
        Ok(rows.into_rows())
    }

    /// Ongoing contract and at least one allow-listed delivery product.
    pub fn is_reportable_without_traffic(&self, cpcode: &CatalogCpCode) -> bool {
        cpcode.has_ongoing_contract() && cpcode.has_product_in(&self.policy.delivery_products)
    }

    async fn contract_ids(&self) -> ReportResult<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for contract in self.source.list_contracts().await? {
            let key = identifiers::contract_key(&contract.contract_id);
            if !ids.contains(&key) {
                ids.push(key);
            }
        }
        Ok(ids)
    }

    async fn build_attribution(
        &self,
        catalog: &BTreeMap<u64, CatalogCpCode>,
    ) -> ReportResult<Attribution> {
        let groups = self.source.list_groups().await?;
        let resolved = GroupHierarchy::from_groups(&groups)?.resolve_all()?;
        let memberships = crossref::fetch_group_memberships(self.source, &resolved).await?;
        let reporting_groups = self.source.list_reporting_groups().await?;

        let catalog: Vec<CatalogCpCode> = catalog.values().cloned().collect();
        let crossref = CrossReference::build(&catalog, &memberships, &reporting_groups);
        Ok(Attribution::new(
            crossref,
            resolved,
            self.policy.attribution_depth,
        ))
    }

    /// Usage records per contract, in the order of `contracts`.
    async fn fetch_usage(
        &self,
        contracts: &[String],
        request: &ReportRequest,
    ) -> ReportResult<Vec<Vec<UsageRecord>>> {
        stream::iter(contracts)
            .map(|contract| {
                usage::cpcode_statistics(
                    self.source,
                    contract,
                    &request.product_id,
                    request.month,
                )
            })
            .buffered(self.policy.usage_concurrency.max(1))
            .try_collect()
            .await
    }
}

/// Rows in emission order, at most one per CP code.
#[derive(Debug, Default)]
struct RowSet {
    rows: Vec<ReportRow>,
    index: HashMap<u64, usize>,
}

impl RowSet {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn contains(&self, cpcode: u64) -> bool {
        self.index.contains_key(&cpcode)
    }

    fn push(&mut self, row: ReportRow) {
        self.index.insert(row.cpcode, self.rows.len());
        self.rows.push(row);
    }

    fn add_usage(
        &mut self,
        record: &UsageRecord,
        fetched_under: &str,
        catalog: &BTreeMap<u64, CatalogCpCode>,
        attribution: &Attribution,
    ) {
        if let Some(&i) = self.index.get(&record.cpcode) {
            debug!(
                cpcode = record.cpcode,
                contract = fetched_under,
                "CP code reported under several contracts, merging usage"
            );
            self.rows[i].merge_usage(record.hits, record.bytes);
            return;
        }

        let name = match catalog.get(&record.cpcode) {
            Some(cpcode) => cpcode.cpcode_name.clone(),
            None => {
                warn!(
                    cpcode = record.cpcode,
                    contract = fetched_under,
                    "CP code with usage is missing from the billing catalog"
                );
                String::new()
            }
        };

        self.push(ReportRow {
            contract: attribution.contract_of(record.cpcode).map(str::to_string),
            cpcode: record.cpcode,
            name,
            group_path: attribution.first_level_names(record.cpcode),
            rep_groups: attribution.reporting_group_names(record.cpcode),
            hits: record.hits,
            bytes: record.bytes,
        });
    }

    fn into_rows(self) -> Vec<ReportRow> {
        self.rows
    }
}
