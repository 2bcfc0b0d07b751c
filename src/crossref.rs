//! CP code cross-reference maps.
//!
//! The three endpoints that describe a CP code do not share a key space, so
//! the report joins them through maps keyed by the numeric CP code id:
//!
//! - CP code -> authoritative contract (billing catalog `accessGroup`)
//! - CP code -> account group ids (one property manager call per group)
//! - CP code -> reporting group names (reporting group -> contract -> CP code)
//!
//! The maps are built once per run and only read afterwards.

use crate::error::ReportResult;
use crate::hierarchy::ResolvedGroup;
use crate::identifiers;
use crate::models::{CatalogCpCode, GroupCpCode, ReportingGroup};
use crate::source::BillingSource;
use std::collections::HashMap;
use tracing::{debug, warn};

/// CP codes listed under one account group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMembership {
    pub group_id: u64,
    pub cpcodes: Vec<GroupCpCode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossReference {
    entity_contract: HashMap<u64, String>,
    entity_groups: HashMap<u64, Vec<u64>>,
    entity_reporting_groups: HashMap<u64, Vec<String>>,
}

impl CrossReference {
    pub fn build(
        catalog: &[CatalogCpCode],
        memberships: &[GroupMembership],
        reporting_groups: &[ReportingGroup],
    ) -> Self {
        let mut crossref = Self::default();

        for cpcode in catalog {
            // accessGroup.groupId is always null here and deliberately unused.
            if let Some(contract) = cpcode.access_group.contract_id.as_deref() {
                crossref
                    .entity_contract
                    .insert(cpcode.cpcode_id, identifiers::contract_key(contract));
            }
        }

        for membership in memberships {
            for member in &membership.cpcodes {
                match identifiers::cpcode_id(&member.cpcode_id) {
                    Ok(id) => crossref
                        .entity_groups
                        .entry(id)
                        .or_default()
                        .push(membership.group_id),
                    Err(e) => warn!(group_id = membership.group_id, error = %e, "Skipping CP code"),
                }
            }
        }

        for group in reporting_groups {
            for contract in &group.contracts {
                for cpcode in &contract.cpcodes {
                    crossref
                        .entity_reporting_groups
                        .entry(cpcode.cpcode_id)
                        .or_default()
                        .push(group.reporting_group_name.clone());
                }
            }
        }

        debug!(
            contracts = crossref.entity_contract.len(),
            grouped = crossref.entity_groups.len(),
            reporting = crossref.entity_reporting_groups.len(),
            "Built cross-reference maps"
        );
        crossref
    }

    /// Authoritative contract, prefix stripped.
    pub fn contract_of(&self, cpcode: u64) -> Option<&str> {
        self.entity_contract.get(&cpcode).map(String::as_str)
    }

    pub fn groups_of(&self, cpcode: u64) -> &[u64] {
        self.entity_groups.get(&cpcode).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reporting_groups_of(&self, cpcode: u64) -> &[String] {
        self.entity_reporting_groups
            .get(&cpcode)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Fetch the CP codes of every group that has a root contract. Groups
/// without one cannot be queried and contribute no memberships.
pub async fn fetch_group_memberships<S: BillingSource + ?Sized>(
    source: &S,
    groups: &[ResolvedGroup],
) -> ReportResult<Vec<GroupMembership>> {
    let mut memberships = Vec::with_capacity(groups.len());
    for group in groups {
        let Some(contract) = group.root_contract.as_deref() else {
            continue;
        };
        let cpcodes = source
            .list_group_cpcodes(&identifiers::contract_key(contract), group.id)
            .await?;
        debug!(group_id = group.id, cpcodes = cpcodes.len(), "Fetched group CP codes");
        memberships.push(GroupMembership {
            group_id: group.id,
            cpcodes,
        });
    }
    Ok(memberships)
}
