//! Account group hierarchy resolution.
//!
//! The groups endpoint returns a flat list where each group may point at a
//! parent. [`GroupHierarchy`] indexes that list by numeric group id and walks
//! parent chains iteratively, rejecting chains that loop back on themselves.
//!
//! Two things are derived per group:
//! - the **root contract**: the contract bound to the top of the chain,
//!   recognised by its bare id appearing in the root group's name;
//! - the **path**: group names ordered from the top-level group down to the
//!   group itself.

use crate::error::{ReportError, ReportResult};
use crate::identifiers::{self, CONTRACT_PREFIX};
use crate::models::AccountGroup;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct GroupNode {
    name: String,
    parent: Option<u64>,
    contract_ids: Vec<String>,
}

/// A group with its derived root contract and path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGroup {
    pub id: u64,
    /// Id as returned by the API, e.g. `grp_42`.
    pub raw_id: String,
    pub name: String,
    /// Root contract with its `ctr_` prefix, when one could be matched.
    pub root_contract: Option<String>,
    pub path: Vec<String>,
}

impl ResolvedGroup {
    /// The name this group contributes to first-level attribution.
    ///
    /// Only groups whose path is exactly `depth` long contribute; with the
    /// default depth of 2 that is the direct children of the account root.
    pub fn first_level_name(&self, depth: usize) -> Option<&str> {
        if depth > 0 && self.path.len() == depth {
            self.path.last().map(String::as_str)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupHierarchy {
    nodes: BTreeMap<u64, GroupNode>,
    raw_ids: BTreeMap<u64, String>,
}

impl GroupHierarchy {
    pub fn from_groups(groups: &[AccountGroup]) -> ReportResult<Self> {
        let mut hierarchy = Self::default();
        for group in groups {
            let id = identifiers::group_id(&group.group_id)?;
            let parent = match group.parent_group_id.as_deref() {
                Some(raw) => Some(identifiers::group_id(raw)?),
                None => None,
            };
            hierarchy.nodes.insert(
                id,
                GroupNode {
                    name: group.group_name.clone(),
                    parent,
                    contract_ids: group.contract_ids.clone(),
                },
            );
            hierarchy.raw_ids.insert(id, group.group_id.clone());
        }
        Ok(hierarchy)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Group ids from `id` upwards. A parent id that is not in the list ends
    /// the chain.
    fn ancestors(&self, id: u64) -> ReportResult<Vec<u64>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(group_id) = current {
            let Some(node) = self.nodes.get(&group_id) else {
                break;
            };
            if !seen.insert(group_id) {
                return Err(ReportError::HierarchyCycle { group_id });
            }
            chain.push(group_id);
            current = node.parent;
        }
        Ok(chain)
    }

    /// Contract bound to the top-level ancestor of `id`, or `None` when no
    /// contract id of that ancestor appears in its name.
    pub fn resolve_root_contract(&self, id: u64) -> ReportResult<Option<String>> {
        let chain = self.ancestors(id)?;
        let Some(root) = chain.last().and_then(|root| self.nodes.get(root)) else {
            return Ok(None);
        };

        let contract = root
            .contract_ids
            .iter()
            .find(|contract| {
                let bare = identifiers::strip_prefix(contract, CONTRACT_PREFIX);
                !bare.is_empty() && root.name.contains(bare)
            })
            .cloned();

        if contract.is_none() {
            debug!(group_id = id, root = %root.name, "No contract matches the root group name");
        }
        Ok(contract)
    }

    /// Names from the top-level ancestor down to `id`. Empty for an unknown id.
    pub fn resolve_path(&self, id: u64) -> ReportResult<Vec<String>> {
        let chain = self.ancestors(id)?;
        Ok(chain
            .iter()
            .rev()
            .filter_map(|group_id| self.nodes.get(group_id))
            .map(|node| node.name.clone())
            .collect())
    }

    /// Resolve every group, ordered by id.
    pub fn resolve_all(&self) -> ReportResult<Vec<ResolvedGroup>> {
        let mut resolved = Vec::with_capacity(self.nodes.len());
        for (&id, node) in &self.nodes {
            let root_contract = self.resolve_root_contract(id)?;
            if root_contract.is_none() {
                warn!(group_id = id, group = %node.name, "Group has no resolvable root contract");
            }
            resolved.push(ResolvedGroup {
                id,
                raw_id: self.raw_ids.get(&id).cloned().unwrap_or_default(),
                name: node.name.clone(),
                root_contract,
                path: self.resolve_path(id)?,
            });
        }
        Ok(resolved)
    }
}
