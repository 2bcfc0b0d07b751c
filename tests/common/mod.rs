#![allow(dead_code)]

use async_trait::async_trait;
use cpcode_usage::models::*;
use cpcode_usage::source::BillingSource;
use cpcode_usage::{Month, ReportError, ReportResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory billing API.
#[derive(Default)]
pub struct FixtureSource {
    pub contracts: Vec<Contract>,
    pub cpcodes: Vec<CatalogCpCode>,
    pub groups: Vec<AccountGroup>,
    /// Keyed by (bare contract id, numeric group id).
    pub group_cpcodes: HashMap<(String, u64), Vec<GroupCpCode>>,
    pub reporting_groups: Vec<ReportingGroup>,
    /// Keyed by bare contract id; a missing entry answers "no content".
    pub usage: HashMap<String, UsageSummary>,
    /// Contracts whose usage call fails with a transport error.
    pub failing_usage: Vec<String>,
    pub usage_calls: Mutex<Vec<(String, String, Month, Month)>>,
    pub group_calls: Mutex<Vec<(String, u64)>>,
}

#[async_trait]
impl BillingSource for FixtureSource {
    async fn list_contracts(&self) -> ReportResult<Vec<Contract>> {
        Ok(self.contracts.clone())
    }

    async fn list_cpcodes(&self) -> ReportResult<Vec<CatalogCpCode>> {
        Ok(self.cpcodes.clone())
    }

    async fn list_group_cpcodes(
        &self,
        contract_id: &str,
        group_id: u64,
    ) -> ReportResult<Vec<GroupCpCode>> {
        self.group_calls
            .lock()
            .unwrap()
            .push((contract_id.to_string(), group_id));
        Ok(self
            .group_cpcodes
            .get(&(contract_id.to_string(), group_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_groups(&self) -> ReportResult<Vec<AccountGroup>> {
        Ok(self.groups.clone())
    }

    async fn list_reporting_groups(&self) -> ReportResult<Vec<ReportingGroup>> {
        Ok(self.reporting_groups.clone())
    }

    async fn usage_by_cpcode(
        &self,
        contract_id: &str,
        product_id: &str,
        start: Month,
        end: Month,
    ) -> ReportResult<Option<UsageSummary>> {
        self.usage_calls.lock().unwrap().push((
            contract_id.to_string(),
            product_id.to_string(),
            start,
            end,
        ));
        if self.failing_usage.iter().any(|c| c == contract_id) {
            return Err(ReportError::Transport {
                method: "GET".to_string(),
                url: format!("/billing/v1/contracts/{contract_id}"),
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self.usage.get(contract_id).cloned())
    }
}

pub fn contract(id: &str) -> Contract {
    Contract {
        contract_id: id.to_string(),
        contract_type_name: None,
    }
}

pub fn catalog_cpcode(
    id: u64,
    name: &str,
    contract: &str,
    status: &str,
    products: &[&str],
) -> CatalogCpCode {
    CatalogCpCode {
        cpcode_id: id,
        cpcode_name: name.to_string(),
        access_group: AccessGroup {
            contract_id: Some(contract.to_string()),
            group_id: None,
        },
        contracts: vec![CpCodeContract {
            contract_id: contract.trim_start_matches("ctr_").to_string(),
            status: status.to_string(),
        }],
        products: products
            .iter()
            .map(|p| CpCodeProduct {
                product_id: p.to_string(),
                product_name: None,
            })
            .collect(),
    }
}

pub fn group(id: &str, name: &str, parent: Option<&str>, contracts: &[&str]) -> AccountGroup {
    AccountGroup {
        group_id: id.to_string(),
        group_name: name.to_string(),
        parent_group_id: parent.map(str::to_string),
        contract_ids: contracts.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn members(ids: &[u64]) -> Vec<GroupCpCode> {
    ids.iter()
        .map(|id| GroupCpCode {
            cpcode_id: id.to_string(),
            cpcode_name: None,
        })
        .collect()
}

pub fn reporting_group(name: &str, contract: &str, ids: &[u64]) -> ReportingGroup {
    ReportingGroup {
        reporting_group_id: None,
        reporting_group_name: name.to_string(),
        contracts: vec![ReportingGroupContract {
            contract_id: contract.to_string(),
            cpcodes: ids
                .iter()
                .map(|id| ReportingGroupCpCode {
                    cpcode_id: *id,
                    cpcode_name: None,
                })
                .collect(),
        }],
    }
}

/// `(cpcode, hits, gb)` triples for a single usage period.
pub fn usage_summary(stats: &[(u64, Option<f64>, Option<f64>)]) -> UsageSummary {
    UsageSummary {
        usage_periods: vec![UsagePeriod {
            month: None,
            cp_code_stats: stats
                .iter()
                .map(|(cpcode, hits, gb)| {
                    let mut values = Vec::new();
                    if let Some(gb) = gb {
                        values.push(Stat {
                            stat_type: "Bytes".to_string(),
                            value: *gb,
                            unit: Some("GB".to_string()),
                        });
                    }
                    if let Some(hits) = hits {
                        values.push(Stat {
                            stat_type: "Hits".to_string(),
                            value: *hits,
                            unit: None,
                        });
                    }
                    CpCodeStat {
                        cp_code: *cpcode,
                        stats: values,
                    }
                })
                .collect(),
        }],
    }
}

/// One contract, root group "1-ACME" with child "Team"; CP code 100 sits in
/// "Team" and in reporting groups RG1 and RG2, with usage for the month.
pub fn example_source() -> FixtureSource {
    let mut source = FixtureSource {
        contracts: vec![contract("ctr_1")],
        cpcodes: vec![catalog_cpcode(
            100,
            "Site-A",
            "ctr_1",
            "ongoing",
            &["Site_Accel::Site_Accel"],
        )],
        groups: vec![
            group("grp_1", "1-ACME", None, &["ctr_1"]),
            group("grp_2", "Team", Some("grp_1"), &["ctr_1"]),
        ],
        reporting_groups: vec![
            reporting_group("RG1", "1", &[100]),
            reporting_group("RG2", "1", &[100]),
        ],
        ..Default::default()
    };
    source
        .group_cpcodes
        .insert(("1".to_string(), 2), members(&[100]));
    source.usage.insert(
        "1".to_string(),
        usage_summary(&[(100, Some(500_000.0), Some(12.5))]),
    );
    source
}

pub fn month(s: &str) -> Month {
    s.parse().unwrap()
}
