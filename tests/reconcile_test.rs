use cpcode_usage::reconcile::{ReconciliationEngine, ReportPolicy, ReportRequest};
use cpcode_usage::summary::{BucketTotals, SummaryAggregator, MULTIPLE_BUCKET, NONE_BUCKET};
use cpcode_usage::{ReportError, ReportRow};

mod common;
use common::*;

fn request(include_no_traffic: bool) -> ReportRequest {
    ReportRequest {
        product_id: "X".to_string(),
        month: month("2024-03"),
        include_no_traffic,
    }
}

async fn run(source: &FixtureSource, include_no_traffic: bool) -> Vec<ReportRow> {
    ReconciliationEngine::new(source, ReportPolicy::default())
        .run(&request(include_no_traffic))
        .await
        .expect("reconciliation succeeds")
}

fn row<'a>(rows: &'a [ReportRow], cpcode: u64) -> &'a ReportRow {
    rows.iter()
        .find(|r| r.cpcode == cpcode)
        .unwrap_or_else(|| panic!("no row for CP code {cpcode}"))
}

#[tokio::test]
async fn test_example_scenario() {
    let source = example_source();
    let rows = run(&source, false).await;

    assert_eq!(
        rows,
        vec![ReportRow {
            contract: Some("1".to_string()),
            cpcode: 100,
            name: "Site-A".to_string(),
            group_path: vec!["Team".to_string()],
            rep_groups: vec!["RG1".to_string(), "RG2".to_string()],
            hits: Some(500_000),
            bytes: Some(12.5),
        }]
    );

    let summary = SummaryAggregator::from_rows(&rows);
    assert_eq!(summary.get("RG1"), Some(&BucketTotals { hits: 500_000, bytes: 12.5 }));
    assert_eq!(summary.get("RG2"), Some(&BucketTotals { hits: 500_000, bytes: 12.5 }));
    assert_eq!(
        summary.get(MULTIPLE_BUCKET),
        Some(&BucketTotals { hits: -500_000, bytes: -12.5 })
    );

    let calls = source.usage_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "1");
    assert_eq!(calls[0].1, "X");
    assert_eq!(calls[0].2, month("2024-03"));
    assert_eq!(calls[0].3, month("2024-04"));
}

#[tokio::test]
async fn test_reports_catalog_contract_not_fetch_contract() {
    let mut source = example_source();
    source.contracts.push(contract("ctr_2"));
    source
        .cpcodes
        .push(catalog_cpcode(200, "Site-B", "ctr_2", "ongoing", &[]));
    // Usage for 200 shows up under contract 1.
    source.usage.insert(
        "1".to_string(),
        usage_summary(&[(100, Some(1.0), Some(1.0)), (200, Some(5.0), Some(0.5))]),
    );

    let rows = run(&source, false).await;
    assert_eq!(row(&rows, 200).contract.as_deref(), Some("2"));
    assert_eq!(row(&rows, 200).hits, Some(5));
    assert_eq!(rows.iter().filter(|r| r.cpcode == 200).count(), 1);
}

#[tokio::test]
async fn test_no_traffic_filter() {
    let mut source = example_source();
    source.cpcodes.extend([
        catalog_cpcode(300, "idle-delivery", "ctr_1", "ongoing", &["Site_Accel::Site_Accel"]),
        catalog_cpcode(301, "expired", "ctr_1", "expired", &["Site_Accel::Site_Accel"]),
        catalog_cpcode(302, "other-product", "ctr_1", "ongoing", &["Other::Other"]),
    ]);
    source.reporting_groups.push(reporting_group("RG3", "1", &[300]));

    let rows = run(&source, false).await;
    let ids: Vec<u64> = rows.iter().map(|r| r.cpcode).collect();
    assert_eq!(ids, vec![100, 300]);

    let idle = row(&rows, 300);
    assert_eq!(idle.hits, None);
    assert_eq!(idle.bytes, None);
    assert_eq!(idle.rep_groups, vec!["RG3".to_string()]);
    assert_eq!(idle.contract.as_deref(), Some("1"));
}

#[tokio::test]
async fn test_include_no_traffic_skips_synthesis() {
    let mut source = example_source();
    source.cpcodes.push(catalog_cpcode(
        300,
        "idle-delivery",
        "ctr_1",
        "ongoing",
        &["Site_Accel::Site_Accel"],
    ));

    let rows = run(&source, true).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].cpcode, 100);
}

#[tokio::test]
async fn test_delivery_products_are_overridable() {
    let mut source = example_source();
    source
        .cpcodes
        .push(catalog_cpcode(302, "other-product", "ctr_1", "ongoing", &["Other::Other"]));

    let policy = ReportPolicy {
        delivery_products: vec!["Other::Other".to_string()],
        ..ReportPolicy::default()
    };
    let rows = ReconciliationEngine::new(&source, policy)
        .run(&request(false))
        .await
        .unwrap();
    assert!(rows.iter().any(|r| r.cpcode == 302));
}

#[tokio::test]
async fn test_usage_for_unknown_cpcode_is_still_reported() {
    let mut source = example_source();
    source.usage.insert(
        "1".to_string(),
        usage_summary(&[(100, Some(1.0), None), (999, Some(2.0), Some(0.2))]),
    );

    let rows = run(&source, false).await;
    let unknown = row(&rows, 999);
    assert_eq!(unknown.contract, None);
    assert_eq!(unknown.name, "");
    assert!(unknown.group_path.is_empty());
    assert!(unknown.rep_groups.is_empty());
    assert_eq!(unknown.hits, Some(2));
}

#[tokio::test]
async fn test_no_content_contract_contributes_nothing() {
    let mut source = example_source();
    source.contracts.push(contract("ctr_2"));

    let rows = run(&source, false).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(source.usage_calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_transport_error_aborts_run() {
    let mut source = example_source();
    source.failing_usage.push("1".to_string());

    let result = ReconciliationEngine::new(&source, ReportPolicy::default())
        .run(&request(false))
        .await;
    match result {
        Err(ReportError::Transport { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal error");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_usage_under_several_contracts_is_merged() {
    let mut source = example_source();
    source.contracts.push(contract("ctr_2"));
    source.usage.insert(
        "2".to_string(),
        usage_summary(&[(100, Some(100.0), Some(0.5))]),
    );

    let rows = run(&source, false).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].hits, Some(500_100));
    assert_eq!(rows[0].bytes, Some(13.0));
}

#[tokio::test]
async fn test_first_level_attribution_only() {
    let mut source = example_source();
    source.groups.extend([
        group("grp_3", "Ops", Some("grp_1"), &["ctr_1"]),
        group("grp_4", "Deep", Some("grp_2"), &["ctr_1"]),
    ]);
    source
        .group_cpcodes
        .insert(("1".to_string(), 3), members(&[100]));
    source
        .group_cpcodes
        .insert(("1".to_string(), 4), members(&[100]));
    // Membership in the root group itself carries no first-level name either.
    source
        .group_cpcodes
        .insert(("1".to_string(), 1), members(&[100]));

    let rows = run(&source, false).await;
    assert_eq!(rows[0].group_path, vec!["Team".to_string(), "Ops".to_string()]);
}

#[tokio::test]
async fn test_groups_without_root_contract_are_not_queried() {
    let mut source = example_source();
    source
        .groups
        .push(group("grp_9", "Unmatched", None, &["ctr_7-ZZZ"]));

    run(&source, false).await;
    let calls = source.group_calls.lock().unwrap();
    assert!(calls.iter().all(|(_, gid)| *gid != 9));
    assert!(calls.contains(&("1".to_string(), 2)));
}

#[tokio::test]
async fn test_hierarchy_cycle_fails() {
    let mut source = example_source();
    source.groups.extend([
        group("grp_5", "A", Some("grp_6"), &[]),
        group("grp_6", "B", Some("grp_5"), &[]),
    ]);

    let result = ReconciliationEngine::new(&source, ReportPolicy::default())
        .run(&request(false))
        .await;
    assert!(matches!(result, Err(ReportError::HierarchyCycle { .. })));
}

#[tokio::test]
async fn test_concurrent_usage_fetch_matches_sequential() {
    let mut source = example_source();
    for i in 2..=6u64 {
        source.contracts.push(contract(&format!("ctr_{i}")));
        source.cpcodes.push(catalog_cpcode(
            i * 100,
            &format!("site-{i}"),
            &format!("ctr_{i}"),
            "ongoing",
            &[],
        ));
        source.usage.insert(
            i.to_string(),
            usage_summary(&[(i * 100, Some(i as f64), Some(i as f64 / 10.0))]),
        );
    }

    let sequential = run(&source, false).await;
    let policy = ReportPolicy {
        usage_concurrency: 4,
        ..ReportPolicy::default()
    };
    let concurrent = ReconciliationEngine::new(&source, policy)
        .run(&request(false))
        .await
        .unwrap();
    assert_eq!(sequential, concurrent);
}

#[tokio::test]
async fn test_summary_identity_over_mixed_rows() {
    let mut source = example_source();
    source.cpcodes.extend([
        catalog_cpcode(101, "solo", "ctr_1", "ongoing", &[]),
        catalog_cpcode(102, "none", "ctr_1", "ongoing", &[]),
        catalog_cpcode(103, "idle", "ctr_1", "ongoing", &["Site_Accel::Site_Accel"]),
    ]);
    source.reporting_groups.push(reporting_group("RG3", "1", &[101, 100]));
    source.usage.insert(
        "1".to_string(),
        usage_summary(&[
            (100, Some(500_000.0), Some(12.5)),
            (101, Some(1_000.0), Some(0.3)),
            (102, Some(42.0), Some(0.01)),
        ]),
    );

    let rows = run(&source, false).await;
    assert_eq!(rows.len(), 4);
    let summary = SummaryAggregator::from_rows(&rows);

    let hits: u64 = rows.iter().map(|r| r.hits_or_zero()).sum();
    let bytes: f64 = rows.iter().map(|r| r.bytes_or_zero()).sum();
    assert_eq!(summary.total().hits, hits as i64);
    assert!((summary.total().bytes - bytes).abs() < 1e-9);

    // 100 is in RG1, RG2, RG3; 102 and the idle 103 have no reporting group.
    assert_eq!(summary.get(MULTIPLE_BUCKET).unwrap().hits, -1_000_000);
    assert_eq!(summary.get(NONE_BUCKET).unwrap().hits, 42);
    assert_eq!(summary.get("RG3").unwrap().hits, 501_000);
}
