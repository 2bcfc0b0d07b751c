use cpcode_usage::output::{report_file_name, write_csv, write_report_file};
use cpcode_usage::{Month, ReportRow};
use std::fs;
use tempfile::tempdir;

fn rows() -> Vec<ReportRow> {
    vec![
        ReportRow {
            contract: Some("1".to_string()),
            cpcode: 100,
            name: "Site-A".to_string(),
            group_path: vec!["Team".to_string(), "Ops".to_string()],
            rep_groups: vec!["RG1".to_string(), "RG2".to_string()],
            hits: Some(500_000),
            bytes: Some(12.5),
        },
        ReportRow {
            contract: None,
            cpcode: 200,
            name: "Name, with comma".to_string(),
            group_path: vec![],
            rep_groups: vec![],
            hits: None,
            bytes: None,
        },
    ]
}

#[test]
fn test_csv_layout() {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, &rows(), ";").unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines[0], "contract,cpcode,name,groupPath,repGroups,hits,gb");
    assert_eq!(lines[1], "1,100,Site-A,Team;Ops,RG1;RG2,500000,12.5");
    assert_eq!(lines[2], ",200,\"Name, with comma\",,,,");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_report_file_is_named_by_month() {
    let month: Month = "2024-03".parse().unwrap();
    assert_eq!(report_file_name(month), "traffic_2024-03.csv");

    let dir = tempdir().unwrap();
    let out = dir.path().join("reports");
    let path = write_report_file(&out, month, &rows(), "|").unwrap();

    assert_eq!(path, out.join("traffic_2024-03.csv"));
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("Team|Ops"));

    // Only the final file remains.
    let entries: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_empty_report_keeps_header() {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, &[], ";").unwrap();
    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        "contract,cpcode,name,groupPath,repGroups,hits,gb\n"
    );
}
