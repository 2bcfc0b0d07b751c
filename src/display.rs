//! Terminal and JSON presentation of report results.
//!
//! The summary table keeps the fixed-width layout of the original report:
//!
//! ```text
//!      Reporting Group:      MHits         GB
//!                  RG1:       0.50      12.50
//! ```
//!
//! With `--json` everything is printed as one JSON document instead.

use crate::hierarchy::ResolvedGroup;
use crate::models::ReportRow;
use crate::month::Month;
use crate::summary::SummaryAggregator;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::Path;

pub struct DisplayManager;

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_report(
        &self,
        month: Month,
        product_id: &str,
        csv_path: &Path,
        rows: &[ReportRow],
        summary: &SummaryAggregator,
        json_output: bool,
    ) {
        if json_output {
            let output = serde_json::json!({
                "month": month,
                "productId": product_id,
                "csv": csv_path.display().to_string(),
                "rows": rows,
                "summary": summary.buckets(),
            });
            match serde_json::to_string_pretty(&output) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Error serializing report to JSON: {}", e),
            }
            return;
        }

        println!(
            "Traffic for month {} and product {} written to {}",
            month.to_string().bright_white().bold(),
            product_id.bright_cyan(),
            csv_path.display().to_string().bright_green()
        );
        println!(
            "{} CP codes ({} with usage)",
            rows.len().to_string().bright_white().bold(),
            rows.iter().filter(|r| r.hits.is_some() || r.bytes.is_some()).count()
        );
        println!("{}", "Summary of Reporting Groups:".bright_white().bold());
        print!("{}", render_summary_table(summary));
    }

    pub fn display_groups(&self, groups: &[ResolvedGroup], json_output: bool) {
        if json_output {
            match serde_json::to_string_pretty(&serde_json::json!({ "groups": groups })) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Error serializing groups to JSON: {}", e),
            }
            return;
        }

        println!("\n{}", "=".repeat(80).bright_cyan());
        println!("{}", "Account Groups".bright_white().bold());
        println!("{}", "=".repeat(80).bright_cyan());

        for group in groups {
            let contract = group
                .root_contract
                .as_deref()
                .map(|c| c.bright_green().to_string())
                .unwrap_or_else(|| "-".dimmed().to_string());
            println!(
                "{:>10}  {}  {}",
                group.raw_id.bright_white(),
                contract,
                group.path.join(" / ").bright_cyan()
            );
        }
        println!("\n{} groups", groups.len().to_string().bright_white().bold());
    }
}

/// Fixed-width bucket table, buckets sorted by name.
pub fn render_summary_table(summary: &SummaryAggregator) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "     Reporting Group:      MHits         GB");
    for bucket in summary.buckets() {
        let _ = writeln!(
            out,
            "{:>20}: {:>10.2} {:>10.2}",
            bucket.name,
            bucket.totals.million_hits(),
            bucket.totals.bytes
        );
    }
    out
}
