//! Traffic Report Runner
//!
//! [`TrafficAnalyzer`] ties the pieces together for one invocation:
//!
//! 1. **Reconcile**: run the [`ReconciliationEngine`] against a
//!    [`BillingSource`] for the requested product and month
//! 2. **Write**: commit the rows to `traffic_<month>.csv` (only after the whole
//!    reconciliation succeeded)
//! 3. **Summarize**: fold the rows into reporting group totals
//! 4. **Display**: print the summary table or a JSON document
//!
//! ```rust,no_run
//! use cpcode_usage::{Config, TrafficAnalyzer};
//! use cpcode_usage::client::AkamaiClient;
//! use cpcode_usage::edgerc::EdgeGridCredentials;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load(None)?;
//! let credentials = EdgeGridCredentials::from_file(&config.edgerc.path, &config.edgerc.section)?;
//! let client = AkamaiClient::new(credentials, config.account_switch_key())?;
//!
//! let analyzer = TrafficAnalyzer::new(&client, &config);
//! let month = "2024-03".parse::<cpcode_usage::Month>()?;
//! analyzer.run_report(month, "M-LC-169586", false, false).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::display::DisplayManager;
use crate::hierarchy::{GroupHierarchy, ResolvedGroup};
use crate::logging;
use crate::models::ReportRow;
use crate::month::Month;
use crate::output;
use crate::reconcile::{ReconciliationEngine, ReportRequest};
use crate::source::BillingSource;
use crate::summary::SummaryAggregator;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn, Instrument};

/// Everything one report run produced.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub rows: Vec<ReportRow>,
    pub summary: SummaryAggregator,
    pub csv_path: PathBuf,
}

pub struct TrafficAnalyzer<'a, S: BillingSource + ?Sized> {
    source: &'a S,
    config: &'a Config,
    display_manager: DisplayManager,
}

impl<'a, S: BillingSource + ?Sized> TrafficAnalyzer<'a, S> {
    pub fn new(source: &'a S, config: &'a Config) -> Self {
        Self {
            source,
            config,
            display_manager: DisplayManager::new(),
        }
    }

    /// Reconcile, write the CSV and compute the summary without printing.
    pub async fn build_report(
        &self,
        month: Month,
        product_id: &str,
        include_no_traffic: bool,
    ) -> Result<ReportOutcome> {
        let span = logging::run_span(product_id, &month.to_string());

        async {
            let engine = ReconciliationEngine::new(self.source, self.config.report_policy());
            let request = ReportRequest {
                product_id: product_id.to_string(),
                month,
                include_no_traffic,
            };

            let rows = engine
                .run(&request)
                .await
                .with_context(|| format!("Failed to build traffic report for {month}"))?;

            if rows.is_empty() {
                warn!("No CP codes to report");
            }

            let csv_path = output::write_report_file(
                &self.config.report.output_directory,
                month,
                &rows,
                &self.config.report.list_delimiter,
            )?;

            let summary = SummaryAggregator::from_rows(&rows);
            info!(buckets = summary.buckets().len(), "Summarized reporting groups");

            Ok::<_, anyhow::Error>(ReportOutcome {
                rows,
                summary,
                csv_path,
            })
        }
        .instrument(span)
        .await
    }

    pub async fn run_report(
        &self,
        month: Month,
        product_id: &str,
        include_no_traffic: bool,
        json_output: bool,
    ) -> Result<()> {
        let outcome = self
            .build_report(month, product_id, include_no_traffic)
            .await?;

        self.display_manager.display_report(
            month,
            product_id,
            &outcome.csv_path,
            &outcome.rows,
            &outcome.summary,
            json_output,
        );
        Ok(())
    }

    pub async fn resolve_groups(&self) -> Result<Vec<ResolvedGroup>> {
        let groups = self
            .source
            .list_groups()
            .await
            .context("Failed to list account groups")?;
        let resolved = GroupHierarchy::from_groups(&groups)?.resolve_all()?;
        Ok(resolved)
    }

    pub async fn run_groups(&self, json_output: bool) -> Result<()> {
        let groups = self.resolve_groups().await?;
        self.display_manager.display_groups(&groups, json_output);
        Ok(())
    }
}
