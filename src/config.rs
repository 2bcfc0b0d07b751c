//! Configuration
//!
//! Settings come from, in increasing priority:
//! - built-in defaults
//! - a TOML file (`cpcode-usage.toml`, `.cpcode-usage.toml`, or
//!   `<config dir>/cpcode-usage/config.toml`, or an explicit path)
//! - environment variables, including a `.env` file in the working
//!   directory (variables already set in the process win)
//!
//! The EdgeGrid variables keep the names used by other Akamai tooling
//! (`AKAMAI_EDGERC`, `AKAMAI_EDGERC_SECTION`, `AKAMAI_ACCOUNT_SWITCH_KEY`).

use crate::reconcile::{ReportPolicy, DEFAULT_ATTRIBUTION_DEPTH, DEFAULT_DELIVERY_PRODUCTS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// "App & API Protector with Advanced Security Management - Included delivery"
pub const DEFAULT_PRODUCT_ID: &str = "M-LC-169586";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub edgerc: EdgercConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    /// File the settings were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgercConfig {
    pub path: PathBuf,
    pub section: String,
    /// Empty means no account switching.
    pub account_switch_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub product_id: String,
    pub delivery_products: Vec<String>,
    pub attribution_depth: usize,
    pub list_delimiter: String,
    pub output_directory: PathBuf,
    pub usage_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for EdgercConfig {
    fn default() -> Self {
        Self {
            path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".edgerc"),
            section: "default".to_string(),
            account_switch_key: String::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            delivery_products: DEFAULT_DELIVERY_PRODUCTS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            attribution_depth: DEFAULT_ATTRIBUTION_DEPTH,
            list_delimiter: ";".to_string(),
            output_directory: PathBuf::from("."),
            usage_concurrency: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from file (explicit or discovered), environment and
    /// defaults, then validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::discover()?,
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn discover() -> Result<Self> {
        let config_paths = [
            PathBuf::from("cpcode-usage.toml"),
            PathBuf::from(".cpcode-usage.toml"),
            dirs::config_dir()
                .map(|d| d.join("cpcode-usage").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                return Self::load_from_file(path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // EdgeGrid
        if let Ok(val) = env::var("AKAMAI_EDGERC") {
            self.edgerc.path = expand_home(&val);
        }
        if let Ok(val) = env::var("AKAMAI_EDGERC_SECTION") {
            self.edgerc.section = val;
        }
        if let Ok(val) = env::var("AKAMAI_ACCOUNT_SWITCH_KEY") {
            self.edgerc.account_switch_key = val;
        }

        // Logging
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Report
        if let Ok(val) = env::var("CPCODE_USAGE_PRODUCT_ID") {
            self.report.product_id = val;
        }
        if let Ok(val) = env::var("CPCODE_USAGE_DELIVERY_PRODUCTS") {
            self.report.delivery_products = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(val) = env::var("CPCODE_USAGE_ATTRIBUTION_DEPTH") {
            self.report.attribution_depth = val
                .parse()
                .context("Invalid CPCODE_USAGE_ATTRIBUTION_DEPTH")?;
        }
        if let Ok(val) = env::var("CPCODE_USAGE_CONCURRENCY") {
            self.report.usage_concurrency =
                val.parse().context("Invalid CPCODE_USAGE_CONCURRENCY")?;
        }
        if let Ok(val) = env::var("CPCODE_USAGE_OUTPUT_DIR") {
            self.report.output_directory = PathBuf::from(val);
        }

        // Paths
        if let Ok(val) = env::var("CPCODE_USAGE_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.report.attribution_depth == 0 {
            return Err(anyhow::anyhow!("Attribution depth must be at least 1"));
        }

        if self.report.usage_concurrency == 0 {
            return Err(anyhow::anyhow!("Usage concurrency must be greater than 0"));
        }

        if self.report.list_delimiter.is_empty() {
            return Err(anyhow::anyhow!("List delimiter cannot be empty"));
        }

        if self.report.product_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Product id cannot be empty"));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(anyhow::anyhow!(
                "Log format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            ));
        }

        match self.logging.output.as_str() {
            "console" => {}
            "file" | "both" => {
                if !self.paths.log_directory.exists() {
                    fs::create_dir_all(&self.paths.log_directory)
                        .context("Failed to create log directory")?;
                }
            }
            other => {
                return Err(anyhow::anyhow!(
                    "Log output must be 'console', 'file' or 'both', got '{}'",
                    other
                ))
            }
        }

        Ok(())
    }

    pub fn report_policy(&self) -> ReportPolicy {
        ReportPolicy {
            delivery_products: self.report.delivery_products.clone(),
            attribution_depth: self.report.attribution_depth,
            usage_concurrency: self.report.usage_concurrency,
        }
    }

    /// Report where the settings came from. Called once logging is installed.
    pub fn log_loaded(&self) {
        match &self.source {
            Some(path) => info!(config_file = %path.display(), "Loaded configuration from file"),
            None => debug!("No configuration file found, using defaults"),
        }
        if self.report.delivery_products.is_empty() {
            warn!("No delivery products configured, CP codes without traffic will be omitted");
        }
    }

    pub fn account_switch_key(&self) -> Option<String> {
        Some(self.edgerc.account_switch_key.trim().to_string()).filter(|k| !k.is_empty())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}
