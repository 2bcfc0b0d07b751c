//! CP Code Usage Library
//!
//! Builds a monthly traffic report per CP code from the Akamai billing API
//! and attributes every CP code to its first-level account groups and its
//! reporting groups.
//!
//! ## Architecture Overview
//!
//! - [`identifiers`] - prefix stripping so ids from different APIs compare equal
//! - [`month`] - `YYYY-MM` arithmetic for usage windows
//! - [`hierarchy`] - root contract and path resolution over the flat group list
//! - [`crossref`] - CP code to contract / group / reporting group maps
//! - [`usage`] - per-contract usage retrieval
//! - [`reconcile`] - the engine that joins usage with the maps into report rows
//! - [`summary`] - per reporting group totals with `#None` and `#Multiple`
//! - [`source`] - the API surface the engine consumes
//! - [`client`] / [`edgerc`] - EdgeGrid-signed HTTP client and credentials
//! - [`output`] / [`display`] - CSV file and terminal/JSON output
//! - [`analyzer`] - one report run end to end
//! - [`config`] / [`logging`] - configuration and structured logging
//!
//! ## Main Entry Point
//!
//! [`TrafficAnalyzer`] drives a run against any [`source::BillingSource`];
//! [`client::AkamaiClient`] is the production source.

pub mod analyzer;
pub mod client;
pub mod config;
pub mod crossref;
pub mod display;
pub mod edgerc;
pub mod error;
pub mod hierarchy;
pub mod identifiers;
pub mod logging;
pub mod models;
pub mod month;
pub mod output;
pub mod reconcile;
pub mod source;
pub mod summary;
pub mod usage;

pub use analyzer::{ReportOutcome, TrafficAnalyzer};
pub use config::Config;
pub use error::{ReportError, ReportResult};
pub use models::*;
pub use month::Month;
