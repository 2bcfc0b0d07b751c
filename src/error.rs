//! Error taxonomy for the report pipeline
//!
//! Only conditions that abort a run are represented here. Unresolved
//! references and ambiguous hierarchy lookups are not errors: they surface
//! as `None` or empty attribution lists and are logged where they occur.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Non-2xx response other than 204 No Content.
    #[error("{method} {url} returned status {status}: {body}")]
    Transport {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unexpected response body from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A parent chain revisits a group it already passed through.
    #[error("group hierarchy has a parent cycle through group {group_id}")]
    HierarchyCycle { group_id: u64 },

    #[error("malformed identifier '{raw}' (expected optional prefix '{prefix}' and a number)")]
    MalformedIdentifier { raw: String, prefix: String },

    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("month {month} shifted by {offset} falls outside 0000-01..9999-12")]
    MonthOutOfRange { month: String, offset: i32 },

    #[error("credentials: {0}")]
    Credentials(String),
}

pub type ReportResult<T> = Result<T, ReportError>;
