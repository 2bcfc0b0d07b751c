//! `.edgerc` credential file loading.
//!
//! The file is a small INI document with one section per API client:
//!
//! ```ini
//! [default]
//! client_secret = abcd...
//! host = akab-xxxx.luna.akamaiapis.net
//! access_token = akab-...
//! client_token = akab-...
//! ```

use crate::error::{ReportError, ReportResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Clone, PartialEq)]
pub struct EdgeGridCredentials {
    pub host: String,
    pub client_token: String,
    pub client_secret: String,
    pub access_token: String,
}

// Keep secrets out of logs.
impl std::fmt::Debug for EdgeGridCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeGridCredentials")
            .field("host", &self.host)
            .field("client_token", &"***")
            .field("client_secret", &"***")
            .field("access_token", &"***")
            .finish()
    }
}

impl EdgeGridCredentials {
    pub fn from_file(path: &Path, section: &str) -> ReportResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str_section(&content, section)
    }

    pub fn from_str_section(content: &str, section: &str) -> ReportResult<Self> {
        let sections = parse_ini(content);
        let values = sections
            .get(section)
            .ok_or_else(|| ReportError::Credentials(format!("section [{section}] not found")))?;

        let get = |key: &str| {
            values
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| {
                    ReportError::Credentials(format!("section [{section}] has no '{key}'"))
                })
        };

        let host = get("host")?;
        let host = host
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            host,
            client_token: get("client_token")?,
            client_secret: get("client_secret")?,
            access_token: get("access_token")?,
        })
    }
}

fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let Some(section) = current.as_ref() else {
            continue;
        };
        if let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) {
            let value = value.trim().trim_matches('"').to_string();
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_lowercase(), value);
        }
    }
    sections
}
