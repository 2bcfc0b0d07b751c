//! Identifier normalization.
//!
//! The billing catalog, the property manager and the reporting group API
//! return the same logical identifiers with different string prefixes
//! (`ctr_1-ABC` vs `1-ABC`, `grp_42` vs `42`). Every contract or group id is
//! passed through here before it is used as a map key.

use crate::error::{ReportError, ReportResult};

pub const CONTRACT_PREFIX: &str = "ctr_";
pub const GROUP_PREFIX: &str = "grp_";
pub const CPCODE_PREFIX: &str = "cpc_";

/// Remove `prefix` from `raw` if present. Identifiers without the prefix
/// pass through unchanged.
pub fn strip_prefix<'a>(raw: &'a str, prefix: &str) -> &'a str {
    raw.strip_prefix(prefix).unwrap_or(raw)
}

/// Bare contract id, e.g. `ctr_1-ABC` -> `1-ABC`.
pub fn contract_key(raw: &str) -> String {
    strip_prefix(raw.trim(), CONTRACT_PREFIX).to_string()
}

/// Parse a numeric identifier that may carry `prefix`.
pub fn parse_numeric_id(raw: &str, prefix: &str) -> ReportResult<u64> {
    strip_prefix(raw.trim(), prefix)
        .parse()
        .map_err(|_| ReportError::MalformedIdentifier {
            raw: raw.to_string(),
            prefix: prefix.to_string(),
        })
}

pub fn group_id(raw: &str) -> ReportResult<u64> {
    parse_numeric_id(raw, GROUP_PREFIX)
}

pub fn cpcode_id(raw: &str) -> ReportResult<u64> {
    parse_numeric_id(raw, CPCODE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix_present_and_absent() {
        assert_eq!(strip_prefix("ctr_1-ABC", CONTRACT_PREFIX), "1-ABC");
        assert_eq!(strip_prefix("1-ABC", CONTRACT_PREFIX), "1-ABC");
        assert_eq!(strip_prefix("", CONTRACT_PREFIX), "");
    }

    #[test]
    fn test_strip_prefix_only_leading() {
        assert_eq!(strip_prefix("x-ctr_1", CONTRACT_PREFIX), "x-ctr_1");
    }

    #[test]
    fn test_group_id_parsing() {
        assert_eq!(group_id("grp_42").unwrap(), 42);
        assert_eq!(group_id("42").unwrap(), 42);
        assert!(matches!(
            group_id("grp_abc"),
            Err(ReportError::MalformedIdentifier { .. })
        ));
    }

    #[test]
    fn test_contract_key() {
        assert_eq!(contract_key("ctr_C-0N7RAC7"), "C-0N7RAC7");
        assert_eq!(contract_key(" C-0N7RAC7 "), "C-0N7RAC7");
    }
}
