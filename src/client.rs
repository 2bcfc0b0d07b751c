//! Authenticated HTTP client for the Akamai APIs.
//!
//! Requests are signed with the EdgeGrid `EG1-HMAC-SHA256` scheme. One client
//! is built per run from the `.edgerc` credentials and handed to every
//! collaborator by reference.

use crate::edgerc::EdgeGridCredentials;
use crate::error::{ReportError, ReportResult};
use crate::identifiers;
use crate::models::{
    AccountGroup, CatalogCpCode, Contract, ContractsResponse, CpCodesResponse, GroupCpCode,
    GroupCpCodesResponse, GroupsResponse, ReportingGroup, ReportingGroupsResponse, UsageSummary,
};
use crate::month::Month;
use crate::source::BillingSource;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

const SIGNING_ALGORITHM: &str = "EG1-HMAC-SHA256";

pub struct AkamaiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: EdgeGridCredentials,
    account_switch_key: Option<String>,
}

impl AkamaiClient {
    pub fn new(
        credentials: EdgeGridCredentials,
        account_switch_key: Option<String>,
    ) -> ReportResult<Self> {
        let base = format!("https://{}/", credentials.host);
        Self::with_base_url(&base, credentials, account_switch_key)
    }

    /// Client against an explicit base URL instead of the credential host.
    pub fn with_base_url(
        base_url: &str,
        credentials: EdgeGridCredentials,
        account_switch_key: Option<String>,
    ) -> ReportResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ReportError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
            account_switch_key: account_switch_key.filter(|k| !k.is_empty()),
        })
    }

    /// Absolute URL for an API path, with the account switch key appended.
    pub fn api_url(&self, path: &str) -> ReportResult<Url> {
        let mut url = self.base_url.join(path).map_err(|e| ReportError::InvalidUrl {
            url: path.to_string(),
            reason: e.to_string(),
        })?;
        if let Some(key) = &self.account_switch_key {
            url.query_pairs_mut().append_pair("accountSwitchKey", key);
        }
        Ok(url)
    }

    /// GET `path`. `Ok(None)` on 204 No Content; any other status outside
    /// 2xx is a [`ReportError::Transport`].
    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> ReportResult<Option<String>> {
        let url = self.api_url(path)?;
        let timestamp = chrono::Utc::now().format("%Y%m%dT%H:%M:%S+0000").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();
        let authorization = sign_request(&self.credentials, "GET", &url, &timestamp, &nonce)?;

        debug!(url = %url, "GET");
        let mut request = self.http.get(url.clone()).header("Authorization", authorization);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|source| ReportError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!(url = %url, "No content");
            return Ok(None);
        }

        let body = response.text().await.map_err(|source| ReportError::Http {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Request failed");
            return Err(ReportError::Transport {
                method: "GET".to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> ReportResult<Option<T>> {
        let Some(body) = self.get(path, headers).await? else {
            return Ok(None);
        };
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|source| ReportError::Decode {
                url: path.to_string(),
                source,
            })
    }
}

/// Build the EdgeGrid `Authorization` header for a body-less request.
pub fn sign_request(
    credentials: &EdgeGridCredentials,
    method: &str,
    url: &Url,
    timestamp: &str,
    nonce: &str,
) -> ReportResult<String> {
    let auth_header = format!(
        "{} client_token={};access_token={};timestamp={};nonce={};",
        SIGNING_ALGORITHM, credentials.client_token, credentials.access_token, timestamp, nonce
    );

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };
    let path_and_query = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };

    // method, scheme, host, path+query, canonical headers, content hash, auth header
    let data_to_sign = [
        method.to_uppercase().as_str(),
        url.scheme(),
        host.as_str(),
        path_and_query.as_str(),
        "",
        "",
        auth_header.as_str(),
    ]
    .join("\t");

    let signing_key = base64_hmac(credentials.client_secret.as_bytes(), timestamp)?;
    let signature = base64_hmac(signing_key.as_bytes(), &data_to_sign)?;

    Ok(format!("{auth_header}signature={signature}"))
}

fn base64_hmac(key: &[u8], data: &str) -> ReportResult<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ReportError::Credentials(format!("unusable client secret: {e}")))?;
    mac.update(data.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl BillingSource for AkamaiClient {
    async fn list_contracts(&self) -> ReportResult<Vec<Contract>> {
        let response: Option<ContractsResponse> = self.get_json("/papi/v1/contracts", &[]).await?;
        Ok(response.map(|r| r.contracts.items).unwrap_or_default())
    }

    async fn list_cpcodes(&self) -> ReportResult<Vec<CatalogCpCode>> {
        let response: Option<CpCodesResponse> = self.get_json("/cprg/v1/cpcodes", &[]).await?;
        Ok(response.map(|r| r.cpcodes).unwrap_or_default())
    }

    async fn list_group_cpcodes(
        &self,
        contract_id: &str,
        group_id: u64,
    ) -> ReportResult<Vec<GroupCpCode>> {
        let path = format!(
            "/papi/v1/cpcodes?contractId={}&groupId={}",
            identifiers::contract_key(contract_id),
            group_id
        );
        let headers = [("accept", "application/json"), ("PAPI-Use-Prefixes", "false")];
        let response: Option<GroupCpCodesResponse> = self.get_json(&path, &headers).await?;
        Ok(response.map(|r| r.cpcodes.items).unwrap_or_default())
    }

    async fn list_groups(&self) -> ReportResult<Vec<AccountGroup>> {
        let response: Option<GroupsResponse> = self.get_json("/papi/v1/groups", &[]).await?;
        Ok(response.map(|r| r.groups.items).unwrap_or_default())
    }

    async fn list_reporting_groups(&self) -> ReportResult<Vec<ReportingGroup>> {
        let response: Option<ReportingGroupsResponse> =
            self.get_json("/cprg/v1/reporting-groups", &[]).await?;
        Ok(response.map(|r| r.groups).unwrap_or_default())
    }

    async fn usage_by_cpcode(
        &self,
        contract_id: &str,
        product_id: &str,
        start: Month,
        end: Month,
    ) -> ReportResult<Option<UsageSummary>> {
        let path = format!(
            "/billing/v1/contracts/{}/products/{}/usage/by-cp-code/monthly-summary?start={}&end={}",
            identifiers::contract_key(contract_id),
            product_id,
            start,
            end
        );
        self.get_json(&path, &[]).await
    }
}
