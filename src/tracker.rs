//! Client for the remote bug tracker.
//!
//! Protocol, relative to the configured base URL:
//! - `POST /tokens` with `{"account", "password"}` returns `{"token"}`
//! - `GET /products/{id}/bugs?limit=<n>&status=all` with a `Token` header
//!   returns `{"bugs": [...]}`
//!
//! Every request is bounded by the configured timeout.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrackerConfig;
use crate::counters::CounterSnapshot;
use crate::error::{Error, Result};

/// Header carrying the session token on data requests
pub const TOKEN_HEADER: &str = "Token";

/// Person reference as the tracker reports it.
///
/// Usually a profile object; unassigned slots come back as an empty
/// string, a bare account name, or null. Anything else is kept opaque and
/// counts as unassigned rather than failing the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PersonRef {
    Profile {
        #[serde(default)]
        account: Option<String>,
        #[serde(default)]
        realname: Option<String>,
    },
    Account(String),
    Other(serde_json::Value),
}

impl PersonRef {
    /// Name used as the counter key
    pub fn display_name(&self) -> &str {
        match self {
            PersonRef::Profile { realname, .. } => realname.as_deref().unwrap_or(""),
            PersonRef::Account(_) | PersonRef::Other(_) => "",
        }
    }
}

/// The two people a bug record is counted under
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugRecord {
    #[serde(default)]
    pub resolved_by: Option<PersonRef>,
    #[serde(default)]
    pub assigned_to: Option<PersonRef>,
}

impl BugRecord {
    pub fn resolver_name(&self) -> &str {
        self.resolved_by
            .as_ref()
            .map(PersonRef::display_name)
            .unwrap_or("")
    }

    pub fn assignee_name(&self) -> &str {
        self.assigned_to
            .as_ref()
            .map(PersonRef::display_name)
            .unwrap_or("")
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    account: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
}

#[derive(Deserialize)]
struct BugsPage {
    #[serde(default)]
    bugs: Vec<BugRecord>,
}

#[derive(Debug, Clone)]
pub struct TrackerClient {
    base_url: String,
    account: String,
    password: String,
    product_id: u64,
    page_limit: u64,
    client: reqwest::Client,
}

impl TrackerClient {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        config.ensure_usable()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.host.trim_end_matches('/').to_string(),
            account: config.account.clone(),
            password: config.password.clone(),
            product_id: config.product_id,
            page_limit: config.page_limit,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange the account credentials for a session token
    pub async fn fetch_token(&self) -> Result<String> {
        let url = format!("{}/tokens", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&TokenRequest {
                account: &self.account,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| Error::RemoteAuth(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::RemoteAuth(describe_status(status, resp).await));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::RemoteAuth(format!("invalid token response: {e}")))?;
        if body.token.is_empty() {
            return Err(Error::RemoteAuth("tracker returned an empty token".to_string()));
        }
        Ok(body.token)
    }

    /// Fetch every bug of the configured product, in any status
    pub async fn fetch_bugs(&self, token: &str) -> Result<Vec<BugRecord>> {
        let url = format!("{}/products/{}/bugs", self.base_url, self.product_id);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("limit", self.page_limit.to_string()),
                ("status", "all".to_string()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| Error::RemoteFetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::RemoteFetch(describe_status(status, resp).await));
        }

        let page: BugsPage = resp
            .json()
            .await
            .map_err(|e| Error::RemoteFetch(format!("invalid bug list: {e}")))?;
        debug!(records = page.bugs.len(), "fetched bug records");
        Ok(page.bugs)
    }

    /// Authenticate, fetch and aggregate in one go
    pub async fn fetch_counters(&self) -> Result<CounterSnapshot> {
        let token = self.fetch_token().await?;
        let bugs = self.fetch_bugs(&token).await?;
        Ok(CounterSnapshot::aggregate(&bugs, chrono::Utc::now()))
    }
}

async fn describe_status(status: StatusCode, resp: reqwest::Response) -> String {
    let body = resp.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        let snippet: String = body.chars().take(200).collect();
        format!("HTTP {}: {snippet}", status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reads_profile_names() {
        let record: BugRecord = serde_json::from_str(
            r#"{"id": 1, "resolvedBy": {"id": 3, "account": "x1", "realname": "Xia"},
                "assignedTo": {"account": "y1", "realname": "Yun"}}"#,
        )
        .unwrap();
        assert_eq!(record.resolver_name(), "Xia");
        assert_eq!(record.assignee_name(), "Yun");
    }

    #[test]
    fn unassigned_forms_map_to_empty_name() {
        let record: BugRecord =
            serde_json::from_str(r#"{"resolvedBy": "", "assignedTo": null}"#).unwrap();
        assert_eq!(record.resolver_name(), "");
        assert_eq!(record.assignee_name(), "");

        let record: BugRecord = serde_json::from_str(r#"{"title": "no people"}"#).unwrap();
        assert_eq!(record.resolver_name(), "");
        assert_eq!(record.assignee_name(), "");

        let record: BugRecord =
            serde_json::from_str(r#"{"resolvedBy": {"account": "closed"}}"#).unwrap();
        assert_eq!(record.resolver_name(), "");

        let record: BugRecord = serde_json::from_str(
            r#"{"resolvedBy": {"account": "a", "realname": null},
                "assignedTo": {"account": null, "realname": "Yun"}}"#,
        )
        .unwrap();
        assert_eq!(record.resolver_name(), "");
        assert_eq!(record.assignee_name(), "Yun");

        let record: BugRecord =
            serde_json::from_str(r#"{"resolvedBy": 0, "assignedTo": false}"#).unwrap();
        assert_eq!(record.resolver_name(), "");
        assert_eq!(record.assignee_name(), "");

        let record: BugRecord =
            serde_json::from_str(r#"{"resolvedBy": {"realname": 42}, "assignedTo": []}"#).unwrap();
        assert_eq!(record.resolver_name(), "");
        assert_eq!(record.assignee_name(), "");
    }

    #[test]
    fn client_requires_host() {
        let config = TrackerConfig::default();
        assert!(matches!(
            TrackerClient::new(&config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = TrackerConfig {
            host: "http://tracker.local/api.php/v1/".to_string(),
            account: "bot".to_string(),
            ..TrackerConfig::default()
        };
        let client = TrackerClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://tracker.local/api.php/v1");
    }
}
