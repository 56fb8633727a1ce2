use crate::error::NodeError;
use crate::model::{BackupIndex, BrowseResponse, NodeConfig, Run, RunsResponse};
use reqwest::Url;
use serde::de::DeserializeOwned;

pub(crate) const BACKUP_INDEX_PATH: &str = "browse/null";
pub(crate) const DEVICES_PATH: &str = "devices";
pub(crate) const RUNS_LIST_PATH: &str = "runs_list";

/// HTTP access to a node's read-only listing endpoints.
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: Url,
}

/// Parse the node root, making sure relative endpoint joins keep any path prefix.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, NodeError> {
    let mut with_slash = raw.trim().to_string();
    if !with_slash.ends_with('/') {
        with_slash.push('/');
    }
    let url = Url::parse(&with_slash).map_err(|e| NodeError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(NodeError::InvalidUrl {
            url: raw.to_string(),
            reason: "expected an http(s) URL".into(),
        });
    }
    Ok(url)
}

impl NodeClient {
    pub fn new(cfg: &NodeConfig) -> Result<Self, NodeError> {
        let base_url = parse_base_url(&cfg.base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .map_err(|source| NodeError::Http {
                endpoint: base_url.to_string(),
                source,
            })?;
        Ok(Self { http, base_url })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, NodeError> {
        self.base_url.join(path).map_err(|e| NodeError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            reason: e.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NodeError> {
        let url = self.endpoint(path)?;
        let endpoint = url.to_string();
        tracing::debug!(%endpoint, "GET");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| NodeError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NodeError::Status { endpoint, status });
        }

        resp.json::<T>()
            .await
            .map_err(|source| NodeError::Decode { endpoint, source })
    }

    /// `browse/null`: backup files on the node, keyed by basename.
    pub async fn fetch_backup_index(&self) -> Result<BackupIndex, NodeError> {
        let resp: BrowseResponse = self.get_json(BACKUP_INDEX_PATH).await?;
        Ok(resp.files)
    }

    /// `devices`: passed through untouched.
    pub async fn fetch_devices(&self) -> Result<serde_json::Value, NodeError> {
        self.get_json(DEVICES_PATH).await
    }

    /// `runs_list`: raw run records, not yet enriched.
    pub async fn fetch_runs(&self) -> Result<Vec<Run>, NodeError> {
        let resp: RunsResponse = self.get_json(RUNS_LIST_PATH).await?;
        Ok(resp.into_runs())
    }
}
