//! npm-compatible registry client over HTTP

use super::{Metadata, Registry};
use crate::error::{DxError, DxResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Abbreviated metadata document; still carries the full `versions` map
const ACCEPT_ABBREVIATED: &str = "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8";

/// Upper bound on a metadata body; large packages publish thousands of versions
const MAX_METADATA_BYTES: u64 = 64 * 1024 * 1024;

/// Registry client backed by a blocking `ureq` agent
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpRegistry {
    /// Create a client for `base_url` with a global per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            base_url: base_url.into(),
            agent,
        }
    }

    fn fetch_blocking(agent: &ureq::Agent, url: &str, name: &str) -> DxResult<Metadata> {
        let mut response = agent
            .get(url)
            .header("accept", ACCEPT_ABBREVIATED)
            .header("user-agent", concat!("dx/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| DxError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!("Registry returned {} for {}", status.as_u16(), url);
            return Err(DxError::NotFound(name.to_string()));
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_METADATA_BYTES)
            .read_to_string()
            .map_err(|e| DxError::network(url, e))?;

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn fetch_metadata(&self, name: &str) -> DxResult<Metadata> {
        if name.is_empty() {
            return Err(DxError::InvalidRequest(
                "package name cannot be empty".to_string(),
            ));
        }

        let url = package_url(&self.base_url, name);
        debug!("Fetching metadata: {}", url);

        let agent = self.agent.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &url, &name))
            .await
            .map_err(|e| DxError::Internal(format!("registry request task failed: {e}")))?
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Join a registry base URL and a package name.
///
/// Scoped names keep their `@` and have the scope separator encoded, which
/// every npm-compatible registry accepts.
pub fn package_url(base_url: &str, name: &str) -> String {
    let encoded = if name.starts_with('@') {
        name.replacen('/', "%2F", 1)
    } else {
        name.to_string()
    };
    format!("{}/{}", base_url.trim_end_matches('/'), encoded)
}
