//! Retrieval of update manifests from the update API.

use crate::config::UpdateConfig;
use crate::error::{UpdateError, UpdateResult};
use async_trait::async_trait;
use lectio_delta::UpdateManifest;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Anything that can answer "what changed since version N".
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch_manifest(
        &self,
        current_version: i64,
        auth_token: Option<&str>,
    ) -> UpdateResult<UpdateManifest>;
}

#[async_trait]
impl<T: ManifestSource + ?Sized> ManifestSource for Arc<T> {
    async fn fetch_manifest(
        &self,
        current_version: i64,
        auth_token: Option<&str>,
    ) -> UpdateResult<UpdateManifest> {
        (**self).fetch_manifest(current_version, auth_token).await
    }
}

/// Fetches manifests over HTTP from `GET {base}/database/updates`.
#[derive(Clone, Debug)]
pub struct HttpManifestFetcher {
    client: Client,
    base_url: String,
}

impl HttpManifestFetcher {
    pub fn new(config: &UpdateConfig) -> UpdateResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn updates_url(&self) -> String {
        format!("{}/database/updates", self.base_url)
    }
}

#[async_trait]
impl ManifestSource for HttpManifestFetcher {
    async fn fetch_manifest(
        &self,
        current_version: i64,
        auth_token: Option<&str>,
    ) -> UpdateResult<UpdateManifest> {
        let mut request = self
            .client
            .get(self.updates_url())
            .query(&[("current_version", current_version)]);
        if let Some(token) = auth_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpdateError::Network(format!("{status}: {body}")));
        }

        let manifest: UpdateManifest = resp.json().await?;
        debug!(
            current_version,
            latest_version = manifest.latest_version,
            changes = manifest.changes.len(),
            "Fetched update manifest"
        );
        Ok(manifest)
    }
}
