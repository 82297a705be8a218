use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{content_type_for, Artifact, ArtifactError, ArtifactStore};

/// Connection settings for Pinata
#[derive(Debug, Clone)]
pub struct PinataConfig {
    /// Bearer JWT for the pinning API
    pub jwt: String,

    /// Dedicated gateway host, e.g. `example.mypinata.cloud`
    pub gateway: String,

    /// API base URL
    pub api_url: String,

    pub timeout: Duration,
}

impl PinataConfig {
    pub fn new(jwt: impl Into<String>, gateway: impl Into<String>) -> Self {
        Self {
            jwt: jwt.into(),
            gateway: gateway.into(),
            api_url: "https://api.pinata.cloud".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Artifact store backed by Pinata's IPFS pinning service
#[derive(Debug, Clone)]
pub struct PinataArtifactStore {
    http: reqwest::Client,
    config: PinataConfig,
}

impl PinataArtifactStore {
    pub fn new(config: PinataConfig) -> Result<Self, ArtifactError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ArtifactError::Upload(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Public URL of a pinned content id
    pub fn gateway_url(&self, content_id: &str) -> String {
        let gateway = self
            .config
            .gateway
            .trim_start_matches("https://")
            .trim_end_matches('/');
        format!("https://{}/ipfs/{}", gateway, content_id)
    }
}

#[async_trait]
impl ArtifactStore for PinataArtifactStore {
    async fn upload(&self, bytes: Bytes, filename: &str) -> Result<Artifact, ArtifactError> {
        let size = bytes.len();
        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type_for(filename))
            .map_err(|e| ArtifactError::Upload(format!("Invalid content type: {}", e)))?;

        let metadata = serde_json::json!({ "name": filename }).to_string();
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata);

        let url = format!(
            "{}/pinning/pinFileToIPFS",
            self.config.api_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.jwt)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ArtifactError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, filename, "Artifact upload rejected");
            return Err(ArtifactError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| ArtifactError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            content_id = %pinned.ipfs_hash,
            filename,
            size,
            "Artifact uploaded"
        );

        Ok(Artifact {
            url: self.gateway_url(&pinned.ipfs_hash),
            content_id: pinned.ipfs_hash,
        })
    }
}
