//! Artifact store client
//!
//! Uploads opaque byte buffers (signature images, rendered PDFs, logos) to a
//! content-addressed store and returns a stable public URL. Every call is a
//! fresh upload; nothing is deduplicated across calls and nothing is retried.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

mod memory;
mod pinata;

pub use memory::MemoryArtifactStore;
pub use pinata::{PinataArtifactStore, PinataConfig};

/// Error type for artifact uploads
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Transport failure or non-success response
    #[error("Upload failed: {0}")]
    Upload(String),

    /// The store answered with something we could not read
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// A stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub content_id: String,
    pub url: String,
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(&self, bytes: Bytes, filename: &str) -> Result<Artifact, ArtifactError>;
}

/// Best-effort MIME type from a file name
pub fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
