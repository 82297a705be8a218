use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{Artifact, ArtifactError, ArtifactStore};

/// Artifact store that keeps uploads in memory
///
/// Content ids are SHA-256 over the bytes and a per-call sequence number,
/// so identical uploads still get distinct ids. Counts uploads for tests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    uploads: AtomicUsize,
    objects: Mutex<HashMap<String, (String, Bytes)>>,
    fail_after: Option<usize>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that accepts `n` uploads and fails every later one
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// Successful uploads so far
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Filename and bytes stored under `content_id`
    pub async fn get(&self, content_id: &str) -> Option<(String, Bytes)> {
        self.objects.lock().await.get(content_id).cloned()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, bytes: Bytes, filename: &str) -> Result<Artifact, ArtifactError> {
        let mut objects = self.objects.lock().await;
        let sequence = self.uploads.load(Ordering::SeqCst);

        if self.fail_after.map_or(false, |limit| sequence >= limit) {
            return Err(ArtifactError::Upload("memory store refused upload".to_string()));
        }

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.update(sequence.to_be_bytes());
        let content_id = hex::encode(hasher.finalize());

        let url = format!("memory://artifacts/{}/{}", content_id, filename);
        objects.insert(content_id.clone(), (filename.to_string(), bytes));
        self.uploads.fetch_add(1, Ordering::SeqCst);

        Ok(Artifact { content_id, url })
    }
}
