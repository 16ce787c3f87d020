//! Disk-backed implementation of CoverStore

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{CoverStore, DomainError};

/// Stores cover files as flat entries under the media root. Stored names are
/// prefixed with a random id so repeated logical names never collide.
pub struct DiskCoverStore {
    root: PathBuf,
}

impl DiskCoverStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Strip anything that could escape the media root or upset a filesystem.
    fn sanitize(name: &str) -> String {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let safe: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if safe.trim_matches('.').is_empty() {
            "cover.jpg".to_string()
        } else {
            safe
        }
    }
}

#[async_trait]
impl CoverStore for DiskCoverStore {
    async fn save(&self, logical_name: &str, data: &[u8]) -> Result<String, DomainError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DomainError::Storage(format!("failed to create media root: {}", e)))?;

        let stored_name = format!(
            "{}_{}",
            uuid::Uuid::new_v4().simple(),
            Self::sanitize(logical_name)
        );

        tokio::fs::write(self.root.join(&stored_name), data)
            .await
            .map_err(|e| DomainError::Storage(format!("failed to write cover file: {}", e)))?;

        tracing::info!(name = %stored_name, size = data.len(), "cover file stored");

        Ok(stored_name)
    }

    async fn delete(&self, stored_name: &str) -> Result<(), DomainError> {
        match tokio::fs::remove_file(self.root.join(stored_name)).await {
            Ok(()) => {
                tracing::info!(name = %stored_name, "cover file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Storage(format!(
                "failed to remove cover file: {}",
                e
            ))),
        }
    }
}
