use crate::{Result, RewearError};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Stores uploaded image bytes under a single media root directory.
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            RewearError::Media(format!(
                "Failed to create media root {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            root,
            url_prefix: url_prefix.into(),
        })
    }

    /// Writes `bytes` under a fresh uuid-based name and returns that name.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let file_name = unique_name(original_name);
        let path = self.root.join(&file_name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            RewearError::Media(format!("Failed to write {}: {}", path.display(), e))
        })?;

        Ok(file_name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute URL for a stored file under the given public base URL.
    pub fn url_for(&self, public_base: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}",
            public_base.trim_end_matches('/'),
            self.url_prefix.trim_matches('/'),
            file_name
        )
    }
}

// Only the extension survives from the client-supplied name.
fn unique_name(original: &str) -> String {
    match Path::new(original).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{}.{}", Uuid::new_v4(), ext),
        _ => Uuid::new_v4().to_string(),
    }
}
