//! On-disk persistence of finished WAV responses

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::wav::AudioContainer;
use crate::error::{Error, Result};

const FILE_PREFIX: &str = "voice_response_";
const FILE_EXTENSION: &str = ".wav";

/// Writes containers as opaque blobs and reads them back by file name
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage directory if needed
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        info!("Audio responses stored in {:?}", self.root);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a container under a fresh unique name and return that name
    pub async fn save(&self, container: &AudioContainer) -> Result<String> {
        let file_name = format!("{}{}{}", FILE_PREFIX, Uuid::new_v4(), FILE_EXTENSION);
        let path = self.root.join(&file_name);

        tokio::fs::write(&path, container.as_bytes()).await?;
        debug!("Saved {} bytes to {:?}", container.len(), path);

        Ok(file_name)
    }

    /// Load a previously saved container, validating its header
    pub async fn load(&self, file_name: &str) -> Result<AudioContainer> {
        let path = self.resolve(file_name)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::AudioNotFound(file_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        AudioContainer::from_bytes(Bytes::from(bytes))
    }

    fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        if !is_valid_file_name(file_name) {
            return Err(Error::InvalidRequest(format!(
                "invalid audio file name: {}",
                file_name
            )));
        }
        Ok(self.root.join(file_name))
    }
}

fn is_valid_file_name(name: &str) -> bool {
    name.ends_with(FILE_EXTENSION)
        && name.len() > FILE_EXTENSION.len()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioStreamDescriptor;

    fn temp_store() -> AudioStore {
        AudioStore::new(std::env::temp_dir().join(format!("agriguide-audio-{}", Uuid::new_v4())))
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = temp_store();
        store.init().await.unwrap();

        let container =
            AudioContainer::build(&[1, 2, 3, 4], AudioStreamDescriptor::default()).unwrap();
        let name = store.save(&container).await.unwrap();
        assert!(name.starts_with("voice_response_"));
        assert!(name.ends_with(".wav"));

        let loaded = store.load(&name).await.unwrap();
        assert_eq!(loaded, container);

        tokio::fs::remove_dir_all(store.root()).await.ok();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let store = temp_store();
        store.init().await.unwrap();
        let result = store.load("voice_response_missing.wav").await;
        assert!(matches!(result, Err(Error::AudioNotFound(_))));
        tokio::fs::remove_dir_all(store.root()).await.ok();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let store = temp_store();
        for name in ["../secret.wav", "a/b.wav", "..wav", ".wav", "notes.txt", "x..y.wav"] {
            let result = store.load(name).await;
            assert!(
                matches!(result, Err(Error::InvalidRequest(_))),
                "{} should be rejected",
                name
            );
        }
    }
}
