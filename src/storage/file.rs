// src/storage/file.rs
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::backend::{encode, verify_address, BackendKind, HelperRef, HelperStore, StorageError};
use crate::core::crypto::extractor::HelperData;

/// One JSON file per content address under a configured root directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, address: &str) -> PathBuf {
        self.root.join(format!("{}.json", address))
    }
}

#[async_trait]
impl HelperStore for FileStore {
    async fn store(&self, helper: &HelperData) -> Result<HelperRef, StorageError> {
        let (address, bytes) = encode(helper)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.path_for(&address), &bytes).await?;
        debug!(address = %address, "stored helper data on disk");
        Ok(HelperRef {
            backend: BackendKind::File,
            address,
        })
    }

    async fn retrieve(&self, reference: &HelperRef) -> Result<HelperData, StorageError> {
        let path = self.path_for(&reference.address);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(reference.uri()));
            }
            Err(e) => return Err(e.into()),
        };
        let helper: HelperData = serde_json::from_slice(&bytes)?;
        verify_address(reference, &helper)?;
        Ok(helper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::biometric::quantizer::QuantizerParams;
    use crate::core::biometric::types::QuantizedTemplate;
    use crate::core::crypto::extractor::{FuzzyExtractor, DEFAULT_ERROR_CAPACITY};

    fn sample_helper() -> HelperData {
        let params = QuantizerParams::default();
        let fx = FuzzyExtractor::new(params.clone(), DEFAULT_ERROR_CAPACITY).unwrap();
        let mut template = QuantizedTemplate::zeroed(params.template_bits());
        for i in 0..25 {
            template.set_bit(i * 97 % params.template_bits());
        }
        fx.generate(&template).unwrap().1
    }

    #[tokio::test]
    async fn test_store_retrieve_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let helper = sample_helper();

        let reference = store.store(&helper).await.unwrap();
        assert_eq!(reference.backend, BackendKind::File);
        assert_eq!(store.retrieve(&reference).await.unwrap(), helper);
    }

    #[tokio::test]
    async fn test_tampered_file_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let helper = sample_helper();

        let reference = store.store(&helper).await.unwrap();

        // Rewrite the file with a different (still valid) helper payload.
        let mut tampered = helper.clone();
        tampered.salt[0] ^= 0xFF;
        tokio::fs::write(
            store.path_for(&reference.address),
            serde_json::to_vec(&tampered).unwrap(),
        )
        .await
        .unwrap();

        assert!(matches!(
            store.retrieve(&reference).await,
            Err(StorageError::IntegrityFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let reference = HelperRef {
            backend: BackendKind::File,
            address: "11".repeat(32),
        };
        assert!(matches!(
            store.retrieve(&reference).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
