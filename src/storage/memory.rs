// src/storage/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::backend::{encode, verify_address, BackendKind, HelperRef, HelperStore, StorageError};
use crate::core::crypto::extractor::HelperData;

/// Content-addressed in-memory backend. The default for tests and for
/// deployments that embed helper data elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, HelperData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl HelperStore for MemoryStore {
    async fn store(&self, helper: &HelperData) -> Result<HelperRef, StorageError> {
        let (address, _) = encode(helper)?;
        self.entries
            .write()
            .insert(address.clone(), helper.clone());
        debug!(address = %address, "stored helper data in memory");
        Ok(HelperRef {
            backend: BackendKind::Memory,
            address,
        })
    }

    async fn retrieve(&self, reference: &HelperRef) -> Result<HelperData, StorageError> {
        let helper = self
            .entries
            .read()
            .get(&reference.address)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(reference.uri()))?;
        verify_address(reference, &helper)?;
        Ok(helper)
    }
}
