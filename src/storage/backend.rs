// src/storage/backend.rs
//! Helper-data persistence boundary.
//!
//! The core only consumes this interface; where helper data actually
//! lives (memory, file, content-addressed network store) is a deployment
//! choice made in configuration. References are content addresses, so a
//! backend can never silently swap payloads.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

use crate::core::crypto::extractor::HelperData;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Reference not found: {0}")]
    NotFound(String),

    #[error("Content address mismatch for {0}")]
    IntegrityFailure(String),

    #[error("Malformed helper reference: {0}")]
    MalformedRef(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    File,
}

impl BackendKind {
    fn scheme(&self) -> &'static str {
        match self {
            BackendKind::Memory => "mem",
            BackendKind::File => "file",
        }
    }
}

/// Content-addressed reference to helper data held by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HelperRef {
    pub backend: BackendKind,
    /// Hex SHA3-256 of the canonical helper encoding.
    pub address: String,
}

impl HelperRef {
    pub fn uri(&self) -> String {
        format!("{}://{}", self.backend.scheme(), self.address)
    }

    pub fn from_uri(uri: &str) -> Result<Self, StorageError> {
        let (scheme, address) = uri
            .split_once("://")
            .ok_or_else(|| StorageError::MalformedRef(uri.to_string()))?;
        let backend = match scheme {
            "mem" => BackendKind::Memory,
            "file" => BackendKind::File,
            _ => return Err(StorageError::MalformedRef(uri.to_string())),
        };
        if address.len() != 64 || hex::decode(address).is_err() {
            return Err(StorageError::MalformedRef(uri.to_string()));
        }
        Ok(Self {
            backend,
            address: address.to_string(),
        })
    }
}

#[async_trait]
pub trait HelperStore: Send + Sync {
    async fn store(&self, helper: &HelperData) -> Result<HelperRef, StorageError>;
    async fn retrieve(&self, reference: &HelperRef) -> Result<HelperData, StorageError>;
}

/// Canonical encoding + content address shared by every backend.
pub(crate) fn encode(helper: &HelperData) -> Result<(String, Vec<u8>), StorageError> {
    let bytes = serde_json::to_vec(helper)?;
    let address = hex::encode(Sha3_256::digest(&bytes));
    Ok((address, bytes))
}

pub(crate) fn verify_address(
    reference: &HelperRef,
    helper: &HelperData,
) -> Result<(), StorageError> {
    let (address, _) = encode(helper)?;
    if address != reference.address {
        return Err(StorageError::IntegrityFailure(reference.uri()));
    }
    Ok(())
}
