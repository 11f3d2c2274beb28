// src/blockchain/metadata.rs
//! On-chain metadata records and the schema adapter.
//!
//! Two wire schemas exist: the legacy 1.0 single-wallet shape and the
//! current 1.1 multi-controller shape with timestamp and revocation
//! fields. Both normalize into one canonical `EnrollmentRecord`; only
//! 1.1 is written for new enrollments.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::warn;

use crate::core::biometric::types::FingerPosition;
use crate::core::crypto::extractor::HelperData;
use crate::core::identity::did::Did;
use crate::utils::error::{IdentityError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[serde(rename = "1.0")]
    V1,
    #[serde(rename = "1.1")]
    V1_1,
}

pub const CURRENT_SCHEMA: SchemaVersion = SchemaVersion::V1_1;

/// Where one finger's helper data lives: embedded in the record, or
/// behind a storage reference URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HelperLocation {
    External(String),
    Inline(HelperData),
}

impl HelperLocation {
    pub fn is_inline(&self) -> bool {
        matches!(self, HelperLocation::Inline(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperStorageMode {
    Inline,
    External,
}

/// The biometric block of an on-chain record. Carries only public
/// material: a hash commitment to the identifier and the helper data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricSection {
    pub id_hash: String,
    pub helper_storage: HelperStorageMode,
    pub helpers: BTreeMap<FingerPosition, HelperLocation>,
}

/// Versioned wire shape attached to the enrollment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum MetadataRecord {
    #[serde(rename = "1.0", rename_all = "camelCase")]
    V1 {
        did: Did,
        wallet_address: String,
        biometric: BiometricSection,
    },
    #[serde(rename = "1.1", rename_all = "camelCase")]
    V1_1 {
        did: Did,
        controllers: Vec<String>,
        enrollment_timestamp: DateTime<Utc>,
        revoked: bool,
        revoked_at: Option<DateTime<Utc>>,
        biometric: BiometricSection,
    },
}

impl MetadataRecord {
    pub fn did(&self) -> &Did {
        match self {
            MetadataRecord::V1 { did, .. } => did,
            MetadataRecord::V1_1 { did, .. } => did,
        }
    }

    pub fn schema(&self) -> SchemaVersion {
        match self {
            MetadataRecord::V1 { .. } => SchemaVersion::V1,
            MetadataRecord::V1_1 { .. } => SchemaVersion::V1_1,
        }
    }
}

/// Canonical in-memory enrollment state both wire schemas normalize into.
///
/// Never deleted; revocation is the only terminal transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub did: Did,
    pub controllers: BTreeSet<String>,
    /// Absent only on records read from legacy 1.0 metadata.
    pub enrolled_at: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub helpers: BTreeMap<FingerPosition, HelperLocation>,
}

impl EnrollmentRecord {
    pub fn is_active(&self) -> bool {
        !self.revoked
    }

    /// One-way transition; a second revocation is an error, and the
    /// timestamp never changes once set.
    pub fn revoke(&mut self, at: DateTime<Utc>) -> Result<()> {
        if self.revoked {
            return Err(IdentityError::Metadata("record already revoked".into()));
        }
        self.revoked = true;
        self.revoked_at = Some(at);
        Ok(())
    }

    /// Adds a controller wallet; returns false when it was already one.
    pub fn add_controller(&mut self, wallet: impl Into<String>) -> bool {
        self.controllers.insert(wallet.into())
    }
}

/// Maps either wire schema onto the canonical record.
pub fn normalize(record: MetadataRecord) -> EnrollmentRecord {
    match record {
        MetadataRecord::V1 {
            did,
            wallet_address,
            biometric,
        } => EnrollmentRecord {
            did,
            controllers: BTreeSet::from([wallet_address]),
            enrolled_at: None,
            revoked: false,
            revoked_at: None,
            helpers: biometric.helpers,
        },
        MetadataRecord::V1_1 {
            did,
            controllers,
            enrollment_timestamp,
            revoked,
            revoked_at,
            biometric,
        } => EnrollmentRecord {
            did,
            controllers: controllers.into_iter().collect(),
            enrolled_at: Some(enrollment_timestamp),
            revoked,
            revoked_at,
            helpers: biometric.helpers,
        },
    }
}

/// Assembles a fresh enrollment record and its on-chain payload.
///
/// Pure assembly: no storage or ledger I/O happens here.
pub struct RecordBuilder {
    did: Did,
    controllers: BTreeSet<String>,
    helpers: BTreeMap<FingerPosition, HelperLocation>,
    schema: SchemaVersion,
}

impl RecordBuilder {
    pub fn new(did: Did) -> Self {
        Self {
            did,
            controllers: BTreeSet::new(),
            helpers: BTreeMap::new(),
            schema: CURRENT_SCHEMA,
        }
    }

    pub fn schema(mut self, schema: SchemaVersion) -> Self {
        self.schema = schema;
        self
    }

    pub fn controller(mut self, wallet: impl Into<String>) -> Self {
        self.controllers.insert(wallet.into());
        self
    }

    pub fn helper(mut self, position: FingerPosition, location: HelperLocation) -> Self {
        self.helpers.insert(position, location);
        self
    }

    /// Builds the canonical record plus the wire payload to attach.
    pub fn build(self) -> Result<(EnrollmentRecord, MetadataRecord)> {
        if self.controllers.is_empty() {
            return Err(IdentityError::Metadata(
                "a record needs at least one controller wallet".into(),
            ));
        }
        if self.helpers.is_empty() {
            return Err(IdentityError::Metadata(
                "a record needs helper data for at least one finger".into(),
            ));
        }

        let inline_count = self.helpers.values().filter(|l| l.is_inline()).count();
        let helper_storage = if inline_count == self.helpers.len() {
            HelperStorageMode::Inline
        } else if inline_count == 0 {
            HelperStorageMode::External
        } else {
            return Err(IdentityError::Metadata(
                "helpers must be all inline or all external".into(),
            ));
        };

        let biometric = BiometricSection {
            id_hash: id_hash(&self.did),
            helper_storage,
            helpers: self.helpers.clone(),
        };

        let enrolled_at = Utc::now();
        let metadata = match self.schema {
            SchemaVersion::V1_1 => MetadataRecord::V1_1 {
                did: self.did.clone(),
                controllers: self.controllers.iter().cloned().collect(),
                enrollment_timestamp: enrolled_at,
                revoked: false,
                revoked_at: None,
                biometric,
            },
            SchemaVersion::V1 => {
                if self.controllers.len() > 1 {
                    return Err(IdentityError::Metadata(
                        "schema 1.0 carries a single wallet".into(),
                    ));
                }
                warn!(
                    schema = "1.0",
                    did = %self.did,
                    "writing deprecated metadata schema for a new enrollment"
                );
                MetadataRecord::V1 {
                    did: self.did.clone(),
                    wallet_address: self.controllers.iter().next().cloned().unwrap_or_default(),
                    biometric,
                }
            }
        };

        let record = EnrollmentRecord {
            did: self.did,
            controllers: self.controllers,
            enrolled_at: Some(enrolled_at),
            revoked: false,
            revoked_at: None,
            helpers: self.helpers,
        };

        Ok((record, metadata))
    }
}

/// Public commitment to the identifier embedded in the biometric section.
fn id_hash(did: &Did) -> String {
    hex::encode(Sha3_256::digest(did.to_string().as_bytes()))
}
