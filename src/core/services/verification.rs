// src/core/services/verification.rs
use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    blockchain::metadata::{EnrollmentRecord, HelperLocation},
    core::{
        biometric::{
            quantizer::quantize,
            types::{FingerPosition, FingerTemplate},
        },
        crypto::extractor::{FuzzyExtractor, HelperData},
        identity::{
            aggregator::{aggregate, EnrolledFinger},
            did::{generate_did, Did},
        },
    },
    storage::backend::{HelperRef, HelperStore},
    utils::{
        config::Config,
        error::{IdentityError, Result},
    },
};

/// Outcome of verifying fresh captures against a claimed enrollment.
/// Carries per-finger reproduction results but never key material.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub verified: bool,
    pub reproduced: usize,
    pub failed: Vec<FingerPosition>,
}

/// Replays the verification flow: reproduce each finger key from stored
/// helper data, re-aggregate, re-derive the identifier and compare it
/// against the claimed record.
pub struct VerificationService {
    config: Config,
    extractor: FuzzyExtractor,
    helper_store: Arc<dyn HelperStore>,
}

impl VerificationService {
    pub fn new(config: Config, helper_store: Arc<dyn HelperStore>) -> Result<Self> {
        config.validate()?;
        let extractor =
            FuzzyExtractor::new(config.quantizer.clone(), config.extractor.error_capacity)?;
        Ok(Self {
            config,
            extractor,
            helper_store,
        })
    }

    pub async fn verify(
        &self,
        record: &EnrollmentRecord,
        captures: &[FingerTemplate],
    ) -> Result<VerificationReport> {
        if record.revoked {
            return Err(IdentityError::Metadata(
                "enrollment record has been revoked".into(),
            ));
        }

        let mut fingers = Vec::with_capacity(captures.len());
        let mut failed = Vec::new();
        for capture in captures {
            match self.reproduce_finger(record, capture).await? {
                Some(key) => fingers.push(EnrolledFinger {
                    position: capture.position,
                    key,
                    quality: capture.quality,
                }),
                None => failed.push(capture.position),
            }
        }

        let commitment = match aggregate(&fingers, &self.config.aggregation) {
            Ok(commitment) => commitment,
            Err(IdentityError::InsufficientFingers { provided }) => {
                warn!(
                    reproduced = provided,
                    failed = failed.len(),
                    "too few reproduced fingers to verify"
                );
                return Ok(VerificationReport {
                    verified: false,
                    reproduced: fingers.len(),
                    failed,
                });
            }
            Err(e) => return Err(e),
        };

        let derived = match &record.did {
            Did::Deterministic { network, .. } => generate_did(&commitment, *network),
            Did::Legacy { wallet, .. } => {
                #[allow(deprecated)]
                let legacy =
                    crate::core::identity::did::generate_legacy_did(wallet, &commitment)?;
                legacy
            }
        };

        let verified = derived == record.did;
        info!(
            verified,
            reproduced = fingers.len(),
            failed = failed.len(),
            "verification complete"
        );
        Ok(VerificationReport {
            verified,
            reproduced: fingers.len(),
            failed,
        })
    }

    /// Reproduces one finger key, or `None` when this capture cannot be
    /// matched: no enrolled helper for the position, or extraction
    /// rejected the noisy template. Availability failures still surface
    /// as errors.
    async fn reproduce_finger(
        &self,
        record: &EnrollmentRecord,
        capture: &FingerTemplate,
    ) -> Result<Option<crate::core::crypto::types::FingerKey>> {
        let helper = match record.helpers.get(&capture.position) {
            Some(location) => self.resolve_helper(location).await?,
            None => {
                warn!(position = %capture.position, "no enrolled helper for captured finger");
                return Ok(None);
            }
        };

        let quantized = quantize(capture, &self.config.quantizer)?;
        match self.extractor.reproduce(&quantized, &helper) {
            Ok(key) => Ok(Some(key)),
            Err(IdentityError::ExtractionFailed(reason)) => {
                warn!(position = %capture.position, %reason, "finger key reproduction failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_helper(&self, location: &HelperLocation) -> Result<HelperData> {
        match location {
            HelperLocation::Inline(helper) => Ok(helper.clone()),
            HelperLocation::External(uri) => {
                let reference = HelperRef::from_uri(uri)?;
                Ok(self.helper_store.retrieve(&reference).await?)
            }
        }
    }
}
