// src/core/identity/aggregator.rs
//! Combines per-finger keys into one aggregate commitment.
//!
//! Order-independent by construction: pairs are sorted into canonical
//! finger-position order before a single domain-separated hash fold, so
//! capture sequence never changes the commitment. Admission is governed
//! by a configurable quality ladder, not hard-coded counts.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::core::biometric::types::FingerPosition;
use crate::core::crypto::types::{AggregateCommitment, FingerKey, KEY_LEN};
use crate::utils::error::{IdentityError, Result};

const AGGREGATION_PERSONALIZATION: &[u8] = b"bioanchor.aggregate.v1";

/// One finger admitted to aggregation: its reproduced key and the capture
/// quality the ladder judges it by. Quality never enters the commitment.
#[derive(Debug, Clone)]
pub struct EnrolledFinger {
    pub position: FingerPosition,
    pub key: FingerKey,
    pub quality: f32,
}

/// A rung of the fallback ladder: `min_fingers` fingers, each of quality
/// at least `min_quality`, are sufficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderRung {
    pub min_fingers: usize,
    pub min_quality: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationPolicy {
    pub ladder: Vec<LadderRung>,
}

impl Default for AggregationPolicy {
    /// Four ordinary-quality fingers, or three good ones, or two
    /// excellent ones.
    fn default() -> Self {
        Self {
            ladder: vec![
                LadderRung { min_fingers: 4, min_quality: 40.0 },
                LadderRung { min_fingers: 3, min_quality: 70.0 },
                LadderRung { min_fingers: 2, min_quality: 85.0 },
            ],
        }
    }
}

impl AggregationPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.ladder.is_empty() {
            return Err(IdentityError::InvalidParameters(
                "aggregation ladder must have at least one rung".into(),
            ));
        }
        for rung in &self.ladder {
            if rung.min_fingers < 2 || rung.min_fingers > FingerPosition::ALL.len() {
                return Err(IdentityError::InvalidParameters(format!(
                    "rung finger count {} outside 2..=10",
                    rung.min_fingers
                )));
            }
            if !rung.min_quality.is_finite() || !(0.0..=100.0).contains(&rung.min_quality) {
                return Err(IdentityError::InvalidParameters(
                    "rung quality threshold outside [0, 100]".into(),
                ));
            }
        }
        Ok(())
    }

    /// Whether any rung admits the given finger set.
    pub fn admits(&self, fingers: &[EnrolledFinger]) -> bool {
        self.ladder.iter().any(|rung| {
            fingers.len() >= rung.min_fingers
                && fingers.iter().all(|f| f.quality >= rung.min_quality)
        })
    }
}

/// Folds the finger keys into the aggregate commitment.
///
/// Fails with `InsufficientFingers` when no ladder rung admits the set,
/// and rejects duplicate finger positions outright.
pub fn aggregate(
    fingers: &[EnrolledFinger],
    policy: &AggregationPolicy,
) -> Result<AggregateCommitment> {
    policy.validate()?;

    let mut sorted: Vec<&EnrolledFinger> = fingers.iter().collect();
    sorted.sort_by_key(|f| f.position.code());
    for pair in sorted.windows(2) {
        if pair[0].position == pair[1].position {
            return Err(IdentityError::DuplicateFinger(pair[0].position));
        }
    }

    if !policy.admits(fingers) {
        return Err(IdentityError::InsufficientFingers {
            provided: fingers.len(),
        });
    }

    let mut hasher = Sha3_256::new();
    hasher.update(AGGREGATION_PERSONALIZATION);
    for finger in sorted {
        hasher.update([finger.position.code()]);
        hasher.update(finger.key.as_bytes());
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&digest);
    Ok(AggregateCommitment::from_bytes(bytes))
}
