// src/core/crypto/types.rs
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;

/// Stable 32-byte key reproduced from one finger by the fuzzy extractor.
///
/// Secret material: compared in constant time, wiped on drop, never
/// serialized. Only the aggregator consumes these.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FingerKey([u8; KEY_LEN]);

impl FingerKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl PartialEq for FingerKey {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for FingerKey {}

impl std::fmt::Debug for FingerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FingerKey(..)")
    }
}

/// Combined digest over 2–10 finger keys; possession-equivalent to "this
/// is the same person". Same handling rules as [`FingerKey`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AggregateCommitment([u8; KEY_LEN]);

impl AggregateCommitment {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl PartialEq for AggregateCommitment {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for AggregateCommitment {}

impl std::fmt::Debug for AggregateCommitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AggregateCommitment(..)")
    }
}
