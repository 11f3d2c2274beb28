// src/core/crypto/extractor.rs
//! Fuzzy extractor: Gen/Rep over quantized fingerprint templates.
//!
//! Syndrome construction of a secure sketch. Enrollment stores per-block
//! BCH syndromes of the template plus a salt and an auth tag; none of it
//! is secret. Reproduction XORs stored and fresh syndromes to obtain the
//! syndromes of the error pattern alone, locates up to `t` flipped bits
//! per 127-bit block, and re-derives the key from the corrected template.
//! The auth tag detects convergence to a wrong codeword before any key is
//! released.

use ring::hmac;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use super::bch::{BchCodec, CodecError, BLOCK_BITS};
use super::types::{FingerKey, KEY_LEN};
use crate::core::biometric::quantizer::QuantizerParams;
use crate::core::biometric::types::QuantizedTemplate;
use crate::utils::error::{ExtractionFailure, IdentityError, Result};

/// Helper format version. Version 1 was the salted-hash scheme, which is
/// not compatible with syndrome helper data and is not readable here.
pub const HELPER_VERSION: u16 = 2;

pub const SALT_LEN: usize = 16;
pub const DEFAULT_ERROR_CAPACITY: usize = 10;

const KEY_PERSONALIZATION: &[u8] = b"bioanchor.fingerkey.v2";
const TAG_PERSONALIZATION: &[u8] = b"bioanchor.helper-auth.v2";
const SALT_PERSONALIZATION: &[u8] = b"bioanchor.salt.v2";

/// Parameter echo carried inside helper data so a reproducing extractor
/// can refuse helpers produced under a different configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperParams {
    pub quantizer: QuantizerParams,
    pub error_capacity: usize,
}

/// Public recovery data for one enrolled finger.
///
/// Safe to store on-chain or hand to any storage backend: the syndromes
/// reveal at most the code's parity information per block, and the tag is
/// a MAC under the derived key, not an inversion aid. Size is a function
/// of the parameter set only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperData {
    pub version: u16,
    pub salt: [u8; SALT_LEN],
    pub params: HelperParams,
    pub syndromes: Vec<u8>,
    pub auth_tag: [u8; KEY_LEN],
}

pub struct FuzzyExtractor {
    quantizer: QuantizerParams,
    codec: BchCodec,
}

impl FuzzyExtractor {
    pub fn new(quantizer: QuantizerParams, error_capacity: usize) -> Result<Self> {
        quantizer.validate()?;
        let codec = BchCodec::new(error_capacity).map_err(|e| match e {
            CodecError::InvalidCapacity(c) => {
                IdentityError::InvalidParameters(format!("error capacity {} out of range", c))
            }
            CodecError::Uncorrectable => IdentityError::ExtractionFailed(
                ExtractionFailure::TooManyErrors,
            ),
        })?;
        Ok(Self { quantizer, codec })
    }

    pub fn quantizer_params(&self) -> &QuantizerParams {
        &self.quantizer
    }

    pub fn error_capacity(&self) -> usize {
        self.codec.capacity()
    }

    /// Enrollment half: derives the finger key and the public helper data.
    ///
    /// Deterministic end to end, including the salt: an independent
    /// enrollment of the same finger on another device must derive the
    /// identical key, or the whole one-person-one-identifier argument
    /// collapses. The salt is a domain-separated digest of the template,
    /// serving as per-finger key separation, not as randomness.
    pub fn generate(&self, template: &QuantizedTemplate) -> Result<(FingerKey, HelperData)> {
        self.check_template_len(template)?;

        let salt = derive_salt(template);

        let block_count = self.quantizer.block_count();
        let mut syndromes = Vec::with_capacity(block_count * self.codec.syndrome_len());
        for block in 0..block_count {
            syndromes.extend(self.codec.syndromes(self.block_positions(template, block)));
        }

        let key_bytes = derive_key(&salt, template);
        let auth_tag = compute_tag(&key_bytes);

        let helper = HelperData {
            version: HELPER_VERSION,
            salt,
            params: HelperParams {
                quantizer: self.quantizer.clone(),
                error_capacity: self.codec.capacity(),
            },
            syndromes,
            auth_tag,
        };

        Ok((FingerKey::from_bytes(key_bytes), helper))
    }

    /// Verification half: reproduces the enrolled key from a noisy
    /// re-capture, or fails. Never returns a wrong key: the auth tag is
    /// checked in constant time before release.
    pub fn reproduce(
        &self,
        noisy: &QuantizedTemplate,
        helper: &HelperData,
    ) -> Result<FingerKey> {
        if helper.version != HELPER_VERSION {
            return Err(IdentityError::ExtractionFailed(
                ExtractionFailure::UnsupportedVersion(helper.version),
            ));
        }
        if helper.params.quantizer != self.quantizer
            || helper.params.error_capacity != self.codec.capacity()
        {
            return Err(IdentityError::ExtractionFailed(
                ExtractionFailure::ParameterMismatch,
            ));
        }
        self.check_template_len(noisy)?;

        let block_count = self.quantizer.block_count();
        let syndrome_len = self.codec.syndrome_len();
        if helper.syndromes.len() != block_count * syndrome_len {
            return Err(IdentityError::ExtractionFailed(
                ExtractionFailure::ParameterMismatch,
            ));
        }
        // Syndrome components are GF(2^7) elements; a high bit means the
        // helper bytes were not produced by this codec.
        if helper.syndromes.iter().any(|&b| b >= 0x80) {
            return Err(IdentityError::ExtractionFailed(
                ExtractionFailure::ParameterMismatch,
            ));
        }

        let mut corrected = noisy.clone();
        for block in 0..block_count {
            let fresh = self.codec.syndromes(self.block_positions(&corrected, block));
            let stored = &helper.syndromes[block * syndrome_len..(block + 1) * syndrome_len];

            // Syndromes are linear: fresh XOR stored is the syndrome of
            // the error pattern between the two captures.
            let error_syndromes: Vec<u8> = fresh
                .iter()
                .zip(stored.iter())
                .map(|(a, b)| a ^ b)
                .collect();

            let error_positions = self.codec.locate_errors(&error_syndromes).map_err(|e| {
                match e {
                    CodecError::Uncorrectable => {
                        IdentityError::ExtractionFailed(ExtractionFailure::TooManyErrors)
                    }
                    CodecError::InvalidCapacity(c) => {
                        IdentityError::InvalidParameters(format!("capacity {}", c))
                    }
                }
            })?;
            for position in error_positions {
                corrected.flip_bit(block * BLOCK_BITS + position);
            }
        }

        let key_bytes = derive_key(&helper.salt, &corrected);
        let tag = compute_tag(&key_bytes);
        ring::constant_time::verify_slices_are_equal(&tag, &helper.auth_tag).map_err(|_| {
            IdentityError::ExtractionFailed(ExtractionFailure::TagMismatch)
        })?;

        Ok(FingerKey::from_bytes(key_bytes))
    }

    fn check_template_len(&self, template: &QuantizedTemplate) -> Result<()> {
        if template.bit_len() != self.quantizer.template_bits() {
            return Err(IdentityError::MalformedTemplate(format!(
                "template length {} does not match parameter set ({})",
                template.bit_len(),
                self.quantizer.template_bits()
            )));
        }
        Ok(())
    }

    fn block_positions<'a>(
        &self,
        template: &'a QuantizedTemplate,
        block: usize,
    ) -> impl Iterator<Item = usize> + 'a {
        let base = block * BLOCK_BITS;
        (0..BLOCK_BITS).filter(move |&p| template.bit(base + p))
    }
}

fn derive_salt(template: &QuantizedTemplate) -> [u8; SALT_LEN] {
    let mut hasher = Sha3_256::new();
    hasher.update(SALT_PERSONALIZATION);
    hasher.update(template.as_bytes());
    let digest = hasher.finalize();

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&digest[..SALT_LEN]);
    salt
}

fn derive_key(salt: &[u8; SALT_LEN], template: &QuantizedTemplate) -> [u8; KEY_LEN] {
    let mut hasher = Sha3_256::new();
    hasher.update(KEY_PERSONALIZATION);
    hasher.update(salt);
    hasher.update(template.as_bytes());
    let digest = hasher.finalize();

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest);
    key
}

fn compute_tag(key: &[u8; KEY_LEN]) -> [u8; KEY_LEN] {
    let mac_key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let signature = hmac::sign(&mac_key, TAG_PERSONALIZATION);

    let mut tag = [0u8; KEY_LEN];
    tag.copy_from_slice(signature.as_ref());
    tag
}
