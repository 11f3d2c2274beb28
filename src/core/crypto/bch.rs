// src/core/crypto/bch.rs
//! Binary BCH syndrome codec over 127-bit blocks.
//!
//! The fuzzy extractor only ever needs the syndrome side of the code:
//! power-sum syndromes of a block at enrollment, and syndrome decoding
//! (Berlekamp–Massey + Chien search) of an error pattern at reproduction.
//! No generator polynomial or systematic encoder is required for the
//! syndrome construction of a secure sketch.

use thiserror::Error;

use super::gf::{Gf128, FIELD_ORDER};

/// Code length; one block of the quantized template.
pub const BLOCK_BITS: usize = 127;

/// Largest supported correction capacity per block.
pub const MAX_CAPACITY: usize = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("correction capacity must be in 1..={MAX_CAPACITY}, got {0}")]
    InvalidCapacity(usize),

    #[error("error pattern exceeds correction capacity")]
    Uncorrectable,
}

#[derive(Debug)]
pub struct BchCodec {
    capacity: usize,
    gf: Gf128,
}

impl BchCodec {
    pub fn new(capacity: usize) -> Result<Self, CodecError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(CodecError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            gf: Gf128::new(),
        })
    }

    /// Correctable bit errors per block.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Syndrome bytes per block: one GF(2^7) element per S_1..S_2t.
    pub fn syndrome_len(&self) -> usize {
        2 * self.capacity
    }

    /// Power-sum syndromes S_j = Σ α^(j·p) over the set bit positions of a
    /// block, for j = 1..=2t. Positions must lie in 0..BLOCK_BITS.
    pub fn syndromes<I>(&self, set_positions: I) -> Vec<u8>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut syndromes = vec![0u8; self.syndrome_len()];
        for position in set_positions {
            debug_assert!(position < BLOCK_BITS);
            for (j, slot) in syndromes.iter_mut().enumerate() {
                *slot ^= self.gf.alpha_pow(position * (j + 1));
            }
        }
        syndromes
    }

    /// Locates the error positions described by the syndromes of an error
    /// pattern (the XOR of enrolled-block and noisy-block syndromes).
    ///
    /// Returns the positions of the flipped bits, empty when the syndromes
    /// are all zero. Fails when the pattern weight exceeds the capacity or
    /// the locator polynomial is inconsistent with any ≤t-bit pattern.
    pub fn locate_errors(&self, error_syndromes: &[u8]) -> Result<Vec<usize>, CodecError> {
        debug_assert_eq!(error_syndromes.len(), self.syndrome_len());

        if error_syndromes.iter().all(|&s| s == 0) {
            return Ok(Vec::new());
        }

        let locator = self.berlekamp_massey(error_syndromes)?;
        self.chien_search(&locator)
    }

    /// Synthesizes the error-locator polynomial σ(x) from the syndromes.
    fn berlekamp_massey(&self, syndromes: &[u8]) -> Result<Vec<u8>, CodecError> {
        let gf = &self.gf;
        let mut sigma = vec![0u8; self.capacity + 2];
        let mut prev = vec![0u8; self.capacity + 2];
        sigma[0] = 1;
        prev[0] = 1;

        let mut degree = 0usize;
        let mut gap = 1usize;
        let mut prev_discrepancy = 1u8;

        for n in 0..syndromes.len() {
            let mut discrepancy = syndromes[n];
            for i in 1..=degree {
                if n >= i {
                    discrepancy ^= gf.mul(sigma[i], syndromes[n - i]);
                }
            }

            if discrepancy == 0 {
                gap += 1;
                continue;
            }

            // Coefficients past the capacity bound are dropped; any pattern
            // needing them ends with degree > capacity and is rejected below.
            let scale = gf.div(discrepancy, prev_discrepancy);
            if 2 * degree <= n {
                let snapshot = sigma.clone();
                for i in 0..prev.len().saturating_sub(gap) {
                    sigma[i + gap] ^= gf.mul(scale, prev[i]);
                }
                degree = n + 1 - degree;
                prev = snapshot;
                prev_discrepancy = discrepancy;
                gap = 1;
            } else {
                for i in 0..prev.len().saturating_sub(gap) {
                    sigma[i + gap] ^= gf.mul(scale, prev[i]);
                }
                gap += 1;
            }
        }

        if degree > self.capacity {
            return Err(CodecError::Uncorrectable);
        }
        sigma.truncate(degree + 1);
        Ok(sigma)
    }

    /// Finds the roots of σ(x) by trying every block position. Position p
    /// is in error when σ(α^(-p)) = 0.
    fn chien_search(&self, locator: &[u8]) -> Result<Vec<usize>, CodecError> {
        let degree = locator.len() - 1;
        let mut positions = Vec::with_capacity(degree);

        for p in 0..BLOCK_BITS {
            let x = self.gf.alpha_pow(FIELD_ORDER - p);
            if self.gf.eval_poly(locator, x) == 0 {
                positions.push(p);
            }
        }

        // A valid ≤t-error pattern yields exactly deg(σ) distinct roots.
        if positions.len() != degree {
            return Err(CodecError::Uncorrectable);
        }
        Ok(positions)
    }
}
