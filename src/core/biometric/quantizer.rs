// src/core/biometric/quantizer.rs
//! Maps raw minutiae onto a fixed-length discrete bit template.
//!
//! Each minutia lands in a (grid cell, angle bucket) pair; the template is
//! the occupancy bit vector over all pairs. Sub-cell positional jitter and
//! sub-bucket angular jitter between captures of the same finger quantize
//! to the same bits, which is what gives the downstream error-correcting
//! code a bounded number of bit flips to absorb.

use serde::{Deserialize, Serialize};

use super::types::{FingerTemplate, Minutia, QuantizedTemplate};
use crate::core::crypto::bch::BLOCK_BITS;
use crate::utils::error::{IdentityError, Result};

pub const DEFAULT_MIN_MINUTIAE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizerParams {
    /// Side length of one grid cell, in capture coordinate units.
    pub grid_size: f32,
    /// Cells per axis. Positions beyond the grid clamp to the border cell.
    pub grid_dim: u16,
    /// Uniform orientation buckets over [0, 2π).
    pub angle_bins: u16,
    /// Captures with fewer minutiae are rejected.
    pub min_minutiae: usize,
}

impl Default for QuantizerParams {
    fn default() -> Self {
        Self {
            grid_size: 32.0,
            grid_dim: 16,
            angle_bins: 8,
            min_minutiae: DEFAULT_MIN_MINUTIAE,
        }
    }
}

impl QuantizerParams {
    pub fn validate(&self) -> Result<()> {
        if !self.grid_size.is_finite() || self.grid_size <= 0.0 {
            return Err(IdentityError::InvalidParameters(
                "grid_size must be positive and finite".into(),
            ));
        }
        if self.grid_dim == 0 || self.angle_bins == 0 {
            return Err(IdentityError::InvalidParameters(
                "grid_dim and angle_bins must be non-zero".into(),
            ));
        }
        if self.min_minutiae == 0 {
            return Err(IdentityError::InvalidParameters(
                "min_minutiae must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Raw (cell, bucket) pair count before block alignment.
    pub fn raw_bits(&self) -> usize {
        self.grid_dim as usize * self.grid_dim as usize * self.angle_bins as usize
    }

    /// Template length in bits, padded up to whole code blocks so the
    /// length depends on parameters only.
    pub fn template_bits(&self) -> usize {
        self.block_count() * BLOCK_BITS
    }

    pub fn block_count(&self) -> usize {
        (self.raw_bits() + BLOCK_BITS - 1) / BLOCK_BITS
    }
}

/// Quantizes one finger capture into its discrete bit template.
///
/// Pure function of the template and parameters; capture order of the
/// minutiae never affects the result (occupancy is positional).
pub fn quantize(template: &FingerTemplate, params: &QuantizerParams) -> Result<QuantizedTemplate> {
    params.validate()?;

    if !template.quality.is_finite() || !(0.0..=100.0).contains(&template.quality) {
        return Err(IdentityError::MalformedTemplate(format!(
            "quality {} outside [0, 100]",
            template.quality
        )));
    }
    if template.minutiae.len() < params.min_minutiae {
        return Err(IdentityError::InsufficientMinutiae {
            found: template.minutiae.len(),
            required: params.min_minutiae,
        });
    }

    let mut quantized = QuantizedTemplate::zeroed(params.template_bits());
    for minutia in &template.minutiae {
        if !minutia.is_finite() {
            return Err(IdentityError::MalformedTemplate(
                "non-finite minutia coordinates".into(),
            ));
        }
        quantized.set_bit(bit_index(minutia, params));
    }

    Ok(quantized)
}

fn bit_index(minutia: &Minutia, params: &QuantizerParams) -> usize {
    let dim = params.grid_dim as usize;
    let cell_x = grid_cell(minutia.x, params.grid_size, dim);
    let cell_y = grid_cell(minutia.y, params.grid_size, dim);
    let bucket = angle_bucket(minutia.angle, params.angle_bins);
    (cell_y * dim + cell_x) * params.angle_bins as usize + bucket
}

fn grid_cell(coordinate: f32, grid_size: f32, dim: usize) -> usize {
    let cell = (coordinate / grid_size).floor();
    if cell < 0.0 {
        0
    } else {
        (cell as usize).min(dim - 1)
    }
}

fn angle_bucket(angle: f32, bins: u16) -> usize {
    const TAU: f32 = std::f32::consts::TAU;
    let normalized = angle.rem_euclid(TAU);
    let bucket = (normalized / (TAU / bins as f32)) as usize;
    bucket.min(bins as usize - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::biometric::types::FingerPosition;

    fn sample_minutiae() -> Vec<Minutia> {
        (0..12)
            .map(|i| {
                let i = i as f32;
                Minutia::new(20.0 + i * 35.0 % 480.0, 15.0 + i * 41.0 % 480.0, i * 0.5)
            })
            .collect()
    }

    fn sample_template() -> FingerTemplate {
        FingerTemplate::new(FingerPosition::RightIndex, sample_minutiae(), 80.0)
    }

    #[test]
    fn test_quantize_is_deterministic() {
        let params = QuantizerParams::default();
        let a = quantize(&sample_template(), &params).unwrap();
        let b = quantize(&sample_template(), &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_capture_order_does_not_matter() {
        let params = QuantizerParams::default();
        let forward = sample_template();
        let mut reversed = forward.clone();
        reversed.minutiae.reverse();

        let a = quantize(&forward, &params).unwrap();
        let b = quantize(&reversed, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sub_cell_jitter_is_absorbed() {
        let params = QuantizerParams::default();
        let clean = sample_template();
        // Nudge every minutia well inside its cell and bucket.
        let jittered = FingerTemplate::new(
            clean.position,
            clean
                .minutiae
                .iter()
                .map(|m| Minutia::new(m.x + 0.5, m.y - 0.5, m.angle + 0.01))
                .collect(),
            clean.quality,
        );

        let a = quantize(&clean, &params).unwrap();
        let b = quantize(&jittered, &params).unwrap();
        // Minutiae near a cell boundary may still cross; the bulk must not.
        assert!(a.hamming_distance(&b) <= 4);
    }

    #[test]
    fn test_distinct_fingers_produce_distinct_templates() {
        let params = QuantizerParams::default();
        let a = quantize(&sample_template(), &params).unwrap();

        let other = FingerTemplate::new(
            FingerPosition::LeftRing,
            (0..12)
                .map(|i| {
                    let i = i as f32;
                    Minutia::new(470.0 - i * 29.0 % 480.0, 460.0 - i * 53.0 % 480.0, i * 1.1)
                })
                .collect(),
            80.0,
        );
        let b = quantize(&other, &params).unwrap();
        assert!(a.hamming_distance(&b) > 10);
    }

    #[test]
    fn test_rejects_too_few_minutiae() {
        let params = QuantizerParams::default();
        let template = FingerTemplate::new(
            FingerPosition::RightThumb,
            sample_minutiae().into_iter().take(7).collect(),
            80.0,
        );
        match quantize(&template, &params) {
            Err(IdentityError::InsufficientMinutiae { found: 7, required: 10 }) => {}
            other => panic!("expected InsufficientMinutiae, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rejects_non_finite_minutia() {
        let params = QuantizerParams::default();
        let mut minutiae = sample_minutiae();
        minutiae[3].angle = f32::NAN;
        let template = FingerTemplate::new(FingerPosition::RightThumb, minutiae, 80.0);
        assert!(matches!(
            quantize(&template, &params),
            Err(IdentityError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_range_quality() {
        let params = QuantizerParams::default();
        let template = FingerTemplate::new(FingerPosition::RightThumb, sample_minutiae(), 140.0);
        assert!(matches!(
            quantize(&template, &params),
            Err(IdentityError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_template_length_depends_on_parameters_only() {
        let params = QuantizerParams::default();
        let sparse = FingerTemplate::new(
            FingerPosition::LeftThumb,
            sample_minutiae().into_iter().take(10).collect(),
            50.0,
        );
        let dense = FingerTemplate::new(
            FingerPosition::LeftThumb,
            (0..60)
                .map(|i| Minutia::new((i * 7 % 500) as f32, (i * 13 % 500) as f32, i as f32 * 0.2))
                .collect(),
            50.0,
        );

        let a = quantize(&sparse, &params).unwrap();
        let b = quantize(&dense, &params).unwrap();
        assert_eq!(a.bit_len(), params.template_bits());
        assert_eq!(a.bit_len(), b.bit_len());
    }

    #[test]
    fn test_out_of_grid_positions_clamp_to_border() {
        let params = QuantizerParams::default();
        let mut minutiae = sample_minutiae();
        minutiae.push(Minutia::new(-40.0, 9_000.0, 0.3));
        let template = FingerTemplate::new(FingerPosition::LeftLittle, minutiae, 70.0);
        // Must not panic or index out of range.
        quantize(&template, &params).unwrap();
    }

    #[test]
    fn test_angle_wraps_modulo_tau() {
        assert_eq!(
            angle_bucket(0.1, 8),
            angle_bucket(0.1 + std::f32::consts::TAU, 8)
        );
        assert_eq!(angle_bucket(-0.1, 8), 7);
    }
}
