// src/core/biometric/types.rs
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One ridge feature extracted from a fingerprint image: position plus
/// ridge orientation in radians. Produced by the upstream capture
/// collaborator; this core never sees raw images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minutia {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl Minutia {
    pub fn new(x: f32, y: f32, angle: f32) -> Self {
        Self { x, y, angle }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.angle.is_finite()
    }
}

/// The ten standard finger positions, ANSI/NIST ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerPosition {
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightLittle,
    LeftThumb,
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftLittle,
}

impl FingerPosition {
    pub const ALL: [FingerPosition; 10] = [
        FingerPosition::RightThumb,
        FingerPosition::RightIndex,
        FingerPosition::RightMiddle,
        FingerPosition::RightRing,
        FingerPosition::RightLittle,
        FingerPosition::LeftThumb,
        FingerPosition::LeftIndex,
        FingerPosition::LeftMiddle,
        FingerPosition::LeftRing,
        FingerPosition::LeftLittle,
    ];

    /// Stable one-byte code used for canonical ordering and metadata keys.
    pub fn code(&self) -> u8 {
        match self {
            FingerPosition::RightThumb => 1,
            FingerPosition::RightIndex => 2,
            FingerPosition::RightMiddle => 3,
            FingerPosition::RightRing => 4,
            FingerPosition::RightLittle => 5,
            FingerPosition::LeftThumb => 6,
            FingerPosition::LeftIndex => 7,
            FingerPosition::LeftMiddle => 8,
            FingerPosition::LeftRing => 9,
            FingerPosition::LeftLittle => 10,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code.wrapping_sub(1) as usize).copied()
    }
}

impl std::fmt::Display for FingerPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FingerPosition::RightThumb => "right_thumb",
            FingerPosition::RightIndex => "right_index",
            FingerPosition::RightMiddle => "right_middle",
            FingerPosition::RightRing => "right_ring",
            FingerPosition::RightLittle => "right_little",
            FingerPosition::LeftThumb => "left_thumb",
            FingerPosition::LeftIndex => "left_index",
            FingerPosition::LeftMiddle => "left_middle",
            FingerPosition::LeftRing => "left_ring",
            FingerPosition::LeftLittle => "left_little",
        };
        f.write_str(name)
    }
}

/// One finger capture: minutiae plus the scanner's quality score in
/// [0, 100]. Consumed once by the quantizer, never persisted.
#[derive(Debug, Clone)]
pub struct FingerTemplate {
    pub position: FingerPosition,
    pub minutiae: Vec<Minutia>,
    pub quality: f32,
}

impl FingerTemplate {
    pub fn new(position: FingerPosition, minutiae: Vec<Minutia>, quality: f32) -> Self {
        Self {
            position,
            minutiae,
            quality,
        }
    }

    pub fn meets_quality(&self, minimum: f32) -> bool {
        self.quality >= minimum
    }
}

/// Fixed-length discrete bit template produced by the quantizer.
///
/// The length is a pure function of the quantization parameters, never of
/// the biometric content. Wiped on drop; exists in memory only.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct QuantizedTemplate {
    bits: Vec<u8>,
    bit_len: usize,
}

impl std::fmt::Debug for QuantizedTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QuantizedTemplate({} bits)", self.bit_len)
    }
}

impl QuantizedTemplate {
    pub fn zeroed(bit_len: usize) -> Self {
        Self {
            bits: vec![0u8; (bit_len + 7) / 8],
            bit_len,
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < self.bit_len);
        self.bits[index / 8] >> (index % 8) & 1 == 1
    }

    pub fn set_bit(&mut self, index: usize) {
        debug_assert!(index < self.bit_len);
        self.bits[index / 8] |= 1 << (index % 8);
    }

    pub fn flip_bit(&mut self, index: usize) {
        debug_assert!(index < self.bit_len);
        self.bits[index / 8] ^= 1 << (index % 8);
    }

    /// Packed little-endian bit bytes; KDF input.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Number of differing bits between two templates of equal length.
    pub fn hamming_distance(&self, other: &Self) -> usize {
        debug_assert_eq!(self.bit_len, other.bit_len);
        self.bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finger_position_codes_are_stable_and_distinct() {
        let mut seen = std::collections::HashSet::new();
        for position in FingerPosition::ALL {
            let code = position.code();
            assert!((1..=10).contains(&code));
            assert!(seen.insert(code));
            assert_eq!(FingerPosition::from_code(code), Some(position));
        }
        assert_eq!(FingerPosition::from_code(0), None);
        assert_eq!(FingerPosition::from_code(11), None);
    }

    #[test]
    fn test_template_quality_gate() {
        let template = FingerTemplate::new(FingerPosition::LeftIndex, vec![], 62.5);
        assert!(template.meets_quality(60.0));
        assert!(!template.meets_quality(70.0));
    }

    #[test]
    fn test_bit_operations() {
        let mut t = QuantizedTemplate::zeroed(127);
        assert_eq!(t.count_ones(), 0);

        t.set_bit(0);
        t.set_bit(100);
        t.set_bit(126);
        assert!(t.bit(0) && t.bit(100) && t.bit(126));
        assert!(!t.bit(1));
        assert_eq!(t.count_ones(), 3);

        t.flip_bit(100);
        assert!(!t.bit(100));
        assert_eq!(t.count_ones(), 2);
    }

    #[test]
    fn test_hamming_distance() {
        let mut a = QuantizedTemplate::zeroed(254);
        let mut b = QuantizedTemplate::zeroed(254);
        a.set_bit(3);
        a.set_bit(200);
        b.set_bit(3);
        assert_eq!(a.hamming_distance(&b), 1);
        b.set_bit(77);
        assert_eq!(a.hamming_distance(&b), 2);
    }
}
