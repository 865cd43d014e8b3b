use std::error;
use std::fmt;

/* Unsigned Qm.n fixed-point conversion. The original capture variants only
differ in these widths, so they are plain values passed to the pipeline
instead of compile-time constants. */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantProfile {
    pub total_bits: u32,
    pub int_bits: u32,  // m
    pub frac_bits: u32, // n
}

impl QuantProfile {
    /// Power statistics of the training set, Q2.10 in 12 bits.
    pub const POWER_Q2_10: QuantProfile = QuantProfile {
        total_bits: 12,
        int_bits: 2,
        frac_bits: 10,
    };
    /// Power statistics of the normal/attack sets, Q2.14 in 16 bits.
    pub const POWER_Q2_14: QuantProfile = QuantProfile {
        total_bits: 16,
        int_bits: 2,
        frac_bits: 14,
    };
    /// Power statistics of the sampled test set, Q1.15 in 16 bits.
    pub const POWER_Q1_15: QuantProfile = QuantProfile {
        total_bits: 16,
        int_bits: 1,
        frac_bits: 15,
    };
    /// Hamming distance, Q8.0 in 8 bits.
    pub const LEAKAGE_Q8: QuantProfile = QuantProfile {
        total_bits: 8,
        int_bits: 8,
        frac_bits: 0,
    };

    pub fn new(total_bits: u32, int_bits: u32, frac_bits: u32) -> Result<Self, QuantError> {
        let profile = QuantProfile {
            total_bits,
            int_bits,
            frac_bits,
        };
        check_widths(profile)?;
        Ok(profile)
    }
}

/// A quantized scalar: `total_bits` characters of `0`/`1`, MSB first.
/// `saturated` flags a value that was clamped to the top of the Qm.n range.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Encoded {
    pub bits: String,
    pub saturated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuantError {
    /// Negative scalar, not representable in the unsigned format.
    Negative(f32),
    /// Profile widths that would truncate or overflow the code word.
    BadWidths(QuantProfile),
}

impl fmt::Display for QuantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantError::Negative(value) => {
                write!(f, "negative value {value} in unsigned fixed-point converter")
            }
            QuantError::BadWidths(p) => write!(
                f,
                "Q{}.{} does not fit in {} output bits",
                p.int_bits, p.frac_bits, p.total_bits
            ),
        }
    }
}

impl error::Error for QuantError {}

fn check_widths(profile: QuantProfile) -> Result<(), QuantError> {
    /* total_bits < m + n would silently drop high bits of the code word,
    corrupting every exported feature. Widths past 32 bits exceed the code
    word itself. */
    let code_bits = profile.int_bits + profile.frac_bits;
    if profile.total_bits < code_bits || profile.total_bits > 32 || code_bits == 0 {
        return Err(QuantError::BadWidths(profile));
    }
    Ok(())
}

/// Encodes a non-negative scalar as an unsigned Qm.n bit string.
///
/// Rounding is to the nearest code, ties away from zero. A value past the
/// top of the range is clamped to the all-ones code and flagged `saturated`.
pub fn encode(value: f32, profile: QuantProfile) -> Result<Encoded, QuantError> {
    check_widths(profile)?;
    if value < 0.0 {
        return Err(QuantError::Negative(value));
    }

    let scale = (1u64 << profile.frac_bits) as f32;
    // f32 -> u64 casts saturate, so huge inputs land on the clamp below
    let mut code = (value * scale).round() as u64;

    let limit = 1u64 << (profile.int_bits + profile.frac_bits);
    let saturated = code >= limit;
    if saturated {
        code = limit - 1;
    }

    let mut bits = String::with_capacity(profile.total_bits as usize);
    for i in (0..profile.total_bits).rev() {
        bits.push(if (code >> i) & 1 == 1 { '1' } else { '0' });
    }

    Ok(Encoded { bits, saturated })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bits: &str, profile: QuantProfile) -> f32 {
        let code = u64::from_str_radix(bits, 2).unwrap();
        code as f32 / (1u64 << profile.frac_bits) as f32
    }

    #[test]
    fn encode_zero() {
        let e = encode(0.0, QuantProfile::LEAKAGE_Q8).unwrap();
        assert_eq!(e.bits, "00000000");
        assert!(!e.saturated);
    }

    #[test]
    fn encode_training_profile() {
        let e = encode(1.5, QuantProfile::POWER_Q2_10).unwrap();
        // 1.5 * 2^10 = 1536 = 0b011000000000
        assert_eq!(e.bits, "011000000000");
        assert!(!e.saturated);
    }

    #[test]
    fn round_trip_within_half_lsb() {
        let profile = QuantProfile::POWER_Q2_10;
        let half_lsb = 0.5 / (1u64 << profile.frac_bits) as f32;
        for step in 0..4000 {
            let v = step as f32 * 0.001; // [0.0, 4.0)
            let e = encode(v, profile).unwrap();
            assert!(!e.saturated, "{v} saturated below the range top");
            assert!((decode(&e.bits, profile) - v).abs() <= half_lsb);
        }
    }

    #[test]
    fn rounds_ties_away_from_zero() {
        // 2.5 in Q8.0 rounds up to 3
        let e = encode(2.5, QuantProfile::LEAKAGE_Q8).unwrap();
        assert_eq!(e.bits, "00000011");
    }

    #[test]
    fn rejects_negative() {
        assert_eq!(
            encode(-1.0, QuantProfile::POWER_Q2_10),
            Err(QuantError::Negative(-1.0))
        );
    }

    #[test]
    fn saturates_to_all_ones() {
        let e = encode(4.2, QuantProfile::POWER_Q2_10).unwrap();
        assert_eq!(e.bits, "111111111111");
        assert!(e.saturated);

        let e = encode(1e9, QuantProfile::LEAKAGE_Q8).unwrap();
        assert_eq!(e.bits, "11111111");
        assert!(e.saturated);
    }

    #[test]
    fn high_bits_stay_zero_when_total_exceeds_code_width() {
        let profile = QuantProfile::new(16, 2, 10).unwrap();
        let e = encode(1e9, profile).unwrap();
        assert_eq!(e.bits, "0000111111111111");
    }

    #[test]
    fn rejects_truncating_widths() {
        assert!(matches!(
            QuantProfile::new(8, 2, 10),
            Err(QuantError::BadWidths(_))
        ));
        assert!(matches!(
            encode(
                1.0,
                QuantProfile {
                    total_bits: 8,
                    int_bits: 2,
                    frac_bits: 10
                }
            ),
            Err(QuantError::BadWidths(_))
        ));
    }

    #[test]
    fn named_profiles_are_valid() {
        for p in [
            QuantProfile::POWER_Q2_10,
            QuantProfile::POWER_Q2_14,
            QuantProfile::POWER_Q1_15,
            QuantProfile::LEAKAGE_Q8,
        ] {
            assert!(QuantProfile::new(p.total_bits, p.int_bits, p.frac_bits).is_ok());
        }
    }
}
