//! G.711 µ-law companding.

/// Bias added to the magnitude before compression.
pub const MULAW_BIAS: i32 = 0x84;

/// Largest magnitude that survives compression.
pub const MULAW_CLIP: i32 = 32635;

/// Expand one µ-law byte into a linear sample.
#[inline]
pub fn mulaw_to_linear(byte: u8) -> i16 {
    let u = !byte;
    let exponent = (u >> 4) & 0x07;
    let mantissa = (u & 0x0F) as i32;
    let magnitude = (((mantissa << 3) + MULAW_BIAS) << exponent) - MULAW_BIAS;

    if u & 0x80 != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Compress one linear sample into a µ-law byte.
#[inline]
pub fn linear_to_mulaw(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign: u8 = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0
    };

    magnitude = magnitude.min(MULAW_CLIP) + MULAW_BIAS;

    let mut exponent: u8 = 7;
    let mut mask = 0x4000;
    while magnitude & mask == 0 && exponent > 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;
    !(sign | (exponent << 4) | mantissa)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference expansion written directly from the G.711 segment table.
    fn reference_expand(byte: u8) -> i16 {
        const SEGMENT_BASE: [i32; 8] = [0, 132, 396, 924, 1980, 4092, 8316, 16764];
        let u = !byte;
        let segment = ((u >> 4) & 0x07) as usize;
        let step = 1 << (segment + 3);
        let value = SEGMENT_BASE[segment] + (u & 0x0F) as i32 * step;
        if u & 0x80 != 0 { -value as i16 } else { value as i16 }
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(mulaw_to_linear(0xFF), 0);
        // 0x7F is G.711 negative zero; the smallest negative step is 0x7E.
        assert_eq!(mulaw_to_linear(0x7F), 0);
        assert_eq!(mulaw_to_linear(0x7E), -8);
        assert_eq!(mulaw_to_linear(0x80), 32124);
        assert_eq!(mulaw_to_linear(0x00), -32124);
        assert_eq!(mulaw_to_linear(0x70), -120);
        assert_eq!(mulaw_to_linear(0xF0), 120);
    }

    #[test]
    fn test_decode_matches_segment_table_for_every_byte() {
        for byte in 0..=255u8 {
            assert_eq!(
                mulaw_to_linear(byte),
                reference_expand(byte),
                "byte {byte:#04x}"
            );
        }
    }

    #[test]
    fn test_silence_encodes_to_0xff() {
        assert_eq!(linear_to_mulaw(0), 0xFF);
    }

    #[test]
    fn test_extremes_clip() {
        assert_eq!(linear_to_mulaw(i16::MAX), 0x80);
        assert_eq!(linear_to_mulaw(i16::MIN), 0x00);
        assert_eq!(mulaw_to_linear(linear_to_mulaw(i16::MAX)), 32124);
        assert_eq!(mulaw_to_linear(linear_to_mulaw(i16::MIN)), -32124);
    }

    #[test]
    fn test_every_byte_survives_reencoding() {
        for byte in 0..=255u8 {
            let linear = mulaw_to_linear(byte);
            let again = linear_to_mulaw(linear);
            // 0x7F is negative zero and folds onto 0xFF.
            if byte == 0x7F {
                assert_eq!(again, 0xFF);
            } else {
                assert_eq!(again, byte, "byte {byte:#04x}");
            }
        }
    }

    #[test]
    fn test_roundtrip_within_one_step_for_all_samples() {
        for sample in i16::MIN..=i16::MAX {
            let encoded = linear_to_mulaw(sample);
            let exponent = ((!encoded >> 4) & 0x07) as i32;
            let step = 1i32 << (exponent + 3);
            let decoded = mulaw_to_linear(encoded) as i32;
            let clipped = (sample as i32).clamp(-MULAW_CLIP, MULAW_CLIP);
            assert!(
                (clipped - decoded).abs() <= step,
                "sample {sample} decoded to {decoded} (step {step})"
            );
            assert!(
                decoded.signum() * clipped.signum() >= 0,
                "sign flipped for {sample}"
            );
        }
    }
}
