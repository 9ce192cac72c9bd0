//! Audio codec for the telephony leg.
//!
//! The telephony provider streams G.711 µ-law at 8kHz, one base64 block per
//! media event. The realtime endpoint speaks 16-bit linear PCM (little-endian)
//! at the same rate, so conversion is a per-sample companding step with no
//! resampling.
//!
//! # Example
//!
//! ```rust
//! use voice_bridge::core::audio::{decode_frame, encode_frames, FRAME_SAMPLES};
//! use base64::prelude::*;
//!
//! let pcm = decode_frame(&BASE64_STANDARD.encode([0xFFu8; 160])).unwrap();
//! assert_eq!(pcm.len(), 320);
//!
//! let frames = encode_frames(&BASE64_STANDARD.encode(&pcm), FRAME_SAMPLES).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```

mod mulaw;

use base64::prelude::*;
use thiserror::Error;

pub use mulaw::{MULAW_BIAS, MULAW_CLIP, linear_to_mulaw, mulaw_to_linear};

/// Samples per outbound telephony frame (20ms at 8kHz).
pub const FRAME_SAMPLES: usize = 160;

/// Sample rate shared by both legs of the bridge.
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

/// Errors raised when a media payload cannot be interpreted.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload was not valid base64
    #[error("Invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Expand µ-law bytes into 16-bit little-endian PCM (two output bytes per input byte).
pub fn mulaw_to_pcm16(mulaw: &[u8]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(mulaw.len() * 2);
    for &byte in mulaw {
        pcm.extend_from_slice(&mulaw_to_linear(byte).to_le_bytes());
    }
    pcm
}

/// Compress 16-bit little-endian PCM into µ-law bytes.
///
/// A trailing odd byte is not a whole sample and is ignored.
pub fn pcm16_to_mulaw(pcm: &[u8]) -> Vec<u8> {
    pcm.chunks_exact(2)
        .map(|pair| linear_to_mulaw(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// Decode one inbound telephony media payload into PCM bytes.
pub fn decode_frame(payload: &str) -> Result<Vec<u8>, CodecError> {
    let mulaw = BASE64_STANDARD.decode(payload)?;
    Ok(mulaw_to_pcm16(&mulaw))
}

/// Re-encode base64 PCM into base64 µ-law frames of `frame_samples` samples.
///
/// The last frame may be shorter. Frame order follows sample order.
pub fn encode_frames(pcm_base64: &str, frame_samples: usize) -> Result<Vec<String>, CodecError> {
    let pcm = BASE64_STANDARD.decode(pcm_base64)?;
    Ok(frame_pcm16(&pcm, frame_samples))
}

/// Split raw PCM into base64 µ-law frames.
pub fn frame_pcm16(pcm: &[u8], frame_samples: usize) -> Vec<String> {
    let frame_bytes = frame_samples.max(1) * 2;
    pcm.chunks(frame_bytes)
        .map(pcm16_to_mulaw)
        .filter(|frame| !frame.is_empty())
        .map(|frame| BASE64_STANDARD.encode(frame))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_from_samples(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_frame_doubles_length() {
        let payload = BASE64_STANDARD.encode([0xFFu8, 0x80, 0x00, 0x7F]);
        let pcm = decode_frame(&payload).unwrap();
        assert_eq!(pcm.len(), 8);
        assert_eq!(i16::from_le_bytes([pcm[0], pcm[1]]), 0);
        assert_eq!(i16::from_le_bytes([pcm[2], pcm[3]]), 32124);
        assert_eq!(i16::from_le_bytes([pcm[4], pcm[5]]), -32124);
    }

    #[test]
    fn test_decode_frame_rejects_bad_base64() {
        let result = decode_frame("not base64!!");
        assert!(matches!(result, Err(CodecError::InvalidBase64(_))));
    }

    #[test]
    fn test_encode_frames_200ms_makes_ten_frames() {
        let samples: Vec<i16> = (0..1600).map(|i| ((i * 37) % 2000 - 1000) as i16).collect();
        let pcm = pcm_from_samples(&samples);
        assert_eq!(pcm.len(), 3200);

        let frames = encode_frames(&BASE64_STANDARD.encode(&pcm), FRAME_SAMPLES).unwrap();
        assert_eq!(frames.len(), 10);
        for frame in &frames {
            let mulaw = BASE64_STANDARD.decode(frame).unwrap();
            assert_eq!(mulaw.len(), 160);
            assert_eq!(mulaw_to_pcm16(&mulaw).len() / 2, 160);
        }
    }

    #[test]
    fn test_encode_frames_short_tail() {
        let pcm = pcm_from_samples(&[100i16; 200]);
        let frames = frame_pcm16(&pcm, FRAME_SAMPLES);
        assert_eq!(frames.len(), 2);
        assert_eq!(BASE64_STANDARD.decode(&frames[1]).unwrap().len(), 40);
    }

    #[test]
    fn test_encode_frames_preserves_order() {
        let mut samples = vec![0i16; 160];
        samples.extend(vec![8000i16; 160]);
        let frames = frame_pcm16(&pcm_from_samples(&samples), FRAME_SAMPLES);

        let first = BASE64_STANDARD.decode(&frames[0]).unwrap();
        let second = BASE64_STANDARD.decode(&frames[1]).unwrap();
        assert!(first.iter().all(|&b| b == 0xFF));
        assert!(second.iter().all(|&b| b == linear_to_mulaw(8000)));
    }

    #[test]
    fn test_empty_pcm_yields_no_frames() {
        assert!(frame_pcm16(&[], FRAME_SAMPLES).is_empty());
        assert!(pcm16_to_mulaw(&[0x01]).is_empty());
    }
}
