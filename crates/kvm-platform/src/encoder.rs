//! Video encoder contract (§6: "accepts pixel buffers, emits
//! Annex-B-framed NAL payloads with a keyframe flag").

use kvm_video::Codec;
use thiserror::Error;

use crate::screen::PixelBuffer;

#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub payload: Vec<u8>,
    pub timestamp_ms: u64,
    pub is_keyframe: bool,
}

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoder initialisation failed: {0}")]
    Init(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

pub trait VideoEncoder: Send {
    fn codec(&self) -> Codec;

    /// Request that the next encoded frame be a keyframe (carrying a
    /// full parameter-set head).
    fn force_keyframe(&mut self);

    fn encode(&mut self, frame: &PixelBuffer) -> Result<EncodedFrame, EncoderError>;
}

/// Stub encoder: produces a canned Annex-B payload per call, honouring
/// `force_keyframe` by prefixing a parameter-set pair on the next frame.
pub struct StubVideoEncoder {
    codec: Codec,
    sps: Vec<u8>,
    pps: Vec<u8>,
    force_next: bool,
    next_seq: u64,
}

impl StubVideoEncoder {
    #[must_use]
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            sps: vec![0x67, 0x01],
            pps: vec![0x68, 0x01],
            force_next: true,
            next_seq: 0,
        }
    }

    fn start_code(buf: &mut Vec<u8>) {
        buf.extend_from_slice(&[0, 0, 0, 1]);
    }
}

impl VideoEncoder for StubVideoEncoder {
    fn codec(&self) -> Codec {
        self.codec
    }

    fn force_keyframe(&mut self) {
        self.force_next = true;
    }

    fn encode(&mut self, frame: &PixelBuffer) -> Result<EncodedFrame, EncoderError> {
        let mut payload = Vec::new();
        let is_keyframe = self.force_next;
        if is_keyframe {
            Self::start_code(&mut payload);
            payload.extend_from_slice(&self.sps);
            Self::start_code(&mut payload);
            payload.extend_from_slice(&self.pps);
            self.force_next = false;
        }
        Self::start_code(&mut payload);
        let slice_type: u8 = if is_keyframe { 0x65 } else { 0x61 };
        payload.push(slice_type);
        payload.extend_from_slice(&self.next_seq.to_le_bytes());
        self.next_seq += 1;

        Ok(EncodedFrame {
            payload,
            timestamp_ms: frame.timestamp_ms,
            is_keyframe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::PixelFormat;

    fn frame(ts: u64) -> PixelBuffer {
        PixelBuffer {
            width: 4,
            height: 4,
            format: PixelFormat::Bgra,
            data: vec![0; 64],
            timestamp_ms: ts,
        }
    }

    #[test]
    fn first_encode_is_a_keyframe_with_parameter_sets() {
        let mut enc = StubVideoEncoder::new(Codec::H264);
        let out = enc.encode(&frame(0)).unwrap();
        assert!(out.is_keyframe);
        let nals = kvm_video::split_annexb(&out.payload);
        assert_eq!(nals.len(), 3);
    }

    #[test]
    fn force_keyframe_reinserts_parameter_sets() {
        let mut enc = StubVideoEncoder::new(Codec::H264);
        enc.encode(&frame(0)).unwrap();
        let follow_up = enc.encode(&frame(33)).unwrap();
        assert!(!follow_up.is_keyframe);

        enc.force_keyframe();
        let forced = enc.encode(&frame(66)).unwrap();
        assert!(forced.is_keyframe);
    }
}
