//! Video decoder contract (§6: "accepts Annex-B bytes, emits decoded
//! pixel buffers and a callback whenever parameter sets change").

use kvm_video::{FormatDescription, NalKind, ParameterSetCache};
use thiserror::Error;

use crate::screen::{PixelBuffer, PixelFormat};

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("decoder initialisation failed: {0}")]
    Init(String),
    #[error("slice references a parameter set that has not been seen yet")]
    MissingParameterSet,
    #[error("decode failed: {0}")]
    Decode(String),
}

/// One decode event. A single `decode` call may yield a parameter-set
/// change notification followed by the frame it describes.
#[derive(Debug, Clone)]
pub enum DecodeEvent {
    ParameterSetChanged(FormatDescription),
    Frame(PixelBuffer),
}

pub trait VideoDecoder: Send {
    fn decode(&mut self, annexb: &[u8], timestamp_ms: u64) -> Result<Vec<DecodeEvent>, DecoderError>;
}

/// Stub decoder: tracks parameter sets with [`ParameterSetCache`] and
/// fabricates a flat-colour [`PixelBuffer`] per slice NAL, so session
/// logic can be exercised without a real codec. Slices observed before a
/// complete parameter set is known report [`DecoderError::MissingParameterSet`].
pub struct StubVideoDecoder {
    cache: ParameterSetCache,
    width: u32,
    height: u32,
}

impl StubVideoDecoder {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            cache: ParameterSetCache::new(),
            width,
            height,
        }
    }
}

impl VideoDecoder for StubVideoDecoder {
    fn decode(&mut self, annexb: &[u8], timestamp_ms: u64) -> Result<Vec<DecodeEvent>, DecoderError> {
        let nals = self.cache.observe(annexb);
        let mut events = Vec::new();

        if self.cache.take_rebuild_required() {
            if let Some(desc) = self.cache.format_description() {
                events.push(DecodeEvent::ParameterSetChanged(desc));
            }
        }

        let codec = self.cache.codec();
        for nal in &nals {
            let Some(codec) = codec else { continue };
            if kvm_video::classify(codec, nal.data) != NalKind::Slice {
                continue;
            }
            if self.cache.format_description().is_none() {
                return Err(DecoderError::MissingParameterSet);
            }
            events.push(DecodeEvent::Frame(PixelBuffer {
                width: self.width,
                height: self.height,
                format: PixelFormat::Bgra,
                data: vec![0; (self.width * self.height * 4) as usize],
                timestamp_ms,
            }));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annexb(nals: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for nal in nals {
            out.extend_from_slice(&[0, 0, 0, 1]);
            out.extend_from_slice(nal);
        }
        out
    }

    #[test]
    fn slice_without_parameter_set_is_rejected() {
        let mut dec = StubVideoDecoder::new(4, 4);
        let frame = annexb(&[&[0x65, 0x01]]);
        // No SPS/PPS observed yet, and codec can't even be detected from
        // a bare slice NAL, so no slice is classified — this exercises
        // the "codec still unknown" path rather than the parameter-set
        // gap; see the keyframe test below for the gap itself.
        let events = dec.decode(&frame, 0).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn keyframe_emits_param_set_change_then_frame() {
        let mut dec = StubVideoDecoder::new(4, 4);
        let frame = annexb(&[&[0x67, 0x01], &[0x68, 0x02], &[0x65, 0xAA]]);
        let events = dec.decode(&frame, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DecodeEvent::ParameterSetChanged(_)));
        assert!(matches!(events[1], DecodeEvent::Frame(_)));
    }

    #[test]
    fn slice_with_stale_codec_but_no_pps_is_missing_parameter_set() {
        let mut dec = StubVideoDecoder::new(4, 4);
        // SPS only: codec known, but format_description needs PPS too.
        let sps_only = annexb(&[&[0x67, 0x01], &[0x65, 0xAA]]);
        let err = dec.decode(&sps_only, 0).unwrap_err();
        assert!(matches!(err, DecoderError::MissingParameterSet));
    }
}
