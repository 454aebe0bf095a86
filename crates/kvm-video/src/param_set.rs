//! Parameter-set caching and format-description construction (§4.3, §4.8
//! ownership summary: "Controller caches the most recent set for remux to
//! the display pipeline").

use crate::codec::{classify, detect_codec, Codec, NalKind};
use crate::nal::split_annexb;

/// The codec-appropriate set of parameter-set NALs needed to build a
/// decoder format description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    pub codec: Codec,
    pub vps: Option<Vec<u8>>,
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
}

/// Tracks the most recently observed VPS/SPS/PPS, feeds a scanned Annex-B
/// payload in, and reports whether the decoder needs to be rebuilt.
#[derive(Debug, Default)]
pub struct ParameterSetCache {
    codec: Option<Codec>,
    vps: Option<Vec<u8>>,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
    rebuild_required: bool,
}

impl ParameterSetCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn codec(&self) -> Option<Codec> {
        self.codec
    }

    /// Scan `payload` (a whole Annex-B frame, as delivered in one
    /// `VideoFrame` message) and update the cache with any parameter sets
    /// found. Returns the NAL units in stream order, so the caller can
    /// also locate the coded slice(s) for decoding.
    pub fn observe<'a>(&mut self, payload: &'a [u8]) -> Vec<crate::nal::NalUnit<'a>> {
        let nals = split_annexb(payload);

        for nal in &nals {
            let Some(&byte0) = nal.data.first() else {
                continue;
            };

            let codec = match self.codec {
                Some(c) => c,
                None => {
                    let Some(detected) = detect_codec(nal.data) else {
                        continue;
                    };
                    tracing::info!(?detected, "auto-detected video codec");
                    self.codec = Some(detected);
                    detected
                }
            };
            let _ = byte0;

            match classify(codec, nal.data) {
                NalKind::Vps => self.set_if_changed(Set::Vps, nal.data),
                NalKind::Sps => self.set_if_changed(Set::Sps, nal.data),
                NalKind::Pps => self.set_if_changed(Set::Pps, nal.data),
                NalKind::Slice | NalKind::Other => {}
            }
        }

        nals
    }

    fn set_if_changed(&mut self, which: Set, data: &[u8]) {
        let slot = match which {
            Set::Vps => &mut self.vps,
            Set::Sps => &mut self.sps,
            Set::Pps => &mut self.pps,
        };
        if slot.as_deref() != Some(data) {
            *slot = Some(data.to_vec());
            self.rebuild_required = true;
        }
    }

    /// Build a [`FormatDescription`] once every set the codec requires is
    /// known. HEVC requires VPS+SPS+PPS; H.264 requires SPS+PPS.
    #[must_use]
    pub fn format_description(&self) -> Option<FormatDescription> {
        let codec = self.codec?;
        let sps = self.sps.clone()?;
        let pps = self.pps.clone()?;
        let vps = match codec {
            Codec::Hevc => Some(self.vps.clone()?),
            Codec::H264 => None,
        };
        Some(FormatDescription { codec, vps, sps, pps })
    }

    /// Consume the "parameter sets changed since last check" flag. The
    /// decoder should be rebuilt whenever this returns `true`.
    pub fn take_rebuild_required(&mut self) -> bool {
        std::mem::take(&mut self.rebuild_required)
    }
}

enum Set {
    Vps,
    Sps,
    Pps,
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
    fn h264_format_description_needs_sps_and_pps_only() {
        let mut cache = ParameterSetCache::new();
        let frame = annexb(&[&[0x67, 0x01], &[0x68, 0x02], &[0x65, 0x03, 0x04]]);
        cache.observe(&frame);
        assert_eq!(cache.codec(), Some(Codec::H264));
        let desc = cache.format_description().unwrap();
        assert_eq!(desc.codec, Codec::H264);
        assert!(desc.vps.is_none());
        assert_eq!(desc.sps, vec![0x67, 0x01]);
        assert_eq!(desc.pps, vec![0x68, 0x02]);
    }

    #[test]
    fn hevc_requires_vps_before_format_description() {
        let mut cache = ParameterSetCache::new();
        let sps_byte0 = 33u8 << 1;
        let pps_byte0 = 34u8 << 1;
        let frame = annexb(&[&[sps_byte0, 0x01], &[pps_byte0, 0x02]]);
        cache.observe(&frame);
        assert_eq!(cache.codec(), Some(Codec::Hevc));
        assert!(cache.format_description().is_none());

        let vps_byte0 = 32u8 << 1;
        let frame2 = annexb(&[&[vps_byte0, 0x00]]);
        cache.observe(&frame2);
        let desc = cache.format_description().unwrap();
        assert_eq!(desc.vps, Some(vec![vps_byte0, 0x00]));
    }

    #[test]
    fn rebuild_required_only_on_change() {
        let mut cache = ParameterSetCache::new();
        let frame = annexb(&[&[0x67, 0x01], &[0x68, 0x02]]);
        cache.observe(&frame);
        assert!(cache.take_rebuild_required());
        assert!(!cache.take_rebuild_required());

        // Same SPS/PPS again: no rebuild needed.
        cache.observe(&frame);
        assert!(!cache.take_rebuild_required());

        // Changed SPS: rebuild needed.
        let frame2 = annexb(&[&[0x67, 0xFF], &[0x68, 0x02]]);
        cache.observe(&frame2);
        assert!(cache.take_rebuild_required());
    }

    #[test]
    fn parameter_sets_precede_slice_in_scan_order() {
        // §8 invariant: keyframe param-set NALs precede slice NALs at the
        // head, in Annex-B scan order.
        let mut cache = ParameterSetCache::new();
        let frame = annexb(&[&[0x67, 0x01], &[0x68, 0x02], &[0x65, 0xAA]]);
        let nals = cache.observe(&frame);
        assert_eq!(nals.len(), 3);
        assert_eq!(classify(Codec::H264, nals[0].data), NalKind::Sps);
        assert_eq!(classify(Codec::H264, nals[1].data), NalKind::Pps);
        assert_eq!(classify(Codec::H264, nals[2].data), NalKind::Slice);
    }
}
