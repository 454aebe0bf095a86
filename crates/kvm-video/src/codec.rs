//! Codec autodetection and NAL-type classification (§4.3).

/// Coded video format, auto-detected from the first parameter-set NAL
/// observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    H264,
    Hevc,
}

/// What kind of parameter set (or non-parameter-set content) a NAL unit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalKind {
    Vps,
    Sps,
    Pps,
    /// A coded slice (keyframe or not — this crate doesn't need to tell
    /// the difference, the video-frame header's keyframe flag already
    /// carries that).
    Slice,
    Other,
}

/// Classify the first byte of a NAL unit under the assumption that it is
/// encoded with `codec`.
#[must_use]
pub fn classify(codec: Codec, nal: &[u8]) -> NalKind {
    let Some(&byte0) = nal.first() else {
        return NalKind::Other;
    };
    match codec {
        Codec::H264 => match byte0 & 0x1F {
            7 => NalKind::Sps,
            8 => NalKind::Pps,
            1 | 5 => NalKind::Slice,
            _ => NalKind::Other,
        },
        Codec::Hevc => match (byte0 >> 1) & 0x3F {
            32 => NalKind::Vps,
            33 => NalKind::Sps,
            34 => NalKind::Pps,
            0..=31 => NalKind::Slice,
            _ => NalKind::Other,
        },
    }
}

/// Guess the codec from a single NAL unit, used only on the very first
/// parameter-set NAL seen on a fresh decoder (§4.3: "Codec ... is
/// auto-detected from the first parameter-set NAL").
///
/// This is a heuristic, not a bitstream-semantics proof: it tries the
/// H.264 interpretation of the NAL header byte first (SPS=7/PPS=8), then
/// the HEVC interpretation (VPS=32/SPS=33/PPS=34). Real streams from a
/// single encoder never emit both, so the first match wins.
#[must_use]
pub fn detect_codec(nal: &[u8]) -> Option<Codec> {
    let &byte0 = nal.first()?;
    let h264_type = byte0 & 0x1F;
    if h264_type == 7 || h264_type == 8 {
        return Some(Codec::H264);
    }
    let hevc_type = (byte0 >> 1) & 0x3F;
    if matches!(hevc_type, 32 | 33 | 34) {
        return Some(Codec::Hevc);
    }
    None
}
