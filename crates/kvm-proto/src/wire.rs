//! Encode/decode helpers for structured records and video-frame headers.
//!
//! Kept separate from [`crate::message`] and [`crate::frame`] so both can
//! depend on the same low-level codec without a cycle.

use crate::message::Message;

/// Maximum permitted video frame payload size (§3 invariant).
pub const MAX_FRAME_SIZE: u32 = 10 * 1024 * 1024;

/// Minimum permitted video frame payload size (zero-length frames resync).
pub const MIN_FRAME_SIZE: u32 = 1;

/// Size in bytes of the fixed video-frame header.
pub const FRAME_HEADER_LEN: usize = 9;

/// Bit 0 of the header flags byte: this frame is a keyframe.
pub const FLAG_KEYFRAME: u8 = 0x01;

/// Errors decoding a structured record or a video-frame header.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed structured record: {0}")]
    BadRecord(#[from] serde_json::Error),
    #[error("video frame size {0} out of range 1..={MAX_FRAME_SIZE}")]
    BadFrameSize(u32),
}

/// Serialize `msg` to a newline-terminated JSON record.
///
/// The first byte of the result is always `{` (serde_json never emits
/// leading whitespace), which is what lets the demultiplexer classify a
/// record without a side channel.
#[must_use]
pub fn encode_structured(msg: &Message) -> Vec<u8> {
    let mut buf = serde_json::to_vec(msg).expect("Message serialization is infallible");
    buf.push(b'\n');
    buf
}

/// Decode a single structured record (without its trailing newline).
///
/// # Errors
/// Returns [`WireError::BadRecord`] if `line` is not a valid JSON object,
/// or matches no known `kind` field shape. Unknown-but-well-formed `kind`
/// values decode to [`Message::Unknown`] rather than erroring (see
/// `#[serde(other)]` on [`Message`]).
pub fn decode_structured(line: &[u8]) -> Result<Message, WireError> {
    Ok(serde_json::from_slice(line)?)
}

/// A parsed video-frame header: `u32 size LE, u32 timestamp_ms LE, u8 flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub size: u32,
    pub timestamp_ms: u32,
    pub flags: u8,
}

impl FrameHeader {
    #[must_use]
    pub fn new(size: u32, timestamp_ms: u32, is_keyframe: bool) -> Self {
        Self {
            size,
            timestamp_ms,
            flags: if is_keyframe { FLAG_KEYFRAME } else { 0 },
        }
    }

    #[must_use]
    pub fn is_keyframe(&self) -> bool {
        self.flags & FLAG_KEYFRAME != 0
    }

    /// Encode to the fixed 9-byte little-endian wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut out = [0u8; FRAME_HEADER_LEN];
        out[0..4].copy_from_slice(&self.size.to_le_bytes());
        out[4..8].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        out[8] = self.flags;
        out
    }

    /// Parse a 9-byte header and validate the size bound.
    ///
    /// # Errors
    /// Returns [`WireError::BadFrameSize`] if `size` is 0 or exceeds
    /// [`MAX_FRAME_SIZE`]; the caller is expected to treat that as a
    /// resync trigger, not a fatal error (§4.1).
    pub fn parse(bytes: &[u8; FRAME_HEADER_LEN]) -> Result<Self, WireError> {
        let size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let timestamp_ms = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let flags = bytes[8];
        if size < MIN_FRAME_SIZE || size > MAX_FRAME_SIZE {
            return Err(WireError::BadFrameSize(size));
        }
        Ok(Self {
            size,
            timestamp_ms,
            flags,
        })
    }
}

/// Build a complete on-wire video frame: header followed by `payload`.
///
/// # Panics
/// Panics if `payload.len()` does not fit in a `u32` or is out of the
/// `1..=MAX_FRAME_SIZE` bound; callers are expected to validate upstream
/// (the encoder collaborator never emits out-of-bound payloads).
#[must_use]
pub fn encode_frame(is_keyframe: bool, timestamp_ms: u32, payload: &[u8]) -> Vec<u8> {
    let size = u32::try_from(payload.len()).expect("payload exceeds u32::MAX");
    assert!(
        (MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&size),
        "payload size {size} out of range"
    );
    let header = FrameHeader::new(size, timestamp_ms, is_keyframe);
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        for (size, ts, is_key) in [(1u32, 0u32, false), (200_000, 12345, true), (MAX_FRAME_SIZE, u32::MAX, true)] {
            let header = FrameHeader::new(size, ts, is_key);
            let encoded = header.encode();
            let parsed = FrameHeader::parse(&encoded).unwrap();
            assert_eq!(parsed.size, size);
            assert_eq!(parsed.timestamp_ms, ts);
            assert_eq!(parsed.is_keyframe(), is_key);
        }
    }

    #[test]
    fn zero_size_rejected() {
        let header = FrameHeader::new(0, 0, false);
        let encoded = header.encode();
        assert!(matches!(FrameHeader::parse(&encoded), Err(WireError::BadFrameSize(0))));
    }

    #[test]
    fn oversize_rejected() {
        let header = FrameHeader::new(MAX_FRAME_SIZE + 1, 0, false);
        let encoded = header.encode();
        assert!(matches!(
            FrameHeader::parse(&encoded),
            Err(WireError::BadFrameSize(n)) if n == MAX_FRAME_SIZE + 1
        ));
    }

    #[test]
    fn reserved_bit_ignored_by_is_keyframe() {
        // bit 1 is reserved-zero on this wire (spec §9 open question
        // resolved: treat as reserved, not a codec selector).
        let mut header = FrameHeader::new(10, 0, true);
        header.flags |= 0x02;
        assert!(header.is_keyframe());
    }
}
