//! Annex-B to length-prefixed NAL conversion (§4.3: "Clients that relay to
//! a byte-length-prefixed consumer must convert Annex-B to length-prefixed
//! form").

use crate::nal::split_annexb;

/// Re-encode an Annex-B payload as a sequence of 4-byte big-endian length
/// prefixes, one per NAL unit, with no start codes.
#[must_use]
pub fn annexb_to_length_prefixed(payload: &[u8]) -> Vec<u8> {
    let nals = split_annexb(payload);
    let mut out = Vec::with_capacity(payload.len());
    for nal in nals {
        let len = u32::try_from(nal.data.len()).expect("single NAL unit exceeds u32 length");
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(nal.data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_two_nals_to_length_prefixed_form() {
        let mut annexb = Vec::new();
        annexb.extend_from_slice(&[0, 0, 0, 1, 0x67, 0x01, 0x02]);
        annexb.extend_from_slice(&[0, 0, 1, 0x68, 0x03]);

        let out = annexb_to_length_prefixed(&annexb);

        let mut expected = Vec::new();
        expected.extend_from_slice(&3u32.to_be_bytes());
        expected.extend_from_slice(&[0x67, 0x01, 0x02]);
        expected.extend_from_slice(&2u32.to_be_bytes());
        expected.extend_from_slice(&[0x68, 0x03]);

        assert_eq!(out, expected);
    }

    #[test]
    fn empty_payload_converts_to_empty_output() {
        assert!(annexb_to_length_prefixed(&[]).is_empty());
    }
}
