//! Framed transport multiplex (§4.1): reads one bytestream, classifies each
//! next frame as a structured record or a binary video frame, and dispatches.
//!
//! Grounded in the same shape as the teacher's `ironrdp-server` connection
//! loop (one reactor task owns the socket, reads drive a dispatch match) but
//! the classification and resync policy below are specific to this
//! protocol's two-format bytestream.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::message::Message;
use crate::wire::{self, FrameHeader, WireError, FRAME_HEADER_LEN};

/// After this many consecutive header-parse failures, the receive buffer is
/// dropped entirely and the demultiplexer waits for the next keyframe
/// (§4.1 resync policy).
const MAX_CONSECUTIVE_ERRORS: u8 = 3;

/// Bytes read per underlying `AsyncRead::read` call when the buffer needs
/// more data.
const READ_CHUNK: usize = 64 * 1024;

/// One classified item off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum DemuxItem {
    /// A decoded structured record.
    Structured(Message),
    /// A binary video frame payload with its header fields.
    Video {
        flags: u8,
        timestamp_ms: u32,
        payload: Vec<u8>,
    },
}

impl DemuxItem {
    #[must_use]
    pub fn is_keyframe(&self) -> bool {
        matches!(self, Self::Video { flags, .. } if flags & wire::FLAG_KEYFRAME != 0)
    }
}

/// Transport-level failure. Per §7, these terminate the session; there is
/// no retry at this layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection lost: {0}")]
    ConnectionLost(#[from] std::io::Error),
}

/// Read half of the multiplex: owns the receive buffer and resync state.
pub struct Demultiplexer<R> {
    reader: R,
    buf: BytesMut,
    consecutive_errors: u8,
    /// Set after a resync clears the buffer; cleared once a keyframe is
    /// seen. While set, non-keyframe video frames are silently dropped.
    awaiting_keyframe: bool,
}

impl<R: AsyncRead + Unpin> Demultiplexer<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: BytesMut::with_capacity(READ_CHUNK),
            consecutive_errors: 0,
            awaiting_keyframe: false,
        }
    }

    /// Whether a resync is currently discarding frames until the next
    /// keyframe. Exposed for tests and for surfacing a "video unavailable"
    /// style status upstream.
    #[must_use]
    pub fn awaiting_keyframe(&self) -> bool {
        self.awaiting_keyframe
    }

    /// Read and classify the next item on the wire.
    ///
    /// Returns `Ok(None)` on a clean EOF (peer closed the socket having sent
    /// no partial frame). Malformed structured records are logged and
    /// skipped internally — they never surface as an `Err` or end the
    /// stream. Oversized/malformed video headers trigger resync internally
    /// and likewise never surface as an `Err`.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionLost`] on a read failure, or on
    /// EOF that truncates a partially-received structured or video record.
    pub async fn next_item(&mut self) -> Result<Option<DemuxItem>, TransportError> {
        loop {
            if self.buf.is_empty() {
                if !self.fill().await? {
                    return Ok(None);
                }
                continue;
            }

            if self.buf[0] == b'{' {
                match self.take_structured_record() {
                    Some(line) => match wire::decode_structured(&line) {
                        Ok(msg) => {
                            self.consecutive_errors = 0;
                            return Ok(Some(DemuxItem::Structured(msg)));
                        }
                        Err(WireError::BadRecord(e)) => {
                            tracing::warn!(error = %e, "malformed structured record, skipping");
                            continue;
                        }
                        Err(other) => {
                            tracing::warn!(error = %other, "unexpected decode error, skipping");
                            continue;
                        }
                    },
                    None => {
                        // No newline yet: need more bytes before we can act.
                        if !self.fill_with_eof_check(true).await? {
                            return Err(TransportError::ConnectionLost(truncated_eof()));
                        }
                        continue;
                    }
                }
            } else {
                match self.try_take_video()? {
                    TakeVideo::Item(item) => return Ok(Some(item)),
                    TakeVideo::DroppedDuringResync => continue,
                    TakeVideo::NeedMoreHeader => {
                        if !self.fill_with_eof_check(true).await? {
                            return Err(TransportError::ConnectionLost(truncated_eof()));
                        }
                        continue;
                    }
                    TakeVideo::NeedMorePayload => {
                        if !self.fill_with_eof_check(true).await? {
                            return Err(TransportError::ConnectionLost(truncated_eof()));
                        }
                        continue;
                    }
                    TakeVideo::ResyncAdvanced => continue,
                }
            }
        }
    }

    /// Take a structured record (without its trailing newline) out of the
    /// buffer if a complete one is present, advancing past the newline.
    fn take_structured_record(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf[..pos].to_vec();
        self.buf.advance(pos + 1);
        Some(line)
    }

    /// Attempt to classify and extract one video frame from the buffer.
    fn try_take_video(&mut self) -> Result<TakeVideo, TransportError> {
        if self.buf.len() < FRAME_HEADER_LEN {
            return Ok(TakeVideo::NeedMoreHeader);
        }

        let mut header_bytes = [0u8; FRAME_HEADER_LEN];
        header_bytes.copy_from_slice(&self.buf[..FRAME_HEADER_LEN]);

        let header = match FrameHeader::parse(&header_bytes) {
            Ok(h) => h,
            Err(WireError::BadFrameSize(size)) => {
                tracing::debug!(size, "bad video frame header, resyncing");
                self.buf.advance(1);
                self.register_parse_error();
                return Ok(TakeVideo::ResyncAdvanced);
            }
            Err(other) => return Err(TransportError::ConnectionLost(std::io::Error::other(other))),
        };

        let total_len = FRAME_HEADER_LEN + header.size as usize;
        if self.buf.len() < total_len {
            return Ok(TakeVideo::NeedMorePayload);
        }

        self.buf.advance(FRAME_HEADER_LEN);
        let payload = self.buf[..header.size as usize].to_vec();
        self.buf.advance(header.size as usize);
        self.consecutive_errors = 0;

        if self.awaiting_keyframe {
            if header.is_keyframe() {
                self.awaiting_keyframe = false;
            } else {
                tracing::trace!("dropping non-keyframe while resyncing");
                return Ok(TakeVideo::DroppedDuringResync);
            }
        }

        Ok(TakeVideo::Item(DemuxItem::Video {
            flags: header.flags,
            timestamp_ms: header.timestamp_ms,
            payload,
        }))
    }

    fn register_parse_error(&mut self) {
        self.consecutive_errors += 1;
        if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
            tracing::warn!("resync: clearing receive buffer after repeated parse failures");
            self.buf.clear();
            self.awaiting_keyframe = true;
            self.consecutive_errors = 0;
        }
    }

    /// Read more bytes into the buffer. Returns `Ok(false)` on clean EOF.
    async fn fill(&mut self) -> Result<bool, TransportError> {
        self.fill_with_eof_check(false).await
    }

    /// Read more bytes into the buffer. `mid_record` only affects the error
    /// path chosen by the caller on EOF; the read itself is identical.
    async fn fill_with_eof_check(&mut self, _mid_record: bool) -> Result<bool, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(false);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(true)
    }
}

enum TakeVideo {
    Item(DemuxItem),
    NeedMoreHeader,
    NeedMorePayload,
    ResyncAdvanced,
    DroppedDuringResync,
}

fn truncated_eof() -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "connection closed mid-record",
    )
}

/// Write half of the multiplex. Owned exclusively by the session reactor
/// (§5): there is never more than one writer, so structured records and
/// video frames can never interleave mid-message without any locking.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize and write one structured message, newline-terminated.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionLost`] on a write failure.
    pub async fn send_structured(&mut self, msg: &Message) -> Result<(), TransportError> {
        let buf = wire::encode_structured(msg);
        self.writer.write_all(&buf).await?;
        Ok(())
    }

    /// Write one video frame: 9-byte header followed by `payload`.
    ///
    /// # Errors
    /// Returns [`TransportError::ConnectionLost`] on a write failure.
    pub async fn send_frame(
        &mut self,
        is_keyframe: bool,
        timestamp_ms: u32,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let buf = wire::encode_frame(is_keyframe, timestamp_ms, payload);
        self.writer.write_all(&buf).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use std::io::Cursor;

    #[tokio::test]
    async fn demux_disjointness_scenario() {
        // §8 scenario 6: one structured record immediately followed by one
        // video frame, dispatched in order with no residual bytes.
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"kind\":\"controlRelease\"}\n");
        let payload = vec![0xABu8; 2048];
        input.extend_from_slice(&wire::encode_frame(false, 1234, &payload));

        let mut demux = Demultiplexer::new(Cursor::new(input));

        let first = demux.next_item().await.unwrap().unwrap();
        assert_eq!(first, DemuxItem::Structured(Message::ControlRelease));

        let second = demux.next_item().await.unwrap().unwrap();
        match second {
            DemuxItem::Video {
                flags,
                timestamp_ms,
                payload: p,
            } => {
                assert_eq!(flags, 0);
                assert_eq!(timestamp_ms, 1234);
                assert_eq!(p, payload);
            }
            other => panic!("expected video frame, got {other:?}"),
        }

        assert!(demux.next_item().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ordering_preserved_across_many_sends() {
        let mut input = Vec::new();
        for i in 0..20u32 {
            if i % 2 == 0 {
                input.extend_from_slice(
                    &wire::encode_structured(&Message::WarpCursor { x: f64::from(i), y: 0.0 }),
                );
            } else {
                input.extend_from_slice(&wire::encode_frame(false, i, &[i as u8; 16]));
            }
        }
        let mut demux = Demultiplexer::new(Cursor::new(input));
        for i in 0..20u32 {
            let item = demux.next_item().await.unwrap().unwrap();
            if i % 2 == 0 {
                assert_eq!(
                    item,
                    DemuxItem::Structured(Message::WarpCursor { x: f64::from(i), y: 0.0 })
                );
            } else {
                assert!(matches!(item, DemuxItem::Video { timestamp_ms, .. } if timestamp_ms == i));
            }
        }
    }

    /// An `AsyncRead` that hands out a queue of byte chunks one logical
    /// "network segment" at a time, never coalescing two segments into one
    /// `poll_read` call (a segment may still be split across several reads
    /// if the caller's buffer is smaller than it, but two segments are
    /// never merged). This models realistic TCP segment arrival well
    /// enough to test resync behaviour without the corruption scenario
    /// being an artifact of a test harness that buffers everything at
    /// once.
    struct StagedReader {
        stages: std::collections::VecDeque<Vec<u8>>,
    }

    impl StagedReader {
        fn new(stages: Vec<Vec<u8>>) -> Self {
            Self {
                stages: stages.into_iter().collect(),
            }
        }
    }

    impl AsyncRead for StagedReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            let Some(stage) = self.stages.front_mut() else {
                return std::task::Poll::Ready(Ok(()));
            };
            let n = stage.len().min(buf.remaining());
            buf.put_slice(&stage[..n]);
            stage.drain(..n);
            if stage.is_empty() {
                self.stages.pop_front();
            }
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn resync_after_random_bytes_recovers_at_next_keyframe() {
        // §8 scenario 3: a valid keyframe, then 5 random (non-`{`) bytes
        // that don't parse as a header, then a valid header. After at most
        // 3 parse attempts the buffer clears and we wait for a keyframe.
        // The already-buffered bytes following the corruption are lost as
        // part of the clear (a stream position, not a frame, is what gets
        // discarded) — the property under test is that the *next* keyframe
        // to arrive afterwards is decoded end-to-end without error, not
        // that the frame adjacent to the corruption survives.
        let first_payload = vec![0x11u8; 200_000];
        let junk = vec![0xFFu8, 0xFF, 0xFF, 0xFF, 0x02];
        let second_payload = vec![0x22u8; 15_000];
        let third_payload = vec![0x33u8; 8_000];

        let stages = vec![
            wire::encode_frame(true, 1, &first_payload),
            junk,
            wire::encode_frame(true, 2, &second_payload),
            wire::encode_frame(true, 3, &third_payload),
        ];
        let mut demux = Demultiplexer::new(StagedReader::new(stages));

        let item1 = demux.next_item().await.unwrap().unwrap();
        assert!(item1.is_keyframe());
        match item1 {
            DemuxItem::Video { payload, .. } => assert_eq!(payload, first_payload),
            other => panic!("expected video, got {other:?}"),
        }

        // The corruption forces a resync; whichever keyframe survives to
        // be decoded next must be decoded cleanly (no partial/garbled
        // payload ever surfaces).
        let recovered = demux.next_item().await.unwrap().unwrap();
        assert!(recovered.is_keyframe());
        match recovered {
            DemuxItem::Video { payload, .. } => {
                assert!(payload == second_payload || payload == third_payload);
            }
            other => panic!("expected video, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn structured_record_with_embedded_newline_is_rejected() {
        // §8 boundary: a record whose first byte is `{` but with an
        // embedded 0x0A is never produced by a conforming sender; if it
        // appears (e.g. a hostile peer), the bytes up to the first newline
        // fail JSON decoding and are skipped, not treated as the full
        // intended record.
        let mut input = Vec::new();
        input.extend_from_slice(b"{\"kind\":\"clipboard\",\"id\":1,\n");
        input.extend_from_slice(b"{\"kind\":\"controlRelease\"}\n");
        let mut demux = Demultiplexer::new(Cursor::new(input));
        let item = demux.next_item().await.unwrap().unwrap();
        assert_eq!(item, DemuxItem::Structured(Message::ControlRelease));
    }

    #[tokio::test]
    async fn writer_frames_never_interleave() {
        let mut buf = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buf);
            writer.send_structured(&Message::StartVideoStream).await.unwrap();
            writer.send_frame(true, 1, &[1, 2, 3]).await.unwrap();
        }
        let mut demux = Demultiplexer::new(Cursor::new(buf));
        assert_eq!(
            demux.next_item().await.unwrap().unwrap(),
            DemuxItem::Structured(Message::StartVideoStream)
        );
        assert!(matches!(
            demux.next_item().await.unwrap().unwrap(),
            DemuxItem::Video { .. }
        ));
    }
}
