//! Server-Sent Events frame decoding.
//!
//! The streaming endpoint answers with a sequence of frames, each a fixed
//! prefix, one JSON object and a blank-line delimiter:
//! ```text
//! data: {"id": "...", "choices": [...]}\r\n\r\n
//! data: {"id": "...", "choices": [...]}\r\n\r\n
//! ```
//! The transport hands the body over in chunks of arbitrary size, so a chunk
//! may end in the middle of a frame or hold several frames and the start of
//! another. [`FrameDecoder`] keeps the unterminated tail as carry-over and
//! joins it with the following reads.

use std::collections::VecDeque;
use std::marker::PhantomData;

use bytes::{Buf, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::client::ClientError;

/// Prefix in front of every frame payload.
pub const DATA_PREFIX: &[u8] = b"data: ";

/// Terminator after every frame.
pub const FRAME_DELIMITER: &[u8] = b"\r\n\r\n";

/// End-of-stream marker some servers send; skipped when seen.
pub const DONE_MARKER: &[u8] = b"[DONE]";

/// Largest carry-over kept while waiting for a delimiter.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Incremental decoder turning raw body chunks into parsed frames.
///
/// Frames come out in the order they were received. A frame split over any
/// number of reads is emitted once, after its delimiter arrives. A terminated
/// segment that is not valid JSON is dropped with a warning, and so is a
/// carry-over that grows past [`MAX_FRAME_LEN`] without a delimiter.
///
/// # Example
/// ```
/// use pplx::model::CompletionResponse;
/// use pplx::sse::FrameDecoder;
///
/// let mut decoder = FrameDecoder::<CompletionResponse>::new();
/// assert!(decoder.feed(b"data: {\"id\":\"a\"").is_empty());
///
/// let frames = decoder.feed(b"}\r\n\r\n");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].id, "a");
/// ```
#[derive(Debug)]
pub struct FrameDecoder<T> {
    pending: BytesMut,
    // Prefix of `pending` already known to hold no delimiter.
    scanned: usize,
    _frame: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Default for FrameDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> FrameDecoder<T> {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::new(),
            scanned: 0,
            _frame: PhantomData,
        }
    }

    /// Append one read and return every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<T> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(end) = self.find_delimiter() {
            let segment = self.pending.split_to(end);
            self.pending.advance(FRAME_DELIMITER.len());
            self.scanned = 0;

            if let Some(frame) = decode_segment(&segment) {
                frames.push(frame);
            }
        }

        if self.pending.len() > MAX_FRAME_LEN {
            tracing::warn!(
                bytes = self.pending.len(),
                limit = MAX_FRAME_LEN,
                "dropping oversized frame"
            );
            self.pending.clear();
            self.scanned = 0;
        } else if !self.pending.is_empty() {
            tracing::trace!(carry_over = self.pending.len(), "frame continues in next read");
        }
        frames
    }

    /// Flush the carry-over at end of stream.
    ///
    /// A last frame sent without its delimiter is still returned. Anything
    /// else left over is dropped.
    pub fn finish(&mut self) -> Option<T> {
        let tail = self.pending.split();
        self.scanned = 0;
        decode_segment(&tail)
    }

    /// Number of carried-over bytes waiting for the rest of their frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn find_delimiter(&mut self) -> Option<usize> {
        // A delimiter may straddle the previous and the new read.
        let start = self.scanned.saturating_sub(FRAME_DELIMITER.len() - 1);
        let found = self.pending[start..]
            .windows(FRAME_DELIMITER.len())
            .position(|window| window == FRAME_DELIMITER)
            .map(|offset| start + offset);

        if found.is_none() {
            self.scanned = self.pending.len();
        }
        found
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &[u8]) -> Option<T> {
    let payload = frame_payload(segment);
    if payload.is_empty() || is_done_marker(payload) {
        return None;
    }

    match serde_json::from_slice(payload) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::warn!(error = %e, bytes = payload.len(), "dropping malformed frame");
            None
        }
    }
}

/// Extract the JSON payload from one delimited segment.
///
/// Strips surrounding whitespace and NUL padding, and the `data: ` prefix
/// when present.
///
/// # Example
/// ```
/// use pplx::sse::frame_payload;
///
/// assert_eq!(frame_payload(b"data: {\"key\": \"value\"}"), b"{\"key\": \"value\"}");
/// assert_eq!(frame_payload(b"{\"key\": 1}\0\0"), b"{\"key\": 1}");
/// assert_eq!(frame_payload(b"\0\0\0"), b"");
/// ```
pub fn frame_payload(segment: &[u8]) -> &[u8] {
    let segment = trim_padding(segment);
    let payload = segment.strip_prefix(DATA_PREFIX).unwrap_or(segment);
    trim_padding(payload)
}

/// Check if a frame payload indicates the stream is done.
///
/// # Example
/// ```
/// use pplx::sse::is_done_marker;
///
/// assert!(is_done_marker(b"[DONE]"));
/// assert!(!is_done_marker(b""));
/// assert!(!is_done_marker(b"{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(payload: &[u8]) -> bool {
    payload == DONE_MARKER
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let is_padding = |b: &u8| *b == 0 || b.is_ascii_whitespace();
    let start = bytes.iter().position(|b| !is_padding(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_padding(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Extension trait for `reqwest::Response` to decode an SSE body into frames.
pub trait SSEResponseExt {
    /// Convert the response body into a stream of decoded frames.
    ///
    /// Yields frames in arrival order and ends when the body ends. A
    /// transport error is yielded once and ends the stream.
    fn frames<T>(self) -> impl Stream<Item = Result<T, ClientError>> + Send
    where
        T: DeserializeOwned + Send + 'static;
}

impl SSEResponseExt for reqwest::Response {
    fn frames<T>(self) -> impl Stream<Item = Result<T, ClientError>> + Send
    where
        T: DeserializeOwned + Send + 'static,
    {
        let byte_stream = self.bytes_stream();

        stream::unfold(
            (
                Box::pin(byte_stream),
                FrameDecoder::<T>::new(),
                VecDeque::new(),
                false,
            ),
            |(mut byte_stream, mut decoder, mut ready, mut stream_ended)| async move {
                loop {
                    if let Some(frame) = ready.pop_front() {
                        return Some((Ok(frame), (byte_stream, decoder, ready, stream_ended)));
                    }

                    if stream_ended {
                        return None;
                    }

                    match byte_stream.next().await {
                        Some(Ok(chunk)) => {
                            ready.extend(decoder.feed(&chunk));
                        }
                        Some(Err(e)) => {
                            stream_ended = true;
                            return Some((
                                Err(ClientError::from(e)),
                                (byte_stream, decoder, ready, stream_ended),
                            ));
                        }
                        None => {
                            stream_ended = true;
                            ready.extend(decoder.finish());
                        }
                    }
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CompletionResponse;

    const FIRST: &str =
        r#"data: {"choices":[{"message":{"role":"assistant","content":"What's"}}]}"#;
    const SECOND: &str = r#"data: {"choices":[{"message":{"role":"assistant","content":"What's the capital of France?"}}]}"#;

    fn body() -> Vec<u8> {
        format!("{FIRST}\r\n\r\n{SECOND}\r\n\r\n").into_bytes()
    }

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<CompletionResponse> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(decoder.feed(chunk));
        }
        frames.extend(decoder.finish());
        frames
    }

    fn unsplit(frame: &str) -> CompletionResponse {
        serde_json::from_slice(frame_payload(frame.as_bytes())).unwrap()
    }

    #[test]
    fn test_whole_body_in_one_read() {
        let frames = decode_chunks(&[&body()]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].last_content(), "What's");
        assert_eq!(frames[1].last_content(), "What's the capital of France?");
    }

    #[test]
    fn test_split_at_closing_brace() {
        let frame = format!("{FIRST}\r\n\r\n");
        let cut = FIRST.len() - 1;
        let (head, tail) = frame.as_bytes().split_at(cut);
        assert_eq!(tail[0], b'}');

        let mut decoder = FrameDecoder::<CompletionResponse>::new();
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.pending(), head.len());

        let frames = decoder.feed(tail);
        assert_eq!(frames, vec![unsplit(FIRST)]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_split_at_every_offset() {
        let body = body();
        for cut in 1..body.len() {
            let (head, tail) = body.split_at(cut);
            let frames = decode_chunks(&[head, tail]);
            assert_eq!(frames, vec![unsplit(FIRST), unsplit(SECOND)], "cut at {cut}");
        }
    }

    #[test]
    fn test_frame_spanning_three_reads() {
        let body = body();
        let frames = decode_chunks(&[&body[..10], &body[10..40], &body[40..]]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].last_content(), "What's the capital of France?");
    }

    #[test]
    fn test_byte_at_a_time() {
        let body = body();
        let chunks: Vec<&[u8]> = body.chunks(1).collect();
        let frames = decode_chunks(&chunks);
        assert_eq!(frames, vec![unsplit(FIRST), unsplit(SECOND)]);
    }

    #[test]
    fn test_full_frame_and_partial_in_one_read() {
        let body = body();
        let cut = FIRST.len() + FRAME_DELIMITER.len() + 12;

        let mut decoder = FrameDecoder::<CompletionResponse>::new();
        let first = decoder.feed(&body[..cut]);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].last_content(), "What's");

        let second = decoder.feed(&body[cut..]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].last_content(), "What's the capital of France?");
    }

    #[test]
    fn test_nul_padding_ignored() {
        let mut padded = body();
        padded.extend_from_slice(&[0u8; 64]);
        let frames = decode_chunks(&[&padded]);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_malformed_frame_dropped_and_stream_continues() {
        let body = format!("data: {{not json}}\r\n\r\n{SECOND}\r\n\r\n");
        let frames = decode_chunks(&[body.as_bytes()]);
        assert_eq!(frames, vec![unsplit(SECOND)]);
    }

    #[test]
    fn test_final_frame_without_delimiter() {
        let frames = decode_chunks(&[FIRST.as_bytes()]);
        assert_eq!(frames, vec![unsplit(FIRST)]);
    }

    #[test]
    fn test_truncated_final_frame_dropped() {
        let frames = decode_chunks(&[&FIRST.as_bytes()[..20]]);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_done_marker_skipped() {
        let body = format!("{FIRST}\r\n\r\ndata: [DONE]\r\n\r\n");
        let frames = decode_chunks(&[body.as_bytes()]);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_delimiter_split_between_reads() {
        let frame = format!("{FIRST}\r\n\r\n");
        let bytes = frame.as_bytes();
        let cut = bytes.len() - 2;

        let mut decoder = FrameDecoder::<CompletionResponse>::new();
        assert!(decoder.feed(&bytes[..cut]).is_empty());
        assert_eq!(decoder.feed(&bytes[cut..]).len(), 1);
    }

    #[test]
    fn test_oversized_carry_over_dropped() {
        let mut decoder = FrameDecoder::<CompletionResponse>::new();
        let chunk = vec![b'x'; 64 * 1024];
        for _ in 0..(MAX_FRAME_LEN / chunk.len()) {
            assert!(decoder.feed(&chunk).is_empty());
        }
        assert_eq!(decoder.pending(), MAX_FRAME_LEN);

        assert!(decoder.feed(b"x").is_empty());
        assert_eq!(decoder.pending(), 0);

        // The rest of the oversized frame ends in a malformed segment; the
        // next frame decodes normally.
        let rest = format!("xxxx\r\n\r\n{SECOND}\r\n\r\n");
        assert_eq!(decoder.feed(rest.as_bytes()), vec![unsplit(SECOND)]);
    }

    #[test]
    fn test_frame_payload() {
        assert_eq!(frame_payload(b"data: {}"), b"{}");
        assert_eq!(frame_payload(b"\r\ndata: {}  "), b"{}");
        assert_eq!(frame_payload(b"{}"), b"{}");
        assert_eq!(frame_payload(b""), b"");
    }

    #[test]
    fn test_is_done_marker() {
        assert!(is_done_marker(b"[DONE]"));
        assert!(!is_done_marker(b""));
        assert!(!is_done_marker(b"data"));
    }
}
