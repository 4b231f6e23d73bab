//! Newline-delimited JSON frame reassembly
//!
//! The stdio transport reads the server subprocess's stdout in arbitrary
//! byte chunks; [`MessageBuffer`] reassembles those chunks into complete
//! JSON frames. One frame per line, blank lines skipped, and anything that
//! is not a JSON object counted as a parse error and dropped.
//!
//! The buffer holds the unterminated tail between `append` calls, so frames
//! split across chunk boundaries are emitted as soon as their terminating
//! newline arrives. Feeding the same bytes in any chunking produces the
//! same frames.
//!
//! A frame-size cap bounds the retained tail ([`DEFAULT_MAX_FRAME_BYTES`]);
//! exceeding it is fatal to the owning transport.

use serde_json::Value;

use crate::error::{McpError, Result};

/// Default cap on a single unterminated frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Outcome of decoding one candidate line.
enum LineOutcome {
    /// A JSON object frame.
    Frame(Value),
    /// An empty or whitespace-only line.
    Blank,
    /// Undecodable, non-UTF-8, or decoded to a non-object.
    Bad,
}

/// Decode one candidate line. Blank lines are skipped; only JSON objects
/// qualify as frames.
fn decode_line(line: &[u8]) -> LineOutcome {
    let text = match std::str::from_utf8(line) {
        Ok(t) => t.trim(),
        Err(_) => return LineOutcome::Bad,
    };
    if text.is_empty() {
        return LineOutcome::Blank;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => LineOutcome::Frame(value),
        Ok(other) => {
            tracing::debug!("message buffer: dropping non-object frame: {other}");
            LineOutcome::Bad
        }
        Err(e) => {
            tracing::debug!("message buffer: dropping undecodable line: {e}");
            LineOutcome::Bad
        }
    }
}

/// Reassembles newline-delimited JSON frames from arbitrary byte chunks.
///
/// # Examples
///
/// ```
/// use mcpkit::buffer::MessageBuffer;
///
/// let mut buf = MessageBuffer::new();
/// assert!(buf.append(b"{\"id\":1}").unwrap().is_empty());
/// let frames = buf.append(b"\n").unwrap();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0]["id"], 1);
/// ```
#[derive(Debug)]
pub struct MessageBuffer {
    /// Bytes after the last seen newline.
    tail: Vec<u8>,
    /// Cap on `tail` growth.
    max_frame_bytes: usize,
    /// Total bytes appended over the buffer's lifetime.
    bytes_in: u64,
    /// Total frames emitted.
    frames_out: u64,
    /// Lines that failed to decode or decoded to a non-object.
    parse_errors: u64,
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuffer {
    /// Create a buffer with the default frame cap.
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Create a buffer with an explicit frame cap.
    ///
    /// # Arguments
    ///
    /// * `max_frame_bytes` - Maximum length of an unterminated line before
    ///   [`MessageBuffer::append`] fails.
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            tail: Vec::new(),
            max_frame_bytes,
            bytes_in: 0,
            frames_out: 0,
            parse_errors: 0,
        }
    }

    /// Append a chunk and return every frame completed by it.
    ///
    /// The chunk is split on `\n`; every piece except the last is a
    /// candidate frame, and the last piece is retained until a later chunk
    /// terminates it. Candidates are trimmed, blank lines skipped, and
    /// decoded as JSON: objects become frames, anything else increments the
    /// parse-error counter and is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::FrameTooLarge`] when the retained tail exceeds
    /// the frame cap. The buffer is cleared; the owning transport should
    /// treat this as fatal.
    pub fn append(&mut self, chunk: &[u8]) -> Result<Vec<Value>> {
        self.bytes_in += chunk.len() as u64;
        self.tail.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(rel) = self.tail[start..].iter().position(|&b| b == b'\n') {
            let end = start + rel;
            match decode_line(&self.tail[start..end]) {
                LineOutcome::Frame(frame) => frames.push(frame),
                LineOutcome::Blank => {}
                LineOutcome::Bad => self.parse_errors += 1,
            }
            start = end + 1;
        }
        self.tail.drain(..start);
        self.frames_out += frames.len() as u64;

        if self.tail.len() > self.max_frame_bytes {
            let size = self.tail.len();
            self.tail.clear();
            return Err(McpError::FrameTooLarge {
                size,
                cap: self.max_frame_bytes,
            }
            .into());
        }

        Ok(frames)
    }

    /// Parse any retained bytes as a final frame, then clear the buffer.
    ///
    /// Called when the input stream ends, to recover a trailing frame whose
    /// terminating newline never arrived.
    pub fn reset(&mut self) -> Option<Value> {
        let tail = std::mem::take(&mut self.tail);
        match decode_line(&tail) {
            LineOutcome::Frame(frame) => {
                self.frames_out += 1;
                Some(frame)
            }
            LineOutcome::Blank => None,
            LineOutcome::Bad => {
                self.parse_errors += 1;
                None
            }
        }
    }

    /// Total bytes appended over the buffer's lifetime.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// Total frames emitted.
    pub fn frames_out(&self) -> u64 {
        self.frames_out
    }

    /// Lines dropped because they failed to decode to a JSON object.
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    /// Length of the currently retained, unterminated tail.
    pub fn pending_len(&self) -> usize {
        self.tail.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The boundary scenario from the transport contract: a frame split
    /// across three chunks emits `[]`, `[{"id":1}]`, `[{"id":2}]`.
    #[test]
    fn test_split_frame_reassembly_per_chunk_emissions() {
        let mut buf = MessageBuffer::new();

        let first = buf.append(br#"{"id":1}"#).unwrap();
        assert!(first.is_empty(), "no newline yet, nothing to emit");

        let second = buf.append(b"\n{\"id\":").unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["id"], 1);

        let third = buf.append(b"2}\n").unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0]["id"], 2);
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn test_chunking_is_equivalent_to_single_append() {
        let bytes = b"{\"a\":1}\n\n  {\"b\":2}\n[3]\n{\"c\":3}\n";

        let mut whole = MessageBuffer::new();
        let frames_whole = whole.append(bytes).unwrap();

        let mut split = MessageBuffer::new();
        let mut frames_split = Vec::new();
        for chunk in bytes.chunks(3) {
            frames_split.extend(split.append(chunk).unwrap());
        }

        assert_eq!(frames_whole, frames_split);
        assert_eq!(frames_whole.len(), 3);
        assert_eq!(whole.parse_errors(), split.parse_errors());
        assert_eq!(whole.parse_errors(), 1, "[3] is a non-object");
    }

    #[test]
    fn test_blank_lines_skipped_without_counting() {
        let mut buf = MessageBuffer::new();
        let frames = buf.append(b"\n   \n\t\n{\"x\":0}\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(buf.parse_errors(), 0);
    }

    #[test]
    fn test_non_object_json_counts_as_parse_error() {
        let mut buf = MessageBuffer::new();
        let frames = buf.append(b"42\n\"str\"\ntrue\n[1,2]\n").unwrap();
        assert!(frames.is_empty());
        assert_eq!(buf.parse_errors(), 4);
    }

    #[test]
    fn test_undecodable_line_counts_as_parse_error() {
        let mut buf = MessageBuffer::new();
        let frames = buf.append(b"{not json\n{\"ok\":true}\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(buf.parse_errors(), 1);
    }

    #[test]
    fn test_whitespace_around_frame_trimmed() {
        let mut buf = MessageBuffer::new();
        let frames = buf.append(b"  {\"id\":7}  \r\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["id"], 7);
    }

    #[test]
    fn test_reset_recovers_unterminated_final_frame() {
        let mut buf = MessageBuffer::new();
        assert!(buf.append(br#"{"last":true}"#).unwrap().is_empty());
        let frame = buf.reset().expect("trailing frame recovered");
        assert_eq!(frame["last"], true);
        assert_eq!(buf.pending_len(), 0);
        assert_eq!(buf.frames_out(), 1);
    }

    #[test]
    fn test_reset_on_garbage_tail_returns_none() {
        let mut buf = MessageBuffer::new();
        assert!(buf.append(b"garbage without newline").unwrap().is_empty());
        assert!(buf.reset().is_none());
        assert_eq!(buf.parse_errors(), 1);
    }

    #[test]
    fn test_reset_on_empty_buffer_returns_none() {
        let mut buf = MessageBuffer::new();
        assert!(buf.reset().is_none());
        assert_eq!(buf.parse_errors(), 0);
    }

    #[test]
    fn test_counters_track_bytes_and_frames() {
        let mut buf = MessageBuffer::new();
        buf.append(b"{\"a\":1}\n{\"b\":2}\n").unwrap();
        assert_eq!(buf.bytes_in(), 16);
        assert_eq!(buf.frames_out(), 2);
    }

    #[test]
    fn test_oversized_tail_fails_and_clears() {
        let mut buf = MessageBuffer::with_max_frame_bytes(8);
        let err = buf.append(b"0123456789abcdef").unwrap_err();
        assert!(err.to_string().contains("buffer cap"));
        assert_eq!(buf.pending_len(), 0);
    }

    #[test]
    fn test_terminated_frames_not_subject_to_cap() {
        // A long but newline-terminated line passes through; only the
        // retained tail is capped.
        let mut buf = MessageBuffer::with_max_frame_bytes(8);
        let frames = buf.append(b"{\"key\":\"0123456789abcdef\"}\n").unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk_preserve_order() {
        let mut buf = MessageBuffer::new();
        let frames = buf
            .append(b"{\"seq\":1}\n{\"seq\":2}\n{\"seq\":3}\n")
            .unwrap();
        let seqs: Vec<i64> = frames.iter().map(|f| f["seq"].as_i64().unwrap()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
