use log::warn;

use crate::models::chat::StreamChunk;

const DONE_SENTINEL: &str = "[DONE]";
const DATA_PREFIX: &str = "data: ";

/// Outcome of decoding one newline-delimited frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Incremental content extracted from the first choice's delta.
    Delta(String),
    /// The stream-termination sentinel.
    Done,
    /// Blank line or other frame that carries no payload.
    Skip,
    /// Payload that failed to parse as JSON; dropped, never aborts the stream.
    Malformed,
}

/// Decodes a single frame. Pure: callers own all accumulation state.
pub fn parse_frame(line: &str) -> FrameOutcome {
    let line = line.trim();
    if line.is_empty() {
        return FrameOutcome::Skip;
    }
    if line == DONE_SENTINEL {
        return FrameOutcome::Done;
    }
    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line).trim();
    if payload == DONE_SENTINEL {
        return FrameOutcome::Done;
    }
    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => {
            let delta = chunk
                .choices
                .first()
                .and_then(|choice| choice.delta.content.clone())
                .unwrap_or_default();
            FrameOutcome::Delta(delta)
        }
        Err(e) => {
            warn!("dropping malformed stream frame: {} (payload: {})", e, payload);
            FrameOutcome::Malformed
        }
    }
}

/// Incremental decoding state for one in-flight stream-consumption call.
///
/// Owns the undecoded UTF-8 tail (multi-byte characters split across chunk
/// boundaries), the unterminated line buffer, and the accumulated response
/// text. The text only ever grows; a malformed frame leaves it untouched.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    pending: Vec<u8>,
    line_buf: String,
    text: String,
    terminated: bool,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of raw bytes, returning a full-buffer snapshot for
    /// each frame that parsed successfully, in frame order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let decoded = self.take_decodable();
        self.line_buf.push_str(&decoded);

        let mut snapshots = Vec::new();
        while let Some(pos) = self.line_buf.find('\n') {
            let line: String = self.line_buf.drain(..=pos).collect();
            if self.terminated {
                continue;
            }
            match parse_frame(&line) {
                FrameOutcome::Delta(delta) => {
                    self.text.push_str(&delta);
                    snapshots.push(self.text.clone());
                }
                FrameOutcome::Done => self.terminated = true,
                FrameOutcome::Skip | FrameOutcome::Malformed => {}
            }
        }
        snapshots
    }

    /// Processes any trailing unterminated line once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.terminated || self.line_buf.trim().is_empty() {
            self.line_buf.clear();
            return None;
        }
        let line = std::mem::take(&mut self.line_buf);
        match parse_frame(&line) {
            FrameOutcome::Delta(delta) => {
                self.text.push_str(&delta);
                Some(self.text.clone())
            }
            FrameOutcome::Done => {
                self.terminated = true;
                None
            }
            FrameOutcome::Skip | FrameOutcome::Malformed => None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    // Splits `pending` at the largest prefix that is valid UTF-8, keeping an
    // incomplete trailing sequence for the next chunk. Invalid bytes in the
    // middle are dropped so one bad sequence cannot wedge the decoder.
    fn take_decodable(&mut self) -> String {
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or(""));
                    match e.error_len() {
                        // Incomplete multi-byte char at the end of the chunk.
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(bad) => {
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_frame(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}\n",
            serde_json::to_string(content).unwrap()
        )
    }

    #[test]
    fn parse_frame_extracts_delta_content() {
        let outcome = parse_frame("data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}");
        assert_eq!(outcome, FrameOutcome::Delta("hi".to_string()));
    }

    #[test]
    fn parse_frame_defaults_missing_content_to_empty() {
        let outcome = parse_frame("data: {\"choices\":[{\"delta\":{}}]}");
        assert_eq!(outcome, FrameOutcome::Delta(String::new()));
    }

    #[test]
    fn parse_frame_handles_unprefixed_payload() {
        let outcome = parse_frame("{\"choices\":[{\"delta\":{\"content\":\"x\"}}]}");
        assert_eq!(outcome, FrameOutcome::Delta("x".to_string()));
    }

    #[test]
    fn sentinel_never_parses_with_or_without_whitespace() {
        assert_eq!(parse_frame("[DONE]"), FrameOutcome::Done);
        assert_eq!(parse_frame("  [DONE]  "), FrameOutcome::Done);
        assert_eq!(parse_frame("data: [DONE]"), FrameOutcome::Done);
        assert_eq!(parse_frame("data: [DONE] "), FrameOutcome::Done);
    }

    #[test]
    fn blank_lines_skip() {
        assert_eq!(parse_frame(""), FrameOutcome::Skip);
        assert_eq!(parse_frame("   "), FrameOutcome::Skip);
    }

    #[test]
    fn malformed_json_is_malformed() {
        assert_eq!(parse_frame("data: {not json"), FrameOutcome::Malformed);
    }

    #[test]
    fn accumulates_across_arbitrary_chunk_boundaries() {
        let body = format!("{}{}{}data: [DONE]\n", delta_frame("Hel"), delta_frame("lo, "), delta_frame("world"));
        let bytes = body.as_bytes();

        // Re-split the same byte stream at every possible single boundary.
        for split in 1..bytes.len() {
            let mut acc = FrameAccumulator::new();
            let mut snapshots = acc.push_chunk(&bytes[..split]);
            snapshots.extend(acc.push_chunk(&bytes[split..]));
            acc.finish();
            assert_eq!(acc.text(), "Hello, world", "split at {}", split);
            assert_eq!(snapshots.len(), 3);
        }
    }

    #[test]
    fn multibyte_char_split_across_chunks_decodes_intact() {
        let body = delta_frame("héllo ✓");
        let bytes = body.as_bytes();
        for split in 1..bytes.len() {
            let mut acc = FrameAccumulator::new();
            let mut snapshots = acc.push_chunk(&bytes[..split]);
            snapshots.extend(acc.push_chunk(&bytes[split..]));
            assert_eq!(acc.text(), "héllo ✓", "split at {}", split);
        }
    }

    #[test]
    fn malformed_frame_leaves_buffer_unchanged() {
        let with_bad = format!("{}data: {{broken\n{}", delta_frame("a"), delta_frame("b"));
        let without_bad = format!("{}{}", delta_frame("a"), delta_frame("b"));

        let mut acc1 = FrameAccumulator::new();
        acc1.push_chunk(with_bad.as_bytes());
        let mut acc2 = FrameAccumulator::new();
        acc2.push_chunk(without_bad.as_bytes());

        assert_eq!(acc1.text(), acc2.text());
        assert_eq!(acc1.text(), "ab");
    }

    #[test]
    fn snapshots_are_monotonically_non_shrinking() {
        let body = format!("{}{}{}", delta_frame("a"), delta_frame("bc"), delta_frame("def"));
        let mut acc = FrameAccumulator::new();
        let snapshots = acc.push_chunk(body.as_bytes());
        assert_eq!(snapshots.len(), 3);
        let mut prev = 0;
        for snap in &snapshots {
            assert!(snap.len() >= prev);
            prev = snap.len();
        }
        assert_eq!(snapshots.last().unwrap(), "abcdef");
    }

    #[test]
    fn sentinel_produces_no_snapshot_and_halts_later_frames() {
        let body = format!("data: [DONE]\n{}", delta_frame("late"));
        let mut acc = FrameAccumulator::new();
        let snapshots = acc.push_chunk(body.as_bytes());
        assert!(snapshots.is_empty());
        assert_eq!(acc.text(), "");
    }

    #[test]
    fn trailing_unterminated_frame_is_flushed_on_finish() {
        let mut acc = FrameAccumulator::new();
        acc.push_chunk(delta_frame("one ").as_bytes());
        // No trailing newline on the final frame.
        acc.push_chunk(b"data: {\"choices\":[{\"delta\":{\"content\":\"two\"}}]}");
        let snap = acc.finish();
        assert_eq!(snap.as_deref(), Some("one two"));
        assert_eq!(acc.into_text(), "one two");
    }
}
