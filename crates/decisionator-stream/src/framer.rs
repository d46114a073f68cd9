//! Splits assembled text into complete JSON values.
//!
//! The service does not delimit messages. Values may arrive back-to-back,
//! separated by whitespace, or cut at any byte, so the framer keeps the
//! unconsumed remainder and retries once more text arrives. A cheap bracket
//! scan decides when a retry can possibly succeed, so a value split into many
//! small chunks is parsed once rather than once per chunk.

use serde_json::Value;

use crate::StreamError;

const LEFTOVER_PREVIEW_CHARS: usize = 64;

#[derive(Debug, Default)]
/// Public struct `JsonFramer` used by the decoder pipeline.
pub struct JsonFramer {
    buffer: String,
    scan: ScanState,
}

#[derive(Debug, Default)]
struct ScanState {
    offset: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text received but not yet framed into a value.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Appends `text` and moves every completed value into `out`.
    ///
    /// Values framed before a syntax error are still written to `out`.
    pub fn push(&mut self, text: &str, out: &mut Vec<Value>) -> Result<(), StreamError> {
        self.buffer.push_str(text);
        if !self.scan_for_boundary() {
            return Ok(());
        }
        let drained = self.drain(out, false);
        self.scan = ScanState::default();
        self.scan_for_boundary();
        drained
    }

    /// Frames whatever remains at stream close. Non-whitespace leftovers are
    /// a protocol violation; incomplete text is only an error at this point.
    pub fn finish(&mut self, out: &mut Vec<Value>) -> Result<(), StreamError> {
        self.scan = ScanState::default();
        self.drain(out, true)?;

        let leftover = self.buffer.trim();
        if leftover.is_empty() {
            self.buffer.clear();
            return Ok(());
        }

        let preview: String = leftover.chars().take(LEFTOVER_PREVIEW_CHARS).collect();
        let message = format!(
            "stream closed with {} byte(s) of unparsed text: {preview}",
            leftover.len()
        );
        self.buffer.clear();
        Err(StreamError::Protocol(message))
    }

    /// Advances the scan over unseen bytes. Returns `true` once the scan sits
    /// at top level outside a string, where a value may have completed.
    fn scan_for_boundary(&mut self) -> bool {
        let scan = &mut self.scan;
        for &byte in &self.buffer.as_bytes()[scan.offset..] {
            scan.offset += 1;
            if scan.in_string {
                match byte {
                    _ if scan.escaped => scan.escaped = false,
                    b'\\' => scan.escaped = true,
                    b'"' => scan.in_string = false,
                    _ => continue,
                }
            } else {
                match byte {
                    b'"' => scan.in_string = true,
                    b'[' | b'{' => scan.depth += 1,
                    b']' | b'}' => scan.depth = scan.depth.saturating_sub(1),
                    _ => {}
                }
            }
            if scan.depth == 0 && !scan.in_string {
                return true;
            }
        }
        false
    }

    fn drain(&mut self, out: &mut Vec<Value>, at_close: bool) -> Result<(), StreamError> {
        let mut consumed = 0;
        let mut failure = None;
        {
            let mut values = serde_json::Deserializer::from_str(&self.buffer).into_iter::<Value>();
            loop {
                match values.next() {
                    None => {
                        // Only whitespace remained; drop it.
                        consumed = values.byte_offset();
                        break;
                    }
                    Some(Ok(value)) => {
                        let end = values.byte_offset();
                        // `12` may be the head of `123`; wait for a delimiter.
                        if value.is_number() && end == self.buffer.len() && !at_close {
                            break;
                        }
                        out.push(value);
                        consumed = end;
                    }
                    Some(Err(error)) if error.is_eof() => break,
                    Some(Err(error)) => {
                        failure = Some(StreamError::Parse(error.to_string()));
                        break;
                    }
                }
            }
        }
        self.buffer.drain(..consumed);

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::JsonFramer;
    use crate::StreamError;

    fn frame_all(pieces: &[&str]) -> Result<Vec<Value>, StreamError> {
        let mut framer = JsonFramer::new();
        let mut out = Vec::new();
        for piece in pieces {
            framer.push(piece, &mut out)?;
        }
        framer.finish(&mut out)?;
        Ok(out)
    }

    #[test]
    fn unit_frames_back_to_back_values_without_delimiters() {
        let values = frame_all(&["[\"A\",\"B\"]{\"response\":\"go\"}[\"C\"]"]).expect("frames");
        assert_eq!(
            values,
            vec![json!(["A", "B"]), json!({"response": "go"}), json!(["C"])]
        );
    }

    #[test]
    fn functional_buffers_partial_value_until_it_completes() {
        let mut framer = JsonFramer::new();
        let mut out = Vec::new();

        framer.push("[\"A\",\"B\"", &mut out).expect("partial");
        assert!(out.is_empty());
        assert_eq!(framer.buffered(), "[\"A\",\"B\"");

        framer.push("]\n  {\"resp", &mut out).expect("first complete");
        assert_eq!(out, vec![json!(["A", "B"])]);
        assert_eq!(framer.buffered(), "{\"resp");
    }

    #[test]
    fn functional_whitespace_between_and_after_values_is_ignored() {
        let values = frame_all(&["  [\"A\"]\n", "\r\n\t", "[\"B\"]  \n"]).expect("frames");
        assert_eq!(values, vec![json!(["A"]), json!(["B"])]);
    }

    #[test]
    fn regression_trailing_number_is_held_until_delimited() {
        let mut framer = JsonFramer::new();
        let mut out = Vec::new();
        framer.push("12", &mut out).expect("number head");
        assert!(out.is_empty());
        framer.push("3 ", &mut out).expect("number tail");
        assert_eq!(out, vec![json!(123)]);

        let values = frame_all(&["7"]).expect("number at close");
        assert_eq!(values, vec![json!(7)]);
    }

    #[test]
    fn regression_nested_value_in_small_chunks_waits_for_its_closing_bracket() {
        let text = "{\"response\":\"a ] } [ { \\\" b\",\"options\":[{\"title\":\"A\"}]}[\"C\"]";
        let mut framer = JsonFramer::new();
        let mut out = Vec::new();
        let first_close = text.find("}[").expect("end of first value") + 1;

        for (index, piece) in text.as_bytes().chunks(3).enumerate() {
            let piece = std::str::from_utf8(piece).expect("ascii");
            framer.push(piece, &mut out).expect("chunk");
            if (index + 1) * 3 < first_close {
                assert!(out.is_empty());
                assert_eq!(framer.scan.offset, framer.buffered().len());
                assert!(framer.scan.depth > 0 || framer.scan.in_string);
            }
        }
        framer.finish(&mut out).expect("close");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["response"], "a ] } [ { \" b");
        assert_eq!(out[1], json!(["C"]));
    }

    #[test]
    fn regression_unparsed_text_at_close_is_protocol_error() {
        let error = frame_all(&["{\"resp"]).expect_err("incomplete value at close");
        match error {
            StreamError::Protocol(message) => {
                assert!(message.contains("unparsed text"));
                assert!(message.contains("{\"resp"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn regression_syntax_error_keeps_values_framed_before_it() {
        let mut framer = JsonFramer::new();
        let mut out = Vec::new();
        let error = framer
            .push("[\"A\"] [\"B\",,]", &mut out)
            .expect_err("double comma");
        assert!(matches!(error, StreamError::Parse(_)));
        assert_eq!(out, vec![json!(["A"])]);
    }
}
