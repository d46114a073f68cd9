//! Incremental UTF-8 reassembly for transport chunks.
//!
//! Chunk boundaries carry no meaning: a multi-byte code point may straddle
//! two chunks. The assembler emits the longest decodable prefix and carries
//! the incomplete tail into the next push.

use crate::StreamError;

#[derive(Debug, Default)]
/// Public struct `Utf8Assembler` used by the decoder pipeline.
pub struct Utf8Assembler {
    carry: Vec<u8>,
    consumed: usize,
}

impl Utf8Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back because they end inside a code point.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Appends `chunk` and returns every character that is now complete.
    ///
    /// Bytes that can never become valid UTF-8 fail immediately; bytes that
    /// are only truncated stay buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Result<String, StreamError> {
        self.carry.extend_from_slice(chunk);

        let valid = match std::str::from_utf8(&self.carry) {
            Ok(_) => self.carry.len(),
            Err(error) => {
                if let Some(invalid_len) = error.error_len() {
                    return Err(StreamError::Decode {
                        offset: self.consumed + error.valid_up_to(),
                        detail: format!("{invalid_len} byte(s) do not form a code point"),
                    });
                }
                error.valid_up_to()
            }
        };

        let tail = self.carry.split_off(valid);
        let head = std::mem::replace(&mut self.carry, tail);
        self.consumed += head.len();
        String::from_utf8(head).map_err(|error| StreamError::Decode {
            offset: self.consumed,
            detail: error.to_string(),
        })
    }

    /// Signals end of stream. Any carried bytes are an unfinished code point.
    pub fn finish(&mut self) -> Result<(), StreamError> {
        if self.carry.is_empty() {
            return Ok(());
        }
        let trailing = std::mem::take(&mut self.carry);
        Err(StreamError::Decode {
            offset: self.consumed,
            detail: format!(
                "stream closed inside a multi-byte code point ({} trailing byte(s))",
                trailing.len()
            ),
        })
    }
}
