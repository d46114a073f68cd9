use serde_json::Value;
use tracing::debug;

use crate::{Classifier, DecodedMessage, JsonFramer, StreamError, Utf8Assembler};

#[derive(Debug, Default)]
/// Bytes in, classified messages out.
///
/// Composes [`Utf8Assembler`], [`JsonFramer`] and [`Classifier`]. After the
/// first error the decoder is poisoned and ignores further input.
pub struct MessageDecoder {
    assembler: Utf8Assembler,
    framer: JsonFramer,
    classifier: Classifier,
    poisoned: bool,
    framed: usize,
}

impl MessageDecoder {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            ..Self::default()
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Number of messages produced so far.
    pub fn framed(&self) -> usize {
        self.framed
    }

    /// Feeds one transport chunk. Messages completed before an error are
    /// still appended to `out`.
    pub fn push(&mut self, chunk: &[u8], out: &mut Vec<DecodedMessage>) -> Result<(), StreamError> {
        if self.poisoned {
            return Ok(());
        }
        let outcome = self.push_inner(chunk, out);
        self.poisoned = outcome.is_err();
        outcome
    }

    /// Signals end of stream and flushes anything left.
    pub fn finish(&mut self, out: &mut Vec<DecodedMessage>) -> Result<(), StreamError> {
        if self.poisoned {
            return Ok(());
        }
        let outcome = self.finish_inner(out);
        self.poisoned = outcome.is_err();
        outcome
    }

    fn push_inner(&mut self, chunk: &[u8], out: &mut Vec<DecodedMessage>) -> Result<(), StreamError> {
        let text = self.assembler.push(chunk)?;
        if text.is_empty() {
            return Ok(());
        }
        let mut values = Vec::new();
        let framed = self.framer.push(&text, &mut values);
        self.classify_into(values, out)?;
        framed
    }

    fn finish_inner(&mut self, out: &mut Vec<DecodedMessage>) -> Result<(), StreamError> {
        self.assembler.finish()?;
        let mut values = Vec::new();
        let framed = self.framer.finish(&mut values);
        self.classify_into(values, out)?;
        framed
    }

    fn classify_into(
        &mut self,
        values: Vec<Value>,
        out: &mut Vec<DecodedMessage>,
    ) -> Result<(), StreamError> {
        for value in values {
            let message = self.classifier.classify(value)?;
            self.framed += 1;
            debug!(
                index = self.framed,
                kind = message_kind(&message),
                "framed message"
            );
            out.push(message);
        }
        Ok(())
    }
}

fn message_kind(message: &DecodedMessage) -> &'static str {
    match message {
        DecodedMessage::OptionsBatch(_) => "options_batch",
        DecodedMessage::Result(_) => "result",
    }
}

/// Decodes a complete byte sequence delivered as `chunks`.
pub fn decode_chunks<I, B>(
    classifier: Classifier,
    chunks: I,
) -> Result<Vec<DecodedMessage>, StreamError>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut decoder = MessageDecoder::new(classifier);
    let mut out = Vec::new();
    for chunk in chunks {
        decoder.push(chunk.as_ref(), &mut out)?;
    }
    decoder.finish(&mut out)?;
    Ok(out)
}
