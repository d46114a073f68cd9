//! Typed messages of the decision stream and the shape-based classifier that
//! produces them from framed JSON values.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::StreamError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
/// One candidate the service weighed, with its justification.
pub struct DecisionOption {
    pub title: String,
    pub justification: String,
    pub is_chosen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
/// Release year as sent by the service: either a number or free text.
pub enum Year {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Final answer of an exchange.
pub struct DecisionResult {
    pub response: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_quote: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub character: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub movie: String,
    #[serde(default)]
    pub year: Option<Year>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<DecisionOption>,
}

/// Metadata the service leaves blank may arrive as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl DecisionResult {
    pub fn chosen(&self) -> Option<&DecisionOption> {
        self.options.iter().find(|option| option.is_chosen)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Ordered option labels carried by one intermediate message.
pub struct OptionsBatch {
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Enumerates supported `DecodedMessage` values.
pub enum DecodedMessage {
    OptionsBatch(OptionsBatch),
    Result(DecisionResult),
}

/// Truthiness as the service's original client saw it.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Shape-based message classifier.
///
/// A value whose `response` field is truthy is a [`DecisionResult`];
/// everything else is treated as an [`OptionsBatch`]. In strict mode a value
/// that is neither a result nor an array of strings is rejected.
pub struct Classifier {
    strict_shapes: bool,
}

impl Classifier {
    pub fn new(strict_shapes: bool) -> Self {
        Self { strict_shapes }
    }

    pub fn strict() -> Self {
        Self::new(true)
    }

    pub fn is_strict(&self) -> bool {
        self.strict_shapes
    }

    pub fn classify(&self, value: Value) -> Result<DecodedMessage, StreamError> {
        let has_response = value.get("response").is_some_and(is_truthy);
        if has_response {
            let result: DecisionResult = serde_json::from_value(value)
                .map_err(|error| StreamError::Parse(format!("invalid result message: {error}")))?;
            return Ok(DecodedMessage::Result(result));
        }

        match value {
            Value::Array(items) => self.classify_labels(items),
            other if self.strict_shapes => Err(StreamError::Protocol(format!(
                "expected an options array or a result object, got {}",
                json_kind(&other)
            ))),
            other => {
                warn!(
                    shape = json_kind(&other),
                    "message is neither a result nor an options array; treating as empty options batch"
                );
                Ok(DecodedMessage::OptionsBatch(OptionsBatch::default()))
            }
        }
    }

    fn classify_labels(&self, items: Vec<Value>) -> Result<DecodedMessage, StreamError> {
        let mut labels = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(label) => labels.push(label),
                other if self.strict_shapes => {
                    return Err(StreamError::Protocol(format!(
                        "options array contains a non-string {}",
                        json_kind(&other)
                    )));
                }
                other => labels.push(other.to_string()),
            }
        }
        Ok(DecodedMessage::OptionsBatch(OptionsBatch { labels }))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
