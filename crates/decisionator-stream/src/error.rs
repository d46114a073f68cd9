use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures raised by the assembler/framer/classifier pipeline.
pub enum StreamError {
    #[error("invalid UTF-8 at byte {offset}: {detail}")]
    Decode { offset: usize, detail: String },
    #[error("malformed message: {0}")]
    Parse(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ErrorKind` values.
pub enum ErrorKind {
    Transport,
    Decode,
    Parse,
    Protocol,
    Request,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Failure recorded on an exchange. Cloned into every published state snapshot.
pub enum ExchangeError {
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("decode error: {message}")]
    Decode { message: String },
    #[error("parse error: {message}")]
    Parse { message: String },
    #[error("protocol error: {message}")]
    Protocol { message: String },
    #[error("service returned non-success status {status}: {body}")]
    Request { status: u16, body: String },
}

impl ExchangeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Request { .. } => ErrorKind::Request,
        }
    }
}

impl From<StreamError> for ExchangeError {
    fn from(error: StreamError) -> Self {
        let message = error.to_string();
        match error {
            StreamError::Decode { .. } => Self::Decode { message },
            StreamError::Parse(_) => Self::Parse { message },
            StreamError::Protocol(_) => Self::Protocol { message },
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(error: reqwest::Error) -> Self {
        Self::transport(error.to_string())
    }
}

#[derive(Debug, Error)]
/// Construction-time failures of the HTTP client.
pub enum ClientError {
    #[error("invalid api base '{0}': expected an http(s) URL")]
    InvalidApiBase(String),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}
