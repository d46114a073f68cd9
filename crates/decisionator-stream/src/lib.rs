//! Incremental decoder for the streaming decision service.
//!
//! The service answers a query with zero or more option batches followed by
//! exactly one result, as back-to-back JSON values over a chunked body. This
//! crate reassembles those chunks, classifies the messages, tracks the
//! exchange lifecycle, and aligns the generated line with its reference
//! quote for highlighting.

mod align;
mod assembler;
mod client;
mod config;
mod decoder;
mod error;
mod exchange;
mod framer;
mod message;
pub mod render;
mod request_id;
mod session;

pub use align::{chars_match, compute_alignment, AlignmentSpan};
pub use assembler::Utf8Assembler;
pub use client::{ChunkStream, DecisionClient, QueryTransport};
pub use config::{
    DecisionClientConfig, DEFAULT_API_BASE, DEFAULT_ASK_PATH, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_REQUEST_TIMEOUT_MS,
};
pub use decoder::{decode_chunks, MessageDecoder};
pub use error::{ClientError, ErrorKind, ExchangeError, StreamError};
pub use exchange::{ExchangeMachine, ExchangePhase, ExchangeState, ExchangeTicket};
pub use framer::JsonFramer;
pub use message::{
    is_truthy, Classifier, DecisionOption, DecisionResult, DecodedMessage, OptionsBatch, Year,
};
pub use request_id::REQUEST_ID_HEADER;
pub use session::{pump_stream, DecisionSession, SharedExchange};
