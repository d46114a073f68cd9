use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use tracing::debug;

use crate::{
    request_id::{new_request_id, REQUEST_ID_HEADER},
    ClientError, DecisionClientConfig, ExchangeError,
};

/// Raw body chunks in arrival order. Chunk boundaries carry no meaning.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, ExchangeError>>;

#[async_trait]
/// Trait contract for `QueryTransport` behavior.
///
/// Opens one exchange with the decision service and hands back its body.
pub trait QueryTransport: Send + Sync {
    async fn open(&self, query: &str) -> Result<ChunkStream, ExchangeError>;
}

#[derive(Serialize)]
struct AskBody<'a> {
    query: &'a str,
}

#[derive(Debug, Clone)]
/// Public struct `DecisionClient` speaking to the streaming `/ask` endpoint.
pub struct DecisionClient {
    client: reqwest::Client,
    config: DecisionClientConfig,
}

impl DecisionClient {
    pub fn new(config: DecisionClientConfig) -> Result<Self, ClientError> {
        let base = config.api_base.trim().to_ascii_lowercase();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::InvalidApiBase(config.api_base.clone()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_str("text/event-stream, application/json")?);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms.max(1)));
        if config.request_timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.request_timeout_ms));
        }
        let client = builder.build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DecisionClientConfig {
        &self.config
    }
}

#[async_trait]
impl QueryTransport for DecisionClient {
    async fn open(&self, query: &str) -> Result<ChunkStream, ExchangeError> {
        let url = self.config.ask_url();
        let request_id = new_request_id();
        debug!(%url, %request_id, "opening decision stream");

        let response = self
            .client
            .post(&url)
            .header(REQUEST_ID_HEADER, request_id)
            .json(&AskBody { query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::Request {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ExchangeError::from))
            .boxed())
    }
}
