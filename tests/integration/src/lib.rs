//! Shared fixtures for cross-crate exchange tests.

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use decisionator_stream::{ChunkStream, ExchangeError, ExchangeState, QueryTransport};
use futures_util::{stream, StreamExt};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};

pub type Chunk = Result<Vec<u8>, ExchangeError>;

/// Hands out one channel-backed body per `open`, so tests decide exactly when
/// each chunk arrives.
pub struct ChannelTransport {
    bodies: AsyncMutex<VecDeque<mpsc::UnboundedReceiver<Chunk>>>,
    queries: AsyncMutex<Vec<String>>,
}

impl ChannelTransport {
    /// Builds a transport with `count` bodies plus the senders feeding them.
    pub fn new(count: usize) -> (Self, Vec<mpsc::UnboundedSender<Chunk>>) {
        let mut bodies = VecDeque::new();
        let mut senders = Vec::new();
        for _ in 0..count {
            let (tx, rx) = mpsc::unbounded_channel();
            bodies.push_back(rx);
            senders.push(tx);
        }
        let transport = Self {
            bodies: AsyncMutex::new(bodies),
            queries: AsyncMutex::new(Vec::new()),
        };
        (transport, senders)
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl QueryTransport for ChannelTransport {
    async fn open(&self, query: &str) -> Result<ChunkStream, ExchangeError> {
        self.queries.lock().await.push(query.to_string());
        let body = self
            .bodies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ExchangeError::transport("no scripted body left"))?;
        Ok(stream::unfold(body, |mut body| async move {
            body.recv().await.map(|chunk| (chunk, body))
        })
        .boxed())
    }
}

pub async fn wait_for(
    updates: &mut watch::Receiver<ExchangeState>,
    predicate: impl FnMut(&ExchangeState) -> bool,
) -> ExchangeState {
    tokio::time::timeout(Duration::from_secs(5), updates.wait_for(predicate))
        .await
        .expect("state reached before timeout")
        .expect("sender alive")
        .clone()
}

pub fn send(tx: &mpsc::UnboundedSender<Chunk>, text: &str) {
    tx.send(Ok(text.as_bytes().to_vec())).expect("body receiver alive");
}
