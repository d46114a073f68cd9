//! Pull loop that drives one exchange at a time.
//!
//! The session owns the only [`ExchangeMachine`] and republishes its state on
//! a watch channel after every change. Each `next().await` on the chunk
//! stream is the sole suspension point of an exchange.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    Classifier, ClientError, DecisionClient, DecisionClientConfig, DecodedMessage, ExchangeError,
    ExchangeMachine, ExchangePhase, ExchangeState, ExchangeTicket, MessageDecoder, QueryTransport,
};

#[derive(Debug, Clone)]
/// Shared handle to the exchange state. Cloning shares the same machine.
pub struct SharedExchange {
    machine: Arc<Mutex<ExchangeMachine>>,
    updates: Arc<watch::Sender<ExchangeState>>,
}

impl Default for SharedExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedExchange {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(ExchangeState::default());
        Self {
            machine: Arc::new(Mutex::new(ExchangeMachine::new())),
            updates: Arc::new(updates),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExchangeState> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> ExchangeState {
        self.with_machine(|machine| machine.state().clone())
    }

    pub fn submit(&self, query: &str) -> ExchangeTicket {
        self.mutate(|machine| (machine.submit(query), true))
    }

    pub fn reset(&self) {
        self.mutate(|machine| {
            machine.reset();
            ((), true)
        });
    }

    pub fn is_current(&self, ticket: ExchangeTicket) -> bool {
        self.with_machine(|machine| machine.is_current(ticket))
    }

    /// Applies messages in order. Returns `false` once the ticket no longer
    /// owns the state or its exchange has failed; the caller should stop
    /// reading.
    pub fn apply_all(&self, ticket: ExchangeTicket, messages: Vec<DecodedMessage>) -> bool {
        self.mutate(|machine| {
            let mut changed = false;
            for message in messages {
                changed |= machine.apply(ticket, message);
            }
            let live =
                machine.is_current(ticket) && machine.state().phase != ExchangePhase::Failed;
            (live, changed)
        })
    }

    pub fn fail(&self, ticket: ExchangeTicket, error: ExchangeError) -> bool {
        self.mutate(|machine| {
            let changed = machine.fail(ticket, error);
            (changed, changed)
        })
    }

    pub fn close(&self, ticket: ExchangeTicket) -> bool {
        self.mutate(|machine| {
            let changed = machine.close(ticket);
            (changed, changed)
        })
    }

    fn with_machine<R>(&self, f: impl FnOnce(&ExchangeMachine) -> R) -> R {
        let machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        f(&machine)
    }

    /// Runs `f` under the lock and publishes a snapshot when it reports a
    /// change. Publishing happens under the lock so readers never observe
    /// snapshots out of order.
    fn mutate<R>(&self, f: impl FnOnce(&mut ExchangeMachine) -> (R, bool)) -> R {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        let (outcome, changed) = f(&mut machine);
        if changed {
            self.updates.send_replace(machine.state().clone());
        }
        outcome
    }
}

/// Feeds `stream` through a fresh decoder into `shared` until the stream
/// ends, the pipeline fails, or the exchange is superseded.
pub async fn pump_stream<S, B>(
    shared: &SharedExchange,
    ticket: ExchangeTicket,
    classifier: Classifier,
    mut stream: S,
) where
    S: Stream<Item = Result<B, ExchangeError>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut decoder = MessageDecoder::new(classifier);
    let mut chunks = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                shared.fail(ticket, error);
                return;
            }
        };
        chunks += 1;

        let mut messages = Vec::new();
        let decoded = decoder.push(chunk.as_ref(), &mut messages);
        if !shared.apply_all(ticket, messages) {
            debug!(epoch = ticket.epoch(), chunks, "exchange superseded or failed; dropping stream");
            return;
        }
        if let Err(error) = decoded {
            shared.fail(ticket, error.into());
            return;
        }
    }

    let mut messages = Vec::new();
    let finished = decoder.finish(&mut messages);
    if !shared.apply_all(ticket, messages) {
        return;
    }
    match finished {
        Ok(()) => shared.close(ticket),
        Err(error) => shared.fail(ticket, error.into()),
    };
    debug!(
        epoch = ticket.epoch(),
        chunks,
        messages = decoder.framed(),
        "decision stream closed"
    );
}

/// Public struct `DecisionSession`: one caller, one exchange at a time.
pub struct DecisionSession<T> {
    transport: T,
    shared: SharedExchange,
    classifier: Classifier,
}

impl DecisionSession<DecisionClient> {
    /// Builds the HTTP transport from `config` and applies its classifier
    /// settings to the session.
    pub fn connect(config: DecisionClientConfig) -> Result<Self, ClientError> {
        let strict_shapes = config.strict_shapes;
        Ok(Self::new(DecisionClient::new(config)?).with_strict_shapes(strict_shapes))
    }
}

impl<T: QueryTransport> DecisionSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            shared: SharedExchange::new(),
            classifier: Classifier::default(),
        }
    }

    pub fn with_strict_shapes(mut self, strict_shapes: bool) -> Self {
        self.classifier = Classifier::new(strict_shapes);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn shared(&self) -> &SharedExchange {
        &self.shared
    }

    pub fn subscribe(&self) -> watch::Receiver<ExchangeState> {
        self.shared.subscribe()
    }

    pub fn state(&self) -> ExchangeState {
        self.shared.snapshot()
    }

    pub fn reset(&self) {
        self.shared.reset();
    }

    /// Submits `query` and streams the answer to completion.
    ///
    /// Supersedes any exchange already in flight on this session. Returns the
    /// state as it stands when this exchange stops; if a newer submission
    /// took over meanwhile, that newer state is returned.
    pub async fn ask(&self, query: &str) -> ExchangeState {
        let ticket = self.shared.submit(query);
        info!(epoch = ticket.epoch(), query_len = query.len(), "asking decision service");

        match self.transport.open(query).await {
            Ok(stream) => pump_stream(&self.shared, ticket, self.classifier, stream).await,
            Err(error) => {
                self.shared.fail(ticket, error);
            }
        }

        self.shared.snapshot()
    }
}
