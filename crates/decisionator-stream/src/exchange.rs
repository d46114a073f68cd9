//! Lifecycle of one query/answer exchange.
//!
//! `Idle -> Submitting -> Streaming -> Completed | Failed`. Every submit bumps
//! the epoch; updates carrying an older [`ExchangeTicket`] are dropped so a
//! superseded exchange can never touch the state of a newer one.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{DecisionOption, DecisionResult, DecodedMessage, ExchangeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `ExchangePhase` values.
pub enum ExchangePhase {
    #[default]
    Idle,
    Submitting,
    Streaming,
    Completed,
    Failed,
}

impl ExchangePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Public struct `ExchangeState` observed by presentation layers.
pub struct ExchangeState {
    pub epoch: u64,
    pub query: Option<String>,
    pub phase: ExchangePhase,
    pub options_seen: Vec<String>,
    pub result: Option<DecisionResult>,
    pub error: Option<ExchangeError>,
}

impl ExchangeState {
    /// Whether `label` should still be shown as a live candidate.
    ///
    /// Every label is visible until a result arrives; afterwards only the
    /// label that equals the chosen option's title byte-for-byte.
    pub fn is_visible(&self, label: &str) -> bool {
        match &self.result {
            None => true,
            Some(result) => result
                .chosen()
                .is_some_and(|chosen| chosen.title == label),
        }
    }

    pub fn chosen_option(&self) -> Option<&DecisionOption> {
        self.result.as_ref().and_then(DecisionResult::chosen)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Proof of which exchange an update belongs to.
pub struct ExchangeTicket {
    epoch: u64,
}

impl ExchangeTicket {
    pub fn epoch(self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Default)]
/// Single writer of [`ExchangeState`].
pub struct ExchangeMachine {
    state: ExchangeState,
}

impl ExchangeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    pub fn is_current(&self, ticket: ExchangeTicket) -> bool {
        ticket.epoch == self.state.epoch
    }

    /// Starts a new exchange, discarding whatever the previous one left.
    pub fn submit(&mut self, query: impl Into<String>) -> ExchangeTicket {
        let epoch = self.state.epoch.wrapping_add(1);
        self.state = ExchangeState {
            epoch,
            query: Some(query.into()),
            phase: ExchangePhase::Submitting,
            ..ExchangeState::default()
        };
        info!(epoch, "exchange submitted");
        ExchangeTicket { epoch }
    }

    /// Returns to `Idle`; any in-flight exchange is superseded.
    pub fn reset(&mut self) {
        let epoch = self.state.epoch.wrapping_add(1);
        self.state = ExchangeState {
            epoch,
            ..ExchangeState::default()
        };
        debug!(epoch, "exchange reset");
    }

    /// Applies one classified message. Returns `false` when the message was
    /// ignored (stale ticket, idle or failed exchange).
    pub fn apply(&mut self, ticket: ExchangeTicket, message: DecodedMessage) -> bool {
        if !self.accepts(ticket) {
            return false;
        }

        let open = matches!(
            self.state.phase,
            ExchangePhase::Submitting | ExchangePhase::Streaming
        );
        match message {
            DecodedMessage::OptionsBatch(batch) if open => {
                self.state.phase = ExchangePhase::Streaming;
                self.state.options_seen.extend(batch.labels);
            }
            DecodedMessage::Result(result) if open => {
                self.state.phase = ExchangePhase::Completed;
                self.state.result = Some(result);
                info!(
                    epoch = ticket.epoch,
                    options = self.state.options_seen.len(),
                    "exchange completed"
                );
            }
            DecodedMessage::Result(_) if self.state.phase == ExchangePhase::Completed => {
                self.set_failed(ExchangeError::protocol("received a second result message"));
            }
            DecodedMessage::OptionsBatch(_) if self.state.phase == ExchangePhase::Completed => {
                self.set_failed(ExchangeError::protocol(
                    "received an options message after the result",
                ));
            }
            _ => return false,
        }
        true
    }

    /// Records a failure. No-op on stale tickets or already-failed exchanges.
    pub fn fail(&mut self, ticket: ExchangeTicket, error: ExchangeError) -> bool {
        if !self.accepts(ticket) || self.state.phase == ExchangePhase::Idle {
            return false;
        }
        self.set_failed(error);
        true
    }

    /// Signals that the stream closed normally.
    pub fn close(&mut self, ticket: ExchangeTicket) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        match self.state.phase {
            ExchangePhase::Submitting | ExchangePhase::Streaming => {
                self.set_failed(ExchangeError::protocol(
                    "stream closed before a result message arrived",
                ));
                true
            }
            ExchangePhase::Idle | ExchangePhase::Completed | ExchangePhase::Failed => false,
        }
    }

    fn accepts(&self, ticket: ExchangeTicket) -> bool {
        if !self.is_current(ticket) {
            debug!(
                stale = ticket.epoch,
                current = self.state.epoch,
                "dropping update from superseded exchange"
            );
            return false;
        }
        self.state.phase != ExchangePhase::Failed
    }

    fn set_failed(&mut self, error: ExchangeError) {
        warn!(epoch = self.state.epoch, %error, "exchange failed");
        self.state.phase = ExchangePhase::Failed;
        self.state.error = Some(error);
    }
}
