use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_ASK_PATH: &str = "/ask";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Public struct `DecisionClientConfig` used by the HTTP transport.
pub struct DecisionClientConfig {
    pub api_base: String,
    pub ask_path: String,
    /// Whole-exchange deadline, streaming included. `0` disables it.
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Reject messages that are neither a result nor an array of strings.
    /// Applied to the session by `DecisionSession::connect`.
    pub strict_shapes: bool,
}

impl Default for DecisionClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ask_path: DEFAULT_ASK_PATH.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            strict_shapes: false,
        }
    }
}

impl DecisionClientConfig {
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn ask_url(&self) -> String {
        let base = self.api_base.trim().trim_end_matches('/');
        let path = self.ask_path.trim();
        if path.is_empty() {
            return base.to_string();
        }
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}
