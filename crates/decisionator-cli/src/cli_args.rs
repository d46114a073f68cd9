use clap::Parser;
use decisionator_stream::{
    DecisionClientConfig, DEFAULT_API_BASE, DEFAULT_ASK_PATH, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_REQUEST_TIMEOUT_MS,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "decisionator",
    about = "Ask the decision service and watch its answer stream in",
    version
)]
/// Public struct `Cli` for the `decisionator` binary.
pub struct Cli {
    #[arg(
        required = true,
        num_args = 1..,
        value_name = "QUERY",
        help = "Free-text question. Multiple words are joined with single spaces."
    )]
    pub query: Vec<String>,

    #[arg(
        long,
        env = "DECISIONATOR_API_BASE",
        default_value = DEFAULT_API_BASE,
        help = "Base URL of the decision service."
    )]
    pub api_base: String,

    #[arg(
        long,
        env = "DECISIONATOR_ASK_PATH",
        default_value = DEFAULT_ASK_PATH,
        help = "Path of the streaming ask endpoint, relative to --api-base."
    )]
    pub ask_path: String,

    #[arg(
        long,
        env = "DECISIONATOR_REQUEST_TIMEOUT_MS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_MS,
        help = "Deadline for the whole exchange, streaming included. 0 disables it."
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        env = "DECISIONATOR_CONNECT_TIMEOUT_MS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Deadline for establishing the connection."
    )]
    pub connect_timeout_ms: u64,

    #[arg(
        long,
        env = "DECISIONATOR_STRICT_SHAPES",
        help = "Fail the exchange on messages that are neither a result nor an array of strings."
    )]
    pub strict_shapes: bool,

    #[arg(long, help = "Print the final exchange state as JSON instead of text.")]
    pub json: bool,

    #[arg(
        long,
        help = "Never emit ANSI highlighting; mark the aligned span with [[ ]]."
    )]
    pub plain: bool,

    #[arg(short, long, help = "Log pipeline activity to stderr at debug level.")]
    pub verbose: bool,
}

impl Cli {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }

    pub fn client_config(&self) -> DecisionClientConfig {
        DecisionClientConfig {
            api_base: self.api_base.clone(),
            ask_path: self.ask_path.clone(),
            request_timeout_ms: self.request_timeout_ms,
            connect_timeout_ms: self.connect_timeout_ms,
            strict_shapes: self.strict_shapes,
        }
    }
}
