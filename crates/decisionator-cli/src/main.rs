mod bootstrap_helpers;
mod cli_args;

use std::io::{IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use decisionator_stream::render::{render_options, render_result, HighlightMarkers};
use decisionator_stream::{DecisionSession, ExchangePhase, ExchangeState};
use tokio::sync::watch;

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let query = cli.query_text();
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }

    let session =
        DecisionSession::connect(cli.client_config()).context("failed to build decision client")?;

    if cli.json {
        let state = session.ask(&query).await;
        let rendered =
            serde_json::to_string_pretty(&state).context("failed to serialize exchange state")?;
        println!("{rendered}");
        return Ok(state.phase == ExchangePhase::Completed);
    }

    let printer = tokio::spawn(print_options_as_they_arrive(session.subscribe()));
    let state = session.ask(&query).await;
    printer.await.context("option printer task failed")?;

    let markers = if cli.plain || !std::io::stdout().is_terminal() {
        HighlightMarkers::PLAIN
    } else {
        HighlightMarkers::ANSI_BOLD
    };
    Ok(print_outcome(&state, markers))
}

async fn print_options_as_they_arrive(mut updates: watch::Receiver<ExchangeState>) {
    let mut printed = 0usize;
    while updates.changed().await.is_ok() {
        let state = updates.borrow_and_update().clone();
        {
            let mut stdout = std::io::stdout().lock();
            for label in state.options_seen.iter().skip(printed) {
                let _ = writeln!(stdout, "option: {label}");
            }
            let _ = stdout.flush();
        }
        printed = state.options_seen.len();
        if state.phase.is_terminal() {
            break;
        }
    }
}

fn print_outcome(state: &ExchangeState, markers: HighlightMarkers) -> bool {
    let mut stdout = std::io::stdout().lock();
    if !state.options_seen.is_empty() {
        let _ = writeln!(stdout, "\nOptions:\n{}", render_options(state).trim_end());
    }

    match (&state.result, &state.error) {
        (Some(result), None) => {
            let _ = write!(stdout, "\n{}", render_result(result, markers));
            true
        }
        (_, Some(error)) => {
            let _ = stdout.flush();
            eprintln!("error: {error}");
            false
        }
        (None, None) => {
            eprintln!("error: exchange ended in phase {}", state.phase.as_str());
            false
        }
    }
}
