//! Plain-text rendering shared by front ends.

use std::fmt::Write as _;

use crate::{compute_alignment, AlignmentSpan, DecisionResult, ExchangeState};

pub const CHOSEN_MARKER: &str = " | CHOSEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Text placed around the aligned span of the response.
pub struct HighlightMarkers {
    pub open: &'static str,
    pub close: &'static str,
}

impl HighlightMarkers {
    pub const PLAIN: Self = Self {
        open: "[[",
        close: "]]",
    };
    pub const ANSI_BOLD: Self = Self {
        open: "\u{1b}[1m",
        close: "\u{1b}[0m",
    };
}

/// Wraps `span` of `text` in `markers`. Out-of-range spans leave `text`
/// untouched.
pub fn highlight(text: &str, span: Option<AlignmentSpan>, markers: HighlightMarkers) -> String {
    let Some(span) = span else {
        return text.to_string();
    };
    let (Some(before), Some(inner), Some(after)) = (
        text.get(..span.start),
        span.slice(text),
        text.get(span.end..),
    ) else {
        return text.to_string();
    };
    format!("{before}{}{inner}{}{after}", markers.open, markers.close)
}

/// One line per seen label; labels no longer visible are bracketed.
pub fn render_options(state: &ExchangeState) -> String {
    let mut rendered = String::new();
    for label in &state.options_seen {
        if state.is_visible(label) {
            let _ = writeln!(rendered, "  {label}");
        } else {
            let _ = writeln!(rendered, "  ({label})");
        }
    }
    rendered
}

pub fn render_result(result: &DecisionResult, markers: HighlightMarkers) -> String {
    let span = compute_alignment(&result.response, &result.original_quote);
    let year = result
        .year
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    let mut rendered = String::new();
    let _ = writeln!(
        rendered,
        "Response: {}",
        highlight(&result.response, span, markers)
    );
    let _ = writeln!(rendered, "Original dialog: {}", result.original_quote);
    let _ = writeln!(rendered, "Character: {}", result.character);
    let _ = writeln!(rendered, "Movie: {}", result.movie);
    let _ = writeln!(rendered, "Year: {year}");
    let _ = writeln!(rendered, "Justifications:");
    for option in &result.options {
        let marker = if option.is_chosen { CHOSEN_MARKER } else { "" };
        let _ = writeln!(
            rendered,
            "  {}: {}{marker}",
            option.title, option.justification
        );
    }
    rendered
}
