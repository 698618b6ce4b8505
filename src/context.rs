//! Recommendation context: the prompt-ready view of one request's signals.
//!
//! [`build_context`] is deterministic. Rebuilding from the same question,
//! mode, signals and history yields byte-identical prompts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signals::{SourceBreakdown, extract_themes, severity_score};

/// Signals beyond this count are dropped.
pub const MAX_SIGNALS: usize = 240;
/// Number of themes surfaced in the prompt.
pub const THEME_LIMIT: usize = 8;
/// Number of severity-ranked signals enumerated in the prompt.
pub const TOP_SIGNAL_LIMIT: usize = 12;
/// Number of prior runs summarized in the prompt.
pub const HISTORY_LIMIT: usize = 3;

/// Question used when the caller sends a blank one.
pub const DEFAULT_QUESTION: &str = "What should we build next?";

const SYSTEM_PROMPT: &str = "\
You are a senior AI product strategist for a tool called Cursor for Product Managers.
Goal: convert raw customer/usage/market signals into a concrete feature recommendation.
You must return STRICT JSON only (no markdown, no prose around JSON).
JSON schema:
{
  \"name\": \"string\",
  \"problem\": \"string\",
  \"ui\": [\"string\", \"...\"],
  \"data\": [\"string\", \"...\"],
  \"workflow\": [\"string\", \"...\"],
  \"tasks\": [\"string\", \"...\"],
  \"evidence\": [\"string\", \"...\"],
  \"themes\": [\"string\", \"...\"],
  \"confidence\": 0-100 number
}
Requirements:
- Ground the output in provided signals.
- Keep recommendations implementation-ready and specific.
- Keep UI/data/workflow/task arrays non-empty.";

/// Quality/speed tradeoff requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Accuracy-oriented providers first.
    Safe,
    /// Default ordering.
    #[default]
    Balanced,
    /// Low-latency providers first.
    Fast,
}

impl Mode {
    /// Parse a mode name. Unknown or blank input maps to [`Mode::Balanced`].
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "safe" => Self::Safe,
            "fast" => Self::Fast,
            _ => Self::Balanced,
        }
    }

    /// Lowercase name as it appears in prompts and responses.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Balanced => "balanced",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a previous recommendation run supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Name of the top recommendation of that run.
    pub top_name: Option<String>,
    /// When it ran, in whatever format the caller uses.
    pub timestamp: Option<String>,
}

/// Everything the router needs to ask a model for a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationContext {
    pub question: String,
    pub mode: Mode,
    /// Trimmed, non-empty lines in source order.
    pub signals: Vec<String>,
    pub themes: Vec<String>,
    pub source_breakdown: SourceBreakdown,
    /// Highest-severity lines first; equal severities keep source order.
    pub top_signals: Vec<String>,
    pub severity_signal_count: usize,
    pub history_highlights: Vec<String>,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Build the context for one recommendation request.
pub fn build_context<S: AsRef<str>>(
    question: &str,
    mode: Mode,
    signals: &[S],
    history: &[HistoryEntry],
) -> RecommendationContext {
    let question = match question.trim() {
        "" => DEFAULT_QUESTION.to_string(),
        q => q.to_string(),
    };

    let signals: Vec<String> = signals
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .take(MAX_SIGNALS)
        .map(ToString::to_string)
        .collect();

    let themes = extract_themes(&signals, THEME_LIMIT);
    let source_breakdown = SourceBreakdown::from_lines(&signals);

    let mut scored: Vec<(&String, u32)> = signals
        .iter()
        .map(|line| (line, severity_score(line)))
        .collect();
    let severity_signal_count = scored.iter().filter(|(_, score)| *score > 0).count();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    let top_signals: Vec<String> = scored
        .into_iter()
        .take(TOP_SIGNAL_LIMIT)
        .map(|(line, _)| line.clone())
        .collect();

    let history_highlights = summarize_history(history);

    let user_prompt = render_user_prompt(&UserPromptParts {
        question: &question,
        mode,
        signal_count: signals.len(),
        source_breakdown,
        severity_signal_count,
        themes: &themes,
        history_highlights: &history_highlights,
        top_signals: &top_signals,
    });

    RecommendationContext {
        question,
        mode,
        signals,
        themes,
        source_breakdown,
        top_signals,
        severity_signal_count,
        history_highlights,
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt,
    }
}

fn summarize_history(history: &[HistoryEntry]) -> Vec<String> {
    history
        .iter()
        .take(HISTORY_LIMIT)
        .enumerate()
        .map(|(idx, entry)| {
            let name = non_blank(entry.top_name.as_deref()).unwrap_or("unknown");
            let when = non_blank(entry.timestamp.as_deref()).unwrap_or("recent");
            format!("{}. {name} ({when})", idx + 1)
        })
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

struct UserPromptParts<'a> {
    question: &'a str,
    mode: Mode,
    signal_count: usize,
    source_breakdown: SourceBreakdown,
    severity_signal_count: usize,
    themes: &'a [String],
    history_highlights: &'a [String],
    top_signals: &'a [String],
}

fn render_user_prompt(parts: &UserPromptParts<'_>) -> String {
    let themes = if parts.themes.is_empty() {
        "n/a".to_string()
    } else {
        parts.themes.join(", ")
    };
    let highlights = if parts.history_highlights.is_empty() {
        "n/a".to_string()
    } else {
        parts.history_highlights.join(" | ")
    };

    let mut lines = vec![
        format!("Question: {}", parts.question),
        format!("Mode: {}", parts.mode),
        format!("Signal count: {}", parts.signal_count),
        format!("Source breakdown: {}", parts.source_breakdown),
        format!("Severity-tagged signal count: {}", parts.severity_signal_count),
        format!("Top themes: {themes}"),
        format!("Recent run highlights: {highlights}"),
        "Signals:".to_string(),
    ];
    lines.extend(
        parts
            .top_signals
            .iter()
            .enumerate()
            .map(|(idx, line)| format!("{}. {line}", idx + 1)),
    );
    lines.join("\n")
}
