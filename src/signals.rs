//! Signal analysis: tokenization, source classification and severity scoring.
//!
//! Every function here is pure. The context builder composes them into a
//! [`RecommendationContext`](crate::context::RecommendationContext).

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Tokens ignored when extracting themes.
const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "because", "before", "being", "between", "could",
    "every", "from", "have", "into", "just", "more", "most", "over", "that", "their", "there",
    "these", "this", "those", "very", "what", "when", "where", "which", "with", "would", "users",
    "user", "team", "teams",
];

/// Terms that mark a signal line as urgent. Each counts at most once per line.
const SEVERITY_TERMS: &[&str] = &[
    "incident", "error", "crash", "block", "failure", "urgent", "drop", "churn", "latency", "slow",
    "risk",
];

/// Shortest token kept by [`tokenize`].
const MIN_TOKEN_LEN: usize = 3;

static UPLOAD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(json|csv|txt|md):\s").expect("upload pattern is a valid regex")
});

static PERCENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+%").expect("percent pattern is a valid regex"));

/// Where a signal line came from, inferred from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    /// `Interview: ...`
    Interview,
    /// `Usage: ...`
    Usage,
    /// `Market: ...`
    Market,
    /// An excerpt from an uploaded file, e.g. `notes.md: ...`.
    Upload,
    /// Anything else.
    Other,
}

/// Per-category signal counts.
///
/// Field order is fixed; it is also the key order of the JSON rendering that
/// ends up in the user prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceBreakdown {
    pub interview: usize,
    pub usage: usize,
    pub market: usize,
    pub upload: usize,
    pub other: usize,
}

impl SourceBreakdown {
    /// Count the category of every line.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut breakdown = Self::default();
        for line in lines {
            breakdown.record(classify_source(line.as_ref()));
        }
        breakdown
    }

    fn record(&mut self, category: SourceCategory) {
        let slot = match category {
            SourceCategory::Interview => &mut self.interview,
            SourceCategory::Usage => &mut self.usage,
            SourceCategory::Market => &mut self.market,
            SourceCategory::Upload => &mut self.upload,
            SourceCategory::Other => &mut self.other,
        };
        *slot += 1;
    }

    /// Sum of all categories.
    #[must_use]
    pub fn total(&self) -> usize {
        self.interview + self.usage + self.market + self.upload + self.other
    }
}

impl fmt::Display for SourceBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_serde_error| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Split text into lowercase alphanumeric tokens, dropping short tokens and
/// stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.trim()
        .to_lowercase()
        .split(|c: char| !c.is_ascii_lowercase() && !c.is_ascii_digit())
        .filter(|token| token.len() >= MIN_TOKEN_LEN && !STOP_WORDS.contains(token))
        .map(ToString::to_string)
        .collect()
}

/// Infer the source category of a signal line. Rules are checked in order and
/// the first match wins.
pub fn classify_source(line: &str) -> SourceCategory {
    let lower = line.trim().to_lowercase();
    if lower.starts_with("interview:") {
        SourceCategory::Interview
    } else if lower.starts_with("usage:") {
        SourceCategory::Usage
    } else if lower.starts_with("market:") {
        SourceCategory::Market
    } else if UPLOAD_PATTERN.is_match(&lower) {
        SourceCategory::Upload
    } else {
        SourceCategory::Other
    }
}

/// Count distinct severity terms in the line, plus one for a percentage.
pub fn severity_score(line: &str) -> u32 {
    let lower = line.trim().to_lowercase();
    let terms = SEVERITY_TERMS
        .iter()
        .filter(|term| lower.contains(*term))
        .count() as u32;
    terms + u32::from(PERCENT_PATTERN.is_match(&lower))
}

/// Most frequent tokens across all signals.
///
/// Ties keep the order in which tokens were first seen, so the result only
/// depends on the signal order.
pub fn extract_themes<S: AsRef<str>>(signals: &[S], limit: usize) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for signal in signals {
        for token in tokenize(signal.as_ref()) {
            let count = counts.entry(token.clone()).or_insert(0);
            if *count == 0 {
                order.push(token);
            }
            *count += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|token| {
            let count = counts.get(&token).copied().unwrap_or_default();
            (token, count)
        })
        .collect();
    // `sort_by` is stable, which is what keeps first-seen order on ties.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.into_iter().take(limit).map(|(token, _)| token).collect()
}
