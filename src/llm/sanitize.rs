//! Turns arbitrary model text into a fully populated [`Recommendation`].
//!
//! Nothing a model returns is trusted: the JSON is located heuristically,
//! every field is coerced, and anything missing or malformed is replaced by a
//! fallback. A recommendation is never rejected for being incomplete.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::error::ProviderError;
use crate::context::RecommendationContext;

/// Maximum entries kept in each list field.
pub const MAX_LIST_ITEMS: usize = 10;
/// Maximum top signals reused as fallback evidence.
const FALLBACK_EVIDENCE_ITEMS: usize = 8;

const FALLBACK_NAME: &str = "Signal-Driven Recommendation";
const FALLBACK_PROBLEM: &str =
    "Based on current signals, users have unresolved friction that should be prioritized.";
const FALLBACK_UI: &[&str] = &["Improve the primary user flow for the highest-friction moments."];
const FALLBACK_DATA: &[&str] = &["Add tracking for recommendation impact and outcome changes."];
const FALLBACK_WORKFLOW: &[&str] =
    &["Define iteration goals -> implement update -> measure behavioral change."];
const FALLBACK_TASKS: &[&str] = &[
    "Draft implementation scope and acceptance criteria.",
    "Implement targeted UX and workflow updates.",
    "Instrument impact metrics and validate behavior shift.",
];

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("fenced block pattern is valid")
});

/// The fixed-shape feature recommendation returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub name: String,
    pub problem: String,
    pub ui: Vec<String>,
    pub data: Vec<String>,
    pub workflow: Vec<String>,
    pub tasks: Vec<String>,
    pub evidence: Vec<String>,
    pub themes: Vec<String>,
    /// Within `1..=99` when present.
    pub confidence: Option<u8>,
    /// Within `1..=100` when present.
    pub score: Option<u8>,
}

/// Locate the JSON object inside raw model text.
///
/// Tried in order: the whole text when it already looks like an object, the
/// first fenced code block, then the span from the first `{` to the last `}`.
pub fn extract_json_text(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with('{') && raw.ends_with('}') {
        return Some(raw);
    }

    if let Some(inner) = FENCED_BLOCK
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
    {
        return Some(inner);
    }

    let first = raw.find('{')?;
    let last = raw.rfind('}')?;
    (last > first).then(|| &raw[first..=last])
}

/// Extract, parse and sanitize a raw model answer.
pub fn parse_recommendation(
    raw: &str,
    context: &RecommendationContext,
) -> Result<Recommendation, ProviderError> {
    let json_text = extract_json_text(raw).ok_or(ProviderError::NoJson)?;
    let value: Value =
        serde_json::from_str(json_text).map_err(|e| ProviderError::InvalidJson(e.to_string()))?;
    Ok(sanitize_recommendation(&value, context))
}

/// Build a [`Recommendation`] from parsed model output, substituting
/// fallbacks wherever the output is missing or unusable.
pub fn sanitize_recommendation(value: &Value, context: &RecommendationContext) -> Recommendation {
    let empty = serde_json::Map::new();
    let obj = value.as_object().unwrap_or(&empty);

    let evidence_fallback: Vec<String> = context
        .top_signals
        .iter()
        .take(FALLBACK_EVIDENCE_ITEMS)
        .cloned()
        .collect();

    Recommendation {
        name: text_or(obj.get("name"), FALLBACK_NAME),
        problem: text_or(obj.get("problem"), FALLBACK_PROBLEM),
        ui: list_or(obj.get("ui"), &owned(FALLBACK_UI)),
        data: list_or(obj.get("data"), &owned(FALLBACK_DATA)),
        workflow: list_or(obj.get("workflow"), &owned(FALLBACK_WORKFLOW)),
        tasks: list_or(obj.get("tasks"), &owned(FALLBACK_TASKS)),
        evidence: list_or(obj.get("evidence"), &evidence_fallback),
        themes: list_or(obj.get("themes"), &context.themes),
        confidence: bounded_int(obj.get("confidence"), 1, 99),
        score: bounded_int(obj.get("score"), 1, 100),
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Text form of a JSON scalar; `None` for null.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn text_or(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(value_text)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn list_or(value: Option<&Value>, fallback: &[String]) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(value_text)
            .filter(|s| !s.is_empty())
            .take(MAX_LIST_ITEMS)
            .collect(),
        _ => Vec::new(),
    };
    if items.is_empty() {
        fallback.iter().take(MAX_LIST_ITEMS).cloned().collect()
    } else {
        items
    }
}

/// Round and clamp a numeric (or numeric string) field.
fn bounded_int(value: Option<&Value>, min: u8, max: u8) -> Option<u8> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    let clamped = n.round().clamp(f64::from(min), f64::from(max));
    Some(clamped as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Mode, build_context};
    use serde_json::json;

    fn ctx() -> RecommendationContext {
        build_context(
            "What next?",
            Mode::Balanced,
            &["Usage: export crash on large files", "Interview: export is slow"],
            &[],
        )
    }

    #[test]
    fn test_extract_whole_object() {
        assert_eq!(extract_json_text("  {\"a\":1} "), Some("{\"a\":1}"));
    }

    #[test]
    fn test_extract_fenced_block() {
        let raw = "Here you go:\n```json\n{\"name\":\"X\"}\n```\nThanks";
        assert_eq!(extract_json_text(raw), Some("{\"name\":\"X\"}"));
        let upper = "```JSON\n{\"name\":\"Y\"}```";
        assert_eq!(extract_json_text(upper), Some("{\"name\":\"Y\"}"));
    }

    #[test]
    fn test_extract_brace_span() {
        let raw = "Sure! {\"name\": \"X\", \"ui\": [\"a\"]} hope that helps";
        assert_eq!(extract_json_text(raw), Some("{\"name\": \"X\", \"ui\": [\"a\"]}"));
    }

    #[test]
    fn test_extract_nothing() {
        assert_eq!(extract_json_text(""), None);
        assert_eq!(extract_json_text("no json here"), None);
        assert_eq!(extract_json_text("} backwards {"), None);
    }

    #[test]
    fn test_fenced_and_plain_parse_identically() {
        let plain = r#"{"name":"Bulk export","ui":["Export button"],"confidence":72}"#;
        let fenced = format!("```json\n{plain}\n```");
        let context = ctx();
        assert_eq!(
            parse_recommendation(plain, &context).expect("plain parses"),
            parse_recommendation(&fenced, &context).expect("fenced parses")
        );
    }

    #[test]
    fn test_parse_errors() {
        let context = ctx();
        assert!(matches!(
            parse_recommendation("nothing useful", &context),
            Err(ProviderError::NoJson)
        ));
        assert!(matches!(
            parse_recommendation("{not: valid}", &context),
            Err(ProviderError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_empty_object_gets_every_fallback() {
        let context = ctx();
        let rec = sanitize_recommendation(&json!({}), &context);
        assert_eq!(rec.name, FALLBACK_NAME);
        assert_eq!(rec.problem, FALLBACK_PROBLEM);
        assert!(!rec.ui.is_empty());
        assert!(!rec.data.is_empty());
        assert!(!rec.workflow.is_empty());
        assert_eq!(rec.tasks.len(), 3);
        assert_eq!(rec.evidence, context.top_signals);
        assert_eq!(rec.themes, context.themes);
        assert_eq!(rec.confidence, None);
        assert_eq!(rec.score, None);
    }

    #[test]
    fn test_non_object_json_treated_as_empty() {
        let rec = sanitize_recommendation(&json!([1, 2, 3]), &ctx());
        assert_eq!(rec.name, FALLBACK_NAME);
    }

    #[test]
    fn test_lists_are_trimmed_filtered_and_capped() {
        let many: Vec<String> = (0..15).map(|i| format!(" item {i} ")).collect();
        let rec = sanitize_recommendation(
            &json!({
                "ui": many,
                "data": ["  ", null, 42, true, " keep "],
                "workflow": "not a list",
                "tasks": [],
            }),
            &ctx(),
        );
        assert_eq!(rec.ui.len(), MAX_LIST_ITEMS);
        assert_eq!(rec.ui[0], "item 0");
        assert_eq!(rec.data, vec!["42", "true", "keep"]);
        assert_eq!(rec.workflow, owned(FALLBACK_WORKFLOW));
        assert_eq!(rec.tasks, owned(FALLBACK_TASKS));
    }

    #[test]
    fn test_blank_name_falls_back() {
        let rec = sanitize_recommendation(&json!({"name": "   ", "problem": " Real "}), &ctx());
        assert_eq!(rec.name, FALLBACK_NAME);
        assert_eq!(rec.problem, "Real");
    }

    #[test]
    fn test_confidence_and_score_clamped() {
        let context = ctx();
        let rec = sanitize_recommendation(&json!({"confidence": 500, "score": -3}), &context);
        assert_eq!(rec.confidence, Some(99));
        assert_eq!(rec.score, Some(1));

        let rec = sanitize_recommendation(&json!({"confidence": 72.6, "score": "88"}), &context);
        assert_eq!(rec.confidence, Some(73));
        assert_eq!(rec.score, Some(88));

        let rec = sanitize_recommendation(&json!({"confidence": 0, "score": 100}), &context);
        assert_eq!(rec.confidence, Some(1));
        assert_eq!(rec.score, Some(100));
    }

    #[test]
    fn test_non_numeric_confidence_is_absent() {
        let rec = sanitize_recommendation(
            &json!({"confidence": "high", "score": {"value": 3}}),
            &ctx(),
        );
        assert_eq!(rec.confidence, None);
        assert_eq!(rec.score, None);
    }

    #[test]
    fn test_serializes_absent_scores_as_null() {
        let rec = sanitize_recommendation(&json!({}), &ctx());
        let value = serde_json::to_value(&rec).expect("serializes");
        assert!(value["confidence"].is_null());
        assert!(value["tasks"].is_array());
    }
}
