//! Strict parsing of model output.
//!
//! Every parser returns a [`ParseOutcome`] instead of failing at runtime; a
//! `ParseError` sends the caller down the fallback path.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::grading::{RoundGrading, grade_from_scores};
use crate::rubric::{RoundType, rubric_for};
use crate::session::Source;

/// Tagged result of parsing model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    ParseError(String),
}

#[cfg(test)]
impl<T> ParseOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            ParseOutcome::Parsed(value) => Some(value),
            ParseOutcome::ParseError(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// Reasoning/internal tags some models wrap around their thinking.
const REASONING_TAGS: &[&str] = &[
    "thinking",
    "think",
    "reflection",
    "reflect",
    "internal",
    "reasoning",
    "thought",
    "scratch",
    "scratchpad",
    "plan",
    "analysis",
];

static REASONING_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REASONING_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag)).ok())
        .collect()
});

static ORPHAN_TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"</?[\w]+[^>]*>").ok());

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Strip reasoning blocks, stray tags, and markdown emphasis from an argument.
pub fn sanitize_response(response: &str) -> String {
    let mut result = response.to_string();

    for re in REASONING_BLOCKS.iter() {
        result = re.replace_all(&result, "").into_owned();
    }
    if let Some(re) = ORPHAN_TAG.as_ref() {
        result = re.replace_all(&result, "").into_owned();
    }

    result = result.replace('*', "").replace('#', "");

    if let Some(re) = WHITESPACE.as_ref() {
        result = re.replace_all(&result, " ").into_owned();
    }

    result.trim().to_string()
}

/// Find the first balanced `{...}` block in `text`, skipping code fences and prose.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_object(text: &str) -> Result<serde_json::Map<String, Value>, String> {
    let json = extract_json_object(text).ok_or_else(|| "no JSON object in response".to_string())?;
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("response JSON is not an object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

/// Parse judge output of the form `{"scores": {"<criterion>": n, ...}, "feedback": "..."}`.
pub fn parse_grading(text: &str, round_type: RoundType) -> ParseOutcome<RoundGrading> {
    let object = match parse_object(text) {
        Ok(object) => object,
        Err(reason) => return ParseOutcome::ParseError(reason),
    };

    let Some(Value::Object(scores)) = object.get("scores") else {
        return ParseOutcome::ParseError("missing 'scores' object".to_string());
    };

    let by_key: HashMap<String, &Value> = scores
        .iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect();

    let mut raw = HashMap::new();
    for criterion in rubric_for(round_type) {
        let Some(value) = by_key.get(&criterion.name.to_lowercase()) else {
            return ParseOutcome::ParseError(format!("missing score for '{}'", criterion.name));
        };
        let Some(score) = value.as_f64() else {
            return ParseOutcome::ParseError(format!(
                "score for '{}' is not a number",
                criterion.name
            ));
        };
        raw.insert(criterion.name.to_string(), score);
    }

    let feedback = object
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match grade_from_scores(round_type, &raw, feedback, Source::Ai) {
        Ok(grading) => ParseOutcome::Parsed(grading),
        Err(e) => ParseOutcome::ParseError(e.to_string()),
    }
}

/// Judge verdict on a proposed topic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicVerdict {
    #[serde(alias = "isValid")]
    pub valid: bool,
    #[serde(default)]
    pub refined_topic: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Parse topic-validation output of the form `{"valid": bool, "refinedTopic": "...", "reason": "..."}`.
pub fn parse_topic_check(text: &str) -> ParseOutcome<TopicVerdict> {
    let object = match parse_object(text) {
        Ok(object) => object,
        Err(reason) => return ParseOutcome::ParseError(reason),
    };

    let verdict: TopicVerdict = match serde_json::from_value(Value::Object(object)) {
        Ok(verdict) => verdict,
        Err(e) => return ParseOutcome::ParseError(format!("unexpected topic verdict shape: {}", e)),
    };

    let refined_missing = verdict
        .refined_topic
        .as_deref()
        .is_none_or(|t| t.trim().is_empty());
    if verdict.valid && refined_missing {
        return ParseOutcome::ParseError("valid topic without a refinedTopic".to_string());
    }

    ParseOutcome::Parsed(verdict)
}
