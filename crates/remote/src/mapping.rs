//! Wire types for the chat-completions endpoint and validation of the task
//! payload the model returns.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use quickadd_core::{ParseSource, ParsedTask, Priority};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;

const SYSTEM_PROMPT: &str = "You extract a single task from a user's sentence. \
Reply with one JSON object and nothing else, using exactly these keys: \
\"title\" (string, the task with assignment, priority and date phrases removed), \
\"assignee\" (string or null), \
\"dueDate\" (local date-time formatted YYYY-MM-DDTHH:MM:SS), \
\"timeSpecified\" (boolean, true only if the sentence states a time of day), \
\"priority\" (one of \"P1\", \"P2\", \"P3\", \"P4\"; P1 urgent, P2 high, P3 normal, P4 low; use P3 when unstated), \
\"priorityReason\" (short string or null). \
Resolve relative dates against the current date-time given by the user. \
A bare weekday means its next occurrence after today. \
When no date is stated use today; when no time is stated use 17:00:00.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

/// Task fields as the model reports them, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub title: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<String>,
    pub time_specified: Option<bool>,
    pub priority: Option<String>,
    pub priority_reason: Option<String>,
}

pub fn build_request(model: &str, text: &str, now: NaiveDateTime) -> ChatRequest {
    let user = format!(
        "Current date-time: {} ({}).\nTask: {}",
        now.format("%Y-%m-%dT%H:%M:%S"),
        now.format("%A"),
        text.trim()
    );

    ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user,
            },
        ],
        temperature: 0.0,
        response_format: ResponseFormat {
            kind: "json_object".to_string(),
        },
    }
}

/// Pull the task payload out of the first choice and validate it.
pub fn map_response(body: ChatResponse, default_time: NaiveTime) -> Result<ParsedTask, RemoteError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| RemoteError::Malformed("no choices returned".to_string()))?;

    let payload: TaskPayload = serde_json::from_str(strip_code_fence(&content))
        .map_err(|err| RemoteError::Malformed(format!("content is not a task object: {err}")))?;

    validate_payload(payload, default_time)
}

pub fn validate_payload(payload: TaskPayload, default_time: NaiveTime) -> Result<ParsedTask, RemoteError> {
    let title = non_blank(payload.title)
        .ok_or_else(|| RemoteError::Malformed("missing title".to_string()))?;

    let raw_priority = payload
        .priority
        .ok_or_else(|| RemoteError::Malformed("missing priority".to_string()))?;
    let priority: Priority = raw_priority
        .parse()
        .map_err(|err| RemoteError::Malformed(format!("{err}")))?;

    let time_specified = payload
        .time_specified
        .ok_or_else(|| RemoteError::Malformed("missing timeSpecified".to_string()))?;

    let raw_due = non_blank(payload.due_date)
        .ok_or_else(|| RemoteError::Malformed("missing dueDate".to_string()))?;
    let (due_date, has_clock) = parse_due(&raw_due, default_time)
        .ok_or_else(|| RemoteError::Malformed(format!("unreadable dueDate '{raw_due}'")))?;

    Ok(ParsedTask {
        title,
        assignee: non_blank(payload.assignee),
        due_date,
        time_specified: time_specified && has_clock,
        priority,
        priority_reason: non_blank(payload.priority_reason),
        source: ParseSource::Ai,
    })
}

/// Returns the local date-time and whether the value carried a clock time.
fn parse_due(raw: &str, default_time: NaiveTime) -> Option<(NaiveDateTime, bool)> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some((parsed.naive_local(), true));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some((parsed, true));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| (date.and_time(default_time), false))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
