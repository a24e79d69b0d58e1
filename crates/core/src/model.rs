use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Ordered urgency levels, `P1` being the most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    P1,
    P2,
    #[default]
    P3,
    P4,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
            Priority::P4 => "P4",
        }
    }

    /// Display text shown next to the badge in previews.
    pub fn label(&self) -> &'static str {
        match self {
            Priority::P1 => "P1 - Urgent",
            Priority::P2 => "P2 - High",
            Priority::P3 => "P3 - Normal",
            Priority::P4 => "P4 - Low",
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Priority::P1),
            2 => Some(Priority::P2),
            3 => Some(Priority::P3),
            4 => Some(Priority::P4),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "P1" => Ok(Priority::P1),
            "P2" => Ok(Priority::P2),
            "P3" => Ok(Priority::P3),
            "P4" => Ok(Priority::P4),
            other => Err(ModelError::UnknownPriority(other.to_string())),
        }
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        const VARIANTS: [Priority; 4] = [Priority::P1, Priority::P2, Priority::P3, Priority::P4];
        &VARIANTS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let alias = match self {
            Priority::P1 => "p1",
            Priority::P2 => "p2",
            Priority::P3 => "p3",
            Priority::P4 => "p4",
        };
        Some(clap::builder::PossibleValue::new(self.as_str()).alias(alias))
    }
}

/// Lifecycle state of a captured task. Capture only ever creates pending
/// tasks; later states belong to whatever stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which extractor produced a [`ParsedTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseSource {
    Ai,
    Local,
}

impl ParseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseSource::Ai => "ai",
            ParseSource::Local => "local",
        }
    }
}

impl fmt::Display for ParseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transient extraction result. Recomputed on every settled input change and
/// never persisted; `due_date` is local wall-clock time and not yet corrected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub due_date: NaiveDateTime,
    pub time_specified: bool,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_reason: Option<String>,
    pub source: ParseSource,
}

impl ParsedTask {
    /// Long-form date, e.g. `March 1, 2025`.
    pub fn due_date_formatted(&self) -> String {
        self.due_date.format("%B %-d, %Y").to_string()
    }

    /// Clock time such as `2:30 PM`, present only when the input named a time.
    pub fn due_time_formatted(&self) -> Option<String> {
        self.time_specified
            .then(|| self.due_date.format("%-I:%M %p").to_string())
    }
}

/// Finalized record handed to whatever stores tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub assignee: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn parsed(time_specified: bool) -> ParsedTask {
        ParsedTask {
            title: "Write proposal".into(),
            assignee: None,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            time_specified,
            priority: Priority::P3,
            priority_reason: None,
            source: ParseSource::Local,
        }
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("p2".parse::<Priority>().unwrap(), Priority::P2);
        assert_eq!(" P4 ".parse::<Priority>().unwrap(), Priority::P4);
        assert!("P5".parse::<Priority>().is_err());
        assert!(Priority::P1 < Priority::P4);
    }

    #[test]
    fn status_renders_as_pending() {
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
        assert_eq!(
            serde_json::to_value(TaskStatus::Pending).unwrap(),
            serde_json::json!("pending")
        );
    }

    #[test]
    fn formatted_strings_follow_time_flag() {
        let with_time = parsed(true);
        assert_eq!(with_time.due_date_formatted(), "March 1, 2025");
        assert_eq!(with_time.due_time_formatted().as_deref(), Some("2:30 PM"));
        assert_eq!(parsed(false).due_time_formatted(), None);
    }

    #[test]
    fn task_serializes_with_camel_case_iso_fields() {
        let created = DateTime::parse_from_rfc3339("2024-03-10T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let task = Task {
            id: "01HTEST".into(),
            title: "Write proposal".into(),
            assignee: Some("Sarah".into()),
            due_date: created,
            priority: Priority::P1,
            status: TaskStatus::Pending,
            created_at: created,
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["dueDate"], "2024-03-10T09:00:00Z");
        assert_eq!(value["createdAt"], "2024-03-10T09:00:00Z");
        assert_eq!(value["priority"], "P1");
        assert_eq!(value["status"], "pending");
    }
}
