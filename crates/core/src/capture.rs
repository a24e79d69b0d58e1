use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use ulid::Ulid;

use crate::dates::correct_due_date;
use crate::error::CaptureError;
use crate::model::{ParsedTask, Priority, Task, TaskStatus};
use crate::parser::LocalExtractor;

/// Normalized submission from any front end. Explicit fields override what
/// was extracted from the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureInput {
    pub text: String,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
}

impl CaptureInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn require_text(&self) -> Result<(), CaptureError> {
        if self.text.trim().is_empty() {
            return Err(CaptureError::EmptyText);
        }
        Ok(())
    }

    fn apply_overrides(&self, mut parsed: ParsedTask) -> ParsedTask {
        if let Some(assignee) = self
            .assignee
            .as_ref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            parsed.assignee = Some(assignee.to_string());
        }
        if let Some(priority) = self.priority {
            if priority != parsed.priority {
                parsed.priority_reason = Some("set explicitly".to_string());
            }
            parsed.priority = priority;
        }
        parsed
    }
}

/// Build the submission-ready [`Task`] from the last settled parse.
///
/// When no parse has settled yet the text is run through `fallback`
/// synchronously. The due date is corrected against `now` and converted to
/// UTC through `now`'s time zone.
pub fn finalize_task<Tz: TimeZone>(
    input: &CaptureInput,
    parsed: Option<&ParsedTask>,
    fallback: &LocalExtractor,
    now: &DateTime<Tz>,
) -> Result<Task, CaptureError> {
    input.require_text()?;

    let local_now = now.naive_local();
    let parsed = match parsed {
        Some(parsed) => parsed.clone(),
        None => fallback.parse(&input.text, local_now),
    };
    let parsed = input.apply_overrides(parsed);

    let due_local = correct_due_date(parsed.due_date, local_now);
    let created_at = now.with_timezone(&Utc);
    let due_date = to_utc(&now.timezone(), due_local).unwrap_or(created_at);

    Ok(Task {
        id: Ulid::new().to_string(),
        title: parsed.title,
        assignee: parsed.assignee,
        due_date,
        priority: parsed.priority,
        status: TaskStatus::Pending,
        created_at,
    })
}

/// Local wall-clock time to UTC. Ambiguous times take the earlier instant and
/// times inside a DST gap move forward an hour.
fn to_utc<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}
