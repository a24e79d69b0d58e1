use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use quickadd_core::{AppConfig, CaptureError, CaptureInput, LocalExtractor, ParsedTask};
use quickadd_remote::RemoteExtractor;
use quickadd_session::{Orchestrator, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::cli::{AddArgs, CliCommand, ParseArgs, WatchArgs};

pub async fn execute<W: Write>(config: AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    match command {
        CliCommand::Parse(args) => handle_parse(config, &args, &mut writer).await,
        CliCommand::Add(args) => handle_add(config, &args, &mut writer).await,
        CliCommand::Watch(args) => handle_watch(config, &args, &mut writer).await,
    }
}

fn build_orchestrator(config: AppConfig, settle_window: Duration) -> Result<Orchestrator> {
    let options = config.parse_options();
    let orchestrator = Orchestrator::new(LocalExtractor::new(options), settle_window, config.use_ai);
    if !config.use_ai {
        return Ok(orchestrator);
    }

    if !config.has_api_key() {
        info!("no API key configured, AI parses fall back to local rules");
    }
    let remote =
        RemoteExtractor::new(config.remote, options).context("failed to configure AI extractor")?;
    Ok(orchestrator.with_remote(Arc::new(remote)))
}

async fn handle_parse<W: Write>(config: AppConfig, args: &ParseArgs, writer: &mut W) -> Result<()> {
    let mut orchestrator = build_orchestrator(config, Duration::ZERO)?;
    orchestrator.input_changed(args.text.join(" "));
    let session = orchestrator.settle().await;
    let parsed = session.parsed().ok_or(CaptureError::EmptyText)?;

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, parsed)?;
        writeln!(writer)?;
    } else {
        writeln!(writer, "{}", Preview::new(parsed, session.ai_error()))?;
    }
    Ok(())
}

async fn handle_add<W: Write>(config: AppConfig, args: &AddArgs, writer: &mut W) -> Result<()> {
    let mut orchestrator = build_orchestrator(config, Duration::ZERO)?;
    let input = CaptureInput::from(args);
    input.require_text()?;

    orchestrator.input_changed(input.text.clone());
    orchestrator.settle().await;
    let task = orchestrator.submit(input, &Local::now())?;
    info!(id = task.id.as_str(), priority = %task.priority, "task captured");

    serde_json::to_writer_pretty(&mut *writer, &task)?;
    writeln!(writer)?;
    Ok(())
}

async fn handle_watch<W: Write>(config: AppConfig, args: &WatchArgs, writer: &mut W) -> Result<()> {
    let window = args
        .settle_ms
        .map(Duration::from_millis)
        .unwrap_or(config.settle_window);
    let mut orchestrator = build_orchestrator(config, window)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reported = None;

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("failed to read stdin")? {
                Some(line) => orchestrator.input_changed(line),
                None => break,
            },
            progressed = orchestrator.step(), if orchestrator.session().is_processing() => {
                if progressed {
                    report_settled(orchestrator.session(), &mut reported, writer)?;
                }
            }
        }
    }

    orchestrator.settle().await;
    report_settled(orchestrator.session(), &mut reported, writer)?;
    orchestrator.shutdown();
    Ok(())
}

/// Print the preview once per settled generation.
fn report_settled<W: Write>(session: &Session, reported: &mut Option<u64>, writer: &mut W) -> Result<()> {
    if !session.is_settled() || *reported == Some(session.generation()) {
        return Ok(());
    }
    if let Some(parsed) = session.parsed() {
        writeln!(writer, "{}", Preview::new(parsed, session.ai_error()))?;
        writer.flush()?;
    }
    *reported = Some(session.generation());
    Ok(())
}

struct Preview<'a> {
    parsed: &'a ParsedTask,
    ai_error: Option<&'a str>,
}

impl<'a> Preview<'a> {
    fn new(parsed: &'a ParsedTask, ai_error: Option<&'a str>) -> Self {
        Self { parsed, ai_error }
    }
}

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parsed = self.parsed;
        writeln!(f, "Title:     {}", parsed.title)?;
        if let Some(assignee) = &parsed.assignee {
            writeln!(f, "Assignee:  {assignee}")?;
        }
        match parsed.due_time_formatted() {
            Some(time) => writeln!(f, "Due:       {} at {time}", parsed.due_date_formatted())?,
            None => writeln!(f, "Due:       {}", parsed.due_date_formatted())?,
        }
        match &parsed.priority_reason {
            Some(reason) => writeln!(f, "Priority:  {} ({reason})", parsed.priority.label())?,
            None => writeln!(f, "Priority:  {}", parsed.priority.label())?,
        }
        write!(f, "Source:    {}", parsed.source)?;
        if let Some(error) = self.ai_error {
            write!(f, "\nNote:      AI unavailable, used local rules ({error})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use quickadd_core::{ParseSource, Priority};

    fn offline() -> AppConfig {
        AppConfig {
            use_ai: false,
            ..AppConfig::default()
        }
    }

    fn sample() -> ParsedTask {
        ParsedTask {
            title: "Write proposal".into(),
            assignee: Some("Sarah".into()),
            due_date: NaiveDate::from_ymd_opt(2024, 3, 8)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
            time_specified: true,
            priority: Priority::P1,
            priority_reason: Some("explicit P1 marker".into()),
            source: ParseSource::Local,
        }
    }

    #[test]
    fn preview_lists_every_field() {
        let task = sample();
        let rendered = Preview::new(&task, Some("request timed out")).to_string();
        assert_eq!(
            rendered,
            "Title:     Write proposal\n\
             Assignee:  Sarah\n\
             Due:       March 8, 2024 at 2:00 PM\n\
             Priority:  P1 - Urgent (explicit P1 marker)\n\
             Source:    local\n\
             Note:      AI unavailable, used local rules (request timed out)"
        );
    }

    #[test]
    fn preview_omits_unknown_time_and_assignee() {
        let task = ParsedTask {
            assignee: None,
            time_specified: false,
            priority: Priority::P3,
            priority_reason: None,
            ..sample()
        };
        let rendered = Preview::new(&task, None).to_string();
        assert!(!rendered.contains("Assignee"));
        assert!(rendered.contains("Due:       March 8, 2024\n"));
        assert!(rendered.contains("Priority:  P3 - Normal\n"));
        assert!(!rendered.contains("Note"));
    }

    #[tokio::test]
    async fn parse_prints_json_for_offline_config() {
        let args = ParseArgs {
            text: vec!["Write proposal, assign to Sarah, P1, due next Friday 2pm".into()],
            json: true,
        };
        let mut out = Vec::new();
        execute(offline(), CliCommand::Parse(args), &mut out).await.unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["title"], "Write proposal");
        assert_eq!(value["assignee"], "Sarah");
        assert_eq!(value["priority"], "P1");
        assert_eq!(value["timeSpecified"], true);
        assert_eq!(value["source"], "local");
    }

    #[tokio::test]
    async fn add_applies_overrides_and_rejects_blank_text() {
        let args = AddArgs {
            text: vec!["Call".into(), "the".into(), "bank".into()],
            assignee: Some("Jordan".into()),
            priority: Some(Priority::P2),
        };
        let mut out = Vec::new();
        execute(offline(), CliCommand::Add(args), &mut out).await.unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["title"], "Call the bank");
        assert_eq!(value["assignee"], "Jordan");
        assert_eq!(value["priority"], "P2");
        assert_eq!(value["status"], "pending");

        let blank = AddArgs {
            text: vec!["   ".into()],
            assignee: None,
            priority: None,
        };
        let err = execute(offline(), CliCommand::Add(blank), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task text cannot be empty");
    }
}
