//! Pure capture-session state machine.
//!
//! [`Session::step`] consumes one [`SessionEvent`] and returns the next state
//! plus at most one [`Command`] for the driver to execute. Nothing in here
//! touches timers, tasks or the network.

use quickadd_core::ParsedTask;

/// Which extractor a running parse belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Ai,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Debouncing,
    Parsing(ParseMode),
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    InputChanged(String),
    AiToggled(bool),
    Cleared,
    SettleElapsed { generation: u64 },
    AiSucceeded { generation: u64, task: ParsedTask },
    AiFailed { generation: u64, error: String },
    LocalParsed { generation: u64, task: ParsedTask },
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start (or restart) the settle timer for `generation`.
    Schedule { generation: u64 },
    /// Drop the pending timer and any in-flight parse.
    CancelPending,
    RunAi { generation: u64, text: String },
    RunLocal { generation: u64, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    input: String,
    use_ai: bool,
    generation: u64,
    phase: Phase,
    parsed: Option<ParsedTask>,
    ai_error: Option<String>,
}

impl Session {
    pub fn new(use_ai: bool) -> Self {
        Self {
            use_ai,
            ..Self::default()
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn use_ai(&self) -> bool {
        self.use_ai
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last settled result. While debouncing this may describe an older
    /// revision of the input.
    pub fn parsed(&self) -> Option<&ParsedTask> {
        self.parsed.as_ref()
    }

    /// Why the AI path was abandoned for the current result, if it was.
    pub fn ai_error(&self) -> Option<&str> {
        self.ai_error.as_deref()
    }

    /// True while a parse is scheduled or running.
    pub fn is_processing(&self) -> bool {
        matches!(self.phase, Phase::Debouncing | Phase::Parsing(_))
    }

    pub fn can_submit(&self) -> bool {
        !self.input.trim().is_empty()
    }

    /// `parsed` describes the current input and no parse is outstanding.
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    pub fn step(mut self, event: SessionEvent) -> (Session, Option<Command>) {
        match event {
            SessionEvent::InputChanged(text) => {
                self.input = text;
                self.restart()
            }
            SessionEvent::Cleared => {
                self.input.clear();
                self.restart()
            }
            SessionEvent::AiToggled(use_ai) => {
                if use_ai == self.use_ai {
                    return (self, None);
                }
                self.use_ai = use_ai;
                if self.can_submit() {
                    self.restart()
                } else {
                    (self, None)
                }
            }
            SessionEvent::SettleElapsed { generation } => {
                if generation != self.generation || self.phase != Phase::Debouncing {
                    return (self, None);
                }
                let text = self.input.clone();
                if self.use_ai {
                    self.phase = Phase::Parsing(ParseMode::Ai);
                    (self, Some(Command::RunAi { generation, text }))
                } else {
                    self.phase = Phase::Parsing(ParseMode::Local);
                    (self, Some(Command::RunLocal { generation, text }))
                }
            }
            SessionEvent::AiSucceeded { generation, task } => {
                if !self.awaits(generation, ParseMode::Ai) {
                    return (self, None);
                }
                self.phase = Phase::Settled;
                self.parsed = Some(task);
                self.ai_error = None;
                (self, None)
            }
            SessionEvent::AiFailed { generation, error } => {
                if !self.awaits(generation, ParseMode::Ai) {
                    return (self, None);
                }
                self.phase = Phase::Parsing(ParseMode::Local);
                self.ai_error = Some(error);
                let text = self.input.clone();
                (self, Some(Command::RunLocal { generation, text }))
            }
            SessionEvent::LocalParsed { generation, task } => {
                if !self.awaits(generation, ParseMode::Local) {
                    return (self, None);
                }
                self.phase = Phase::Settled;
                self.parsed = Some(task);
                (self, None)
            }
        }
    }

    /// Bump the generation after any input or mode change. Blank input goes
    /// straight back to idle and forgets the last result.
    fn restart(mut self) -> (Session, Option<Command>) {
        self.generation += 1;
        self.ai_error = None;
        if self.can_submit() {
            self.phase = Phase::Debouncing;
            let generation = self.generation;
            (self, Some(Command::Schedule { generation }))
        } else {
            self.phase = Phase::Idle;
            self.parsed = None;
            (self, Some(Command::CancelPending))
        }
    }

    fn awaits(&self, generation: u64, mode: ParseMode) -> bool {
        generation == self.generation && self.phase == Phase::Parsing(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use quickadd_core::{ParseSource, Priority};
    use rstest::rstest;

    fn task(title: &str, source: ParseSource) -> ParsedTask {
        ParsedTask {
            title: title.to_string(),
            assignee: None,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 6)
                .unwrap()
                .and_hms_opt(17, 0, 0)
                .unwrap(),
            time_specified: false,
            priority: Priority::P3,
            priority_reason: None,
            source,
        }
    }

    fn typed(session: Session, text: &str) -> Session {
        session.step(SessionEvent::InputChanged(text.into())).0
    }

    #[test]
    fn input_change_schedules_with_fresh_generation() {
        let (session, command) = Session::new(true).step(SessionEvent::InputChanged("Buy milk".into()));
        assert_eq!(session.phase(), Phase::Debouncing);
        assert_eq!(command, Some(Command::Schedule { generation: 1 }));
        assert!(session.is_processing());
        assert!(session.can_submit());

        let (session, command) = session.step(SessionEvent::InputChanged("Buy milk today".into()));
        assert_eq!(command, Some(Command::Schedule { generation: 2 }));
        assert_eq!(session.generation(), 2);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn blank_input_stays_idle(#[case] text: &str) {
        let (session, command) = Session::new(true).step(SessionEvent::InputChanged(text.into()));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(command, Some(Command::CancelPending));
        assert!(!session.is_processing());
        assert!(!session.can_submit());
    }

    #[rstest]
    #[case(true, Command::RunAi { generation: 1, text: "Buy milk".into() }, Phase::Parsing(ParseMode::Ai))]
    #[case(false, Command::RunLocal { generation: 1, text: "Buy milk".into() }, Phase::Parsing(ParseMode::Local))]
    fn settle_picks_extractor(#[case] use_ai: bool, #[case] expected: Command, #[case] phase: Phase) {
        let session = typed(Session::new(use_ai), "Buy milk");
        let (session, command) = session.step(SessionEvent::SettleElapsed { generation: 1 });
        assert_eq!(command, Some(expected));
        assert_eq!(session.phase(), phase);
    }

    #[test]
    fn stale_settle_is_ignored() {
        let session = typed(typed(Session::new(true), "Buy"), "Buy milk");
        let (session, command) = session.step(SessionEvent::SettleElapsed { generation: 1 });
        assert_eq!(command, None);
        assert_eq!(session.phase(), Phase::Debouncing);
    }

    #[test]
    fn ai_success_settles_without_error() {
        let session = typed(Session::new(true), "Buy milk");
        let (session, _) = session.step(SessionEvent::SettleElapsed { generation: 1 });
        let (session, command) = session.step(SessionEvent::AiSucceeded {
            generation: 1,
            task: task("Buy milk", ParseSource::Ai),
        });

        assert_eq!(command, None);
        assert!(session.is_settled());
        assert_eq!(session.parsed().map(|t| t.source), Some(ParseSource::Ai));
        assert_eq!(session.ai_error(), None);
    }

    #[test]
    fn ai_failure_falls_back_and_keeps_error() {
        let session = typed(Session::new(true), "Buy milk");
        let (session, _) = session.step(SessionEvent::SettleElapsed { generation: 1 });
        let (session, command) = session.step(SessionEvent::AiFailed {
            generation: 1,
            error: "request timed out".into(),
        });
        assert_eq!(
            command,
            Some(Command::RunLocal {
                generation: 1,
                text: "Buy milk".into()
            })
        );
        assert_eq!(session.phase(), Phase::Parsing(ParseMode::Local));

        let (session, _) = session.step(SessionEvent::LocalParsed {
            generation: 1,
            task: task("Buy milk", ParseSource::Local),
        });
        assert!(session.is_settled());
        assert_eq!(session.ai_error(), Some("request timed out"));
        assert_eq!(session.parsed().map(|t| t.source), Some(ParseSource::Local));
    }

    #[test]
    fn results_from_older_generations_are_discarded() {
        let session = typed(Session::new(true), "Email Alex");
        let (session, _) = session.step(SessionEvent::SettleElapsed { generation: 1 });
        let session = typed(session, "Email Blair");

        let (session, command) = session.step(SessionEvent::AiSucceeded {
            generation: 1,
            task: task("Email Alex", ParseSource::Ai),
        });
        assert_eq!(command, None);
        assert_eq!(session.parsed(), None);

        let (session, command) = session.step(SessionEvent::AiFailed {
            generation: 1,
            error: "late".into(),
        });
        assert_eq!(command, None);
        assert_eq!(session.ai_error(), None);
        assert_eq!(session.phase(), Phase::Debouncing);
    }

    #[test]
    fn clearing_discards_everything() {
        let session = typed(Session::new(true), "Buy milk");
        let (session, _) = session.step(SessionEvent::SettleElapsed { generation: 1 });
        let (session, command) = session.step(SessionEvent::Cleared);
        assert_eq!(command, Some(Command::CancelPending));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.input(), "");

        let (session, _) = session.step(SessionEvent::AiSucceeded {
            generation: 1,
            task: task("Buy milk", ParseSource::Ai),
        });
        assert_eq!(session.parsed(), None);
    }

    #[test]
    fn toggling_ai_reparses_current_input() {
        let session = typed(Session::new(true), "Buy milk");
        let (session, _) = session.step(SessionEvent::SettleElapsed { generation: 1 });
        let (session, _) = session.step(SessionEvent::AiSucceeded {
            generation: 1,
            task: task("Buy milk", ParseSource::Ai),
        });

        let (session, command) = session.step(SessionEvent::AiToggled(false));
        assert!(!session.use_ai());
        assert_eq!(command, Some(Command::Schedule { generation: 2 }));
        assert_eq!(session.phase(), Phase::Debouncing);

        let (session, command) = session.step(SessionEvent::AiToggled(false));
        assert_eq!(command, None);
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn toggling_ai_on_empty_input_only_records_setting() {
        let (session, command) = Session::new(false).step(SessionEvent::AiToggled(true));
        assert!(session.use_ai());
        assert_eq!(command, None);
        assert_eq!(session.phase(), Phase::Idle);
    }
}
