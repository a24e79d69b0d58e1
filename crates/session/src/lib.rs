//! Live capture session: debounced re-parsing of a text field with an AI
//! extractor in front and the local parser behind it.

mod debounce;
mod orchestrator;
mod state;

pub use debounce::Debouncer;
pub use orchestrator::Orchestrator;
pub use state::{Command, ParseMode, Phase, Session, SessionEvent};
