pub mod capture;
pub mod config;
pub mod dates;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;

pub use capture::{finalize_task, CaptureInput};
pub use config::{AppConfig, RemoteSettings};
pub use dates::correct_due_date;
pub use error::{CaptureError, ExtractError, ExtractErrorKind, ModelError};
pub use extract::TaskExtractor;
pub use model::*;
pub use parser::{LocalExtractor, ParseOptions};
