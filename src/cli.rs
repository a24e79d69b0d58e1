use clap::{value_parser, Args, Parser, Subcommand};

use crate::capture::CaptureInput;
use crate::model::Priority;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "quickadd",
    version,
    about = "Turn a sentence into a structured task.",
    after_help = "Examples:\n  quickadd parse \"Write proposal, assign to Sarah, P1, due next Friday 2pm\"\n  quickadd add --no-ai Call the bank tomorrow at 9am\n  quickadd watch --log debug"
)]
pub struct Cli {
    /// Skip the AI extractor and use the local rules only
    #[arg(long = "no-ai", global = true)]
    pub no_ai: bool,

    /// Override the model used for AI extraction
    #[arg(long, value_name = "NAME", global = true)]
    pub model: Option<String>,

    /// Tracing filter written to stderr (e.g. "warn", "debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Preview how a sentence would be captured
    Parse(ParseArgs),
    /// Capture a sentence and print the finalized task as JSON
    Add(AddArgs),
    /// Re-parse each stdin line as a new revision of the input
    Watch(WatchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Task sentence
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Print the parsed task as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task sentence, e.g. "Email Sarah the deck tomorrow 3pm"
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Assign explicitly (overrides a name found in the text)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Set priority explicitly (overrides the detected priority)
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Settle window in milliseconds (defaults to QUICKADD_SETTLE_MS or 500)
    #[arg(long = "settle-ms", value_name = "MILLIS", value_parser = value_parser!(u64))]
    pub settle_ms: Option<u64>,
}

impl From<&AddArgs> for CaptureInput {
    fn from(args: &AddArgs) -> Self {
        CaptureInput {
            text: args.text.join(" "),
            assignee: args.assignee.clone(),
            priority: args.priority,
        }
    }
}
