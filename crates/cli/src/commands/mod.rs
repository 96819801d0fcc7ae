//! Command handlers for the triage CLI.

pub mod ask;
pub mod check;
pub mod interactive;
pub mod knowledge;
pub mod stats;

pub use ask::AskCommand;
pub use check::CheckCommand;
pub use interactive::InteractiveCommand;
pub use knowledge::{CleanCommand, LearnCommand};
pub use stats::StatsCommand;
