pub mod runner;
pub mod status;

pub use runner::{RunOptions, RunReport, Runner};
pub use status::{ExitSignal, Outcome, RunStatus};
