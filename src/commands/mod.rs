// src/commands/mod.rs

//! Operation handlers
//!
//! Each handler takes an opened repository and the invocation settings and
//! reports whether the operation succeeded. Hard errors (I/O, corrupt
//! database, signing failures) propagate as `Err`; soft failures such as a
//! missing target are reported on stderr and turn into [`Status::Failure`].

mod query;
mod remove;
mod update;
mod verify;

pub use query::cmd_query;
pub use remove::cmd_remove;
pub use update::cmd_update;
pub use verify::cmd_verify;

use crate::repository::WriteOutcome;
use std::process::ExitCode;

/// Overall result of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl From<WriteOutcome> for Status {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Empty => Status::Failure,
            WriteOutcome::Unchanged | WriteOutcome::Written => Status::Success,
        }
    }
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
        }
    }
}
