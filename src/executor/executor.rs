use crate::config::FailurePolicy;
use crate::error::PipelineError;

use super::report::PipelineReport;

pub type ExecStatus = Result<ExecOutcome, PipelineError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Every stage ran and was reaped.
    Completed(PipelineReport),
    /// Nothing ran; one description line per stage.
    Planned(Vec<String>),
}

impl ExecOutcome {
    pub fn exit_code(&self, policy: FailurePolicy) -> i32 {
        match self {
            ExecOutcome::Completed(report) => policy.exit_code(report),
            ExecOutcome::Planned(_) => 0,
        }
    }
}

pub trait Executor {
    fn execute(&mut self, tokens: &[String]) -> ExecStatus;
}
