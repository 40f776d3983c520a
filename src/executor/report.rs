use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Exited(i32),
    Signaled(Signal),
}

impl StageStatus {
    /// Shell-style status code: signals map to 128 + signal number.
    pub fn code(&self) -> i32 {
        match self {
            StageStatus::Exited(code) => *code,
            StageStatus::Signaled(sig) => 128 + *sig as i32,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, StageStatus::Exited(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub index: usize,
    pub program: String,
    pub pid: Pid,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub pipe_count: usize,
}

impl PipelineReport {
    pub fn process_count(&self) -> usize {
        self.stages.len()
    }

    pub fn success(&self) -> bool {
        self.stages.iter().all(|s| s.status.success())
    }
}

/// Blocks until `pid` terminates.
pub fn wait_for(pid: Pid) -> Result<StageStatus, PipelineError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(StageStatus::Exited(code)),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(StageStatus::Signaled(sig)),
            // Stop/continue notifications are not requested; keep waiting.
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(PipelineError::Wait { pid, source }),
        }
    }
}
