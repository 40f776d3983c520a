use nix::unistd::Pid;
use tracing::{debug, warn};

use super::executor::{ExecOutcome, ExecStatus, Executor};
use super::launcher::{launch, PreparedStage};
use super::pipe_set::PipeSet;
use super::planner::plan;
use super::report::{wait_for, PipelineReport, StageReport, StageStatus};
use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Runs pipelines for real: one forked process per stage.
pub struct ForkExecutor {
    config: PipelineConfig,
}

impl ForkExecutor {
    pub fn new(config: PipelineConfig) -> Self {
        ForkExecutor { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Executor for ForkExecutor {
    fn execute(&mut self, tokens: &[String]) -> ExecStatus {
        run_pipeline(tokens, &self.config).map(ExecOutcome::Completed)
    }
}

/// Plans `tokens`, launches every stage, then reaps every child.
///
/// Only pipe, fork and wait failures surface as errors. A stage that cannot
/// open its redirection target or exec its program just shows up with a
/// failing status in the report.
pub fn run_pipeline(tokens: &[String], config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    let plan = plan(tokens);
    debug!(stages = plan.stage_count(), pipes = plan.pipe_count(), "planned pipeline");

    let prepared: Vec<PreparedStage> = plan
        .stages
        .iter()
        .map(|stage| PreparedStage::new(stage, config))
        .collect();

    let pipes = PipeSet::allocate(plan.pipe_count())?;

    let mut spawned: Vec<(&PreparedStage, Pid)> = Vec::with_capacity(prepared.len());
    for (stage, prep) in plan.stages.iter().zip(&prepared) {
        match launch(stage, prep, &pipes) {
            Ok(pid) => {
                debug!(stage = stage.index, %pid, program = %prep.program, "spawned stage");
                spawned.push((prep, pid));
            }
            Err(err) => {
                // Release our ends so the stages already running can finish.
                drop(pipes);
                for (_, pid) in spawned {
                    let _ = wait_for(pid);
                }
                return Err(err);
            }
        }
    }

    // The parent never touches the pipes; readers only see EOF once every
    // write end, ours included, is closed.
    drop(pipes);

    let mut stages = Vec::with_capacity(spawned.len());
    let mut first_error = None;
    for (prep, pid) in spawned {
        match wait_for(pid) {
            Ok(status) => {
                log_status(prep, pid, status);
                stages.push(StageReport {
                    index: prep.index,
                    program: prep.program.clone(),
                    pid,
                    status,
                });
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    let report = PipelineReport { stages, pipe_count: plan.pipe_count() };
    debug!(processes = report.process_count(), success = report.success(), "pipeline finished");
    Ok(report)
}

fn log_status(prep: &PreparedStage, pid: Pid, status: StageStatus) {
    match status {
        StageStatus::Exited(0) => {
            debug!(stage = prep.index, %pid, "stage exited");
        }
        StageStatus::Exited(code) => {
            warn!(stage = prep.index, %pid, program = %prep.program, code, "stage failed");
        }
        StageStatus::Signaled(signal) => {
            debug!(stage = prep.index, %pid, ?signal, "stage killed by signal");
        }
    }
}
