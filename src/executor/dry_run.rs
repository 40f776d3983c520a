use nix::errno::Errno;

use super::executor::{ExecOutcome, ExecStatus, Executor};
use super::launcher::materialize;
use super::path_resolver::PathResolver;
use super::planner::{plan, Stage, StageInput, StageOutput};
use super::redirect::Redirections;
use crate::config::PipelineConfig;
use crate::error::StageError;

/// Describes what [`ForkExecutor`](super::ForkExecutor) would do, without
/// creating pipes, forking or opening files.
pub struct DryRunExecutor {
    config: PipelineConfig,
    resolver: PathResolver,
}

impl DryRunExecutor {
    pub fn new(config: PipelineConfig) -> Self {
        DryRunExecutor { config, resolver: PathResolver::from_env() }
    }

    pub fn with_resolver(config: PipelineConfig, resolver: PathResolver) -> Self {
        DryRunExecutor { config, resolver }
    }

    fn describe(&self, stage: &Stage) -> String {
        let redirections = Redirections::parse(&stage.args);
        let stdin = match (redirections.input, stage.input) {
            (Some(path), _) => format!("file {}", path),
            (None, StageInput::Pipe(i)) => format!("pipe {}", i),
            (None, StageInput::Inherit) => "inherit".to_string(),
        };
        let stdout = match (redirections.output, stage.output) {
            (Some(path), _) => format!("file {}", path),
            (None, StageOutput::Pipe(i)) => format!("pipe {}", i),
            (None, StageOutput::Inherit) => "inherit".to_string(),
        };

        let command = match self.check(stage.index, redirections.args) {
            Ok(desc) => desc,
            Err(err) => format!("error: {} (exit {})", err, err.exit_code()),
        };
        format!("stage {}: {} stdin={} stdout={}", stage.index, command, stdin, stdout)
    }

    fn check(&self, index: usize, args: &[String]) -> Result<String, StageError> {
        let argv = materialize(index, args, &self.config)?;
        let program = &args[0];
        let path = self.resolver.resolve(program).ok_or_else(|| StageError::Exec {
            program: program.clone(),
            source: Errno::ENOENT,
        })?;
        let argv: Vec<_> = argv.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        Ok(format!("{} {:?}", path.display(), argv))
    }
}

impl Executor for DryRunExecutor {
    fn execute(&mut self, tokens: &[String]) -> ExecStatus {
        let plan = plan(tokens);
        let mut lines = Vec::with_capacity(plan.stage_count() + 1);
        lines.push(format!(
            "{} stage(s), {} pipe(s)",
            plan.stage_count(),
            plan.pipe_count()
        ));
        lines.extend(plan.stages.iter().map(|stage| self.describe(stage)));
        Ok(ExecOutcome::Planned(lines))
    }
}
