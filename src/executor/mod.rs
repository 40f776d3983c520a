mod executor;
mod fork_executor;
mod dry_run;
mod launcher;
mod path_resolver;
mod pipe_set;
mod planner;
mod redirect;
mod report;

pub use executor::{Executor, ExecOutcome, ExecStatus};
pub use fork_executor::{run_pipeline, ForkExecutor};
pub use dry_run::DryRunExecutor;
pub use launcher::{launch, materialize, PreparedStage};
pub use path_resolver::PathResolver;
pub use pipe_set::PipeSet;
pub use planner::{plan, PipelinePlan, Stage, StageInput, StageOutput, PIPE};
pub use redirect::{Redirections, REDIRECT_IN, REDIRECT_OUT};
pub use report::{wait_for, PipelineReport, StageReport, StageStatus};
