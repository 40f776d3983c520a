//! tiny-pipeline entry point.
//!
//! Usage:
//!   tiny-pipeline                          # Read command lines from stdin
//!   tiny-pipeline -c "ls | wc -l"          # Run one command line and exit
//!   tiny-pipeline -- ls '|' wc -l          # Run pre-split tokens
//!   tiny-pipeline --dry-run -c "..."       # Show the plan instead of running it

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tiny_pipeline_rs::config::{ConfigLoader, FailurePolicy, PipelineConfig};
use tiny_pipeline_rs::executor::{DryRunExecutor, ExecOutcome, Executor, ForkExecutor};
use tiny_pipeline_rs::prompt::ShellPrompt;
use tiny_pipeline_rs::tokenizer::tokenize;
use tiny_pipeline_rs::PROGRAM_NAME;

#[derive(FromArgs)]
/// Run command pipelines: stages separated by `|`, with `<` and `>` redirection.
struct Cli {
    #[argh(option, short = 'c')]
    /// run one command line and exit
    command: Option<String>,

    #[argh(option)]
    /// path to a `key = value` configuration file
    config: Option<PathBuf>,

    #[argh(option)]
    /// how stage failures set the exit code: best-effort, last-stage or any-stage
    policy: Option<FailurePolicy>,

    #[argh(switch)]
    /// print what would run instead of running it
    dry_run: bool,

    #[argh(positional, greedy)]
    /// tokens of a single pipeline
    tokens: Vec<String>,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout belongs to the pipeline.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli: Cli = argh::from_env();
    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("{}: {e:?}", PROGRAM_NAME);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(policy) = cli.policy {
        config.failure_policy = policy;
    }
    let policy = config.failure_policy;

    let mut executor: Box<dyn Executor> = if cli.dry_run {
        Box::new(DryRunExecutor::new(config.clone()))
    } else {
        Box::new(ForkExecutor::new(config.clone()))
    };

    if let Some(line) = &cli.command {
        return run_line(executor.as_mut(), &tokenize(line), policy);
    }
    if !cli.tokens.is_empty() {
        return run_line(executor.as_mut(), &cli.tokens, policy);
    }

    let prompt = ShellPrompt::new(config.prompt);
    let mut last = 0;
    loop {
        prompt.show_prompt()?;
        let Some(line) = prompt.read_line().context("reading command line")? else {
            break;
        };
        let tokens = tokenize(&line);
        if tokens.is_empty() {
            continue;
        }
        last = match run_line(executor.as_mut(), &tokens, policy) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{}: {e}", PROGRAM_NAME);
                1
            }
        };
    }
    Ok(last)
}

fn run_line(executor: &mut dyn Executor, tokens: &[String], policy: FailurePolicy) -> Result<i32> {
    let outcome = executor.execute(tokens)?;
    if let ExecOutcome::Planned(lines) = &outcome {
        for line in lines {
            println!("{}", line);
        }
    }
    Ok(outcome.exit_code(policy))
}
