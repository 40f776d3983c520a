//! A minimal command-pipeline executor.
//!
//! A command line arrives as a token sequence. Every `|` separates two
//! stages; each stage runs as its own forked process, wired to its
//! neighbours through OS pipes, with optional `<` / `>` file redirection
//! taking precedence over the pipes. See [`executor::run_pipeline`].

pub mod config;
pub mod error;
pub mod executor;
pub mod prompt;
pub mod tokenizer;

pub use config::{ArgOverflow, ConfigLoader, FailurePolicy, PipelineConfig};
pub use error::{PipelineError, StageError};
pub use executor::{run_pipeline, PipelineReport};

/// Prefix of every diagnostic a stage writes to stderr.
pub const PROGRAM_NAME: &str = "tiny-pipeline";
