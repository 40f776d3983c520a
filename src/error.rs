use std::io;

use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

/// Errors that abort a whole pipeline. Everything here is a local
/// resource problem of the invoking process, never a user command error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipe: {source}")]
    PipeCreation {
        #[source]
        source: Errno,
    },
    #[error("fork (stage {stage}): {source}")]
    Fork {
        stage: usize,
        #[source]
        source: Errno,
    },
    #[error("wait (pid {pid}): {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },
}

/// Errors local to a single stage. They are reported by the stage's own
/// process and turn into its exit status; siblings keep running.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("empty command")]
    EmptyCommand,
    #[error("argument contains a NUL byte: {arg:?}")]
    NulByte { arg: String },
    #[error("too many arguments: {count} (limit {max})")]
    TooManyArgs { count: usize, max: usize },
    #[error("open {path}: {}", source.desc())]
    Redirect {
        path: String,
        #[source]
        source: Errno,
    },
    #[error("exec {program}: {}", source.desc())]
    Exec {
        program: String,
        #[source]
        source: Errno,
    },
}

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NOT_EXECUTABLE: i32 = 126;
pub const EXIT_NOT_FOUND: i32 = 127;

impl StageError {
    /// The failing operation, without the OS reason: `open in.txt`.
    pub fn operation(&self) -> String {
        match self {
            StageError::Redirect { path, .. } => format!("open {}", path),
            StageError::Exec { program, .. } => format!("exec {}", program),
            other => other.to_string(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            StageError::Exec { source, .. } => exec_exit_code(*source),
            _ => EXIT_FAILURE,
        }
    }
}

/// Exit status of a stage whose program could not replace the child image.
pub fn exec_exit_code(errno: Errno) -> i32 {
    match errno {
        Errno::ENOENT => EXIT_NOT_FOUND,
        _ => EXIT_NOT_EXECUTABLE,
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: line {line}: {message}")]
    Parse { line: usize, message: String },
}
