use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::executor::PipelineReport;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub prompt: String,
    /// Upper bound on a stage's argument vector, program name included.
    /// `None` means the vector grows as needed.
    pub max_args: Option<usize>,
    pub arg_overflow: ArgOverflow,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        ConfigLoader::default_config()
    }
}

/// What to do with a stage whose argument vector exceeds `max_args`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgOverflow {
    /// Drop the extra arguments and run anyway.
    Truncate,
    /// Fail the stage.
    Reject,
}

impl FromStr for ArgOverflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "truncate" => Ok(ArgOverflow::Truncate),
            "reject" => Ok(ArgOverflow::Reject),
            _ => Err(format!("unknown arg_overflow: {}", s)),
        }
    }
}

/// How stage exit statuses fold into the pipeline's own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Always succeed once every stage has been reaped.
    BestEffort,
    /// Use the last stage's status, like a POSIX shell.
    LastStage,
    /// Fail with the first failing stage's status.
    AnyStage,
}

impl FailurePolicy {
    pub fn exit_code(&self, report: &PipelineReport) -> i32 {
        match self {
            FailurePolicy::BestEffort => 0,
            FailurePolicy::LastStage => report
                .stages
                .last()
                .map(|s| s.status.code())
                .unwrap_or(0),
            FailurePolicy::AnyStage => report
                .stages
                .iter()
                .map(|s| s.status.code())
                .find(|&code| code != 0)
                .unwrap_or(0),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-effort" => Ok(FailurePolicy::BestEffort),
            "last-stage" => Ok(FailurePolicy::LastStage),
            "any-stage" => Ok(FailurePolicy::AnyStage),
            _ => Err(format!("unknown failure_policy: {}", s)),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config() -> PipelineConfig {
        PipelineConfig {
            prompt: "$ ".to_string(),
            max_args: None,
            arg_overflow: ArgOverflow::Truncate,
            failure_policy: FailurePolicy::BestEffort,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
        let src = fs::read_to_string(path)?;
        Self::load_from_str(&src)
    }

    pub fn load_from_str(src: &str) -> Result<PipelineConfig, ConfigError> {
        let mut config = Self::default_config();

        for (lineno, line) in src.lines().enumerate() {
            let lineno = lineno + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_error(lineno, format!("No '=' found: {}", line)));
            };
            let key = key.trim();

            match key {
                // The prompt keeps its surrounding whitespace, e.g. `prompt=> `.
                "prompt" => config.prompt = value.strip_prefix(' ').unwrap_or(value).to_string(),
                "max_args" => {
                    config.max_args = match value.trim() {
                        "none" => None,
                        v => match v.parse::<usize>() {
                            Ok(n) if n > 0 => Some(n),
                            _ => return Err(parse_error(lineno, format!("Invalid max_args: {}", v))),
                        },
                    };
                }
                "arg_overflow" => {
                    config.arg_overflow = value.trim().parse().map_err(|e| parse_error(lineno, e))?;
                }
                "failure_policy" => {
                    config.failure_policy = value.trim().parse().map_err(|e| parse_error(lineno, e))?;
                }
                _ => return Err(parse_error(lineno, format!("Unknown key: {}", key))),
            }
        }

        Ok(config)
    }
}

fn parse_error(line: usize, message: String) -> ConfigError {
    ConfigError::Parse { line, message }
}
