pub const PIPE: &str = "|";

/// Where a stage's stdin comes from before redirection is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    Inherit,
    /// Read end of the pipe with this index.
    Pipe(usize),
}

/// Where a stage's stdout goes before redirection is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutput {
    Inherit,
    /// Write end of the pipe with this index.
    Pipe(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub index: usize,
    /// Tokens between separators, redirection operators included.
    pub args: Vec<String>,
    pub input: StageInput,
    pub output: StageOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePlan {
    pub stages: Vec<Stage>,
}

impl PipelinePlan {
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// One pipe per adjacent stage pair.
    pub fn pipe_count(&self) -> usize {
        self.stages.len().saturating_sub(1)
    }
}

/// Splits a token sequence into stages at every `|`.
///
/// A sequence with k separators always yields k + 1 stages, empty ones
/// included, so stage i reads pipe i - 1 and writes pipe i.
pub fn plan(tokens: &[String]) -> PipelinePlan {
    let groups: Vec<&[String]> = tokens.split(|t| t == PIPE).collect();
    let last = groups.len() - 1;

    let stages = groups
        .into_iter()
        .enumerate()
        .map(|(index, args)| Stage {
            index,
            args: args.to_vec(),
            input: if index == 0 { StageInput::Inherit } else { StageInput::Pipe(index - 1) },
            output: if index == last { StageOutput::Inherit } else { StageOutput::Pipe(index) },
        })
        .collect();

    PipelinePlan { stages }
}
