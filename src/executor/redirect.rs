pub const REDIRECT_IN: &str = "<";
pub const REDIRECT_OUT: &str = ">";

/// A stage's arguments with its redirection operators pulled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirections<'a> {
    /// Arguments that are actually executed: everything before the first
    /// honored `<` or `>`.
    pub args: &'a [String],
    pub input: Option<&'a str>,
    pub output: Option<&'a str>,
}

impl<'a> Redirections<'a> {
    /// Only the first `<` and the first `>` count, and only when a filename
    /// follows. Both are looked up on the full token list, then the
    /// arguments are cut at whichever comes first.
    pub fn parse(tokens: &'a [String]) -> Self {
        let input_at = find_operator(tokens, REDIRECT_IN);
        let output_at = find_operator(tokens, REDIRECT_OUT);

        let cut = input_at
            .into_iter()
            .chain(output_at)
            .min()
            .unwrap_or(tokens.len());

        Redirections {
            args: &tokens[..cut],
            input: input_at.map(|i| tokens[i + 1].as_str()),
            output: output_at.map(|i| tokens[i + 1].as_str()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

fn find_operator(tokens: &[String], op: &str) -> Option<usize> {
    tokens
        .iter()
        .position(|t| t == op)
        .filter(|&i| i + 1 < tokens.len())
}
