use std::io::{self, BufRead, IsTerminal, Write};

/// Line source for the interactive front end. The prompt is only shown
/// when stdin is a terminal, so piped input produces clean output.
pub struct ShellPrompt {
    prompt: String,
    interactive: bool,
}

impl ShellPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        ShellPrompt {
            prompt: prompt.into(),
            interactive: io::stdin().is_terminal(),
        }
    }

    pub fn show_prompt(&self) -> io::Result<()> {
        if self.interactive {
            let mut stdout = io::stdout();
            stdout.write_all(self.prompt.as_bytes())?;
            stdout.flush()?;
        }
        Ok(())
    }

    /// Returns `None` at EOF (e.g. Ctrl-D).
    pub fn read_line(&self) -> io::Result<Option<String>> {
        read_line_from(&mut io::stdin().lock(), self.interactive)
    }
}

fn read_line_from(input: &mut impl BufRead, interactive: bool) -> io::Result<Option<String>> {
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        if interactive {
            println!();
        }
        return Ok(None);
    }
    Ok(Some(buf.trim_end().to_string()))
}
