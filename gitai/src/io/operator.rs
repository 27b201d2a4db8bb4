//! The human in the loop.
//!
//! Jobs never touch stdin/stdout directly; they talk to an [`Operator`].

use std::io::{self, BufRead, Stdout, StdinLock, Write};

use anyhow::{Context, Result, bail};

pub trait Operator {
    /// Show a model reply under `label`.
    fn present(&mut self, label: &str, text: &str) -> Result<()>;

    /// Ask a question and return the answer line without its line terminator.
    ///
    /// Fails when the input stream is closed.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Print an informational line.
    fn notify(&mut self, message: &str) -> Result<()>;
}

/// Line-oriented operator over any reader/writer pair.
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl TerminalOperator<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn present(&mut self, label: &str, text: &str) -> Result<()> {
        writeln!(self.output, "\n===== {label} =====\n{text}\n").context("write to terminal")?;
        self.output.flush().context("flush terminal")
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question} ").context("write to terminal")?;
        self.output.flush().context("flush terminal")?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("read operator input")?;
        if read == 0 {
            bail!("operator input closed while waiting for an answer to: {question}");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}").context("write to terminal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn ask_strips_line_terminator() {
        let mut operator = TerminalOperator::new(Cursor::new("  yes \r\n"), Vec::new());
        assert_eq!(operator.ask("ok?").expect("answer"), "  yes ");
        let shown = String::from_utf8(operator.into_output()).expect("utf8");
        assert_eq!(shown, "ok? ");
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut operator = TerminalOperator::new(Cursor::new(""), Vec::new());
        let err = operator.ask("ok?").expect_err("eof");
        assert!(err.to_string().contains("input closed"));
    }

    #[test]
    fn present_shows_label_and_text() {
        let mut operator = TerminalOperator::new(Cursor::new(""), Vec::new());
        operator.present("commit_title", "Fix bug").expect("present");
        let shown = String::from_utf8(operator.into_output()).expect("utf8");
        assert!(shown.contains("commit_title"));
        assert!(shown.contains("Fix bug"));
    }
}
