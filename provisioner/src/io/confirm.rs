//! Yes/no confirmation prompts.
//!
//! Destructive choices (recreating the conda env, re-cloning the repository)
//! are routed through [`Confirm`] so the default answer is always "no" and
//! tests can script the replies.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing::debug;

/// Source of answers to yes/no questions.
pub trait Confirm {
    /// Ask `question`; `true` only for an explicit yes.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Interactive prompt on the controlling terminal.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut stdout = io::stdout();
        ask(question, &mut input, &mut stdout)
    }
}

/// Answers every question with the default ("no"), for unattended runs.
pub struct DeclineAll;

impl Confirm for DeclineAll {
    fn confirm(&self, question: &str) -> Result<bool> {
        debug!(question, "non-interactive: declining");
        Ok(false)
    }
}

/// Write `question [y/N] ` to `output` and read one answer line from `input`.
///
/// End of input counts as "no".
pub fn ask<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "{question} [y/N] ").context("write prompt")?;
    output.flush().context("flush prompt")?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("read answer")?;
    if read == 0 {
        writeln!(output).context("write newline")?;
    }
    let yes = is_yes(&line);
    debug!(question, yes, "prompt answered");
    Ok(yes)
}

/// Only a literal `y` or `Y` is a yes.
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn only_single_y_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes("Y\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yes"));
        assert!(!is_yes("maybe"));
    }

    #[test]
    fn ask_prints_prompt_and_reads_answer() {
        let mut input = Cursor::new(b"y\n".to_vec());
        let mut output = Vec::new();
        assert!(ask("Recreate env?", &mut input, &mut output).expect("ask"));
        assert_eq!(String::from_utf8(output).expect("utf8"), "Recreate env? [y/N] ");
    }

    #[test]
    fn ask_treats_eof_as_no() {
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();
        assert!(!ask("Re-clone?", &mut input, &mut output).expect("ask"));
    }

    #[test]
    fn decline_all_says_no() {
        assert!(!DeclineAll.confirm("anything").expect("confirm"));
    }
}
