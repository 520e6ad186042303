//! External command integration for the edit source.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use thiserror::Error;

use crate::app::edit::EditSource;

/// Error returned when splitting a command line fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShellParseError {
    #[error("unterminated {0} quote in command line")]
    UnterminatedQuote(char),
    #[error("command line is empty")]
    Empty,
}

/// Split a command line into words, honouring single quotes, double quotes, and
/// backslash escapes outside single quotes. No other shell syntax is interpreted.
pub fn split_command_line(line: &str) -> Result<Vec<String>, ShellParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some('"') | None, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(ch);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(open) = quote {
        return Err(ShellParseError::UnterminatedQuote(open));
    }
    if in_word {
        words.push(current);
    }
    if words.is_empty() {
        return Err(ShellParseError::Empty);
    }
    Ok(words)
}

/// Edit source that pipes the prompt to an external program and reads its stdout.
#[derive(Debug, Clone)]
pub struct CommandEditSource {
    program: String,
    args: Vec<String>,
}

impl CommandEditSource {
    /// Build from a program followed by its arguments.
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("edit command missing program")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl EditSource for CommandEditSource {
    fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!(program = %self.program, prompt_len = prompt.len(), "invoking edit command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn edit command: {}", self.program))?;

        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|scope| {
            // The command may emit output before it has consumed all of stdin.
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(prompt.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .map_err(|_| anyhow!("prompt writer thread panicked"));
            (output, written)
        });

        let output = output
            .with_context(|| format!("edit command did not exit cleanly: {}", self.program))?;
        match written? {
            Err(err) if err.kind() != io::ErrorKind::BrokenPipe => {
                return Err(err).context("failed to write prompt to edit command");
            }
            _ => {}
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "edit command exited with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        String::from_utf8(output.stdout).context("edit command produced non UTF-8 output")
    }
}
