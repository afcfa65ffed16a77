//! Canonicalization of generated text, the only I/O-bound step of a run.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CodegenError;

/// Turns raw generated text into its canonical form. The semantic content
/// must not change.
#[async_trait]
pub trait Formatter: Send + Sync {
    async fn format(&self, text: &str) -> Result<String, CodegenError>;
}

/// Leaves the text alone apart from ending it with exactly one newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl Formatter for Passthrough {
    async fn format(&self, text: &str) -> Result<String, CodegenError> {
        let mut out = text.trim_end().to_string();
        out.push('\n');
        Ok(out)
    }
}

/// Pipes the text through an external program's stdin and reads the
/// result from its stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandFormatter {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `terraform fmt -`
    pub fn terraform() -> Self {
        CommandFormatter::new("terraform", ["fmt", "-"])
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Formatter for CommandFormatter {
    async fn format(&self, text: &str) -> Result<String, CodegenError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CodegenError::Formatter(format!("failed to start {}: {}", self.program, e))
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            CodegenError::Formatter(format!("no stdin for {}", self.program))
        })?;
        let input = text.as_bytes().to_vec();
        let writer = async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        };

        // Write and read concurrently so a full stdout pipe can't stall us.
        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output = output.map_err(|e| {
            CodegenError::Formatter(format!("failed to run {}: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                event = "Format",
                phase = "Failed",
                program = self.program.as_str(),
                status = output.status.code()
            );
            return Err(CodegenError::Formatter(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        written.map_err(|e| {
            CodegenError::Formatter(format!("failed to write to {}: {}", self.program, e))
        })?;

        let formatted = String::from_utf8(output.stdout).map_err(|e| {
            CodegenError::Formatter(format!("{} produced invalid UTF-8: {}", self.program, e))
        })?;
        debug!(
            event = "Format",
            phase = "Done",
            program = self.program.as_str(),
            bytes = formatted.len()
        );
        Ok(formatted)
    }
}
