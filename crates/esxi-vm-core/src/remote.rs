//! The remote execution seam.
//!
//! Every interaction with the host goes through [`RemoteExecutor`]: one shell
//! command line in, its stdout and stderr lines out. Commands are issued one at
//! a time over a single connection.

use crate::error::Result;

/// Captured output of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, one entry per line, without line terminators.
    pub stdout: Vec<String>,
    /// Standard error, one entry per line, without line terminators.
    pub stderr: Vec<String>,
}

impl CommandOutput {
    /// Build output from raw stdout/stderr text.
    pub fn from_text(stdout: &str, stderr: &str) -> Self {
        Self {
            stdout: split_lines(stdout),
            stderr: split_lines(stderr),
        }
    }

    /// Build output that only has stdout lines.
    pub fn stdout<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stdout: lines.into_iter().map(Into::into).collect(),
            stderr: Vec::new(),
        }
    }

    /// True if stdout contains at least one non-blank line.
    pub fn has_output(&self) -> bool {
        self.stdout.iter().any(|l| !l.trim().is_empty())
    }

    /// True if stderr contains at least one non-blank line.
    pub fn has_errors(&self) -> bool {
        self.stderr.iter().any(|l| !l.trim().is_empty())
    }

    /// First stdout line, trimmed of line-ending whitespace.
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.first().map(|l| l.trim_end_matches(['\r', '\n']))
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Runs shell command lines on the target host.
///
/// `Err` means the transport failed (connection, authentication, channel).
/// A command that ran and complained on stderr is still `Ok`.
pub trait RemoteExecutor {
    /// Execute a command line and collect its output.
    fn execute(&mut self, command: &str) -> Result<CommandOutput>;

    /// Execute a command line with a pseudo-terminal attached.
    ///
    /// Transports without terminal support fall back to [`execute`](Self::execute).
    fn execute_with_pty(&mut self, command: &str) -> Result<CommandOutput> {
        self.execute(command)
    }
}

impl<E: RemoteExecutor + ?Sized> RemoteExecutor for &mut E {
    fn execute(&mut self, command: &str) -> Result<CommandOutput> {
        (**self).execute(command)
    }

    fn execute_with_pty(&mut self, command: &str) -> Result<CommandOutput> {
        (**self).execute_with_pty(command)
    }
}
