//! The **abstraction** over external process execution.
//!
//! Both pipeline stages do their real work by shelling out to external
//! binaries. This module defines the seam they go through, so the stages can
//! be exercised in tests with counting or canned runners instead of the real
//! tools.
//!
//! **Architectural Note:**
//! Stage code should depend on [`CommandRunner`] only; the concrete
//! [`ExecRunner`] is selected at the outermost layer (CLI `main`).

use std::io;
use std::process::{Command, Stdio};

/// Exit information for a completed subprocess.
///
/// `std::process::ExitStatus` cannot be constructed outside the standard
/// library, so the trait returns this instead to keep stub runners trivial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitInfo {
    pub success: bool,
    pub code: Option<i32>,
}

impl ExitInfo {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }
}

/// Executes external commands on behalf of the pipeline stages.
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion without touching its stdio; the
    /// process writes its own artifacts. Used by scan dispatch.
    fn run_detached(&self, program: &str, args: &[String]) -> io::Result<ExitInfo>;

    /// Runs the command to completion, discarding stdout and returning the
    /// captured stderr bytes. Used by the exploit lookup.
    fn run_capture_stderr(&self, program: &str, args: &[String]) -> io::Result<Vec<u8>>;
}

/// Production runner backed by `std::process::Command`.
pub struct ExecRunner;

impl CommandRunner for ExecRunner {
    fn run_detached(&self, program: &str, args: &[String]) -> io::Result<ExitInfo> {
        let status = Command::new(program).args(args).status()?;
        Ok(ExitInfo {
            success: status.success(),
            code: status.code(),
        })
    }

    fn run_capture_stderr(&self, program: &str, args: &[String]) -> io::Result<Vec<u8>> {
        let output = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;
        Ok(output.stderr)
    }
}
