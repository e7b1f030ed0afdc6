//! Subprocess plumbing for the git CLI half of the backend.

use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::GitError;

/// Captured result of one git invocation.
#[derive(Debug)]
pub struct GitOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// stdout followed by stderr; git splits its sequencer advice between
    /// the two streams.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }

    /// Turn a failed invocation into [`GitError::CommandFailed`].
    pub fn into_result(self, args: &[&str]) -> Result<String, GitError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(GitError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr: self.stderr.trim().to_owned(),
                exit_code: self.exit_code,
            })
        }
    }
}

/// Run `git <args>` in `dir` and capture its output regardless of exit
/// status.
pub fn run_git(dir: &Path, args: &[&str]) -> Result<GitOutput, GitError> {
    run_git_with_input(dir, args, None)
}

/// Like [`run_git`], feeding `input` on stdin.
pub fn run_git_with_input(
    dir: &Path,
    args: &[&str],
    input: Option<&str>,
) -> Result<GitOutput, GitError> {
    tracing::trace!(dir = %dir.display(), args = ?args, "git");
    let mut cmd = Command::new("git");
    cmd.args(args)
        .current_dir(dir)
        // Continuations must never open an editor.
        .env("GIT_EDITOR", "true")
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    let mut child = cmd.spawn()?;
    if let Some(text) = input
        && let Some(mut stdin) = child.stdin.take()
    {
        stdin.write_all(text.as_bytes())?;
    }
    let output = child.wait_with_output()?;

    Ok(GitOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run `git <args>` in `dir`, failing on a non-zero exit.
pub fn git_ok(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    run_git(dir, args)?.into_result(args)
}
