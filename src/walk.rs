//! Build verification along a bisection branch.
//!
//! Checks out evenly spaced commits of the branch (detached) and runs a build
//! at each, collecting exit codes, timings and, on failure, a short excerpt
//! of the output ending at the first error line. Nothing is committed.

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use rebisect_git::{GitOid, GitRepo};

use crate::config::VerifyConfig;
use crate::error::{Error, Result};

/// Shown in place of an excerpt when a failed build names no error line.
pub const NO_ERROR_LINE: &str = "(no error line)";

/// Output of one build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildResult {
    /// `None` when the build was killed by a signal.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
    /// 1-based line of `output` holding the first error.
    pub error_line: Option<usize>,
}

impl BuildResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Builds the tree checked out in a working directory.
pub trait BuildVerifier {
    /// # Errors
    /// [`Error::Verifier`] when the build could not be run at all. A build
    /// that runs and fails is a normal [`BuildResult`].
    fn build(&mut self, workdir: &Path) -> Result<BuildResult>;
}

/// Runs a shell command as the build.
#[derive(Clone, Debug)]
pub struct CommandVerifier {
    command: String,
}

impl CommandVerifier {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl BuildVerifier for CommandVerifier {
    fn build(&mut self, workdir: &Path) -> Result<BuildResult> {
        let out = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(workdir)
            .output()
            .map_err(|e| Error::Verifier(format!("`{}`: {e}", self.command)))?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        let error_line = first_error_line(&output);
        Ok(BuildResult {
            exit_code: out.status.code(),
            output,
            error_line,
        })
    }
}

/// 1-based number of the first line mentioning an error.
#[must_use]
pub fn first_error_line(output: &str) -> Option<usize> {
    output
        .lines()
        .position(|line| strip_ansi(line).to_ascii_lowercase().contains("error"))
        .map(|i| i + 1)
}

fn ansi_regex() -> Option<&'static Regex> {
    static ANSI: OnceLock<Option<Regex>> = OnceLock::new();
    ANSI.get_or_init(|| Regex::new("\x1b\\[[0-9;]*m").ok()).as_ref()
}

/// Remove colour escape sequences.
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ansi_regex().map_or_else(|| text.to_owned(), |re| re.replace_all(text, "").into_owned())
}

/// Up to `lines` lines of `output` ending at 1-based `error_line`, colour
/// stripped.
#[must_use]
pub fn excerpt(output: &str, error_line: Option<usize>, lines: usize) -> String {
    let Some(end) = error_line else {
        return NO_ERROR_LINE.to_owned();
    };
    let all: Vec<&str> = output.lines().collect();
    let end = end.min(all.len());
    let start = end.saturating_sub(lines);
    strip_ansi(&all[start..end].join("\n"))
}

/// The commits to build: every `step`-th commit back from the tip, oldest
/// first, tip last. `commits` is oldest first.
#[must_use]
pub fn stops(commits: &[GitOid], steps: usize) -> Vec<GitOid> {
    let n = commits.len();
    if n == 0 {
        return Vec::new();
    }
    let step = n.div_ceil(steps.max(1)).max(1);
    let mut picked: Vec<GitOid> = (0..n).step_by(step).map(|back| commits[n - 1 - back]).collect();
    picked.reverse();
    picked
}

/// One verified commit.
#[derive(Clone, Debug)]
pub struct StopResult {
    pub oid: GitOid,
    pub title: String,
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
    /// Failure excerpt, `None` on success.
    pub excerpt: Option<String>,
}

impl StopResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Outcome of a walk.
#[derive(Clone, Debug, Default)]
pub struct WalkReport {
    /// Commits on the branch above the baseline.
    pub commits: usize,
    pub stops: Vec<StopResult>,
    pub total: Duration,
}

impl WalkReport {
    /// Stops whose build failed.
    pub fn failures(&self) -> impl Iterator<Item = &StopResult> {
        self.stops.iter().filter(|s| !s.succeeded())
    }
}

/// Walks a bisection branch building at each stop.
pub struct Walker<'a> {
    repo: &'a dyn GitRepo,
    config: &'a VerifyConfig,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn GitRepo, config: &'a VerifyConfig) -> Self {
        Self { repo, config }
    }

    /// Build `steps` evenly spaced commits of `baseline..branch`.
    ///
    /// `branch` is checked out again afterwards, also when a stop fails to
    /// check out or the verifier cannot run.
    ///
    /// # Errors
    /// [`Error::BadRange`] for an unknown branch or baseline, git checkout
    /// failures, or [`Error::Verifier`].
    pub fn walk(
        &self,
        branch: &str,
        baseline: &str,
        steps: usize,
        verifier: &mut dyn BuildVerifier,
    ) -> Result<WalkReport> {
        let range = format!("{baseline}..{branch}");
        let commits = self
            .repo
            .list_commits(&range)
            .map_err(|source| Error::BadRange {
                range: range.clone(),
                source,
            })?;
        let stops = stops(&commits, steps);
        tracing::info!(
            branch,
            commits = commits.len(),
            stops = stops.len(),
            "verifying bisection branch"
        );

        let started = Instant::now();
        let result = self.visit(&stops, verifier);
        let restore = self.repo.checkout(branch);
        let stops = result?;
        restore?;

        let total = started.elapsed();
        tracing::info!(elapsed = ?total, "verification finished");
        Ok(WalkReport {
            commits: commits.len(),
            stops,
            total,
        })
    }

    fn visit(&self, stops: &[GitOid], verifier: &mut dyn BuildVerifier) -> Result<Vec<StopResult>> {
        let mut results = Vec::with_capacity(stops.len());
        for (i, &oid) in stops.iter().enumerate() {
            let title = self.repo.commit_subject(oid)?;
            tracing::info!("[{}/{}] building at {} {title}", i + 1, stops.len(), oid.short());
            self.repo.checkout(&oid.to_string())?;

            let started = Instant::now();
            let build = verifier.build(self.repo.workdir())?;
            let elapsed = started.elapsed();

            let excerpt = if build.succeeded() {
                tracing::info!(elapsed = ?elapsed, "built successfully");
                None
            } else {
                let text = excerpt(&build.output, build.error_line, self.config.excerpt_lines);
                tracing::warn!(exit_code = ?build.exit_code, elapsed = ?elapsed, "build failed\n{text}");
                Some(text)
            };
            results.push(StopResult {
                oid,
                title,
                exit_code: build.exit_code,
                elapsed,
                excerpt,
            });
        }
        Ok(results)
    }
}
