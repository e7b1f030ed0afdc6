//! Run configuration (`.rebisect.toml`).
//!
//! Defines the naming patterns that map versions to refs, the revert skip
//! list, and bisection walk settings. Everything is threaded explicitly into
//! the planner, applier, and walker; nothing is read from globals.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Placeholder substituted with a version string in ref patterns.
pub const VERSION_PLACEHOLDER: &str = "{version}";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// Missing fields use defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How versions map to refs and branch names.
    #[serde(default)]
    pub refs: RefsConfig,

    /// Planner and applier settings.
    #[serde(default)]
    pub plan: PlanConfig,

    /// Bisection walk settings.
    #[serde(default)]
    pub verify: VerifyConfig,
}

// ---------------------------------------------------------------------------
// RefsConfig
// ---------------------------------------------------------------------------

/// Ref naming patterns. `{version}` is replaced by the version given on the
/// command line.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefsConfig {
    /// Downstream branch carrying the patch set for a version.
    #[serde(default = "default_downstream")]
    pub downstream: String,

    /// Upstream tag a downstream branch is based on.
    #[serde(default = "default_upstream_tag")]
    pub upstream_tag: String,

    /// Prefix of the generated `<prefix>-bisect-<old>-<new>` branch.
    #[serde(default = "default_bisect_prefix")]
    pub bisect_prefix: String,

    /// Remotes fetched by `create --fetch`.
    #[serde(default = "default_remotes")]
    pub remotes: Vec<String>,
}

impl Default for RefsConfig {
    fn default() -> Self {
        Self {
            downstream: default_downstream(),
            upstream_tag: default_upstream_tag(),
            bisect_prefix: default_bisect_prefix(),
            remotes: default_remotes(),
        }
    }
}

impl RefsConfig {
    /// Downstream branch for `version`.
    #[must_use]
    pub fn downstream_ref(&self, version: &str) -> String {
        self.downstream.replace(VERSION_PLACEHOLDER, version)
    }

    /// Upstream tag for `version`.
    #[must_use]
    pub fn upstream_ref(&self, version: &str) -> String {
        self.upstream_tag.replace(VERSION_PLACEHOLDER, version)
    }

    /// Name of the bisection branch between two versions.
    #[must_use]
    pub fn bisect_branch(&self, old: &str, new: &str) -> String {
        format!("{}-bisect-{old}-{new}", self.bisect_prefix)
    }
}

fn default_downstream() -> String {
    "cros/merge/continuous/chromeos-kernelupstream-{version}".to_owned()
}

fn default_upstream_tag() -> String {
    "v{version}".to_owned()
}

fn default_bisect_prefix() -> String {
    "kernelupstream".to_owned()
}

fn default_remotes() -> Vec<String> {
    vec!["cros".to_owned(), "upstream".to_owned()]
}

// ---------------------------------------------------------------------------
// PlanConfig
// ---------------------------------------------------------------------------

/// Planner and applier settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    /// Commit titles that are never reverted even when only the old patch
    /// set carries them.
    #[serde(default = "default_skip_reverts")]
    pub skip_reverts: Vec<String>,

    /// Log planner internals (squash pairs, absorbed fixups) at `debug`.
    #[serde(default)]
    pub debug: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            skip_reverts: default_skip_reverts(),
            debug: false,
        }
    }
}

impl PlanConfig {
    /// `true` if a revert with this title must be skipped.
    #[must_use]
    pub fn skips_revert(&self, title: &str) -> bool {
        self.skip_reverts.iter().any(|t| t == title)
    }
}

fn default_skip_reverts() -> Vec<String> {
    vec!["kernel-rebase: normalization [autogenerated]".to_owned()]
}

// ---------------------------------------------------------------------------
// VerifyConfig
// ---------------------------------------------------------------------------

/// Bisection walk settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfig {
    /// Number of build stops along the branch.
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// Shell command run at each stop. `None` → must be given on the
    /// command line.
    #[serde(default)]
    pub build_command: Option<String>,

    /// Lines of build output shown before the reported error line.
    #[serde(default = "default_excerpt_lines")]
    pub excerpt_lines: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            build_command: None,
            excerpt_lines: default_excerpt_lines(),
        }
    }
}

const fn default_steps() -> usize {
    80
}

const fn default_excerpt_lines() -> usize {
    7
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - Invalid TOML or unknown fields yield a [`ConfigError`] with the line.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
