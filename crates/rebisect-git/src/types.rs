//! Values passed across the [`GitRepo`](crate::GitRepo) boundary. No gix
//! types leak through here.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// SHA-1 commit or object id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GitOid([u8; 20]);

impl GitOid {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// First 12 hex digits, for log lines and prompts.
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.to_string();
        s.truncate(12);
        s
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}

impl fmt::Debug for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GitOid({})", self.short())
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    /// Accepts exactly 40 hex digits, either case. Abbreviations must go
    /// through [`GitRepo::rev_parse`](crate::GitRepo::rev_parse).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: String| OidParseError {
            value: s.to_owned(),
            reason,
        };
        if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(fail(format!("{c:?} is not a hex digit")));
        }
        if s.len() != 40 {
            return Err(fail(format!("{} hex digits, need 40", s.len())));
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|e| fail(e.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

/// A string that is not a full hex object id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    pub value: String,
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad object id {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

// ---------------------------------------------------------------------------
// Commit types
// ---------------------------------------------------------------------------

/// Information about a commit object.
///
/// Returned by [`GitRepo::read_commit`](crate::GitRepo::read_commit).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitInfo {
    /// OIDs of parent commits (empty for root commits).
    pub parents: Vec<GitOid>,
    /// The full commit message, subject included.
    pub message: String,
}

impl CommitInfo {
    /// The first line of the message, trimmed.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim()
    }

    /// `true` for commits with more than one parent.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

/// A single line of `git status --porcelain`, kept in its two-column
/// encoding so it can be shown to an operator unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    /// Index (staged) column.
    pub index: char,
    /// Worktree (unstaged) column.
    pub worktree: char,
    /// Path relative to the repository root.
    pub path: String,
}

impl StatusEntry {
    /// `true` when the path is still in a merge-conflict state.
    #[must_use]
    pub fn is_unmerged(&self) -> bool {
        matches!(
            (self.index, self.worktree),
            ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
        )
    }

    /// `true` when nothing is left unstaged for this path.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.worktree == ' '
    }
}

impl fmt::Display for StatusEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", self.index, self.worktree, self.path)
    }
}

// ---------------------------------------------------------------------------
// Sequencer outcomes
// ---------------------------------------------------------------------------

/// Result of a cherry-pick, revert, or commit that did not conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// A new commit was created on HEAD.
    Committed,
    /// The change was already present; no commit was created and no
    /// operation is left in progress.
    Empty,
}

impl StepOutcome {
    /// `true` for [`StepOutcome::Committed`].
    #[must_use]
    pub const fn committed(self) -> bool {
        matches!(self, Self::Committed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
