//! Shared helpers for rebisect integration tests.
//!
//! Every test builds its own git repository in a temp directory: an upstream
//! history on `main` with `v1.0`/`v2.0` tags, and downstream branches
//! `down/1.0` and `down/2.0` carrying the patch sets.
#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use rebisect::config::Config;
use rebisect_git::{GitCli, GitOid};
use tempfile::TempDir;

pub const OLD: &str = "1.0";
pub const NEW: &str = "2.0";
pub const BRANCH: &str = "test-bisect-1.0-2.0";

/// Config mapping versions to the fixture's refs.
pub fn config() -> Config {
    Config::parse(
        r#"
[refs]
downstream = "down/{version}"
upstream_tag = "v{version}"
bisect_prefix = "test"
remotes = []
"#,
    )
    .unwrap()
}

pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

/// A scratch repository.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        git(dir.path(), &["-c", "init.defaultBranch=main", "init", "-q"]);
        git(dir.path(), &["config", "user.email", "test@test.com"]);
        git(dir.path(), &["config", "user.name", "Test User"]);
        git(dir.path(), &["config", "commit.gpgsign", "false"]);
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self, args: &[&str]) -> String {
        git(self.path(), args)
    }

    pub fn repo(&self) -> GitCli {
        GitCli::open(self.path()).unwrap()
    }

    /// Write `files` and commit them.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> GitOid {
        for (name, content) in files {
            std::fs::write(self.path().join(name), content).unwrap();
        }
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
        self.rev("HEAD")
    }

    pub fn rev(&self, spec: &str) -> GitOid {
        self.git(&["rev-parse", spec]).parse().unwrap()
    }

    pub fn tag(&self, name: &str) {
        self.git(&["tag", "-a", name, "-m", name]);
    }

    pub fn branch(&self, name: &str, start: &str) {
        self.git(&["checkout", "-q", "-b", name, start]);
    }

    /// `true` when both revisions have identical trees.
    pub fn same_tree(&self, a: &str, b: &str) -> bool {
        self.git(&["diff", "--stat", a, b]).is_empty()
    }

    pub fn subject(&self, spec: &str) -> String {
        self.git(&["log", "-1", "--format=%s", spec])
    }
}

const CTX_V1: &str = "a\nb\nc\nd\ne\nf\ng\n";
const CTX_UP: &str = "A\nb\nc\nd\ne\nf\ng\n";
const CTX_OLD_PATCHED: &str = "a\nb\nc\nD\ne\nf\ng\n";
const CTX_NEW_PATCHED: &str = "A\nb\nc\nD\ne\nf\ng\n";

/// A rebase with one patch of every kind:
///
/// | patch                  | old | new | expected               |
/// |------------------------|-----|-----|------------------------|
/// | `keep: shared`         | yes | yes | identical, dropped     |
/// | `gone: removed`        | yes |     | revert                 |
/// | `drv: change` + fixup  | v1  | v2  | replace with fixups    |
/// | `FROMLIST: up: second` | yes |     | landed upstream        |
/// | `ctx: tweak`           | yes | yes | context-only, no-op    |
/// | `new: added`           |     | yes | pick                   |
pub fn rebase_fixture() -> Fixture {
    let f = Fixture::new();
    f.commit(
        &[("base.txt", "base\n"), ("ctx.txt", CTX_V1)],
        "initial commit",
    );
    f.tag("v1.0");
    f.commit(&[("up.txt", "u1\n"), ("ctx.txt", CTX_UP)], "up: first");
    f.commit(&[("up2.txt", "u2\n")], "up: second");
    f.tag("v2.0");

    f.branch("down/1.0", "v1.0");
    f.commit(&[("keep.txt", "k\n")], "keep: shared");
    f.commit(&[("gone.txt", "g\n")], "gone: removed");
    f.commit(&[("drv.txt", "v1\n")], "drv: change");
    f.commit(&[("drv.txt", "v1\nfix\n")], "FIXUP: drv: change");
    f.commit(&[("up2.txt", "u2\n")], "FROMLIST: up: second");
    f.commit(&[("ctx.txt", CTX_OLD_PATCHED)], "ctx: tweak");

    f.branch("down/2.0", "v2.0");
    f.commit(&[("keep.txt", "k\n")], "keep: shared");
    f.commit(&[("drv.txt", "v2\n")], "drv: change");
    f.commit(&[("drv.txt", "v2\nfix2\n")], "FIXUP: drv: change");
    f.commit(&[("ctx.txt", CTX_NEW_PATCHED)], "ctx: tweak");
    f.commit(&[("new.txt", "n\n")], "new: added");

    f.git(&["checkout", "-q", "main"]);
    f
}

/// Title of the skip-listed revert in [`conflict_fixture`].
pub const NORMALIZATION: &str = "kernel-rebase: normalization [autogenerated]";
pub const CONFLICTING_UPSTREAM: &str = "up: retune g";

/// A skip-listed downstream patch edits the same line as an upstream commit,
/// so the upstream pick conflicts.
pub fn conflict_fixture() -> Fixture {
    let f = Fixture::new();
    f.commit(&[("base.txt", "base\n"), ("g.txt", "x\n")], "initial commit");
    f.tag("v1.0");
    f.commit(&[("g.txt", "u\n")], CONFLICTING_UPSTREAM);
    f.tag("v2.0");

    f.branch("down/1.0", "v1.0");
    f.commit(&[("g.txt", "n\n")], NORMALIZATION);

    f.branch("down/2.0", "v2.0");
    f.commit(&[("extra.txt", "e\n")], "extra: file");

    f.git(&["checkout", "-q", "main"]);
    f
}

/// `drv: change` is replaced, but a skip-listed patch on top of it rewrote
/// the same line, so reverting the old base conflicts after its fixup has
/// already been reverted.
pub fn replace_conflict_fixture() -> Fixture {
    let f = Fixture::new();
    f.commit(
        &[("base.txt", "base\n"), ("ctx.txt", CTX_V1)],
        "initial commit",
    );
    f.tag("v1.0");
    f.commit(&[("up.txt", "u\n")], "up: one");
    f.tag("v2.0");

    f.branch("down/1.0", "v1.0");
    f.commit(&[("ctx.txt", CTX_OLD_PATCHED)], "drv: change");
    f.commit(&[("fix.txt", "1\n")], "FIXUP: drv: change");
    f.commit(&[("ctx.txt", "a\nb\nc\nN\ne\nf\ng\n")], NORMALIZATION);

    f.branch("down/2.0", "v2.0");
    f.commit(&[("ctx.txt", "a\nb\nc\nE\ne\nf\ng\n")], "drv: change");
    f.commit(&[("fix.txt", "2\n")], "FIXUP: drv: change");

    f.git(&["checkout", "-q", "main"]);
    f
}

/// Two fixups whose base patches are identical on both sides, so each
/// becomes a fixup-only replacement. `FIXUP: ctx: base` only differs in
/// context and is a no-op; `FIXUP: y: base` really changed.
pub fn fixup_only_fixture() -> Fixture {
    let f = Fixture::new();
    f.commit(
        &[("base.txt", "base\n"), ("ctx.txt", CTX_V1)],
        "initial commit",
    );
    f.tag("v1.0");
    f.commit(&[("ctx.txt", CTX_UP)], "up: first");
    f.tag("v2.0");

    f.branch("down/1.0", "v1.0");
    f.commit(&[("x.txt", "x\n")], "ctx: base");
    f.commit(&[("ctx.txt", CTX_OLD_PATCHED)], "FIXUP: ctx: base");
    f.commit(&[("y.txt", "y\n")], "y: base");
    f.commit(&[("y.txt", "y\n1\n")], "FIXUP: y: base");

    f.branch("down/2.0", "v2.0");
    f.commit(&[("x.txt", "x\n")], "ctx: base");
    f.commit(&[("ctx.txt", CTX_NEW_PATCHED)], "FIXUP: ctx: base");
    f.commit(&[("y.txt", "y\n")], "y: base");
    f.commit(&[("y.txt", "y\n2\n")], "FIXUP: y: base");

    f.git(&["checkout", "-q", "main"]);
    f
}

/// The new downstream branch merges a side branch.
pub fn merge_fixture() -> Fixture {
    let f = Fixture::new();
    f.commit(&[("base.txt", "base\n")], "initial commit");
    f.tag("v1.0");
    f.commit(&[("up.txt", "u\n")], "up: one");
    f.tag("v2.0");

    f.branch("down/1.0", "v1.0");
    f.commit(&[("a.txt", "a\n")], "a: add");

    f.branch("down/2.0", "v2.0");
    f.commit(&[("a.txt", "a\n")], "a: add");
    f.branch("side", "down/2.0");
    f.commit(&[("s.txt", "s\n")], "side: work");
    f.git(&["checkout", "-q", "down/2.0"]);
    f.commit(&[("t.txt", "t\n")], "trunk: work");
    f.git(&["merge", "-q", "--no-ff", "-m", "Merge branch 'side'", "side"]);

    f.git(&["checkout", "-q", "main"]);
    f
}
