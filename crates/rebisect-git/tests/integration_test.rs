use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use rebisect_git::{GitCli, GitError, GitOid, GitRepo, StepOutcome};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

fn setup_repo() -> (TempDir, GitCli) {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["-c", "init.defaultBranch=main", "init", "-q"]);
    git(dir.path(), &["config", "user.email", "test@test.com"]);
    git(dir.path(), &["config", "user.name", "Test User"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    commit_file(dir.path(), "base.txt", "base\n", "initial commit");
    let repo = GitCli::open(dir.path()).unwrap();
    (dir, repo)
}

fn commit_file(dir: &Path, name: &str, content: &str, message: &str) -> GitOid {
    std::fs::write(dir.join(name), content).unwrap();
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"]).parse().unwrap()
}

fn head(dir: &Path) -> GitOid {
    git(dir, &["rev-parse", "HEAD"]).parse().unwrap()
}

// ===========================================================================
// Reads
// ===========================================================================

#[test]
fn rev_parse_head_and_branch() {
    let (dir, repo) = setup_repo();
    assert_eq!(repo.rev_parse("HEAD").unwrap(), head(dir.path()));
    assert_eq!(repo.rev_parse("main").unwrap(), head(dir.path()));
}

#[test]
fn rev_parse_peels_annotated_tags() {
    let (dir, repo) = setup_repo();
    git(dir.path(), &["tag", "-a", "v1.0", "-m", "release"]);
    assert_eq!(repo.rev_parse("v1.0").unwrap(), head(dir.path()));
}

#[test]
fn rev_parse_missing_is_not_found() {
    let (_dir, repo) = setup_repo();
    let err = repo.rev_parse("no-such-branch").unwrap_err();
    assert!(matches!(err, GitError::NotFound { .. }), "{err}");
}

#[test]
fn read_commit_subject_and_message() {
    let (dir, repo) = setup_repo();
    let oid = commit_file(
        dir.path(),
        "a.txt",
        "a\n",
        "subsystem: add a\n\nBody.\n\nChange-Id: I42\n",
    );
    let info = repo.read_commit(oid).unwrap();
    assert_eq!(info.subject(), "subsystem: add a");
    assert!(info.message.contains("Change-Id: I42"));
    assert_eq!(info.parents.len(), 1);
    assert!(!repo.is_merge(oid).unwrap());
    assert_eq!(repo.commit_subject(oid).unwrap(), "subsystem: add a");
}

#[test]
fn list_commits_is_oldest_first() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    let a = commit_file(dir.path(), "a.txt", "a\n", "a");
    let b = commit_file(dir.path(), "b.txt", "b\n", "b");
    let range = format!("{base}..HEAD");
    assert_eq!(repo.list_commits(&range).unwrap(), vec![a, b]);
}

#[test]
fn list_commits_bad_range_fails() {
    let (_dir, repo) = setup_repo();
    assert!(matches!(
        repo.list_commits("v9.9..nowhere"),
        Err(GitError::NotFound { .. })
    ));
}

#[test]
fn show_patch_has_no_header() {
    let (dir, repo) = setup_repo();
    let oid = commit_file(dir.path(), "a.txt", "hello\n", "add a");
    let patch = repo.show_patch(oid).unwrap();
    assert!(patch.starts_with("diff --git a/a.txt b/a.txt"), "{patch}");
    assert!(!patch.contains("add a"));
}

// ===========================================================================
// Sequencer
// ===========================================================================

#[test]
fn cherry_pick_commits_and_empty_pick_is_clean() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    let a = commit_file(dir.path(), "a.txt", "a\n", "add a");

    repo.reset_hard(&base.to_string()).unwrap();
    assert_eq!(repo.cherry_pick(a).unwrap(), StepOutcome::Committed);
    assert_eq!(repo.read_commit(head(dir.path())).unwrap().subject(), "add a");

    // Picking the same change again has nothing to add.
    assert_eq!(repo.cherry_pick(a).unwrap(), StepOutcome::Empty);
    assert!(repo.status().unwrap().is_empty());
    // No sequencer state left behind: a further pick must work normally.
    let b = {
        let tip = head(dir.path());
        let b = commit_file(dir.path(), "b.txt", "b\n", "add b");
        repo.reset_hard(&tip.to_string()).unwrap();
        b
    };
    assert_eq!(repo.cherry_pick(b).unwrap(), StepOutcome::Committed);
}

#[test]
fn conflicting_pick_reports_and_aborts() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    let theirs = commit_file(dir.path(), "base.txt", "theirs\n", "theirs");
    repo.reset_hard(&base.to_string()).unwrap();
    commit_file(dir.path(), "base.txt", "ours\n", "ours");
    let before = head(dir.path());

    let err = repo.cherry_pick(theirs).unwrap_err();
    assert!(matches!(err, GitError::MergeConflict { .. }), "{err}");
    let status = repo.status().unwrap();
    assert!(status.iter().any(|e| e.is_unmerged() && e.path == "base.txt"));
    assert!(!repo.is_resolved().unwrap());

    repo.abort_in_progress().unwrap();
    assert_eq!(head(dir.path()), before);
    assert!(repo.status().unwrap().is_empty());
    // Second abort is a no-op.
    repo.abort_in_progress().unwrap();
}

#[test]
fn resolved_conflict_continues() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    let theirs = commit_file(dir.path(), "base.txt", "theirs\n", "theirs");
    repo.reset_hard(&base.to_string()).unwrap();
    commit_file(dir.path(), "base.txt", "ours\n", "ours");

    assert!(repo.cherry_pick(theirs).is_err());
    std::fs::write(dir.path().join("base.txt"), "merged\n").unwrap();
    git(dir.path(), &["add", "base.txt"]);
    assert!(repo.is_resolved().unwrap());
    assert_eq!(repo.continue_in_progress().unwrap(), StepOutcome::Committed);
    assert_eq!(repo.read_commit(head(dir.path())).unwrap().subject(), "theirs");
}

#[test]
fn revert_undoes_commit() {
    let (dir, repo) = setup_repo();
    let a = commit_file(dir.path(), "a.txt", "a\n", "add a");
    assert_eq!(repo.revert(a).unwrap(), StepOutcome::Committed);
    assert!(!dir.path().join("a.txt").exists());
    assert!(repo.commit_subject(head(dir.path())).unwrap().starts_with("Revert"));
}

// ===========================================================================
// Commit / squash / diff
// ===========================================================================

#[test]
fn squash_last_combines_commits() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    commit_file(dir.path(), "a.txt", "a\n", "add a");
    commit_file(dir.path(), "b.txt", "b\n", "add b");

    assert_eq!(
        repo.squash_last(2, "Squash: [add a, add b]").unwrap(),
        StepOutcome::Committed
    );
    let tip = head(dir.path());
    assert_eq!(repo.read_commit(tip).unwrap().parents, vec![base]);
    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn squash_that_cancels_out_is_empty() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    let a = commit_file(dir.path(), "a.txt", "a\n", "add a");
    repo.revert(a).unwrap();

    assert_eq!(repo.squash_last(2, "Squash").unwrap(), StepOutcome::Empty);
    assert_eq!(head(dir.path()), base);
}

#[test]
fn diff_apply_and_commit_all() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    commit_file(dir.path(), "a.txt", "a\n", "add a");
    git(dir.path(), &["branch", "target"]);
    repo.reset_hard(&base.to_string()).unwrap();

    let patch = repo.diff("HEAD..target").unwrap();
    assert!(!patch.is_empty());
    repo.apply_patch(&patch).unwrap();
    assert_eq!(
        repo.commit_all("remaining diff").unwrap(),
        StepOutcome::Committed
    );
    assert!(repo.diff("HEAD..target").unwrap().is_empty());
    assert_eq!(repo.commit_all("nothing").unwrap(), StepOutcome::Empty);
    // Empty patch text is accepted.
    repo.apply_patch("").unwrap();
}

#[test]
fn patch_text_ignores_user_diff_config() {
    let (dir, repo) = setup_repo();
    let base = head(dir.path());
    let oid = commit_file(dir.path(), "a.txt", "a\n", "add a");
    git(dir.path(), &["branch", "target"]);
    repo.reset_hard(&base.to_string()).unwrap();
    git(dir.path(), &["config", "diff.noprefix", "true"]);
    git(dir.path(), &["config", "diff.external", "echo"]);

    assert!(repo.show_patch(oid).unwrap().starts_with("diff --git a/a.txt b/a.txt"));
    let patch = repo.diff("HEAD..target").unwrap();
    assert!(patch.starts_with("diff --git a/a.txt b/a.txt"), "{patch}");
    repo.apply_patch(&patch).unwrap();
    assert_eq!(
        repo.commit_all("remaining diff").unwrap(),
        StepOutcome::Committed
    );
    assert!(repo.diff("HEAD..target").unwrap().is_empty());
}

// ===========================================================================
// Refs and worktrees
// ===========================================================================

#[test]
fn create_branch_refuses_existing() {
    let (_dir, repo) = setup_repo();
    repo.create_branch("topic", "HEAD").unwrap();
    let err = repo.create_branch("topic", "HEAD").unwrap_err();
    assert!(matches!(err, GitError::RefConflict { .. }), "{err}");
    repo.checkout("topic").unwrap();
}

#[test]
fn linked_worktree_lifecycle() {
    let (dir, repo) = setup_repo();
    let tip = head(dir.path());
    let scratch = TempDir::new().unwrap();
    let path = scratch.path().join("trial");

    repo.worktree_add(&path, tip).unwrap();
    let linked = GitCli::open(&path).unwrap();
    assert_eq!(linked.rev_parse("HEAD").unwrap(), tip);
    commit_file(&path, "scratch.txt", "x\n", "scratch only");
    // The main checkout is untouched.
    assert_eq!(head(dir.path()), tip);

    repo.worktree_remove(&path).unwrap();
    assert!(!path.exists());
}
