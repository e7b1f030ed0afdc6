//! Build verification walks over a real branch.

mod common;

use std::path::Path;

use common::{Fixture, git};
use rebisect::Error;
use rebisect::config::VerifyConfig;
use rebisect::walk::{BuildResult, BuildVerifier, CommandVerifier, NO_ERROR_LINE, Walker};

/// Records the commit each build ran at; fails where `broken.txt` exists.
#[derive(Default)]
struct Recorder {
    heads: Vec<String>,
}

impl BuildVerifier for Recorder {
    fn build(&mut self, workdir: &Path) -> rebisect::Result<BuildResult> {
        self.heads.push(git(workdir, &["rev-parse", "HEAD"]));
        if workdir.join("broken.txt").exists() {
            return Ok(BuildResult {
                exit_code: Some(2),
                output: "CC a.o\nCC b.o\n\x1b[31merror: broken\x1b[0m\nmake: *** [all] Error 1\n"
                    .into(),
                error_line: Some(3),
            });
        }
        Ok(BuildResult {
            exit_code: Some(0),
            output: String::new(),
            error_line: None,
        })
    }
}

/// `main` with ten commits on `topic` above it.
fn branch_fixture() -> Fixture {
    let f = Fixture::new();
    f.commit(&[("base.txt", "base\n")], "initial commit");
    f.branch("topic", "main");
    for i in 1..=10 {
        let name = format!("f{i}.txt");
        f.commit(&[(name.as_str(), "x\n")], &format!("commit {i}"));
    }
    f.git(&["checkout", "-q", "main"]);
    f
}

#[test]
fn walk_visits_oldest_stop_first_and_ends_at_tip() {
    let f = branch_fixture();
    let repo = f.repo();
    let config = VerifyConfig::default();
    let mut recorder = Recorder::default();

    let report = Walker::new(&repo, &config)
        .walk("topic", "main", 3, &mut recorder)
        .unwrap();

    // ceil(10 / 3) = 4: topic~8, topic~4, topic.
    let expected: Vec<String> = ["topic~8", "topic~4", "topic"]
        .iter()
        .map(|r| f.git(&["rev-parse", r]))
        .collect();
    assert_eq!(recorder.heads, expected);
    assert_eq!(report.commits, 10);
    assert_eq!(report.stops.len(), 3);
    assert_eq!(report.stops[2].title, "commit 10");
    assert_eq!(report.failures().count(), 0);
    assert_eq!(f.git(&["symbolic-ref", "--short", "HEAD"]), "topic");
}

#[test]
fn failing_stop_reports_clean_excerpt() {
    let f = branch_fixture();
    f.git(&["checkout", "-q", "topic"]);
    f.commit(&[("broken.txt", "!\n")], "break the build");
    f.commit(&[("f11.txt", "x\n")], "after the break");
    f.git(&["checkout", "-q", "main"]);

    let repo = f.repo();
    let config = VerifyConfig {
        excerpt_lines: 2,
        ..VerifyConfig::default()
    };
    let report = Walker::new(&repo, &config)
        .walk("topic", "main", 80, &mut Recorder::default())
        .unwrap();

    assert_eq!(report.stops.len(), 12);
    let failed: Vec<&str> = report.failures().map(|s| s.title.as_str()).collect();
    assert_eq!(failed, vec!["break the build", "after the break"]);
    let excerpt = report.stops[11].excerpt.as_deref().unwrap();
    assert_eq!(excerpt, "CC b.o\nerror: broken");
    assert!(report.stops[0].excerpt.is_none());
}

#[test]
fn command_verifier_runs_in_checked_out_tree() {
    let f = branch_fixture();
    let repo = f.repo();
    let config = VerifyConfig::default();
    let mut verifier = CommandVerifier::new("test -f f5.txt || exit 3");

    let report = Walker::new(&repo, &config)
        .walk("topic", "main", 10, &mut verifier)
        .unwrap();

    let codes: Vec<Option<i32>> = report.stops.iter().map(|s| s.exit_code).collect();
    let mut expected = vec![Some(3); 4];
    expected.extend(vec![Some(0); 6]);
    assert_eq!(codes, expected);
    assert_eq!(report.stops[0].excerpt.as_deref(), Some(NO_ERROR_LINE));
}

#[test]
fn unknown_branch_is_a_bad_range() {
    let f = branch_fixture();
    let repo = f.repo();
    let config = VerifyConfig::default();
    let err = Walker::new(&repo, &config)
        .walk("nope", "main", 3, &mut Recorder::default())
        .unwrap_err();
    assert!(matches!(err, Error::BadRange { .. }), "{err}");
}
