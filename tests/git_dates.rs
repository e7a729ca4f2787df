//! Integration tests for page dates read from git history.

use git2::{Repository as GitRepository, Signature, Time};
use sitefeed::git::Repository;
use sitefeed::util::{DateSource, FileDates, Util};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

const FIRST: i64 = 1_600_000_000;
const SECOND: i64 = 1_650_000_000;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// History queries shell out to `git`; without it there is nothing to test.
fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn create_test_repo() -> (TempDir, GitRepository) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let repo = GitRepository::init(temp_dir.path()).expect("Failed to init test repository");
    (temp_dir, repo)
}

/// Writes `contents` to `relative` and commits it with author and committer
/// time `time`.
fn commit_file(
    repo: &GitRepository,
    relative: &str,
    contents: &str,
    time: i64,
) -> Result<(), git2::Error> {
    let workdir = repo.workdir().expect("non-bare repository");
    let path = workdir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directories");
    }
    fs::write(&path, contents).expect("Failed to write file");

    let mut index = repo.index()?;
    index.add_path(Path::new(relative))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = Signature::new("Tester", "tester@example.org", &Time::new(time, 0))?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        &format!("update {}", relative),
        &tree,
        &parents,
    )?;
    Ok(())
}

fn util_for(path: &Path) -> Util {
    Util::with_timeouts(path, Duration::from_secs(30), Duration::from_secs(5))
        .expect("Failed to build util")
}

#[test]
fn test_dates_from_history() -> TestResult {
    if !git_available() {
        return Ok(());
    }
    let (temp_dir, repo) = create_test_repo();
    commit_file(&repo, "docs/post.md", "first", FIRST)?;
    commit_file(&repo, "docs/post.md", "second", SECOND)?;

    let mut util = util_for(temp_dir.path());
    assert!(util.repository().is_valid());

    let dates = util.get_file_dates(&temp_dir.path().join("docs").join("post.md"));
    assert_eq!(
        FileDates {
            created: FIRST,
            updated: SECOND,
            source: DateSource::History,
        },
        dates
    );
    assert!(dates.created <= dates.updated);
    Ok(())
}

#[test]
fn test_single_commit_gives_equal_dates() -> TestResult {
    if !git_available() {
        return Ok(());
    }
    let (temp_dir, repo) = create_test_repo();
    commit_file(&repo, "index.md", "home", FIRST)?;
    commit_file(&repo, "other.md", "other", SECOND)?;

    let mut util = util_for(temp_dir.path());
    let dates = util.get_file_dates(&temp_dir.path().join("index.md"));
    assert_eq!((FIRST, FIRST), (dates.created, dates.updated));
    assert_eq!(DateSource::History, dates.source);
    Ok(())
}

#[test]
fn test_untracked_file_falls_back_to_build_time() -> TestResult {
    if !git_available() {
        return Ok(());
    }
    let (temp_dir, repo) = create_test_repo();
    commit_file(&repo, "index.md", "home", FIRST)?;
    fs::write(temp_dir.path().join("draft.md"), "draft")?;

    let mut util = util_for(temp_dir.path());
    let dates = util.get_file_dates(&temp_dir.path().join("draft.md"));
    assert_eq!(DateSource::BuildTime, dates.source);
    assert_eq!((util.build_time(), util.build_time()), (dates.created, dates.updated));

    // one bad file doesn't disable history for the others
    assert!(util.repository().is_valid());
    let dates = util.get_file_dates(&temp_dir.path().join("index.md"));
    assert_eq!(DateSource::History, dates.source);
    Ok(())
}

#[test]
fn test_nested_path_finds_repository() -> TestResult {
    if !git_available() {
        return Ok(());
    }
    let (temp_dir, repo) = create_test_repo();
    commit_file(&repo, "docs/blog/post.md", "post", FIRST)?;

    let mut util = util_for(&temp_dir.path().join("docs").join("blog"));
    let dates = util.get_file_dates(&temp_dir.path().join("docs").join("blog").join("post.md"));
    assert_eq!((FIRST, FIRST), (dates.created, dates.updated));
    Ok(())
}

#[test]
fn test_no_repository_falls_back_to_build_time() -> TestResult {
    let temp_dir = TempDir::new()?;
    fs::write(temp_dir.path().join("index.md"), "home")?;

    let mut util = util_for(temp_dir.path());
    assert!(matches!(util.repository(), Repository::Unavailable));

    let dates = util.get_file_dates(&temp_dir.path().join("index.md"));
    assert_eq!(
        FileDates {
            created: util.build_time(),
            updated: util.build_time(),
            source: DateSource::BuildTime,
        },
        dates
    );
    Ok(())
}
