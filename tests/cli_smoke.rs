use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn init_git_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    assert!(Command::new("git")
        .args(["init"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "core.autocrlf", "false"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "user.email", "fixture@example.com"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["config", "user.name", "Fixture"])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn commit_as(dir: &Path, name: &str, email: &str, file: &str, content: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    assert!(Command::new("git")
        .args(["add", "."])
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
    assert!(Command::new("git")
        .args(["commit", "-m", &format!("add {file}")])
        .env("GIT_AUTHOR_NAME", name)
        .env("GIT_AUTHOR_EMAIL", email)
        .env("GIT_COMMITTER_NAME", name)
        .env("GIT_COMMITTER_EMAIL", email)
        .env("GIT_AUTHOR_DATE", "2025-03-10T12:00:00")
        .env("GIT_COMMITTER_DATE", "2025-03-10T12:00:00")
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn write_config(root: &Path, services_json: &str, ignore: &str) {
    let config = root.join("configuration");
    fs::create_dir_all(&config).unwrap();
    fs::write(config.join("services.json"), services_json).unwrap();
    fs::write(config.join("ignore_user.txt"), ignore).unwrap();
    fs::write(config.join("alias.json"), "{}").unwrap();
}

fn gitown(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gitown").unwrap();
    cmd.current_dir(root)
        .args(["--repos-root", "repos", "--output-root", "out", "--config-dir", "configuration"]);
    cmd
}

fn read_json(path: &Path) -> serde_json::Value {
    let body = fs::read_to_string(path).unwrap();
    serde_json::from_str(&body).unwrap()
}

const MARCH: [&str; 4] = ["--from", "2025-03-01", "--to", "2025-03-31"];

#[test]
fn summary_attributes_commits_per_service() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("repos/repo-a");
    init_git_repo(&repo);
    commit_as(&repo, "Alice", "alice@example.com", "src/api/handler.rs", "fn handle() {}\n");
    commit_as(&repo, "Bob", "bob@example.com", "docs/readme.md", "# readme\n");
    write_config(
        dir.path(),
        r#"{"repo-a": {"api": ["src/api"], "core": [""]}}"#,
        "",
    );

    let mut cmd = gitown(dir.path());
    cmd.arg("summary").args(MARCH);
    cmd.assert().success();

    let summary = read_json(
        &dir.path()
            .join("out/stats/repos/repo-a/2025-03-01_2025-03-31/summary.json"),
    );
    assert!(summary["services"]["api"]["developers"]["alice"].is_object());
    assert!(summary["services"]["core"]["developers"]["bob"].is_object());
    assert_eq!(summary["developers"]["alice"]["commits"], 1);
    assert_eq!(summary["developers"]["bob"]["commits"], 1);
    assert!(summary["top_developer"]["slug"].is_string());
}

#[test]
fn ignored_author_is_excluded_everywhere() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("repos/repo-a");
    init_git_repo(&repo);
    commit_as(&repo, "Alice", "alice@example.com", "src/lib.rs", "pub fn a() {}\n");
    commit_as(&repo, "CI Bot", "bot@example.com", "src/gen.rs", "pub fn g() {}\n");
    write_config(dir.path(), "{}", "bot@example.com\n");

    let mut cmd = gitown(dir.path());
    cmd.arg("summary").args(MARCH);
    cmd.assert().success();

    let summary = read_json(
        &dir.path()
            .join("out/stats/repos/repo-a/2025-03-01_2025-03-31/summary.json"),
    );
    assert!(summary["developers"]["alice"].is_object());
    assert!(summary["developers"].get("bot").is_none());
    assert_eq!(summary["top_developer"]["slug"], "alice");
}

#[test]
fn blame_snapshot_line_counts_are_consistent() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("repos/repo-a");
    init_git_repo(&repo);
    commit_as(&repo, "Alice", "alice@example.com", "src/a.rs", "one\ntwo\nthree\n");
    commit_as(&repo, "Bob", "bob@example.com", "src/b.rs", "four\n");
    write_config(dir.path(), "{}", "");

    let mut cmd = gitown(dir.path());
    cmd.arg("blame");
    cmd.assert().success();

    let blame = read_json(&dir.path().join("out/stats/repos/repo-a/blame/blame.json"));
    let total = blame["total_lines"].as_u64().unwrap();
    let dev_sum: u64 = blame["developers"]
        .as_object()
        .unwrap()
        .values()
        .map(|d| d["lines"].as_u64().unwrap())
        .sum();
    assert_eq!(total, dev_sum);
    assert_eq!(blame["developers"]["alice"]["lines"], 3);
    assert_eq!(blame["developers"]["bob"]["lines"], 1);
    assert_eq!(blame["top_developer"]["slug"], "alice");
    assert!((blame["top_developer"]["share"].as_f64().unwrap() - 0.75).abs() < 1e-9);
}

#[test]
fn unmapped_repos_with_same_name_share_a_subsystem() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    // two different teams, same trailing service name, no services.json
    for team in ["team-a", "team-b"] {
        let repo = dir.path().join(format!("repos/{team}/billing"));
        init_git_repo(&repo);
        commit_as(&repo, "Alice", "alice@example.com", "src/lib.rs", "pub fn a() {}\n");
    }
    write_config(dir.path(), "{}", "");

    let mut cmd = gitown(dir.path());
    cmd.arg("subsystems").args(MARCH);
    cmd.assert().success();

    let summary = read_json(
        &dir.path()
            .join("out/stats/subsystems/billing/2025-03-01_2025-03-31/summary.json"),
    );
    assert_eq!(summary["service"], "billing");
    // one commit per repo, summed into the shared subsystem
    assert_eq!(summary["total_commits"], 2);
    assert_eq!(summary["repositories"].as_object().unwrap().len(), 2);
    assert_eq!(summary["developers"]["alice"]["commits"], 2);
}

#[test]
fn authors_summary_records_temporal_buckets() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("repos/repo-a");
    init_git_repo(&repo);
    commit_as(&repo, "Alice", "alice@example.com", "src/lib.rs", "pub fn a() {}\n");
    write_config(dir.path(), "{}", "");

    let mut cmd = gitown(dir.path());
    cmd.arg("authors").args(MARCH);
    cmd.assert().success();

    let summary = read_json(
        &dir.path()
            .join("out/stats/users/alice/2025-03-01_2025-03-31/summary.json"),
    );
    assert_eq!(summary["author_slug"], "alice");
    assert_eq!(summary["total_commits"], 1);
    // 2025-03-10 is a Monday
    assert_eq!(summary["per_weekday"]["Monday"]["commits"], 1);
    assert_eq!(summary["per_date"]["2025-03-10"]["commits"], 1);
    assert_eq!(summary["per_repo"]["repo-a"]["commits"], 1);
}

#[test]
fn window_outside_activity_writes_nothing() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("repos/repo-a");
    init_git_repo(&repo);
    commit_as(&repo, "Alice", "alice@example.com", "src/lib.rs", "pub fn a() {}\n");
    write_config(dir.path(), "{}", "");

    let mut cmd = gitown(dir.path());
    cmd.arg("summary").args(["--from", "2020-01-01", "--to", "2020-01-31"]);
    cmd.assert().success();

    assert!(!dir
        .path()
        .join("out/stats/repos/repo-a/2020-01-01_2020-01-31/summary.json")
        .exists());
}
