//! All repository access goes through the `git` CLI; this module owns the
//! process plumbing: spawning with a hard timeout, the specific invocations
//! the pipelines need, and repository discovery.

use crate::error::{GitownError, Result};
use crate::model::DateWindow;
use ignore::WalkBuilder;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Per-invocation ceiling. A unit that exceeds it is skipped, not retried.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured output of a finished child process. stdout is kept as bytes:
/// blame output of non-UTF8 files is decoded lossily by the caller.
pub struct CapturedOutput {
    pub status_success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Run a command, killing it if it outlives `timeout`.
///
/// Readers drain stdout/stderr on their own threads so a chatty child can
/// never deadlock on a full pipe while we poll for exit.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CapturedOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn()?;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_thread = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_thread.join();
            let _ = stderr_thread.join();
            return Err(GitownError::Timeout(
                timeout.as_secs(),
                format!("{program} {}", args.join(" ")),
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_thread
        .join()
        .map_err(|_| GitownError::Run("stdout reader panicked".to_string()))?;
    let stderr = stderr_thread
        .join()
        .map_err(|_| GitownError::Run("stderr reader panicked".to_string()))?;

    Ok(CapturedOutput {
        status_success: status.success(),
        stdout,
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// Thin wrapper over the git invocations the pipelines use.
#[derive(Debug, Clone)]
pub struct GitClient {
    timeout: Duration,
}

impl Default for GitClient {
    fn default() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
        }
    }
}

impl GitClient {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// A missing git binary is the one fatal environment error.
    pub fn ensure_available() -> Result<()> {
        match Command::new("git")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => Ok(()),
            Err(err) => Err(GitownError::GitMissing(err.to_string())),
        }
    }

    /// Non-merge commits in the inclusive window, headers plus numstat.
    /// `with_dates` adds a "YYYY-MM-DD HH" stamp to each header.
    pub fn log_numstat(
        &self,
        repo_path: &Path,
        window: &DateWindow,
        with_dates: bool,
    ) -> Result<String> {
        let since = format!("--since={}", window.from);
        let until = format!("--until={}", window.to);
        let pretty = if with_dates {
            "--pretty=format:%H%x01%an%x01%ae%x01%ad"
        } else {
            "--pretty=format:%H%x01%an%x01%ae"
        };
        let mut args = vec![
            "log",
            since.as_str(),
            until.as_str(),
            "--no-merges",
            pretty,
            "--numstat",
        ];
        if with_dates {
            args.insert(4, "--date=format:%Y-%m-%d %H");
        }
        let output = run_with_timeout("git", &args, Some(repo_path), self.timeout)?;
        if !output.status_success {
            return Err(GitownError::Git(format!(
                "git log failed in {}: {}",
                repo_path.display(),
                output.stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Tracked files of the current tree.
    pub fn ls_files(&self, repo_path: &Path) -> Result<Vec<String>> {
        let output = run_with_timeout("git", &["ls-files"], Some(repo_path), self.timeout)?;
        if !output.status_success {
            return Err(GitownError::Git(format!(
                "git ls-files failed in {}: {}",
                repo_path.display(),
                output.stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Porcelain blame of one file. `Ok(None)` covers the non-fatal per-file
    /// failures (binary oddities, nonzero exit); timeouts surface as errors
    /// so the caller can log the skip.
    pub fn blame_file(&self, repo_path: &Path, file: &str) -> Result<Option<String>> {
        let output = run_with_timeout(
            "git",
            &["blame", "--line-porcelain", "--", file],
            Some(repo_path),
            self.timeout,
        )?;
        if !output.status_success {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }
}

/// Find every directory under `root` that contains a `.git` directory.
/// Returned as sorted, `/`-separated paths relative to `root`.
pub fn discover_repos(root: &Path) -> Vec<String> {
    if !root.is_dir() {
        return Vec::new();
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    let mut repos = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_dir() || !path.join(".git").is_dir() {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            let rel = rel_to_slash(rel);
            if !rel.is_empty() {
                repos.push(rel);
            }
        }
    }
    repos.sort();
    repos
}

fn rel_to_slash(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Absolute path of one discovered repository.
pub fn repo_path(root: &Path, repo_id: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in repo_id.split('/') {
        path.push(part);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn run_with_timeout_captures_output() {
        let out = run_with_timeout("echo", &["hello"], None, Duration::from_secs(5)).unwrap();
        assert!(out.status_success);
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn run_with_timeout_kills_slow_commands() {
        let err = run_with_timeout("sleep", &["10"], None, Duration::from_millis(200));
        assert!(matches!(err, Err(GitownError::Timeout(_, _))));
    }

    #[test]
    fn discover_finds_nested_repos() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("owner/repo-a/.git")).unwrap();
        fs::create_dir_all(dir.path().join("repo-b/.git")).unwrap();
        fs::create_dir_all(dir.path().join("not-a-repo/src")).unwrap();

        let repos = discover_repos(dir.path());
        assert_eq!(repos, vec!["owner/repo-a".to_string(), "repo-b".to_string()]);
    }

    #[test]
    fn discover_missing_root_is_empty() {
        assert!(discover_repos(Path::new("/no/such/root")).is_empty());
    }
}
