//! On-disk layout of the stats tree.
//!
//! ```text
//! <output>/stats/
//!   repos/<repo-id>/<from>_<to>/summary.json
//!   repos/<repo-id>/blame/blame.json
//!   users/<slug>/<from>_<to>/summary.json
//!   subsystems/<service-slug>/<from>_<to>/summary.json
//! ```
//!
//! Window directories are named by their inclusive date label, so a yearly
//! rollup can find its monthly inputs by parsing directory names alone.

use crate::error::Result;
use crate::identity::slugify;
use crate::model::DateWindow;
use ignore::WalkBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const SUMMARY_FILE: &str = "summary.json";
const BLAME_DIR: &str = "blame";
const BLAME_FILE: &str = "blame.json";

#[derive(Debug, Clone)]
pub struct Store {
    stats_root: PathBuf,
}

impl Store {
    pub fn new(output_root: &Path) -> Self {
        Self {
            stats_root: output_root.join("stats"),
        }
    }

    pub fn stats_root(&self) -> &Path {
        &self.stats_root
    }

    fn repo_dir(&self, repo_id: &str) -> PathBuf {
        let mut dir = self.stats_root.join("repos");
        for part in repo_id.split('/') {
            dir.push(part);
        }
        dir
    }

    pub fn repo_summary_path(&self, repo_id: &str, label: &str) -> PathBuf {
        self.repo_dir(repo_id).join(label).join(SUMMARY_FILE)
    }

    pub fn blame_path(&self, repo_id: &str) -> PathBuf {
        self.repo_dir(repo_id).join(BLAME_DIR).join(BLAME_FILE)
    }

    pub fn user_summary_path(&self, slug: &str, label: &str) -> PathBuf {
        self.stats_root
            .join("users")
            .join(slug)
            .join(label)
            .join(SUMMARY_FILE)
    }

    pub fn subsystem_summary_path(&self, service: &str, label: &str) -> PathBuf {
        self.stats_root
            .join("subsystems")
            .join(slugify(service))
            .join(label)
            .join(SUMMARY_FILE)
    }

    /// Pretty-printed JSON, parent directories created as needed.
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut body = serde_json::to_string_pretty(value)?;
        body.push('\n');
        fs::write(path, body)?;
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let body = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Every stored blame snapshot, sorted by path.
    pub fn list_blame_files(&self) -> Vec<PathBuf> {
        let repos_root = self.stats_root.join("repos");
        if !repos_root.is_dir() {
            return Vec::new();
        }
        let walker = WalkBuilder::new(&repos_root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false)
            .build();
        let mut files: Vec<PathBuf> = walker
            .flatten()
            .map(|e| e.into_path())
            .filter(|p| {
                p.file_name().map(|n| n == BLAME_FILE).unwrap_or(false)
                    && p.parent()
                        .and_then(Path::file_name)
                        .map(|n| n == BLAME_DIR)
                        .unwrap_or(false)
            })
            .collect();
        files.sort();
        files
    }

    /// Repo ids that have at least one stored window or blame snapshot.
    /// Ids are `/`-separated relative to `stats/repos`, mirroring discovery.
    pub fn list_repo_ids(&self) -> Vec<String> {
        let repos_root = self.stats_root.join("repos");
        if !repos_root.is_dir() {
            return Vec::new();
        }
        let walker = WalkBuilder::new(&repos_root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false)
            .build();
        let mut ids = Vec::new();
        for entry in walker.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => continue,
            };
            // a repo dir is recognized by its children, not its own name
            if name != BLAME_DIR && DateWindow::from_label(name).is_none() {
                continue;
            }
            let repo_dir = match path.parent() {
                Some(parent) => parent,
                None => continue,
            };
            if let Ok(rel) = repo_dir.strip_prefix(&repos_root) {
                let id = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !id.is_empty() && !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        ids
    }

    pub fn list_user_slugs(&self) -> Vec<String> {
        list_dir_names(&self.stats_root.join("users"))
    }

    pub fn list_subsystem_dirs(&self) -> Vec<String> {
        list_dir_names(&self.stats_root.join("subsystems"))
    }

    pub fn repo_windows(&self, repo_id: &str) -> Vec<DateWindow> {
        windows_in(&self.repo_dir(repo_id))
    }

    pub fn user_windows(&self, slug: &str) -> Vec<DateWindow> {
        windows_in(&self.stats_root.join("users").join(slug))
    }

    pub fn subsystem_windows(&self, service: &str) -> Vec<DateWindow> {
        windows_in(&self.stats_root.join("subsystems").join(slugify(service)))
    }
}

fn list_dir_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return names,
    };
    for entry in entries.flatten() {
        if entry.path().is_dir() {
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
    }
    names.sort();
    names
}

/// Window subdirectories of one entity directory, sorted by start date.
/// Names that are not date labels (like `blame/`) are skipped.
fn windows_in(dir: &Path) -> Vec<DateWindow> {
    let mut windows: Vec<DateWindow> = list_dir_names(dir)
        .iter()
        .filter_map(|name| DateWindow::from_label(name))
        .collect();
    windows.sort_by_key(|w| (w.from, w.to));
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlameSummary, DateWindow};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn paths_follow_the_layout() {
        let store = Store::new(Path::new("/out"));
        assert_eq!(
            store.repo_summary_path("owner/repo", "2025-01-01_2025-01-31"),
            Path::new("/out/stats/repos/owner/repo/2025-01-01_2025-01-31/summary.json")
        );
        assert_eq!(
            store.blame_path("repo"),
            Path::new("/out/stats/repos/repo/blame/blame.json")
        );
        assert_eq!(
            store.subsystem_summary_path("Payment API", "2025-01-01_2025-12-31"),
            Path::new("/out/stats/subsystems/payment-api/2025-01-01_2025-12-31/summary.json")
        );
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let window = DateWindow::month(2025, 3).unwrap();
        let blame = BlameSummary::new("repo");
        let path = store.blame_path("repo");
        store.write_json(&path, &blame).unwrap();
        let read: BlameSummary = Store::read_json(&path).unwrap();
        assert_eq!(read.repo, "repo");

        let summary_path = store.repo_summary_path("repo", &window.label());
        store.write_json(&summary_path, &blame).unwrap();
        assert!(summary_path.is_file());
    }

    #[test]
    fn window_listing_skips_non_label_dirs() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let repo_dir = store.stats_root().join("repos/repo");
        std::fs::create_dir_all(repo_dir.join("2025-02-01_2025-02-28")).unwrap();
        std::fs::create_dir_all(repo_dir.join("2025-01-01_2025-01-31")).unwrap();
        std::fs::create_dir_all(repo_dir.join("blame")).unwrap();

        let windows = store.repo_windows("repo");
        let labels: Vec<String> = windows.iter().map(|w| w.label()).collect();
        assert_eq!(labels, vec!["2025-01-01_2025-01-31", "2025-02-01_2025-02-28"]);
    }

    #[test]
    fn repo_ids_are_recovered_from_nested_layout() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        let root = store.stats_root().join("repos");
        std::fs::create_dir_all(root.join("owner/repo-a/blame")).unwrap();
        std::fs::create_dir_all(root.join("repo-b/2025-01-01_2025-01-31")).unwrap();
        std::fs::create_dir_all(root.join("stray/not-a-window")).unwrap();

        assert_eq!(
            store.list_repo_ids(),
            vec!["owner/repo-a".to_string(), "repo-b".to_string()]
        );
    }

    #[test]
    fn blame_files_are_found_across_repos() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        for repo in ["alpha", "owner/beta"] {
            let path = store.blame_path(repo);
            store.write_json(&path, &BlameSummary::new(repo)).unwrap();
        }
        let files = store.list_blame_files();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("alpha/blame/blame.json"));
        assert!(files[1].ends_with("owner/beta/blame/blame.json"));
    }
}
