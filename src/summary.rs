//! `summary` command: per-repository commit attribution for one window.

use crate::accumulate::RepoAccumulator;
use crate::cli::CommonArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::git::{self, GitClient};
use crate::history::parse_log;
use crate::model::{DateWindow, RepoSummary};
use crate::runner::{build_pool, RunContext, RunReport};
use crate::store::Store;
use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

pub(crate) fn progress_bar(len: u64, msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(msg);
    pb
}

/// Attribute one window across every repository under `repos_root` and
/// write a summary per repo that had activity.
pub fn run(
    repos_root: &Path,
    store: &Store,
    config: &AppConfig,
    window: &DateWindow,
    max_workers: Option<usize>,
) -> anyhow::Result<RunReport> {
    let mut ctx = RunContext::new("summary");
    ctx.start();

    let repos = git::discover_repos(repos_root);
    if repos.is_empty() {
        warn!(root = %repos_root.display(), "no repositories found");
        return Ok(ctx.complete());
    }
    info!(repos = repos.len(), window = %window.label(), "attributing commits");

    let pool = build_pool(repos.len(), max_workers)?;
    let pb = progress_bar(repos.len() as u64, "Attributing commits");
    let client = GitClient::new();

    let results: Vec<(String, Result<Option<RepoSummary>>)> = pool.install(|| {
        repos
            .par_iter()
            .map(|repo_id| {
                let path = git::repo_path(repos_root, repo_id);
                let result = client.log_numstat(&path, window, false).map(|log| {
                    let mut acc = RepoAccumulator::new(repo_id, *window);
                    for event in parse_log(&log) {
                        acc.add_commit(&event, &config.identity, &config.services);
                    }
                    acc.finalize()
                });
                pb.inc(1);
                (repo_id.clone(), result)
            })
            .collect()
    });
    pb.finish_and_clear();

    for (repo_id, result) in results {
        match result {
            Ok(Some(summary)) => {
                let path = store.repo_summary_path(&repo_id, &window.label());
                store.write_json(&path, &summary)?;
                ctx.task_done();
            }
            Ok(None) => ctx.task_done(),
            Err(err) => {
                warn!(repo = %repo_id, %err, "skipping repository");
                ctx.repo_skipped();
            }
        }
    }
    Ok(ctx.complete())
}

pub fn exec(common: CommonArgs, from: String, to: String) -> anyhow::Result<()> {
    GitClient::ensure_available().context("git is required")?;
    let window = DateWindow::parse(&from, &to).context("Failed to parse date window")?;
    let config = AppConfig::load(&common.config_dir);
    let store = Store::new(&common.output_root);

    let report = run(
        &common.repos_root,
        &store,
        &config,
        &window,
        common.max_workers,
    )?;

    println!(
        "{} {} repositories attributed, {} skipped",
        style("summary:").bold(),
        report.tasks_done,
        report.repos_skipped
    );
    Ok(())
}
