//! `authors` command: per-author activity for one window, with language,
//! prod/test and temporal breakdowns.
//!
//! Language attribution runs `cloc` once per repository over the current
//! tree; when `cloc` is missing or fails, attribution degrades to
//! "Unknown" rather than failing the run.

use crate::accumulate::AuthorAccumulator;
use crate::cli::CommonArgs;
use crate::config::AppConfig;
use crate::error::Result;
use crate::git::{self, GitClient};
use crate::history::parse_log;
use crate::lang::LanguageMap;
use crate::merge::merge_maps;
use crate::model::{AuthorSummary, DateWindow};
use crate::runner::{build_pool, RunContext, RunReport};
use crate::store::Store;
use crate::summary::progress_bar;
use anyhow::Context;
use console::style;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

pub fn run(
    repos_root: &Path,
    store: &Store,
    config: &AppConfig,
    window: &DateWindow,
    max_workers: Option<usize>,
) -> anyhow::Result<RunReport> {
    let mut ctx = RunContext::new("authors");
    ctx.start();

    let repos = git::discover_repos(repos_root);
    if repos.is_empty() {
        warn!(root = %repos_root.display(), "no repositories found");
        return Ok(ctx.complete());
    }
    info!(repos = repos.len(), window = %window.label(), "attributing authors");

    let pool = build_pool(repos.len(), max_workers)?;
    let pb = progress_bar(repos.len() as u64, "Attributing authors");
    let client = GitClient::new();

    let partials: Vec<(String, Result<BTreeMap<String, AuthorSummary>>)> = pool.install(|| {
        repos
            .par_iter()
            .map(|repo_id| {
                let path = git::repo_path(repos_root, repo_id);
                let result = client.log_numstat(&path, window, true).map(|log| {
                    let languages = LanguageMap::scan(&path);
                    let mut acc = AuthorAccumulator::new(*window);
                    for event in parse_log(&log) {
                        acc.add_commit(repo_id, &event, &config.identity, &languages);
                    }
                    acc.finalize()
                });
                pb.inc(1);
                (repo_id.clone(), result)
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut authors: BTreeMap<String, AuthorSummary> = BTreeMap::new();
    for (repo_id, result) in partials {
        match result {
            Ok(partial) => {
                merge_maps(&mut authors, partial);
                ctx.task_done();
            }
            Err(err) => {
                warn!(repo = %repo_id, %err, "skipping repository");
                ctx.repo_skipped();
            }
        }
    }

    for (slug, summary) in &authors {
        let path = store.user_summary_path(slug, &window.label());
        store.write_json(&path, summary)?;
    }
    info!(authors = authors.len(), "author summaries written");
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
        style("authors:").bold(),
        report.tasks_done,
        report.repos_skipped
    );
    Ok(())
}
