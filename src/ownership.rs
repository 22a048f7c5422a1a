//! `blame` command: line-ownership snapshot of every repository's current
//! tree. One porcelain blame per tracked file; a file whose blame times out
//! is skipped and counted, never retried.

use crate::accumulate::BlameAccumulator;
use crate::cli::CommonArgs;
use crate::config::AppConfig;
use crate::error::{GitownError, Result};
use crate::git::{self, GitClient};
use crate::model::BlameSummary;
use crate::runner::{build_pool, RunContext, RunReport};
use crate::store::Store;
use crate::summary::progress_bar;
use anyhow::Context;
use console::style;
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

struct RepoBlame {
    summary: Option<BlameSummary>,
    files_skipped: usize,
}

fn blame_repo(
    client: &GitClient,
    repo_root: &Path,
    repo_id: &str,
    config: &AppConfig,
) -> Result<RepoBlame> {
    let files = client.ls_files(repo_root)?;
    let mut acc = BlameAccumulator::new(repo_id);
    let mut files_skipped = 0usize;

    for file in &files {
        match client.blame_file(repo_root, file) {
            Ok(Some(porcelain)) => {
                acc.add_file(file, &porcelain, &config.identity, &config.services);
            }
            Ok(None) => files_skipped += 1,
            Err(GitownError::Timeout(secs, _)) => {
                warn!(repo = repo_id, file = %file, secs, "blame timed out, skipping file");
                files_skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(RepoBlame {
        summary: acc.finalize(),
        files_skipped,
    })
}

pub fn run(
    repos_root: &Path,
    store: &Store,
    config: &AppConfig,
    max_workers: Option<usize>,
) -> anyhow::Result<RunReport> {
    let mut ctx = RunContext::new("blame");
    ctx.start();

    let repos = git::discover_repos(repos_root);
    if repos.is_empty() {
        warn!(root = %repos_root.display(), "no repositories found");
        return Ok(ctx.complete());
    }
    info!(repos = repos.len(), "computing line ownership");

    let pool = build_pool(repos.len(), max_workers)?;
    let pb = progress_bar(repos.len() as u64, "Blaming repositories");
    let client = GitClient::new();

    let results: Vec<(String, Result<RepoBlame>)> = pool.install(|| {
        repos
            .par_iter()
            .map(|repo_id| {
                let path = git::repo_path(repos_root, repo_id);
                let result = blame_repo(&client, &path, repo_id, config);
                pb.inc(1);
                (repo_id.clone(), result)
            })
            .collect()
    });
    pb.finish_and_clear();

    for (repo_id, result) in results {
        match result {
            Ok(blame) => {
                ctx.files_skipped(blame.files_skipped);
                if let Some(summary) = blame.summary {
                    store.write_json(&store.blame_path(&repo_id), &summary)?;
                }
                ctx.task_done();
            }
            Err(err) => {
                warn!(repo = %repo_id, %err, "skipping repository");
                ctx.repo_skipped();
            }
        }
    }
    Ok(ctx.complete())
}

pub fn exec(common: CommonArgs) -> anyhow::Result<()> {
    GitClient::ensure_available().context("git is required")?;
    let config = AppConfig::load(&common.config_dir);
    let store = Store::new(&common.output_root);

    let report = run(&common.repos_root, &store, &config, common.max_workers)?;

    println!(
        "{} {} repositories blamed, {} skipped, {} files skipped",
        style("blame:").bold(),
        report.tasks_done,
        report.repos_skipped,
        report.files_skipped
    );
    Ok(())
}
