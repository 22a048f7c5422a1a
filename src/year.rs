//! `year` command: run every monthly window of a year, then fold the
//! monthly summaries into yearly rollups for repos, subsystems and users.
//!
//! The current year only covers the months that have started; a future
//! year warns but still runs all twelve. The yearly window keeps its full
//! Jan 1 .. Dec 31 label even when fewer months contributed.

use crate::cli::CommonArgs;
use crate::config::AppConfig;
use crate::git::GitClient;
use crate::model::{AuthorSummary, DateWindow, RepoSummary, SubsystemSummary};
use crate::rollup::{rollup_author_year, rollup_repo_year, rollup_subsystem_year};
use crate::store::Store;
use crate::{authors, ownership, subsystems, summary};
use anyhow::Context;
use chrono::{Datelike, Utc};
use console::style;
use std::path::Path;
use tracing::{info, warn};

/// Monthly windows of `year`. The current year stops at the month that has
/// started as of `today`; a future year warns but still yields all twelve,
/// producing empty summaries rather than refusing the run.
pub fn months_of(year: i32, today: chrono::NaiveDate) -> Vec<DateWindow> {
    if year > today.year() {
        warn!(year, "year is in the future, results may be empty");
    }
    let last = if year == today.year() {
        today.month()
    } else {
        12
    };
    (1..=last)
        .filter_map(|m| DateWindow::month(year, m).ok())
        .collect()
}

fn monthly_windows_of_year(windows: Vec<DateWindow>, year: i32) -> Vec<DateWindow> {
    windows
        .into_iter()
        .filter(|w| w.is_monthly() && w.from.year() == year)
        .collect()
}

/// Fold stored monthly summaries into yearly ones. Returns
/// (repos, subsystems, users) written.
pub fn rollup_year(store: &Store, year: i32) -> anyhow::Result<(usize, usize, usize)> {
    let yearly = DateWindow::year(year)?;
    let label = yearly.label();

    let mut repos_written = 0;
    for repo_id in store.list_repo_ids() {
        let mut monthlies = Vec::new();
        for window in monthly_windows_of_year(store.repo_windows(&repo_id), year) {
            let path = store.repo_summary_path(&repo_id, &window.label());
            match Store::read_json::<RepoSummary>(&path) {
                Ok(summary) => monthlies.push(summary),
                Err(err) => warn!(path = %path.display(), %err, "skipping unreadable summary"),
            }
        }
        if let Some(summary) = rollup_repo_year(year, monthlies) {
            store.write_json(&store.repo_summary_path(&repo_id, &label), &summary)?;
            repos_written += 1;
        }
    }

    let mut subsystems_written = 0;
    for dir in store.list_subsystem_dirs() {
        let mut monthlies = Vec::new();
        for window in monthly_windows_of_year(store.subsystem_windows(&dir), year) {
            let path = store.subsystem_summary_path(&dir, &window.label());
            match Store::read_json::<SubsystemSummary>(&path) {
                Ok(summary) => monthlies.push(summary),
                Err(err) => warn!(path = %path.display(), %err, "skipping unreadable summary"),
            }
        }
        if let Some(summary) = rollup_subsystem_year(year, monthlies) {
            store.write_json(&store.subsystem_summary_path(&dir, &label), &summary)?;
            subsystems_written += 1;
        }
    }

    let mut users_written = 0;
    for slug in store.list_user_slugs() {
        let mut monthlies = Vec::new();
        for window in monthly_windows_of_year(store.user_windows(&slug), year) {
            let path = store.user_summary_path(&slug, &window.label());
            match Store::read_json::<AuthorSummary>(&path) {
                Ok(summary) => monthlies.push(summary),
                Err(err) => warn!(path = %path.display(), %err, "skipping unreadable summary"),
            }
        }
        if let Some(summary) = rollup_author_year(year, monthlies) {
            store.write_json(&store.user_summary_path(&slug, &label), &summary)?;
            users_written += 1;
        }
    }

    Ok((repos_written, subsystems_written, users_written))
}

pub fn run_year(
    repos_root: &Path,
    store: &Store,
    config: &AppConfig,
    year: i32,
    skip_blame: bool,
    max_workers: Option<usize>,
) -> anyhow::Result<()> {
    let months = months_of(year, Utc::now().date_naive());
    for window in &months {
        info!(window = %window.label(), "processing month");
        summary::run(repos_root, store, config, window, max_workers)?;
        subsystems::run(repos_root, store, config, window, max_workers)?;
        authors::run(repos_root, store, config, window, max_workers)?;
    }

    let (repos, subs, users) = rollup_year(store, year)?;
    println!(
        "{} {} months, rollups for {} repos, {} subsystems, {} users",
        style(format!("year {year}:")).bold(),
        months.len(),
        repos,
        subs,
        users
    );

    if !skip_blame {
        let report = ownership::run(repos_root, store, config, max_workers)?;
        println!(
            "{} {} repositories blamed, {} files skipped",
            style("blame:").bold(),
            report.tasks_done,
            report.files_skipped
        );
    }
    Ok(())
}

pub fn exec(common: CommonArgs, year: i32, skip_blame: bool) -> anyhow::Result<()> {
    GitClient::ensure_available().context("git is required")?;
    let config = AppConfig::load(&common.config_dir);
    let store = Store::new(&common.output_root);
    run_year(
        &common.repos_root,
        &store,
        &config,
        year,
        skip_blame,
        common.max_workers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn past_year_has_twelve_months() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let months = months_of(2024, today);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].label(), "2024-01-01_2024-01-31");
        assert_eq!(months[11].label(), "2024-12-01_2024-12-31");
    }

    #[test]
    fn current_year_stops_at_the_running_month() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let months = months_of(2026, today);
        assert_eq!(months.len(), 3);
        assert_eq!(months[2].label(), "2026-03-01_2026-03-31");
    }

    #[test]
    fn future_year_still_yields_all_twelve_months() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let months = months_of(2027, today);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].label(), "2027-01-01_2027-01-31");
        assert_eq!(months[11].label(), "2027-12-01_2027-12-31");
    }

    #[test]
    fn leap_february_gets_its_29th() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let months = months_of(2024, today);
        assert_eq!(months[1].label(), "2024-02-01_2024-02-29");
    }
}
