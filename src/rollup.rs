//! Fold monthly aggregates into yearly ones.
//!
//! The fold reuses the same `Merge` impls the workers use, so a yearly
//! rollup is just another merge. Top contributors are recomputed from the
//! merged totals: a month's precomputed winner is never trusted, because the
//! yearly winner can differ from every monthly one.

use crate::merge::Merge;
use crate::model::{
    pick_top_developer, pick_top_subsystem_developer, AuthorSummary, DateWindow, RepoSummary,
    SubsystemSummary,
};
use chrono::Utc;

/// Fold any mergeable parts; `None` when there is nothing to fold.
pub fn rollup<T: Merge>(parts: impl IntoIterator<Item = T>) -> Option<T> {
    let mut iter = parts.into_iter();
    let mut acc = iter.next()?;
    for part in iter {
        acc.absorb(part);
    }
    Some(acc)
}

pub fn rollup_author_year(
    year: i32,
    monthlies: Vec<AuthorSummary>,
) -> Option<AuthorSummary> {
    let window = DateWindow::year(year).ok()?;
    let mut yearly = rollup(monthlies)?;
    yearly.from = window.from.to_string();
    yearly.to = window.to.to_string();
    yearly.generated_at = Utc::now();
    Some(yearly)
}

pub fn rollup_subsystem_year(
    year: i32,
    monthlies: Vec<SubsystemSummary>,
) -> Option<SubsystemSummary> {
    let window = DateWindow::year(year).ok()?;
    let mut yearly = rollup(monthlies)?;
    yearly.from = window.from.to_string();
    yearly.to = window.to.to_string();
    yearly.top_developer = pick_top_subsystem_developer(&yearly.developers);
    yearly.generated_at = Utc::now();
    Some(yearly)
}

pub fn rollup_repo_year(year: i32, monthlies: Vec<RepoSummary>) -> Option<RepoSummary> {
    let window = DateWindow::year(year).ok()?;
    let mut yearly = rollup(monthlies)?;
    yearly.from = window.from.to_string();
    yearly.to = window.to.to_string();
    yearly.top_developer = pick_top_developer(&yearly.developers);
    yearly.generated_at = Utc::now();
    Some(yearly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DevStats, SubsystemDev};
    use pretty_assertions::assert_eq;

    fn month_summary(month: u32, devs: &[(&str, u64, u64)]) -> SubsystemSummary {
        let window = DateWindow::month(2025, month).unwrap();
        let mut s = SubsystemSummary::new("api", &window);
        for &(slug, changed, commits) in devs {
            let mut dev = SubsystemDev::new(slug);
            dev.commits = commits;
            dev.lines_added = changed;
            dev.changed_lines = changed;
            dev.net_lines = changed as i64;
            s.developers.insert(slug.to_string(), dev);
            s.total_commits += commits;
            s.total_lines_added += changed;
            s.total_changed_lines += changed;
        }
        s.top_developer = pick_top_subsystem_developer(&s.developers);
        s
    }

    #[test]
    fn empty_input_rolls_up_to_none() {
        assert!(rollup(Vec::<DevStats>::new()).is_none());
        assert!(rollup_subsystem_year(2025, Vec::new()).is_none());
    }

    #[test]
    fn yearly_top_is_recomputed_from_merged_totals() {
        // alice wins january, bob wins february, but bob wins the year
        let jan = month_summary(1, &[("alice", 100, 3), ("bob", 90, 2)]);
        let feb = month_summary(2, &[("alice", 10, 1), ("bob", 120, 4)]);
        assert_eq!(jan.top_developer.as_ref().unwrap().slug, "alice");

        let yearly = rollup_subsystem_year(2025, vec![jan, feb]).unwrap();
        assert_eq!(yearly.from, "2025-01-01");
        assert_eq!(yearly.to, "2025-12-31");
        assert_eq!(yearly.total_commits, 10);
        let top = yearly.top_developer.unwrap();
        assert_eq!(top.slug, "bob");
        assert_eq!(top.changed_lines, 210);
    }

    #[test]
    fn single_month_year_still_recomputes_top() {
        let mut jan = month_summary(1, &[("alice", 5, 1)]);
        // stale precomputed winner must not leak through
        jan.top_developer = None;
        let yearly = rollup_subsystem_year(2025, vec![jan]).unwrap();
        assert_eq!(yearly.top_developer.unwrap().slug, "alice");
    }

    #[test]
    fn rollup_is_order_invariant() {
        let months: Vec<_> = (1..=3)
            .map(|m| month_summary(m, &[("alice", 10 * m as u64, m as u64)]))
            .collect();
        let forward = rollup_subsystem_year(2025, months.clone()).unwrap();
        let mut reversed = months;
        reversed.reverse();
        let backward = rollup_subsystem_year(2025, reversed).unwrap();
        assert_eq!(forward.total_commits, backward.total_commits);
        assert_eq!(forward.total_changed_lines, backward.total_changed_lines);
        assert_eq!(
            forward.developers["alice"].changed_lines,
            backward.developers["alice"].changed_lines
        );
    }
}
