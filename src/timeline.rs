//! Historical ownership reconstruction.
//!
//! Blame gives ownership *now*; monthly subsystem summaries give net line
//! deltas per developer per month. Walking the deltas backward from the
//! current snapshot approximates what ownership looked like at each month
//! end. The approximation cannot tell added lines from rewritten ones, and
//! drifts the further back it goes; it is a trend line, not an audit.

use crate::cli::CommonArgs;
use crate::error::Result;
use crate::identity::slugify;
use crate::model::{BlameSummary, SubsystemSummary, SCHEMA_VERSION};
use crate::store::Store;
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Net line deltas for one month, keyed by developer slug.
#[derive(Debug, Clone)]
pub struct MonthlyDeltas {
    /// "YYYY-MM"
    pub month: String,
    pub per_dev: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OwnershipPoint {
    pub month: String,
    /// Fraction of the subsystem's lines owned at that month's end, 0 when
    /// the reconstructed total is not positive.
    pub share: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnershipSeries {
    pub slug: String,
    pub display_name: String,
    pub current_lines: u64,
    pub points: Vec<OwnershipPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineOutput {
    pub version: u32,
    pub subsystem: String,
    pub total_lines: u64,
    pub months: Vec<String>,
    pub series: Vec<OwnershipSeries>,
}

/// Reconstruct per-developer ownership shares, one point per month,
/// oldest first.
///
/// Walks the months newest to oldest. For each month the share is recorded
/// from the running state (the state *after* that month's changes), then the
/// month's deltas are backed out: each tracked developer loses their own
/// delta, the total loses the sum of everyone's deltas. Lines clamp at 0
/// per developer and the total clamps at 1, so a noisy history can never
/// drive shares negative or divide by zero.
pub fn reconstruct_shares(
    current: &BTreeMap<String, u64>,
    total_lines: u64,
    months: &[MonthlyDeltas],
) -> BTreeMap<String, Vec<OwnershipPoint>> {
    let mut dev_lines: BTreeMap<String, i64> =
        current.iter().map(|(s, &l)| (s.clone(), l as i64)).collect();
    let mut total = total_lines as i64;

    let mut series: BTreeMap<String, Vec<OwnershipPoint>> = current
        .keys()
        .map(|slug| (slug.clone(), Vec::with_capacity(months.len())))
        .collect();

    for month in months.iter().rev() {
        for (slug, points) in series.iter_mut() {
            let lines = dev_lines.get(slug).copied().unwrap_or(0);
            let share = if total > 0 {
                lines as f64 / total as f64
            } else {
                0.0
            };
            points.push(OwnershipPoint {
                month: month.month.clone(),
                share,
            });
        }

        let month_total: i64 = month.per_dev.values().sum();
        for (slug, lines) in dev_lines.iter_mut() {
            if let Some(delta) = month.per_dev.get(slug) {
                *lines = (*lines - delta).max(0);
            }
        }
        total = (total - month_total).max(1);
    }

    for points in series.values_mut() {
        points.reverse();
    }
    series
}

/// Assemble inputs from the stats store and reconstruct the series for the
/// top current owners of one subsystem.
pub fn compute_timeline(store: &Store, subsystem: &str, top: usize) -> Result<TimelineOutput> {
    // current snapshot: this subsystem's lines summed across all repo blames
    let mut current: BTreeMap<String, u64> = BTreeMap::new();
    let mut display_names: BTreeMap<String, String> = BTreeMap::new();
    let mut total_lines: u64 = 0;
    for path in store.list_blame_files() {
        let blame: BlameSummary = match Store::read_json(&path) {
            Ok(blame) => blame,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping unreadable blame file");
                continue;
            }
        };
        let Some(service) = blame.services.get(subsystem) else {
            continue;
        };
        total_lines += service.total_lines;
        for dev in service.developers.values() {
            *current.entry(dev.slug.clone()).or_default() += dev.lines;
            display_names
                .entry(dev.slug.clone())
                .or_insert_with(|| dev.display_name.clone());
        }
    }

    // keep only the top current owners
    let mut ranked: Vec<(String, u64)> = current.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top);
    let tracked: BTreeMap<String, u64> = ranked.into_iter().collect();

    // monthly net deltas from the subsystem's stored summaries
    let mut months = Vec::new();
    for window in store.subsystem_windows(subsystem) {
        if !window.is_monthly() {
            continue;
        }
        let path = store.subsystem_summary_path(subsystem, &window.label());
        let summary: SubsystemSummary = match Store::read_json(&path) {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping unreadable monthly summary");
                continue;
            }
        };
        let per_dev = summary
            .developers
            .values()
            .map(|d| (d.slug.clone(), d.net_lines))
            .collect();
        months.push(MonthlyDeltas {
            month: format!("{}", &window.from.format("%Y-%m")),
            per_dev,
        });
    }
    months.sort_by(|a, b| a.month.cmp(&b.month));

    let shares = reconstruct_shares(&tracked, total_lines, &months);
    let series = tracked
        .iter()
        .map(|(slug, &lines)| OwnershipSeries {
            slug: slug.clone(),
            display_name: display_names.get(slug).cloned().unwrap_or_default(),
            current_lines: lines,
            points: shares.get(slug).cloned().unwrap_or_default(),
        })
        .collect();

    Ok(TimelineOutput {
        version: SCHEMA_VERSION,
        subsystem: subsystem.to_string(),
        total_lines,
        months: months.into_iter().map(|m| m.month).collect(),
        series,
    })
}

pub fn exec(common: CommonArgs, subsystem: String, top: usize) -> anyhow::Result<()> {
    let store = Store::new(&common.output_root);
    info!(subsystem = %subsystem, slug = %slugify(&subsystem), "reconstructing ownership timeline");

    let output = compute_timeline(&store, &subsystem, top)
        .with_context(|| format!("Failed to reconstruct timeline for '{subsystem}'"))?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
