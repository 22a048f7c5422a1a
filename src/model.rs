use crate::error::{GitownError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const SCHEMA_VERSION: u32 = 1;

/// Inclusive calendar date window. Serialized as the `from`/`to` fields of
/// every summary and as the `<from>_<to>` output directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        let from = NaiveDate::parse_from_str(from, "%Y-%m-%d")
            .map_err(|e| GitownError::InvalidDate(format!("{from}: {e}")))?;
        let to = NaiveDate::parse_from_str(to, "%Y-%m-%d")
            .map_err(|e| GitownError::InvalidDate(format!("{to}: {e}")))?;
        if from > to {
            return Err(GitownError::InvalidDate(format!(
                "window start {from} is after end {to}"
            )));
        }
        Ok(Self { from, to })
    }

    /// Full month window, e.g. 2025-02 -> 2025-02-01..2025-02-28.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| GitownError::InvalidDate(format!("{year}-{month:02}")))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| GitownError::InvalidDate(format!("{year}-{month:02}")))?;
        let to = next.pred_opt().unwrap_or(from);
        Ok(Self { from, to })
    }

    /// Jan 1 .. Dec 31 of `year`.
    pub fn year(year: i32) -> Result<Self> {
        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| GitownError::InvalidDate(format!("{year}")))?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| GitownError::InvalidDate(format!("{year}")))?;
        Ok(Self { from, to })
    }

    /// Directory label: "YYYY-MM-DD_YYYY-MM-DD".
    pub fn label(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }

    /// Inverse of [`DateWindow::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        let (from, to) = label.split_once('_')?;
        Self::parse(from, to).ok()
    }

    /// Naming heuristic only: a window is "yearly" iff it spans exactly
    /// Jan 1 to Dec 31 of one year. Nothing correctness-bearing hangs on it.
    pub fn is_yearly(&self) -> bool {
        self.from.year() == self.to.year()
            && self.from.month() == 1
            && self.from.day() == 1
            && self.to.month() == 12
            && self.to.day() == 31
    }

    /// True when the window covers exactly one full calendar month.
    pub fn is_monthly(&self) -> bool {
        if self.from.year() != self.to.year() || self.from.month() != self.to.month() {
            return false;
        }
        self.from.day() == 1 && self.to.succ_opt().map(|d| d.day()) == Some(1)
    }
}

/// Top contributor of a commit-delta aggregate, by changed lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopDeveloper {
    pub slug: String,
    pub display_name: String,
    pub changed_lines: u64,
    pub commits: u64,
}

/// Top owner of a blame aggregate, by surviving lines, with its share of
/// the total. Only meaningful when the total is positive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopOwner {
    pub slug: String,
    pub display_name: String,
    pub lines: u64,
    pub share: f64,
}

/// Per-developer commit-delta counters inside one scope (a service, a repo
/// or a subsystem).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DevStats {
    pub slug: String,
    pub display_name: String,
    pub emails: BTreeSet<String>,
    pub commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub net_lines: i64,
    pub changed_lines: u64,
}

impl DevStats {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            display_name: String::new(),
            emails: BTreeSet::new(),
            commits: 0,
            lines_added: 0,
            lines_deleted: 0,
            net_lines: 0,
            changed_lines: 0,
        }
    }

    /// Record a raw identity sighting: first non-empty display name sticks,
    /// emails accumulate as a set.
    pub fn note_identity(&mut self, display_name: &str, email: &str) {
        if self.display_name.is_empty() && !display_name.is_empty() {
            self.display_name = display_name.to_string();
        }
        if !email.is_empty() {
            self.emails.insert(email.to_string());
        }
    }

    pub fn add_delta(&mut self, additions: u64, deletions: u64) {
        self.lines_added += additions;
        self.lines_deleted += deletions;
        self.net_lines = self.lines_added as i64 - self.lines_deleted as i64;
        self.changed_lines = self.lines_added + self.lines_deleted;
    }
}

/// Per-service slice of a repository summary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceStats {
    pub developers: BTreeMap<String, DevStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_developer: Option<TopDeveloper>,
}

/// One repository, one window: commit deltas attributed to services and
/// developers. Written to `stats/repos/<repo>/<from>_<to>/summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
    pub repo: String,
    pub from: String,
    pub to: String,
    pub services: BTreeMap<String, ServiceStats>,
    pub developers: BTreeMap<String, DevStats>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_developer: Option<TopDeveloper>,
    pub generated_at: DateTime<Utc>,
}

/// Per-repo counters inside a subsystem summary.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RepoCounters {
    pub commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub net_lines: i64,
    pub changed_lines: u64,
}

impl RepoCounters {
    pub fn add_commit(&mut self, additions: u64, deletions: u64) {
        self.commits += 1;
        self.add_delta(additions, deletions);
    }

    pub fn add_delta(&mut self, additions: u64, deletions: u64) {
        self.lines_added += additions;
        self.lines_deleted += deletions;
        self.net_lines += additions as i64 - deletions as i64;
        self.changed_lines += additions + deletions;
    }
}

/// Developer record inside a subsystem summary, with a per-repo breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemDev {
    pub slug: String,
    pub display_name: String,
    pub emails: BTreeSet<String>,
    pub commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub net_lines: i64,
    pub changed_lines: u64,
    pub repositories: BTreeMap<String, RepoCounters>,
}

impl SubsystemDev {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            display_name: String::new(),
            emails: BTreeSet::new(),
            commits: 0,
            lines_added: 0,
            lines_deleted: 0,
            net_lines: 0,
            changed_lines: 0,
            repositories: BTreeMap::new(),
        }
    }

    pub fn note_identity(&mut self, display_name: &str, email: &str) {
        if self.display_name.is_empty() && !display_name.is_empty() {
            self.display_name = display_name.to_string();
        }
        if !email.is_empty() {
            self.emails.insert(email.to_string());
        }
    }
}

/// Per-repository slice of a subsystem summary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubsystemRepo {
    pub commits: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub net_lines: i64,
    pub changed_lines: u64,
    pub developers: BTreeMap<String, RepoCounters>,
}

/// One service across all repositories, one window. Written to
/// `stats/subsystems/<service>/<from>_<to>/summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemSummary {
    pub service: String,
    pub from: String,
    pub to: String,
    pub total_commits: u64,
    pub total_lines_added: u64,
    pub total_lines_deleted: u64,
    pub total_changed_lines: u64,
    pub developers: BTreeMap<String, SubsystemDev>,
    pub repositories: BTreeMap<String, SubsystemRepo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_developer: Option<TopDeveloper>,
    pub generated_at: DateTime<Utc>,
}

impl SubsystemSummary {
    pub fn new(service: &str, window: &DateWindow) -> Self {
        Self {
            service: service.to_string(),
            from: window.from.to_string(),
            to: window.to.to_string(),
            total_commits: 0,
            total_lines_added: 0,
            total_lines_deleted: 0,
            total_changed_lines: 0,
            developers: BTreeMap::new(),
            repositories: BTreeMap::new(),
            top_developer: None,
            generated_at: Utc::now(),
        }
    }
}

/// Developer line ownership inside one blame scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlameDev {
    pub slug: String,
    pub display_name: String,
    pub emails: BTreeSet<String>,
    pub lines: u64,
}

impl BlameDev {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            display_name: String::new(),
            emails: BTreeSet::new(),
            lines: 0,
        }
    }

    pub fn note_identity(&mut self, display_name: &str, email: &str) {
        if self.display_name.is_empty() && !display_name.is_empty() {
            self.display_name = display_name.to_string();
        }
        if !email.is_empty() {
            self.emails.insert(email.to_string());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlameService {
    pub total_lines: u64,
    pub developers: BTreeMap<String, BlameDev>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_developer: Option<TopOwner>,
}

/// Simple line counter, used for a repo-level developer's per-service split.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ServiceLines {
    pub lines: u64,
}

/// Repo-level developer ownership with a per-service split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlameRepoDev {
    pub slug: String,
    pub display_name: String,
    pub emails: BTreeSet<String>,
    pub lines: u64,
    pub services: BTreeMap<String, ServiceLines>,
}

impl BlameRepoDev {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            display_name: String::new(),
            emails: BTreeSet::new(),
            lines: 0,
            services: BTreeMap::new(),
        }
    }

    pub fn note_identity(&mut self, display_name: &str, email: &str) {
        if self.display_name.is_empty() && !display_name.is_empty() {
            self.display_name = display_name.to_string();
        }
        if !email.is_empty() {
            self.emails.insert(email.to_string());
        }
    }
}

/// Line-ownership snapshot of one repository's current tree. Written to
/// `stats/repos/<repo>/blame/blame.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlameSummary {
    pub repo: String,
    pub total_lines: u64,
    pub services: BTreeMap<String, BlameService>,
    pub developers: BTreeMap<String, BlameRepoDev>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub top_developer: Option<TopOwner>,
    pub generated_at: DateTime<Utc>,
}

impl BlameSummary {
    pub fn new(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            total_lines: 0,
            services: BTreeMap::new(),
            developers: BTreeMap::new(),
            top_developer: None,
            generated_at: Utc::now(),
        }
    }
}

/// additions/deletions/net triple used by per-language and per-category
/// author breakdowns.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LineDelta {
    pub additions: u64,
    pub deletions: u64,
    pub net_lines: i64,
}

impl LineDelta {
    pub fn add(&mut self, additions: u64, deletions: u64) {
        self.additions += additions;
        self.deletions += deletions;
        self.net_lines = self.additions as i64 - self.deletions as i64;
    }
}

/// Commit-bearing variant of [`LineDelta`] for weekday/hour/date buckets.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ActivityDelta {
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub net_lines: i64,
}

impl ActivityDelta {
    pub fn add_commit(&mut self) {
        self.commits += 1;
    }

    pub fn add_delta(&mut self, additions: u64, deletions: u64) {
        self.additions += additions;
        self.deletions += deletions;
        self.net_lines = self.additions as i64 - self.deletions as i64;
    }
}

/// One author's activity inside a single repository.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RepoActivity {
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub net_lines: i64,
    pub languages: BTreeMap<String, LineDelta>,
    pub code_type: BTreeMap<String, LineDelta>,
    pub documentation: LineDelta,
}

/// One author, one window: totals plus per-repo, per-language, prod/test,
/// documentation and temporal breakdowns. Written to
/// `stats/users/<slug>/<from>_<to>/summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub author_name: String,
    pub author_email: String,
    pub author_slug: String,
    pub from: String,
    pub to: String,
    pub total_commits: u64,
    pub total_lines_added: u64,
    pub total_lines_deleted: u64,
    pub net_lines: i64,
    pub per_repo: BTreeMap<String, RepoActivity>,
    pub languages: BTreeMap<String, LineDelta>,
    pub code_type: BTreeMap<String, LineDelta>,
    pub documentation: LineDelta,
    pub per_weekday: BTreeMap<String, ActivityDelta>,
    pub per_hour: BTreeMap<String, ActivityDelta>,
    pub per_date: BTreeMap<String, ActivityDelta>,
    pub generated_at: DateTime<Utc>,
}

impl AuthorSummary {
    pub fn new(slug: &str, window: &DateWindow) -> Self {
        Self {
            author_name: String::new(),
            author_email: String::new(),
            author_slug: slug.to_string(),
            from: window.from.to_string(),
            to: window.to.to_string(),
            total_commits: 0,
            total_lines_added: 0,
            total_lines_deleted: 0,
            net_lines: 0,
            per_repo: BTreeMap::new(),
            languages: BTreeMap::new(),
            code_type: BTreeMap::new(),
            documentation: LineDelta::default(),
            per_weekday: BTreeMap::new(),
            per_hour: BTreeMap::new(),
            per_date: BTreeMap::new(),
            generated_at: Utc::now(),
        }
    }
}

/// Top developer by changed lines; ties break on the smaller slug so the
/// result does not depend on merge order.
pub fn pick_top_developer(devs: &BTreeMap<String, DevStats>) -> Option<TopDeveloper> {
    devs.values()
        .max_by(|a, b| {
            a.changed_lines
                .cmp(&b.changed_lines)
                .then_with(|| b.slug.cmp(&a.slug))
        })
        .map(|dev| TopDeveloper {
            slug: dev.slug.clone(),
            display_name: dev.display_name.clone(),
            changed_lines: dev.changed_lines,
            commits: dev.commits,
        })
}

/// Same selection for subsystem developer records.
pub fn pick_top_subsystem_developer(
    devs: &BTreeMap<String, SubsystemDev>,
) -> Option<TopDeveloper> {
    devs.values()
        .max_by(|a, b| {
            a.changed_lines
                .cmp(&b.changed_lines)
                .then_with(|| b.slug.cmp(&a.slug))
        })
        .map(|dev| TopDeveloper {
            slug: dev.slug.clone(),
            display_name: dev.display_name.clone(),
            changed_lines: dev.changed_lines,
            commits: dev.commits,
        })
}

/// Top owner by surviving lines. No winner when the denominator is zero.
pub fn pick_top_owner<'a, I>(devs: I, total_lines: u64) -> Option<TopOwner>
where
    I: Iterator<Item = (&'a str, &'a str, u64)>,
{
    if total_lines == 0 {
        return None;
    }
    devs.max_by(|a, b| a.2.cmp(&b.2).then_with(|| b.0.cmp(a.0)))
        .map(|(slug, display_name, lines)| TopOwner {
            slug: slug.to_string(),
            display_name: display_name.to_string(),
            lines,
            share: lines as f64 / total_lines as f64,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn month_window_handles_boundaries() {
        let feb = DateWindow::month(2024, 2).unwrap();
        assert_eq!(feb.label(), "2024-02-01_2024-02-29");
        let dec = DateWindow::month(2025, 12).unwrap();
        assert_eq!(dec.label(), "2025-12-01_2025-12-31");
        assert!(dec.is_monthly());
        assert!(!dec.is_yearly());
    }

    #[test]
    fn yearly_label_is_exact_jan_to_dec() {
        assert!(DateWindow::year(2025).unwrap().is_yearly());
        assert!(!DateWindow::parse("2025-01-01", "2025-12-30").unwrap().is_yearly());
        assert!(!DateWindow::parse("2025-01-02", "2025-12-31").unwrap().is_yearly());
        assert!(!DateWindow::parse("2024-01-01", "2025-12-31").unwrap().is_yearly());
    }

    #[test]
    fn label_round_trips() {
        let w = DateWindow::parse("2025-03-01", "2025-03-31").unwrap();
        assert_eq!(DateWindow::from_label(&w.label()), Some(w));
        assert_eq!(DateWindow::from_label("not-a-window"), None);
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(DateWindow::parse("2025-02-01", "2025-01-01").is_err());
    }

    #[test]
    fn dev_stats_keeps_first_display_name() {
        let mut dev = DevStats::new("jane");
        dev.note_identity("", "jane@a.example");
        dev.note_identity("Jane Doe", "jane@b.example");
        dev.note_identity("J. Doe", "");
        assert_eq!(dev.display_name, "Jane Doe");
        assert_eq!(dev.emails.len(), 2);
    }

    #[test]
    fn top_developer_breaks_ties_on_smallest_slug() {
        let mut devs = BTreeMap::new();
        for slug in ["zeta", "alpha"] {
            let mut d = DevStats::new(slug);
            d.add_delta(10, 5);
            devs.insert(slug.to_string(), d);
        }
        let top = pick_top_developer(&devs).unwrap();
        assert_eq!(top.slug, "alpha");
        assert_eq!(top.changed_lines, 15);
    }

    #[test]
    fn top_owner_requires_positive_total() {
        let devs = [("a", "A", 3u64)];
        assert!(pick_top_owner(devs.iter().map(|&(s, n, l)| (s, n, l)), 0).is_none());
        let top = pick_top_owner(devs.iter().map(|&(s, n, l)| (s, n, l)), 4).unwrap();
        assert_eq!(top.share, 0.75);
    }
}
