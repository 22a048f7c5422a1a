//! Attribution accumulators: fold parsed history events into per-repo,
//! per-subsystem, per-author and blame aggregates.
//!
//! Every accumulator is an independent value: workers each build their own
//! and the results meet in `merge`. Nothing here touches shared state.

use crate::classify::{default_service_name, normalize_path, ServiceMap};
use crate::history::blame::SurvivingLines;
use crate::history::log::CommitEvent;
use crate::identity::IdentityResolver;
use crate::lang::{code_type_of, is_doc_language, LanguageMap};
use crate::merge::Merge;
use crate::model::{
    pick_top_developer, pick_top_owner, pick_top_subsystem_developer, AuthorSummary,
    BlameDev, BlameRepoDev, BlameService, BlameSummary, DateWindow, DevStats, RepoSummary,
    ServiceStats, SubsystemDev, SubsystemSummary,
};
use chrono::{Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Commit-delta attribution for one repository: services x developers.
#[derive(Debug, Clone)]
pub struct RepoAccumulator {
    repo: String,
    window: DateWindow,
    services: BTreeMap<String, ServiceStats>,
}

impl RepoAccumulator {
    pub fn new(repo: &str, window: DateWindow) -> Self {
        Self {
            repo: repo.to_string(),
            window,
            services: BTreeMap::new(),
        }
    }

    /// Attribute one commit. Ignored authors drop the whole commit before
    /// any file is looked at. The commit counter increments once per
    /// distinct service the commit touched.
    pub fn add_commit(
        &mut self,
        event: &CommitEvent,
        identity: &IdentityResolver,
        service_map: &ServiceMap,
    ) {
        let slug = identity.canonicalize(&event.author_name, &event.author_email);
        if identity.is_ignored(&slug) {
            return;
        }

        let mut touched = BTreeSet::new();
        for file in &event.files {
            if file.additions == 0 && file.deletions == 0 {
                // binary or no-op entry: nothing to attribute
                continue;
            }
            let path = normalize_path(&file.path);
            let service = service_map.classify(&self.repo, &path);
            let svc = self.services.entry(service.clone()).or_default();
            let dev = svc
                .developers
                .entry(slug.clone())
                .or_insert_with(|| DevStats::new(&slug));
            dev.note_identity(&event.author_name, &event.author_email);
            dev.add_delta(file.additions, file.deletions);
            touched.insert(service);
        }

        for service in touched {
            if let Some(dev) = self
                .services
                .get_mut(&service)
                .and_then(|svc| svc.developers.get_mut(&slug))
            {
                dev.commits += 1;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Roll the per-service data up to repo level, pick tops, and emit the
    /// summary. `None` when no commit survived the filters.
    pub fn finalize(mut self) -> Option<RepoSummary> {
        if self.services.is_empty() {
            return None;
        }

        let mut developers: BTreeMap<String, DevStats> = BTreeMap::new();
        for svc in self.services.values_mut() {
            svc.top_developer = pick_top_developer(&svc.developers);
            for dev in svc.developers.values() {
                developers
                    .entry(dev.slug.clone())
                    .and_modify(|agg| agg.absorb(dev.clone()))
                    .or_insert_with(|| dev.clone());
            }
        }
        let top_developer = pick_top_developer(&developers);

        Some(RepoSummary {
            repo: self.repo,
            from: self.window.from.to_string(),
            to: self.window.to.to_string(),
            services: self.services,
            developers,
            top_developer,
            generated_at: Utc::now(),
        })
    }
}

/// Service-first attribution across repositories.
#[derive(Debug, Clone)]
pub struct SubsystemAccumulator {
    window: DateWindow,
    subsystems: BTreeMap<String, SubsystemSummary>,
}

impl SubsystemAccumulator {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            subsystems: BTreeMap::new(),
        }
    }

    pub fn add_commit(
        &mut self,
        repo_id: &str,
        event: &CommitEvent,
        identity: &IdentityResolver,
        service_map: &ServiceMap,
    ) {
        let slug = identity.canonicalize(&event.author_name, &event.author_email);
        if identity.is_ignored(&slug) {
            return;
        }

        // collapse the commit's files into per-service deltas first, so the
        // commit counts once per service no matter how many files it touched
        let mut touched: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for file in &event.files {
            let path = normalize_path(&file.path);
            let service = service_map.classify(repo_id, &path);
            let entry = touched.entry(service).or_insert((0, 0));
            entry.0 += file.additions;
            entry.1 += file.deletions;
        }
        if touched.is_empty() && !service_map.has_repo(repo_id) {
            // unmapped repo, commit with no usable numstat: still a commit
            // against the repo's default service
            touched.insert(default_service_name(repo_id), (0, 0));
        }

        for (service, (additions, deletions)) in touched {
            let subsystem = self
                .subsystems
                .entry(service.clone())
                .or_insert_with(|| SubsystemSummary::new(&service, &self.window));

            let dev = subsystem
                .developers
                .entry(slug.clone())
                .or_insert_with(|| SubsystemDev::new(&slug));
            dev.note_identity(&event.author_name, &event.author_email);
            dev.commits += 1;
            dev.lines_added += additions;
            dev.lines_deleted += deletions;
            dev.net_lines += additions as i64 - deletions as i64;
            dev.changed_lines += additions + deletions;
            dev.repositories
                .entry(repo_id.to_string())
                .or_default()
                .add_commit(additions, deletions);

            let repo = subsystem.repositories.entry(repo_id.to_string()).or_default();
            repo.commits += 1;
            repo.lines_added += additions;
            repo.lines_deleted += deletions;
            repo.net_lines += additions as i64 - deletions as i64;
            repo.changed_lines += additions + deletions;
            repo.developers
                .entry(slug.clone())
                .or_default()
                .add_commit(additions, deletions);

            subsystem.total_commits += 1;
            subsystem.total_lines_added += additions;
            subsystem.total_lines_deleted += deletions;
            subsystem.total_changed_lines += additions + deletions;
        }
    }

    pub fn finalize(mut self) -> BTreeMap<String, SubsystemSummary> {
        for subsystem in self.subsystems.values_mut() {
            subsystem.top_developer = pick_top_subsystem_developer(&subsystem.developers);
        }
        self.subsystems
    }
}

/// Line-ownership attribution for one repository's current tree.
#[derive(Debug, Clone)]
pub struct BlameAccumulator {
    repo: String,
    total_lines: u64,
    services: BTreeMap<String, BlameService>,
    developers: BTreeMap<String, BlameRepoDev>,
}

impl BlameAccumulator {
    pub fn new(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            total_lines: 0,
            services: BTreeMap::new(),
            developers: BTreeMap::new(),
        }
    }

    /// Attribute every surviving line of one file. The service is decided
    /// once per file; the ignore filter applies per line.
    pub fn add_file(
        &mut self,
        path: &str,
        porcelain: &str,
        identity: &IdentityResolver,
        service_map: &ServiceMap,
    ) {
        let norm = normalize_path(path);
        let service = service_map.classify(&self.repo, &norm);

        for owner in SurvivingLines::new(porcelain) {
            let slug = identity.canonicalize(owner.author_name, owner.author_email);
            if identity.is_ignored(&slug) {
                continue;
            }
            let display_name = if owner.author_name.is_empty() {
                slug.as_str()
            } else {
                owner.author_name
            };

            self.total_lines += 1;

            let svc = self.services.entry(service.clone()).or_default();
            svc.total_lines += 1;
            let svc_dev = svc
                .developers
                .entry(slug.clone())
                .or_insert_with(|| BlameDev::new(&slug));
            svc_dev.note_identity(display_name, owner.author_email);
            svc_dev.lines += 1;

            let repo_dev = self
                .developers
                .entry(slug.clone())
                .or_insert_with(|| BlameRepoDev::new(&slug));
            repo_dev.note_identity(display_name, owner.author_email);
            repo_dev.lines += 1;
            repo_dev.services.entry(service.clone()).or_default().lines += 1;
        }
    }

    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    pub fn finalize(mut self) -> Option<BlameSummary> {
        if self.total_lines == 0 {
            return None;
        }

        for svc in self.services.values_mut() {
            svc.top_developer = pick_top_owner(
                svc.developers
                    .values()
                    .map(|d| (d.slug.as_str(), d.display_name.as_str(), d.lines)),
                svc.total_lines,
            );
        }
        let top_developer = pick_top_owner(
            self.developers
                .values()
                .map(|d| (d.slug.as_str(), d.display_name.as_str(), d.lines)),
            self.total_lines,
        );

        Some(BlameSummary {
            repo: self.repo,
            total_lines: self.total_lines,
            services: self.services,
            developers: self.developers,
            top_developer,
            generated_at: Utc::now(),
        })
    }
}

/// Per-author activity accumulation across repositories.
#[derive(Debug, Clone)]
pub struct AuthorAccumulator {
    window: DateWindow,
    authors: BTreeMap<String, AuthorSummary>,
}

impl AuthorAccumulator {
    pub fn new(window: DateWindow) -> Self {
        Self {
            window,
            authors: BTreeMap::new(),
        }
    }

    pub fn add_commit(
        &mut self,
        repo_id: &str,
        event: &CommitEvent,
        identity: &IdentityResolver,
        languages: &LanguageMap,
    ) {
        let slug = identity.canonicalize(&event.author_name, &event.author_email);
        if identity.is_ignored(&slug) {
            return;
        }

        let weekday = event.date.as_deref().and_then(weekday_name);
        let window = self.window;
        let author = self
            .authors
            .entry(slug.clone())
            .or_insert_with(|| AuthorSummary::new(&slug, &window));

        if author.author_name.is_empty() && !event.author_name.is_empty() {
            author.author_name = event.author_name.clone();
        }
        if author.author_email.is_empty() && !event.author_email.is_empty() {
            author.author_email = event.author_email.clone();
        }

        author.total_commits += 1;
        author
            .per_repo
            .entry(repo_id.to_string())
            .or_default()
            .commits += 1;
        if let Some(day) = weekday {
            author.per_weekday.entry(day.to_string()).or_default().add_commit();
        }
        if let Some(hour) = &event.hour {
            author.per_hour.entry(hour.clone()).or_default().add_commit();
        }
        if let Some(date) = &event.date {
            author.per_date.entry(date.clone()).or_default().add_commit();
        }

        for file in &event.files {
            let path = normalize_path(&file.path);
            let lang = languages.language_of(&path).to_string();
            let kind = code_type_of(&path);
            let (add, del) = (file.additions, file.deletions);

            author.total_lines_added += add;
            author.total_lines_deleted += del;
            author.net_lines = author.total_lines_added as i64 - author.total_lines_deleted as i64;

            let repo = author.per_repo.entry(repo_id.to_string()).or_default();
            repo.additions += add;
            repo.deletions += del;
            repo.net_lines = repo.additions as i64 - repo.deletions as i64;
            repo.languages.entry(lang.clone()).or_default().add(add, del);
            repo.code_type.entry(kind.to_string()).or_default().add(add, del);

            author.languages.entry(lang.clone()).or_default().add(add, del);
            author.code_type.entry(kind.to_string()).or_default().add(add, del);

            if is_doc_language(&lang) {
                repo.documentation.add(add, del);
                author.documentation.add(add, del);
            }

            if let Some(day) = weekday {
                author
                    .per_weekday
                    .entry(day.to_string())
                    .or_default()
                    .add_delta(add, del);
            }
            if let Some(hour) = &event.hour {
                author.per_hour.entry(hour.clone()).or_default().add_delta(add, del);
            }
            if let Some(date) = &event.date {
                author.per_date.entry(date.clone()).or_default().add_delta(add, del);
            }
        }
    }

    /// Summaries for every author that actually committed in the window.
    pub fn finalize(self) -> BTreeMap<String, AuthorSummary> {
        self.authors
            .into_iter()
            .filter(|(_, a)| a.total_commits > 0)
            .collect()
    }
}

fn weekday_name(date: &str) -> Option<&'static str> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(match parsed.weekday() {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    })
}
