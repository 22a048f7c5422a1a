//! Combining partial results.
//!
//! Workers produce independent aggregates; this module folds them together.
//! The contract: counters add, email sets union, the first non-empty display
//! name wins, derived fields are recomputed from the merged counters. All
//! impls are associative and commutative on the numeric fields, so the final
//! aggregate does not depend on worker completion order or on how work was
//! partitioned. Same-named entities from different parts are the same
//! logical entity and get summed, never overwritten.

use crate::model::{
    pick_top_developer, pick_top_owner, pick_top_subsystem_developer, ActivityDelta,
    AuthorSummary, BlameDev, BlameRepoDev, BlameService, BlameSummary, DevStats, LineDelta,
    RepoActivity, RepoCounters, RepoSummary, ServiceLines, ServiceStats, SubsystemDev,
    SubsystemRepo, SubsystemSummary,
};
use std::collections::BTreeMap;

pub trait Merge {
    fn absorb(&mut self, other: Self);
}

/// Union two keyed maps, merging values that share a key.
pub fn merge_maps<V: Merge>(target: &mut BTreeMap<String, V>, source: BTreeMap<String, V>) {
    for (key, value) in source {
        match target.entry(key) {
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                slot.get_mut().absorb(value);
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
}

fn keep_first_nonempty(target: &mut String, source: String) {
    if target.is_empty() && !source.is_empty() {
        *target = source;
    }
}

impl Merge for DevStats {
    fn absorb(&mut self, other: Self) {
        keep_first_nonempty(&mut self.display_name, other.display_name);
        self.emails.extend(other.emails);
        self.commits += other.commits;
        self.lines_added += other.lines_added;
        self.lines_deleted += other.lines_deleted;
        self.net_lines = self.lines_added as i64 - self.lines_deleted as i64;
        self.changed_lines = self.lines_added + self.lines_deleted;
    }
}

impl Merge for ServiceStats {
    fn absorb(&mut self, other: Self) {
        merge_maps(&mut self.developers, other.developers);
        self.top_developer = pick_top_developer(&self.developers);
    }
}

impl Merge for RepoSummary {
    fn absorb(&mut self, other: Self) {
        merge_maps(&mut self.services, other.services);
        merge_maps(&mut self.developers, other.developers);
        self.top_developer = pick_top_developer(&self.developers);
    }
}

impl Merge for RepoCounters {
    fn absorb(&mut self, other: Self) {
        self.commits += other.commits;
        self.lines_added += other.lines_added;
        self.lines_deleted += other.lines_deleted;
        self.net_lines += other.net_lines;
        self.changed_lines += other.changed_lines;
    }
}

impl Merge for SubsystemDev {
    fn absorb(&mut self, other: Self) {
        keep_first_nonempty(&mut self.display_name, other.display_name);
        self.emails.extend(other.emails);
        self.commits += other.commits;
        self.lines_added += other.lines_added;
        self.lines_deleted += other.lines_deleted;
        self.net_lines = self.lines_added as i64 - self.lines_deleted as i64;
        self.changed_lines = self.lines_added + self.lines_deleted;
        merge_maps(&mut self.repositories, other.repositories);
    }
}

impl Merge for SubsystemRepo {
    fn absorb(&mut self, other: Self) {
        self.commits += other.commits;
        self.lines_added += other.lines_added;
        self.lines_deleted += other.lines_deleted;
        self.net_lines += other.net_lines;
        self.changed_lines += other.changed_lines;
        merge_maps(&mut self.developers, other.developers);
    }
}

impl Merge for SubsystemSummary {
    fn absorb(&mut self, other: Self) {
        self.total_commits += other.total_commits;
        self.total_lines_added += other.total_lines_added;
        self.total_lines_deleted += other.total_lines_deleted;
        self.total_changed_lines += other.total_changed_lines;
        merge_maps(&mut self.developers, other.developers);
        merge_maps(&mut self.repositories, other.repositories);
        self.top_developer = pick_top_subsystem_developer(&self.developers);
    }
}

impl Merge for ServiceLines {
    fn absorb(&mut self, other: Self) {
        self.lines += other.lines;
    }
}

impl Merge for BlameDev {
    fn absorb(&mut self, other: Self) {
        keep_first_nonempty(&mut self.display_name, other.display_name);
        self.emails.extend(other.emails);
        self.lines += other.lines;
    }
}

impl Merge for BlameRepoDev {
    fn absorb(&mut self, other: Self) {
        keep_first_nonempty(&mut self.display_name, other.display_name);
        self.emails.extend(other.emails);
        self.lines += other.lines;
        merge_maps(&mut self.services, other.services);
    }
}

impl Merge for BlameService {
    fn absorb(&mut self, other: Self) {
        self.total_lines += other.total_lines;
        merge_maps(&mut self.developers, other.developers);
        self.top_developer = pick_top_owner(
            self.developers
                .values()
                .map(|d| (d.slug.as_str(), d.display_name.as_str(), d.lines)),
            self.total_lines,
        );
    }
}

impl Merge for BlameSummary {
    fn absorb(&mut self, other: Self) {
        self.total_lines += other.total_lines;
        merge_maps(&mut self.services, other.services);
        merge_maps(&mut self.developers, other.developers);
        self.top_developer = pick_top_owner(
            self.developers
                .values()
                .map(|d| (d.slug.as_str(), d.display_name.as_str(), d.lines)),
            self.total_lines,
        );
    }
}

impl Merge for LineDelta {
    fn absorb(&mut self, other: Self) {
        self.additions += other.additions;
        self.deletions += other.deletions;
        self.net_lines = self.additions as i64 - self.deletions as i64;
    }
}

impl Merge for ActivityDelta {
    fn absorb(&mut self, other: Self) {
        self.commits += other.commits;
        self.additions += other.additions;
        self.deletions += other.deletions;
        self.net_lines = self.additions as i64 - self.deletions as i64;
    }
}

impl Merge for RepoActivity {
    fn absorb(&mut self, other: Self) {
        self.commits += other.commits;
        self.additions += other.additions;
        self.deletions += other.deletions;
        self.net_lines = self.additions as i64 - self.deletions as i64;
        merge_maps(&mut self.languages, other.languages);
        merge_maps(&mut self.code_type, other.code_type);
        self.documentation.absorb(other.documentation);
    }
}

impl Merge for AuthorSummary {
    fn absorb(&mut self, other: Self) {
        keep_first_nonempty(&mut self.author_name, other.author_name);
        keep_first_nonempty(&mut self.author_email, other.author_email);
        self.total_commits += other.total_commits;
        self.total_lines_added += other.total_lines_added;
        self.total_lines_deleted += other.total_lines_deleted;
        self.net_lines = self.total_lines_added as i64 - self.total_lines_deleted as i64;
        merge_maps(&mut self.per_repo, other.per_repo);
        merge_maps(&mut self.languages, other.languages);
        merge_maps(&mut self.code_type, other.code_type);
        self.documentation.absorb(other.documentation);
        merge_maps(&mut self.per_weekday, other.per_weekday);
        merge_maps(&mut self.per_hour, other.per_hour);
        merge_maps(&mut self.per_date, other.per_date);
    }
}
