use crate::classify::{RepoServices, ServiceMap};
use crate::identity::{AliasTable, IdentityResolver, IgnoreSet};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub const ALIAS_FILE: &str = "alias.json";
pub const IGNORE_FILE: &str = "ignore_user.txt";
pub const SERVICES_FILE: &str = "services.json";

/// Immutable run configuration: identity resolution plus service layout.
///
/// Missing files are normal (empty tables); unreadable or malformed files
/// warn and degrade to empty rather than failing the run.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub identity: IdentityResolver,
    pub services: ServiceMap,
}

impl AppConfig {
    pub fn load(config_dir: &Path) -> Self {
        let aliases = load_aliases(&config_dir.join(ALIAS_FILE));
        let ignored = load_ignored_users(&config_dir.join(IGNORE_FILE));
        let services = load_services(&config_dir.join(SERVICES_FILE));
        Self {
            identity: IdentityResolver::new(aliases, ignored),
            services,
        }
    }
}

/// alias.json: `{"canonical": ["alias", ...], ...}`
fn load_aliases(path: &Path) -> AliasTable {
    let mut table = AliasTable::new();
    if !path.is_file() {
        return table;
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read alias file");
            return table;
        }
    };
    let parsed: BTreeMap<String, Vec<String>> = match serde_json::from_str(&text) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(path = %path.display(), %err, "malformed alias file, ignoring");
            return table;
        }
    };
    for (canonical, aliases) in &parsed {
        table.insert(canonical, aliases);
    }
    table
}

/// ignore_user.txt: one identifier per line, `#` starts a comment.
fn load_ignored_users(path: &Path) -> IgnoreSet {
    let mut set = IgnoreSet::new();
    if !path.is_file() {
        return set;
    }
    match std::fs::read_to_string(path) {
        Ok(text) => {
            for line in text.lines() {
                set.insert_entry(line);
            }
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read ignore file");
        }
    }
    set
}

/// services.json: `{"repo": {"service": ["prefix", ...] | "prefix", ...}, ...}`
///
/// Object order within a repo is preserved: it is the tie-break order for
/// equal-length prefix matches.
fn load_services(path: &Path) -> ServiceMap {
    let mut map = ServiceMap::new();
    if !path.is_file() {
        return map;
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read services file");
            return map;
        }
    };
    let parsed: Value = match serde_json::from_str(&text) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(path = %path.display(), %err, "malformed services file, ignoring");
            return map;
        }
    };
    let Value::Object(repos) = parsed else {
        warn!(path = %path.display(), "services file must be an object (repo -> {{service: [prefixes]}})");
        return map;
    };
    for (repo_id, services) in repos {
        let Value::Object(services) = services else {
            warn!(repo = %repo_id, "services for repo should be an object, skipping");
            continue;
        };
        let mut entries = Vec::with_capacity(services.len());
        for (service, prefixes) in services {
            let prefixes = match prefixes {
                Value::Array(items) => items.iter().map(value_to_prefix).collect(),
                // single string shorthand
                other => vec![value_to_prefix(&other)],
            };
            entries.push((service, prefixes));
        }
        map.insert_repo(&repo_id, RepoServices::new(entries));
    }
    map
}

fn value_to_prefix(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
