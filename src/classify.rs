use std::collections::BTreeMap;

/// Per-repository service layout: an ordered list of (service, prefixes)
/// pairs. Order matters: when two prefixes of equal length match the same
/// path, the service listed first in the mapping file wins.
#[derive(Debug, Clone, Default)]
pub struct RepoServices {
    entries: Vec<(String, Vec<String>)>,
}

impl RepoServices {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        Self { entries }
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

/// Path-to-service mapping for all configured repositories.
#[derive(Debug, Clone, Default)]
pub struct ServiceMap {
    repos: BTreeMap<String, RepoServices>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_repo(&mut self, repo_id: &str, services: RepoServices) {
        self.repos.insert(repo_id.to_string(), services);
    }

    pub fn has_repo(&self, repo_id: &str) -> bool {
        self.repos.contains_key(repo_id)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Service owning `path` inside `repo_id`.
    ///
    /// Longest matching prefix wins; a prefix of "" or "." is a catch-all
    /// with match length 0; equal lengths resolve to the service listed
    /// first. Repos without a mapping collapse to a single default service.
    pub fn classify(&self, repo_id: &str, path: &str) -> String {
        let norm = normalize_path(path);

        let Some(mapping) = self.repos.get(repo_id) else {
            return default_service_name(repo_id);
        };

        let mut best: Option<&str> = None;
        let mut best_len: i64 = -1;

        for (service, prefixes) in &mapping.entries {
            for raw in prefixes {
                let mut prefix = normalize_path(raw);
                let matched_len = if prefix.is_empty() || prefix == "." {
                    Some(0i64)
                } else {
                    if !prefix.ends_with('/') {
                        prefix.push('/');
                    }
                    if norm.starts_with(&prefix) {
                        Some(prefix.len() as i64)
                    } else {
                        None
                    }
                };
                if let Some(len) = matched_len {
                    if len > best_len {
                        best_len = len;
                        best = Some(service);
                    }
                }
            }
        }

        match best {
            Some(service) => service.to_string(),
            None => default_service_name(repo_id),
        }
    }
}

/// Forward slashes only, no leading "./".
pub fn normalize_path(path: &str) -> String {
    let p = path.replace('\\', "/");
    p.trim_start_matches("./").to_string()
}

/// Default service for a repo without a mapping: its last path segment.
pub fn default_service_name(repo_id: &str) -> String {
    repo_id
        .trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown-service")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_map() -> ServiceMap {
        let mut map = ServiceMap::new();
        map.insert_repo(
            "org/widgets",
            RepoServices::new(vec![
                ("api".to_string(), vec!["api".to_string()]),
                ("api-internal".to_string(), vec!["api/internal".to_string()]),
                ("main".to_string(), vec!["".to_string()]),
            ]),
        );
        map
    }

    #[test]
    fn longest_prefix_wins() {
        let map = sample_map();
        assert_eq!(map.classify("org/widgets", "api/internal/x.rs"), "api-internal");
        assert_eq!(map.classify("org/widgets", "api/handler.rs"), "api");
        assert_eq!(map.classify("org/widgets", "docs/readme.md"), "main");
    }

    #[test]
    fn catch_all_has_zero_match_length() {
        let mut map = ServiceMap::new();
        map.insert_repo(
            "r",
            RepoServices::new(vec![
                ("everything".to_string(), vec![".".to_string()]),
                ("sub".to_string(), vec!["sub".to_string()]),
            ]),
        );
        // a real prefix beats the catch-all even when the catch-all is first
        assert_eq!(map.classify("r", "sub/file.go"), "sub");
        assert_eq!(map.classify("r", "other/file.go"), "everything");
    }

    #[test]
    fn tie_breaks_on_mapping_order() {
        let mut map = ServiceMap::new();
        map.insert_repo(
            "r",
            RepoServices::new(vec![
                ("first".to_string(), vec!["shared".to_string()]),
                ("second".to_string(), vec!["shared/".to_string()]),
            ]),
        );
        assert_eq!(map.classify("r", "shared/a.c"), "first");
    }

    #[test]
    fn unmapped_repo_uses_last_segment() {
        let map = ServiceMap::new();
        assert_eq!(map.classify("owner/repo-name", "src/lib.rs"), "repo-name");
        assert_eq!(map.classify("flat", "x"), "flat");
        assert_eq!(default_service_name(""), "unknown-service");
    }

    #[test]
    fn classification_is_deterministic() {
        let map = sample_map();
        let a = map.classify("org/widgets", "api/internal/deep/mod.rs");
        for _ in 0..10 {
            assert_eq!(map.classify("org/widgets", "api/internal/deep/mod.rs"), a);
        }
    }

    #[test]
    fn normalizes_separators_and_dot_prefix() {
        let map = sample_map();
        assert_eq!(map.classify("org/widgets", "./api\\handler.rs"), "api");
    }
}
