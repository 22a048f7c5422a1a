use std::collections::{BTreeMap, BTreeSet};

/// Lowercase, filesystem-safe slug: runs of non-alphanumerics collapse to a
/// single hyphen, leading/trailing hyphens are trimmed. Empty input becomes
/// "unknown". Applying it twice yields the same result.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if out.is_empty() {
        "unknown".to_string()
    } else {
        out
    }
}

/// Base slug for an author: the email local-part when an email is present,
/// otherwise the name, otherwise "unknown-author".
pub fn author_slug(name: &str, email: &str) -> String {
    let base = if !email.is_empty() {
        email.split('@').next().unwrap_or(email)
    } else if !name.is_empty() {
        name
    } else {
        "unknown-author"
    };
    slugify(base)
}

/// Alias slug -> canonical slug. Every canonical slug maps to itself.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one canonical identity and its aliases.
    pub fn insert(&mut self, canonical: &str, aliases: &[String]) {
        let canonical_slug = slugify(canonical);
        self.map
            .insert(canonical_slug.clone(), canonical_slug.clone());
        for alias in aliases {
            self.map.insert(slugify(alias), canonical_slug.clone());
        }
    }

    pub fn resolve<'a>(&'a self, slug: &'a str) -> &'a str {
        self.map.get(slug).map(String::as_str).unwrap_or(slug)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Slugs that should never be attributed (bots, service accounts).
///
/// Each configured entry contributes its own slug, plus the slug of the
/// local-part when the entry looks like an email address.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    slugs: BTreeSet<String>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entry(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() || entry.starts_with('#') {
            return;
        }
        self.slugs.insert(slugify(entry));
        if let Some((local, _)) = entry.split_once('@') {
            self.slugs.insert(slugify(local));
        }
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

/// Maps raw author identities to canonical slugs and answers ignore checks.
/// Pure lookups; built once per run from configuration.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    pub aliases: AliasTable,
    pub ignored: IgnoreSet,
}

impl IdentityResolver {
    pub fn new(aliases: AliasTable, ignored: IgnoreSet) -> Self {
        Self { aliases, ignored }
    }

    /// Canonical slug for a (name, email) pair: base slug, then alias lookup.
    pub fn canonicalize(&self, name: &str, email: &str) -> String {
        let base = author_slug(name, email);
        self.aliases.resolve(&base).to_string()
    }

    pub fn is_ignored(&self, slug: &str) -> bool {
        self.ignored.contains(slug)
    }
}
