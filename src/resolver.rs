//! Project key to browse URL resolution with a per-epoch cache.

use std::collections::HashMap;

use crate::pattern::IssueMatch;

/// Mapping from uppercase project key to the base URL of its tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMapping {
    entries: HashMap<String, String>,
}

impl ProjectMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a project, upper-casing its key. Later inserts win.
    pub fn insert(&mut self, project_key: impl AsRef<str>, base_url: impl Into<String>) {
        self.entries
            .insert(project_key.as_ref().to_uppercase(), base_url.into());
    }

    /// Returns the base URL configured for an (already uppercase) project key.
    #[must_use]
    pub fn get(&self, project_key: &str) -> Option<&str> {
        self.entries.get(project_key).map(String::as_str)
    }

    /// Number of configured projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no project is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(project key, base URL)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ProjectMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (key, url) in iter {
            mapping.insert(key, url);
        }
        mapping
    }
}

/// Builds the browse URL for an issue, dropping one trailing slash from the base.
#[must_use]
pub fn browse_url(base_url: &str, issue_key: &str) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    format!("{base}/browse/{issue_key}")
}

/// Resolves issue keys to browse URLs.
///
/// Results, including misses, are cached per `(project key, issue key)` pair.
/// The cache only ever holds entries built from the current mapping: replacing
/// the mapping drops every entry and starts a new epoch.
#[derive(Debug, Default)]
pub struct UrlResolver {
    mapping: ProjectMapping,
    /// `None` records a project with no configured base URL.
    cache: HashMap<String, Option<String>>,
    epoch: u64,
}

impl UrlResolver {
    /// Creates a resolver for the given mapping.
    #[must_use]
    pub fn new(mapping: ProjectMapping) -> Self {
        Self {
            mapping,
            cache: HashMap::new(),
            epoch: 0,
        }
    }

    /// Returns the browse URL for `issue_key`, or `None` if `project_key` is unmapped.
    pub fn resolve(&mut self, project_key: &str, issue_key: &str) -> Option<String> {
        let cache_key = format!("{project_key}-{issue_key}");
        if let Some(cached) = self.cache.get(&cache_key) {
            return cached.clone();
        }

        let resolved = self
            .mapping
            .get(project_key)
            .map(|base| browse_url(base, issue_key));
        if resolved.is_none() {
            log::trace!("No project mapping for {project_key}");
        }
        self.cache.insert(cache_key, resolved.clone());
        resolved
    }

    /// Resolves a match produced by [`crate::pattern::match_pattern`].
    pub fn resolve_match(&mut self, issue: &IssueMatch<'_>) -> Option<String> {
        self.resolve(issue.project_key, issue.full_key)
    }

    /// Replaces the mapping and empties the cache.
    pub fn set_mapping(&mut self, mapping: ProjectMapping) {
        self.mapping = mapping;
        self.clear_cache();
        self.epoch = self.epoch.wrapping_add(1);
        log::debug!(
            "Project mapping replaced ({} projects, epoch {})",
            self.mapping.len(),
            self.epoch
        );
    }

    /// Empties the cache, keeping the mapping.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// The mapping currently in effect.
    #[must_use]
    pub const fn mapping(&self) -> &ProjectMapping {
        &self.mapping
    }

    /// Counter bumped by every [`Self::set_mapping`] call.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}
