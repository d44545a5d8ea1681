//! Configuration parsing for the jiralink preprocessor.

use std::path::Path;

use anyhow::{Context, Result};
use glob::Pattern;
use mdbook_preprocessor::PreprocessorContext;
use serde::Deserialize;

use crate::resolver::ProjectMapping;

const DEFAULT_PROJECT_MAPPINGS: &str = "PROJ=https://jira.atlassian.net";

/// User-facing settings.
///
/// `project_mappings` is kept in its textual form, one `PROJECT_KEY=BASE_URL`
/// per line, so a settings form can edit it directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub project_mappings: String,
    /// Link issue keys in rendered (read-only) content.
    pub enable_preview: bool,
    /// Highlight issue keys in the live editor.
    pub enable_edit_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_mappings: String::from(DEFAULT_PROJECT_MAPPINGS),
            enable_preview: true,
            enable_edit_mode: false,
        }
    }
}

impl Settings {
    /// Parses the mapping text.
    #[must_use]
    pub fn project_mapping(&self) -> ProjectMapping {
        parse_project_mappings(&self.project_mappings)
    }
}

/// Parses `PROJECT_KEY=BASE_URL` lines.
///
/// Blank lines and lines missing either side are dropped. Keys and URLs are
/// trimmed and keys upper-cased. Only the first `=` separates key from URL.
#[must_use]
pub fn parse_project_mappings(text: &str) -> ProjectMapping {
    let mut mapping = ProjectMapping::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((key, url)) = line.split_once('=') else {
            log::debug!("Ignoring project mapping line without '=': {line}");
            continue;
        };
        let (key, url) = (key.trim(), url.trim());
        if key.is_empty() || url.is_empty() {
            log::debug!("Ignoring incomplete project mapping line: {line}");
            continue;
        }
        mapping.insert(key, url);
    }

    mapping
}

/// Configuration for the jiralink preprocessor.
///
/// All fields are private to allow future changes without breaking the API.
/// Use the getter methods to access configuration values.
#[derive(Debug, Clone, Default)]
pub struct Config {
    settings: Settings,
    /// Glob patterns for pages to exclude from issue linking.
    exclude_pages: Vec<Pattern>,
}

/// Raw configuration as deserialized from book.toml.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    project_mappings: Option<String>,
    enable_preview: Option<bool>,
    exclude_pages: Option<Vec<String>>,
}

impl Config {
    /// Creates configuration from the preprocessor context.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration in `book.toml` is malformed.
    pub fn from_context(ctx: &PreprocessorContext) -> Result<Self> {
        let preprocessors: std::collections::BTreeMap<String, RawConfig> = ctx
            .config
            .preprocessors()
            .context("Failed to parse preprocessor configuration")?;

        let raw = preprocessors.get("jiralink").cloned().unwrap_or_default();
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let defaults = Settings::default();

        // Invalid globs are reported and skipped rather than failing the build
        let exclude_pages: Vec<Pattern> = raw
            .exclude_pages
            .unwrap_or_default()
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    log::warn!("Invalid exclude-pages glob pattern '{p}': {e}");
                    None
                }
            })
            .collect();

        Self {
            settings: Settings {
                project_mappings: raw.project_mappings.unwrap_or(defaults.project_mappings),
                enable_preview: raw.enable_preview.unwrap_or(defaults.enable_preview),
                enable_edit_mode: defaults.enable_edit_mode,
            },
            exclude_pages,
        }
    }

    /// Creates configuration from settings, with no excluded pages.
    #[must_use]
    pub const fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            exclude_pages: Vec::new(),
        }
    }

    /// Adds exclude-pages patterns; invalid ones are logged and dropped.
    #[must_use]
    pub fn with_exclude_pages<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw = RawConfig {
            exclude_pages: Some(patterns.into_iter().map(Into::into).collect()),
            ..RawConfig::default()
        };
        self.exclude_pages.extend(Self::from_raw(raw).exclude_pages);
        self
    }

    /// Returns the linker settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Checks if the given path should be excluded from issue linking.
    #[must_use]
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.exclude_pages.iter().any(|p| p.matches(&path_str))
    }
}
