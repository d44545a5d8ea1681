//! # mdbook-jiralink
//!
//! An mdBook preprocessor that turns Jira issue keys such as `PROJ-123` into
//! links to the issue's browse page.
//!
//! ## Features
//!
//! - Detects `UPPERCASE-123` style issue keys on word boundaries
//! - Resolves keys through a per-project base URL mapping
//! - Skips code blocks, inline code, existing links and raw HTML anchors
//! - Safe to run twice: already linked keys are left alone
//! - Live-view API that computes highlight ranges for the visible part of an
//!   editor buffer
//!
//! ## Usage
//!
//! Add to your `book.toml`:
//!
//! ```toml
//! [preprocessor.jiralink]
//! project-mappings = """
//! PROJ=https://jira.example.com
//! BACK=https://jira.backend.example.com/
//! """
//! exclude-pages = ["changelog.md"]
//! ```
//!
//! `PROJ-123` then links to `https://jira.example.com/browse/PROJ-123`.

pub mod annotate;
pub mod config;
pub mod linker;
pub mod live;
pub mod markdown;
pub mod pattern;
pub mod resolver;
pub mod tree;

pub use config::{Config, Settings, parse_project_mappings};
pub use linker::JiraLinker;
pub use live::{LiveAnnotator, Mark, ViewUpdate, compute_marks};
pub use pattern::{IssueMatch, match_pattern};
pub use resolver::{ProjectMapping, UrlResolver};
pub use tree::{ContainerKind, ContainerMeta, IssueLink, Node};

use anyhow::Result;
use mdbook_preprocessor::book::{Book, BookItem};
use mdbook_preprocessor::{Preprocessor, PreprocessorContext};

/// mdBook preprocessor that links Jira issue keys throughout documentation.
#[derive(Debug)]
pub struct JiraLinkPreprocessor {
    config: Config,
}

impl JiraLinkPreprocessor {
    /// Creates a new preprocessor instance from the given context.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration in `book.toml` is invalid.
    pub fn new(ctx: &PreprocessorContext) -> Result<Self> {
        let config = Config::from_context(ctx)?;
        Ok(Self { config })
    }

    /// Creates a preprocessor from an already built configuration.
    #[must_use]
    pub const fn with_config(config: Config) -> Self {
        Self { config }
    }

    /// Links issue keys in every chapter of `book`.
    ///
    /// Chapters that fail to re-render are logged and left unchanged.
    #[must_use]
    pub fn link_book(&self, mut book: Book) -> Book {
        let settings = self.config.settings();
        if !settings.enable_preview {
            log::info!("Issue linking disabled (enable-preview = false)");
            return book;
        }

        let mut linker = JiraLinker::new(settings.clone());
        if linker.resolver().mapping().is_empty() {
            log::warn!("No project mappings configured, leaving book unchanged");
            return book;
        }

        log::info!(
            "Linking issue keys for {} projects",
            linker.resolver().mapping().len()
        );

        book.for_each_mut(|item| {
            if let BookItem::Chapter(chapter) = item {
                // Draft chapters have no path
                let Some(chapter_path) = chapter.path.as_ref() else {
                    return;
                };

                if self.config.should_exclude(chapter_path) {
                    log::debug!("Skipping excluded page: {}", chapter_path.display());
                    return;
                }

                match markdown::link_issues(&chapter.content, &mut linker) {
                    Ok(new_content) => {
                        chapter.content = new_content;
                    }
                    Err(e) => {
                        log::error!("Failed to process chapter {}: {e}", chapter_path.display());
                    }
                }
            }
        });

        book
    }
}

impl Preprocessor for JiraLinkPreprocessor {
    fn name(&self) -> &'static str {
        "jiralink"
    }

    fn run(&self, _ctx: &PreprocessorContext, book: Book) -> Result<Book> {
        Ok(self.link_book(book))
    }
}
