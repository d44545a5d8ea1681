//! Host-facing controller tying settings, resolver and both annotators together.

use std::ops::Range;

use crate::annotate;
use crate::config::Settings;
use crate::live::{self, LiveAnnotator, Mark, ViewUpdate};
use crate::resolver::UrlResolver;
use crate::tree::{ContainerMeta, Node};

/// Links issue keys according to the current [`Settings`].
#[derive(Debug)]
pub struct JiraLinker {
    settings: Settings,
    resolver: UrlResolver,
}

impl JiraLinker {
    /// Creates a linker with the mapping parsed from `settings`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let resolver = UrlResolver::new(settings.project_mapping());
        Self { settings, resolver }
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn resolver(&self) -> &UrlResolver {
        &self.resolver
    }

    /// Applies new settings. A changed mapping text replaces the resolver's
    /// mapping and drops its cache; toggles apply from the next pass on.
    pub fn update_settings(&mut self, settings: Settings) {
        let mapping_changed = settings.project_mappings != self.settings.project_mappings;
        self.settings = settings;
        if mapping_changed {
            self.reload_project_mappings();
        }
    }

    /// Re-parses the mapping text into the resolver.
    pub fn reload_project_mappings(&mut self) {
        self.resolver.set_mapping(self.settings.project_mapping());
    }

    /// See [`UrlResolver::resolve`].
    pub fn resolve(&mut self, project_key: &str, issue_key: &str) -> Option<String> {
        self.resolver.resolve(project_key, issue_key)
    }

    /// See [`UrlResolver::clear_cache`].
    pub fn clear_cache(&mut self) {
        self.resolver.clear_cache();
    }

    /// Links issue keys in a rendered content tree.
    ///
    /// Does nothing when the static view is disabled. Returns the number of
    /// links created.
    pub fn annotate_tree<C: ContainerMeta, L>(&mut self, root: &mut Node<C, L>) -> usize {
        if !self.settings.enable_preview {
            return 0;
        }
        annotate::annotate_tree(root, &mut self.resolver)
    }

    /// Computes live-view marks, or none when the live view is disabled.
    pub fn compute_marks<R, S>(&mut self, visible_ranges: &[Range<usize>], read_range: R) -> Vec<Mark>
    where
        R: FnMut(Range<usize>) -> S,
        S: AsRef<str>,
    {
        if !self.settings.enable_edit_mode {
            return Vec::new();
        }
        live::compute_marks(visible_ranges, read_range, &mut self.resolver)
    }

    /// Forwards a view notification to `annotator`.
    ///
    /// When the live view is disabled the annotator is emptied instead.
    /// Returns true if the annotator's marks changed.
    pub fn refresh_live<R, S>(
        &mut self,
        annotator: &mut LiveAnnotator,
        update: ViewUpdate,
        visible_ranges: &[Range<usize>],
        read_range: R,
    ) -> bool
    where
        R: FnMut(Range<usize>) -> S,
        S: AsRef<str>,
    {
        if !self.settings.enable_edit_mode {
            let had_marks = !annotator.marks().is_empty();
            annotator.clear();
            return had_marks;
        }
        annotator.update(update, visible_ranges, read_range, &mut self.resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{HtmlElement, HtmlNode};

    fn settings(mappings: &str) -> Settings {
        Settings {
            project_mappings: mappings.to_string(),
            enable_preview: true,
            enable_edit_mode: true,
        }
    }

    fn paragraph(text: &str) -> HtmlNode {
        Node::container(HtmlElement::new("p"), vec![Node::text(text)])
    }

    #[test]
    fn test_new_parses_mapping() {
        let linker = JiraLinker::new(settings("proj=https://a.test"));
        assert_eq!(linker.resolver().mapping().get("PROJ"), Some("https://a.test"));
    }

    #[test]
    fn test_update_settings_replaces_mapping() {
        let mut linker = JiraLinker::new(settings("PROJ=https://old.test"));
        assert_eq!(
            linker.resolve("PROJ", "PROJ-1").as_deref(),
            Some("https://old.test/browse/PROJ-1")
        );

        linker.update_settings(settings("PROJ=https://new.test"));
        assert_eq!(linker.resolver().epoch(), 1);
        assert_eq!(
            linker.resolve("PROJ", "PROJ-1").as_deref(),
            Some("https://new.test/browse/PROJ-1")
        );
    }

    #[test]
    fn test_update_settings_toggle_keeps_epoch() {
        let mut linker = JiraLinker::new(settings("PROJ=https://a.test"));
        linker.update_settings(Settings {
            enable_preview: false,
            ..settings("PROJ=https://a.test")
        });
        assert_eq!(linker.resolver().epoch(), 0);
        assert!(!linker.settings().enable_preview);
    }

    #[test]
    fn test_annotate_tree_respects_preview_toggle() {
        let mut linker = JiraLinker::new(settings("PROJ=https://a.test"));
        let mut tree = paragraph("PROJ-1");
        assert_eq!(linker.annotate_tree(&mut tree), 1);

        linker.update_settings(Settings {
            enable_preview: false,
            ..settings("PROJ=https://a.test")
        });
        let mut tree = paragraph("PROJ-1");
        assert_eq!(linker.annotate_tree(&mut tree), 0);
        assert_eq!(tree, paragraph("PROJ-1"));
    }

    #[test]
    fn test_compute_marks_respects_edit_toggle() {
        let text = "PROJ-1";
        let mut linker = JiraLinker::new(settings("PROJ=https://a.test"));
        assert_eq!(linker.compute_marks(&[0..6], |r| &text[r]).len(), 1);

        linker.update_settings(Settings {
            enable_edit_mode: false,
            ..settings("PROJ=https://a.test")
        });
        assert!(linker.compute_marks(&[0..6], |r| &text[r]).is_empty());
    }

    #[test]
    fn test_refresh_live_follows_settings() {
        let text = "PROJ-1 BACK-2";
        let mut linker = JiraLinker::new(settings("PROJ=https://a.test"));
        let mut annotator = LiveAnnotator::new();

        assert!(linker.refresh_live(&mut annotator, ViewUpdate::default(), &[0..13], |r| &text[r]));
        assert_eq!(annotator.marks().len(), 1);

        linker.update_settings(settings("PROJ=https://a.test\nBACK=https://b.test"));
        assert!(linker.refresh_live(&mut annotator, ViewUpdate::default(), &[0..13], |r| &text[r]));
        assert_eq!(annotator.marks().len(), 2);

        linker.update_settings(Settings {
            enable_edit_mode: false,
            ..settings("PROJ=https://a.test\nBACK=https://b.test")
        });
        assert!(linker.refresh_live(&mut annotator, ViewUpdate::doc_changed(), &[0..13], |r| &text[r]));
        assert!(annotator.marks().is_empty());
    }

    #[test]
    fn test_clear_cache() {
        let mut linker = JiraLinker::new(settings("PROJ=https://a.test"));
        linker.resolve("PROJ", "PROJ-1");
        linker.clear_cache();
        assert_eq!(
            linker.resolve("PROJ", "PROJ-1").as_deref(),
            Some("https://a.test/browse/PROJ-1")
        );
    }
}
