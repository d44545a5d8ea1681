//! Incremental annotation of a live, editable buffer.
//!
//! Only the visible part of the buffer is scanned. The host hands over the
//! visible ranges and a way to read them; the result is a list of marks to
//! render as inline highlights. Marks are always recomputed from scratch.

use std::ops::Range;

use crate::pattern::match_pattern;
use crate::resolver::UrlResolver;
use crate::tree::link_title;

/// Highlight covering one resolved issue key in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    /// Absolute byte range in the buffer.
    pub range: Range<usize>,
    pub issue_key: String,
    pub url: String,
}

impl Mark {
    /// Class list the host puts on the rendered highlight.
    pub const CLASS: &'static str = "jira-link-editor jira-link";

    #[must_use]
    pub const fn start(&self) -> usize {
        self.range.start
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.range.end
    }

    /// Attributes for the rendered highlight. The click handler reads the URL
    /// back from `data-jira-url`.
    #[must_use]
    pub fn attributes(&self) -> [(&'static str, String); 3] {
        [
            ("data-jira-url", self.url.clone()),
            ("data-issue-key", self.issue_key.clone()),
            ("title", link_title(&self.issue_key)),
        ]
    }
}

/// Computes the marks for the visible part of a buffer.
///
/// Each range is scanned on its own, so a key crossing a range boundary is
/// not found. Ranges are sorted and overlapping ones merged first, which keeps
/// the returned marks in ascending order without overlaps.
pub fn compute_marks<R, S>(
    visible_ranges: &[Range<usize>],
    mut read_range: R,
    resolver: &mut UrlResolver,
) -> Vec<Mark>
where
    R: FnMut(Range<usize>) -> S,
    S: AsRef<str>,
{
    let mut marks = Vec::new();

    for range in normalize_ranges(visible_ranges) {
        let text = read_range(range.clone());
        for issue in match_pattern(text.as_ref()) {
            let Some(url) = resolver.resolve_match(&issue) else {
                continue;
            };
            let start = range.start + issue.offset;
            marks.push(Mark {
                range: start..start + issue.len,
                issue_key: issue.full_key.to_string(),
                url,
            });
        }
    }

    marks
}

/// Drops empty ranges, sorts by start and merges overlapping ranges.
fn normalize_ranges(ranges: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut sorted: Vec<Range<usize>> = ranges.iter().filter(|r| r.start < r.end).cloned().collect();
    sorted.sort_by_key(|r| r.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start < last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// What changed in the host view since the last update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    pub doc_changed: bool,
    pub viewport_changed: bool,
}

impl ViewUpdate {
    /// The document content changed.
    #[must_use]
    pub const fn doc_changed() -> Self {
        Self {
            doc_changed: true,
            viewport_changed: false,
        }
    }

    /// The visible ranges changed.
    #[must_use]
    pub const fn viewport_changed() -> Self {
        Self {
            doc_changed: false,
            viewport_changed: true,
        }
    }
}

/// Holds the current marks of one live view.
#[derive(Debug, Default)]
pub struct LiveAnnotator {
    marks: Vec<Mark>,
    /// Resolver epoch the marks were computed in; `None` before the first run.
    epoch: Option<u64>,
}

impl LiveAnnotator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all marks with a fresh computation.
    pub fn refresh<R, S>(
        &mut self,
        visible_ranges: &[Range<usize>],
        read_range: R,
        resolver: &mut UrlResolver,
    ) where
        R: FnMut(Range<usize>) -> S,
        S: AsRef<str>,
    {
        self.marks = compute_marks(visible_ranges, read_range, resolver);
        self.epoch = Some(resolver.epoch());
        log::trace!("Recomputed {} live marks", self.marks.len());
    }

    /// Recomputes if the document, the viewport or the project mapping changed.
    ///
    /// Returns true if the marks were recomputed.
    pub fn update<R, S>(
        &mut self,
        update: ViewUpdate,
        visible_ranges: &[Range<usize>],
        read_range: R,
        resolver: &mut UrlResolver,
    ) -> bool
    where
        R: FnMut(Range<usize>) -> S,
        S: AsRef<str>,
    {
        let stale = self.epoch != Some(resolver.epoch());
        if !(update.doc_changed || update.viewport_changed || stale) {
            return false;
        }
        self.refresh(visible_ranges, read_range, resolver);
        true
    }

    /// Drops all marks.
    pub fn clear(&mut self) {
        self.marks.clear();
        self.epoch = None;
    }

    #[must_use]
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Returns the mark covering `offset`, if any.
    #[must_use]
    pub fn mark_at(&self, offset: usize) -> Option<&Mark> {
        let idx = self.marks.partition_point(|m| m.end() <= offset);
        self.marks.get(idx).filter(|m| m.start() <= offset)
    }

    /// URL stored on the mark under `offset`; this is what a click opens.
    #[must_use]
    pub fn url_at(&self, offset: usize) -> Option<&str> {
        self.mark_at(offset).map(|m| m.url.as_str())
    }
}
