//! Content tree consumed by the static annotator.
//!
//! The tree is generic over the host: `C` is the per-container metadata the
//! host attaches (an HTML element, a markdown tag, ...) and `L` is any leaf the
//! annotator must carry through untouched. Hosts only have to say, through
//! [`ContainerMeta`], which category each container falls into.

use std::convert::Infallible;
use std::fmt::Write as _;

/// Class carried by every link the annotator creates.
pub const LINK_CLASS: &str = "jira-link";

/// How the annotator treats a container and everything below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Ordinary content; children are visited.
    Normal,
    /// Code or other verbatim text.
    InertVerbatim,
    /// An existing link, including ones created by a previous pass.
    AlreadyLinked,
    /// Content that is never shown as text (scripts, styles, metadata).
    NonRenderable,
}

impl ContainerKind {
    /// Returns true if neither the container nor its descendants may be rewritten.
    #[must_use]
    pub const fn is_skipped(self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Host metadata that can be categorized for the skip decision.
pub trait ContainerMeta {
    /// The category of this container, computed once per visit.
    fn kind(&self) -> ContainerKind;
}

/// A node of a host content tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node<C, L> {
    /// Plain text; the only node kind that is ever scanned.
    Text(String),
    /// A container holding further nodes.
    Container(Container<C, L>),
    /// A link created by the annotator.
    Link(IssueLink),
    /// Anything else the host needs to keep in place.
    Leaf(L),
}

impl<C, L> Node<C, L> {
    /// Creates a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a container node.
    #[must_use]
    pub const fn container(meta: C, children: Vec<Self>) -> Self {
        Self::Container(Container { meta, children })
    }
}

/// A container node with its host metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Container<C, L> {
    pub meta: C,
    pub children: Vec<Node<C, L>>,
}

/// A link from an issue key to its browse URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLink {
    issue_key: String,
    url: String,
}

impl IssueLink {
    /// Creates a link for `issue_key` pointing at `url`.
    #[must_use]
    pub fn new(issue_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            issue_key: issue_key.into(),
            url: url.into(),
        }
    }

    /// The visible link text.
    #[must_use]
    pub fn issue_key(&self) -> &str {
        &self.issue_key
    }

    /// The link target.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Tooltip naming the destination.
    #[must_use]
    pub fn title(&self) -> String {
        link_title(&self.issue_key)
    }

    /// Renders the link as an anchor that opens in a new, unlinked context.
    #[must_use]
    pub fn to_html(&self) -> String {
        format!(
            r#"<a href="{}" class="{LINK_CLASS}" target="_blank" rel="noopener noreferrer" title="{}">{}</a>"#,
            html_escape(&self.url),
            html_escape(&self.title()),
            html_escape(&self.issue_key),
        )
    }
}

pub(crate) fn link_title(issue_key: &str) -> String {
    format!("Open {issue_key} in Jira")
}

/// A generic HTML element, the reference host for the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlElement {
    tag: String,
    classes: Vec<String>,
}

impl HtmlElement {
    /// Creates an element; the tag name is lower-cased.
    #[must_use]
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self {
            tag: tag.as_ref().to_ascii_lowercase(),
            classes: Vec::new(),
        }
    }

    /// Adds a class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

impl ContainerMeta for HtmlElement {
    fn kind(&self) -> ContainerKind {
        if self.has_class(LINK_CLASS) {
            return ContainerKind::AlreadyLinked;
        }
        classify_tag(&self.tag)
    }
}

/// Categorizes an HTML tag name (lowercase).
#[must_use]
pub fn classify_tag(tag: &str) -> ContainerKind {
    match tag {
        "a" => ContainerKind::AlreadyLinked,
        "code" | "pre" => ContainerKind::InertVerbatim,
        "script" | "style" => ContainerKind::NonRenderable,
        _ => ContainerKind::Normal,
    }
}

/// Tree of plain HTML elements.
pub type HtmlNode = Node<HtmlElement, Infallible>;

/// Serializes an HTML tree, escaping text.
#[must_use]
pub fn render_html(node: &HtmlNode) -> String {
    let mut out = String::new();
    write_html(node, &mut out);
    out
}

fn write_html(node: &HtmlNode, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&html_escape(text)),
        Node::Link(link) => out.push_str(&link.to_html()),
        Node::Container(container) => {
            let element = &container.meta;
            out.push('<');
            out.push_str(&element.tag);
            if !element.classes.is_empty() {
                let _ = write!(
                    out,
                    r#" class="{}""#,
                    html_escape(&element.classes.join(" "))
                );
            }
            out.push('>');
            for child in &container.children {
                write_html(child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
        Node::Leaf(never) => match *never {},
    }
}

/// Escapes HTML special characters.
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
