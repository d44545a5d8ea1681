//! Markdown host: runs the static annotator over pulldown-cmark events.

use std::sync::LazyLock;

use anyhow::{Context as _, Result};
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TextMergeStream};
use pulldown_cmark_to_cmark::cmark;
use regex::Regex;

use crate::linker::JiraLinker;
use crate::tree::{Container, ContainerKind, ContainerMeta, LINK_CLASS, Node, classify_tag};

/// `class` attribute of an HTML tag, quoted or bare.
static CLASS_ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`/]+))"#)
        .expect("invalid class attribute regex")
});

/// Container metadata for a markdown document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownContainer<'a> {
    /// The document root.
    Document,
    /// A block or inline element opened by the parser.
    Tag(Tag<'a>),
    /// Inline raw HTML element such as `<a href="...">...</a>` or `<code>...</code>`.
    RawHtml {
        tag: String,
        /// The opening tag carries the link marker class.
        linked: bool,
        open: CowStr<'a>,
        close: Option<CowStr<'a>>,
    },
}

impl ContainerMeta for MarkdownContainer<'_> {
    fn kind(&self) -> ContainerKind {
        match self {
            Self::Document => ContainerKind::Normal,
            Self::Tag(tag) => match tag {
                Tag::Link { .. } => ContainerKind::AlreadyLinked,
                Tag::CodeBlock(_) => ContainerKind::InertVerbatim,
                Tag::Image { .. } | Tag::HtmlBlock | Tag::MetadataBlock(_) => {
                    ContainerKind::NonRenderable
                }
                _ => ContainerKind::Normal,
            },
            Self::RawHtml { linked: true, .. } => ContainerKind::AlreadyLinked,
            Self::RawHtml { tag, .. } => classify_tag(tag),
        }
    }
}

/// Markdown document tree; events that carry no scannable text stay leaves.
pub type MarkdownNode<'a> = Node<MarkdownContainer<'a>, Event<'a>>;

/// Adds issue links to chapter content.
///
/// Content without any resolvable issue key is returned unchanged, byte for
/// byte.
///
/// # Errors
///
/// Returns an error if markdown reconstruction fails.
pub fn link_issues(content: &str, linker: &mut JiraLinker) -> Result<String> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let events = TextMergeStream::new(Parser::new_ext(content, options));
    let mut root = build_tree(events);

    let linked = linker.annotate_tree(&mut root);
    if linked == 0 {
        return Ok(content.to_string());
    }
    log::debug!("Linked {linked} issue keys");

    let mut events = Vec::new();
    flatten(root, &mut events);

    let mut output = String::new();
    cmark(events.iter(), &mut output).context("Failed to render markdown")?;
    Ok(output)
}

struct Frame<'a> {
    container: MarkdownContainer<'a>,
    children: Vec<MarkdownNode<'a>>,
    /// Unclosed tags inside a raw HTML frame sharing its tag name.
    nested: usize,
}

impl<'a> Frame<'a> {
    const fn new(container: MarkdownContainer<'a>) -> Self {
        Self {
            container,
            children: Vec::new(),
            nested: 0,
        }
    }

    fn into_node(self) -> MarkdownNode<'a> {
        Node::container(self.container, self.children)
    }

    const fn is_raw_html(&self) -> bool {
        matches!(self.container, MarkdownContainer::RawHtml { .. })
    }
}

/// Groups a flat event stream into a tree.
///
/// Start/End pairs become `Tag` containers. Inline HTML opening a tag that
/// must not be rewritten starts a `RawHtml` container that runs until the
/// matching closing tag or the end of the enclosing element.
pub fn build_tree<'a>(events: impl IntoIterator<Item = Event<'a>>) -> MarkdownNode<'a> {
    let mut stack = vec![Frame::new(MarkdownContainer::Document)];

    for event in events {
        match event {
            Event::Start(tag) => stack.push(Frame::new(MarkdownContainer::Tag(tag))),
            Event::End(_) => {
                close_raw_frames(&mut stack);
                pop_frame(&mut stack);
            }
            Event::Text(text) => push_child(&mut stack, Node::Text(text.into_string())),
            Event::InlineHtml(html) => match parse_html_tag(&html) {
                Some(tag) if tag.self_closing => {
                    push_child(&mut stack, Node::Leaf(Event::InlineHtml(html)));
                }
                Some(tag)
                    if !tag.closing && (tag.linked || classify_tag(&tag.name).is_skipped()) =>
                {
                    stack.push(Frame::new(MarkdownContainer::RawHtml {
                        tag: tag.name,
                        linked: tag.linked,
                        open: html,
                        close: None,
                    }));
                }
                Some(tag) if is_open_raw(&stack, &tag.name) => {
                    let Some(frame) = stack.last_mut() else {
                        continue;
                    };
                    if tag.closing && frame.nested == 0 {
                        if let MarkdownContainer::RawHtml { close, .. } = &mut frame.container {
                            *close = Some(html);
                        }
                        pop_frame(&mut stack);
                    } else {
                        if tag.closing {
                            frame.nested -= 1;
                        } else {
                            frame.nested += 1;
                        }
                        frame.children.push(Node::Leaf(Event::InlineHtml(html)));
                    }
                }
                _ => push_child(&mut stack, Node::Leaf(Event::InlineHtml(html))),
            },
            other => push_child(&mut stack, Node::Leaf(other)),
        }
    }

    while stack.len() > 1 {
        pop_frame(&mut stack);
    }
    stack
        .pop()
        .map_or_else(|| Node::container(MarkdownContainer::Document, Vec::new()), Frame::into_node)
}

fn push_child<'a>(stack: &mut [Frame<'a>], node: MarkdownNode<'a>) {
    if let Some(frame) = stack.last_mut() {
        frame.children.push(node);
    }
}

/// Moves the innermost frame into its parent. The root frame is never popped.
fn pop_frame(stack: &mut Vec<Frame<'_>>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(frame) = stack.pop() {
        push_child(stack, frame.into_node());
    }
}

/// Closes raw HTML containers left open at the end of an element.
fn close_raw_frames(stack: &mut Vec<Frame<'_>>) {
    while stack.last().is_some_and(Frame::is_raw_html) {
        pop_frame(stack);
    }
}

fn is_open_raw(stack: &[Frame<'_>], name: &str) -> bool {
    matches!(
        stack.last(),
        Some(Frame { container: MarkdownContainer::RawHtml { tag, .. }, .. }) if tag == name
    )
}

/// What `build_tree` needs to know about one inline HTML tag.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HtmlTag {
    /// Lowercase tag name.
    name: String,
    closing: bool,
    self_closing: bool,
    /// The `class` attribute contains [`LINK_CLASS`].
    linked: bool,
}

fn parse_html_tag(html: &str) -> Option<HtmlTag> {
    let trimmed = html.trim();
    let rest = trimmed.strip_prefix('<')?;
    let (closing, rest) = rest
        .strip_prefix('/')
        .map_or((false, rest), |r| (true, r));
    let name: String = rest
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if name.is_empty() {
        return None;
    }

    let linked = !closing
        && CLASS_ATTR_REGEX.captures(trimmed).is_some_and(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .any(|value| value.as_str().split_ascii_whitespace().any(|c| c == LINK_CLASS))
        });

    Some(HtmlTag {
        name,
        closing,
        self_closing: !closing && trimmed.ends_with("/>"),
        linked,
    })
}

/// Turns a tree back into the event stream it came from, with links as inline HTML.
pub fn flatten<'a>(node: MarkdownNode<'a>, out: &mut Vec<Event<'a>>) {
    match node {
        Node::Text(text) => out.push(Event::Text(text.into())),
        Node::Link(link) => out.push(Event::InlineHtml(link.to_html().into())),
        Node::Leaf(event) => out.push(event),
        Node::Container(Container { meta, children }) => match meta {
            MarkdownContainer::Document => {
                for child in children {
                    flatten(child, out);
                }
            }
            MarkdownContainer::Tag(tag) => {
                let end = tag.to_end();
                out.push(Event::Start(tag));
                for child in children {
                    flatten(child, out);
                }
                out.push(Event::End(end));
            }
            MarkdownContainer::RawHtml { open, close, .. } => {
                out.push(Event::InlineHtml(open));
                for child in children {
                    flatten(child, out);
                }
                if let Some(close) = close {
                    out.push(Event::InlineHtml(close));
                }
            }
        },
    }
}
