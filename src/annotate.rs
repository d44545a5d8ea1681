//! Static annotation: rewrites issue keys in a finished content tree into links.

use crate::pattern::{contains_issue_key, match_pattern};
use crate::resolver::UrlResolver;
use crate::tree::{Container, ContainerMeta, IssueLink, Node};

/// Annotates every visitable text node below `root`.
///
/// Returns the number of links created. A bare text root has no parent to
/// splice into and is left alone; use [`annotate_text`] for that case.
pub fn annotate_tree<C: ContainerMeta, L>(
    root: &mut Node<C, L>,
    resolver: &mut UrlResolver,
) -> usize {
    match root {
        Node::Container(container) => annotate_container(container, resolver),
        Node::Text(_) => {
            log::debug!("Annotation root is a bare text node, nothing to splice into");
            0
        }
        Node::Link(_) | Node::Leaf(_) => 0,
    }
}

fn annotate_container<C: ContainerMeta, L>(
    container: &mut Container<C, L>,
    resolver: &mut UrlResolver,
) -> usize {
    let kind = container.meta.kind();
    if kind.is_skipped() {
        log::trace!("Skipping {kind:?} container");
        return 0;
    }
    annotate_children(&mut container.children, resolver)
}

/// Annotates a list of sibling nodes in place, splicing replacements for
/// text nodes that contain resolvable issue keys.
pub fn annotate_children<C: ContainerMeta, L>(
    children: &mut Vec<Node<C, L>>,
    resolver: &mut UrlResolver,
) -> usize {
    let mut linked = 0;
    let mut i = 0;

    while i < children.len() {
        let replacement = match &mut children[i] {
            Node::Container(container) => {
                linked += annotate_container(container, resolver);
                None
            }
            Node::Text(text) => annotate_text(text, resolver),
            Node::Link(_) | Node::Leaf(_) => None,
        };

        match replacement {
            Some(nodes) => {
                let len = nodes.len();
                linked += nodes
                    .iter()
                    .filter(|node| matches!(node, Node::Link(_)))
                    .count();
                children.splice(i..=i, nodes);
                i += len;
            }
            None => i += 1,
        }
    }

    linked
}

/// Splits `text` into plain text and link nodes.
///
/// Returns `None` when nothing would change: either the text holds no issue
/// key or none of its keys resolve. Unresolved keys stay in the surrounding
/// text segment exactly as written.
pub fn annotate_text<C, L>(text: &str, resolver: &mut UrlResolver) -> Option<Vec<Node<C, L>>> {
    if !contains_issue_key(text) {
        return None;
    }

    let mut nodes = Vec::new();
    let mut cursor = 0;

    for issue in match_pattern(text) {
        let Some(url) = resolver.resolve_match(&issue) else {
            continue;
        };
        if issue.offset > cursor {
            nodes.push(Node::Text(text[cursor..issue.offset].to_string()));
        }
        nodes.push(Node::Link(IssueLink::new(issue.full_key, url)));
        cursor = issue.offset + issue.len;
    }

    if nodes.is_empty() {
        return None;
    }
    if cursor < text.len() {
        nodes.push(Node::Text(text[cursor..].to_string()));
    }
    Some(nodes)
}
