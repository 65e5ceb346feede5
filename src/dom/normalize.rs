//! Document normalizers.
//!
//! Two distinct policies, both producing a new document rooted at `body`
//! (synthetic root -> `body` -> ...), so traces computed against either start
//! with `body`:
//!
//! - [`keep_anchor_paths`]: keep only allow-listed tags that lie on a path to at
//!   least one `<a>`. Used for link listing, where we want a small candidate set.
//! - [`strip_boilerplate`]: drop only deny-listed subtrees (scripts, styles,
//!   frames, nav, header, footer, aside). Used when the full anchor population or
//!   the page's text content is needed.

use super::{Document, NodeId, NodeKind};
use once_cell::sync::Lazy;
use std::collections::HashSet;

static INTERESTING_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "body", "html", "div", "ul", "ol", "li", "p", "a", "h1", "h2", "h3", "h4", "h5", "h6",
        "span", "article", "section", "main",
    ]
    .into_iter()
    .collect()
});

static UNINTERESTING_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "noscript", "script", "style", "iframe", "frame", "frameset", "footer", "header", "nav",
        "aside",
    ]
    .into_iter()
    .collect()
});

/// Keep only allow-listed elements whose subtree contains an anchor.
///
/// Text is retained under kept elements so anchor text survives. The input is
/// left untouched.
pub fn keep_anchor_paths(doc: &Document) -> Document {
    let mut keep = vec![false; doc.len()];
    let start = body_or_root(doc);
    mark_anchor_paths(doc, start, &mut keep);
    copy_from_body(doc, start, |id| match doc.tag_name(id) {
        Some(_) => keep[id.0],
        None => true,
    })
}

/// Drop deny-listed subtrees and keep everything else.
pub fn strip_boilerplate(doc: &Document) -> Document {
    let start = body_or_root(doc);
    copy_from_body(doc, start, |id| match doc.tag_name(id) {
        Some(name) => !UNINTERESTING_TAGS.contains(name),
        None => true,
    })
}

fn body_or_root(doc: &Document) -> NodeId {
    doc.find_first("body").unwrap_or_else(|| doc.root())
}

/// Returns whether `id` is an anchor or has a kept descendant anchor.
fn mark_anchor_paths(doc: &Document, id: NodeId, keep: &mut [bool]) -> bool {
    let mut contains_anchor = false;
    for &child in doc.children(id) {
        let Some(name) = doc.tag_name(child) else {
            continue;
        };
        if !INTERESTING_TAGS.contains(name) {
            continue;
        }
        if mark_anchor_paths(doc, child, keep) {
            keep[child.0] = true;
            contains_anchor = true;
        }
    }
    let is_anchor = doc.tag_name(id) == Some("a");
    if is_anchor || contains_anchor {
        keep[id.0] = true;
    }
    is_anchor || contains_anchor
}

/// Copy `start` (the body, or the root when there is none) into a new document,
/// descending only into nodes `keep` accepts.
fn copy_from_body(doc: &Document, start: NodeId, keep: impl Fn(NodeId) -> bool) -> Document {
    let mut out = Document::new();
    let out_root = out.root();
    if doc.is_root(start) {
        copy_children(doc, start, &mut out, out_root, &keep);
    } else {
        let body = out.push(doc.node(start).kind.clone(), out_root);
        copy_children(doc, start, &mut out, body, &keep);
    }
    out
}

fn copy_children(
    doc: &Document,
    from: NodeId,
    out: &mut Document,
    into: NodeId,
    keep: &impl Fn(NodeId) -> bool,
) {
    for &child in doc.children(from) {
        if !keep(child) {
            continue;
        }
        let kind = match &doc.node(child).kind {
            NodeKind::Root => continue,
            other => other.clone(),
        };
        let copied = out.push(kind, into);
        copy_children(doc, child, out, copied, keep);
    }
}
