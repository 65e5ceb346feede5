//! Computing, deduplicating and replaying traces.
//!
//! Replay is a strict path matcher: each step takes the *direct* children of
//! the current candidates whose tag equals the next name, branching over every
//! sibling match. There are no wildcards and no skipped wrapper levels; sites
//! with inconsistent markup are handled by storing several traces and trying
//! each of them.

use super::Trace;
use crate::dom::{Document, NodeId};
use crate::error::{CrawlError, Result};
use crate::models::TraceKind;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Root-first trace of element `node`.
///
/// Walks up through the ancestors collecting tag names and stops as soon as the
/// current node's parent is the synthetic root, so the root itself is never
/// included. Returns `None` when `node` is not an element.
pub fn compute_trace(doc: &Document, node: NodeId) -> Option<Trace> {
    let mut tags = Vec::new();
    let mut current = node;
    loop {
        tags.push(doc.tag_name(current)?.to_string());
        match doc.parent(current) {
            Some(parent) if !doc.is_root(parent) => current = parent,
            _ => break,
        }
    }
    tags.reverse();
    Trace::new(tags).ok()
}

/// Unique traces for a list of hrefs, in first-seen order.
///
/// For each link the first anchor in document order whose `href` equals it is
/// traced; traces whose digest was already seen are dropped. Links with no
/// matching anchor are skipped.
pub fn dedupe_traces(links: &[String], doc: &Document) -> Vec<Trace> {
    let anchors = doc.find_all("a");
    let mut seen = HashSet::new();
    let mut traces = Vec::new();

    for link in links {
        let Some(anchor) = anchors
            .iter()
            .copied()
            .find(|a| doc.attr(*a, "href") == Some(link.as_str()))
        else {
            debug!(%link, "no anchor found for link");
            continue;
        };
        let Some(trace) = compute_trace(doc, anchor) else {
            continue;
        };
        if seen.insert(trace_digest(&trace)) {
            traces.push(trace);
        }
    }
    traces
}

fn trace_digest(trace: &Trace) -> String {
    hex::encode(Sha256::digest(format!("{:?}", trace.tags()).as_bytes()))
}

/// Every element under `root` reached by following `trace` exactly.
pub fn replay(doc: &Document, root: NodeId, trace: &Trace) -> Vec<NodeId> {
    let mut matches = Vec::new();
    follow(doc, root, trace.tags(), &mut matches);
    matches
}

fn follow(doc: &Document, node: NodeId, remaining: &[String], out: &mut Vec<NodeId>) {
    match remaining {
        [] => {}
        [target] => out.extend(doc.child_elements(node, target)),
        [next, rest @ ..] => {
            for child in doc.child_elements(node, next) {
                follow(doc, child, rest, out);
            }
        }
    }
}

/// Concatenated matches of every trace, in trace order.
pub fn replay_all(doc: &Document, root: NodeId, traces: &[Trace]) -> Vec<NodeId> {
    traces
        .iter()
        .flat_map(|trace| replay(doc, root, trace))
        .collect()
}

/// Text of the first element resolved by the first trace that resolves.
///
/// Traces are tried in order. The first trace that reaches any element wins,
/// even when that element has no text.
#[instrument(level = "debug", skip_all, fields(traces = traces.len()))]
pub fn replay_text(
    doc: &Document,
    root: NodeId,
    traces: &[Trace],
    kind: TraceKind,
    url: &str,
) -> Result<String> {
    for trace in traces {
        match replay(doc, root, trace).into_iter().next() {
            Some(first) => return Ok(doc.text(first)),
            None => debug!(%trace, "trace did not resolve"),
        }
    }
    Err(CrawlError::ReplayMiss {
        kind,
        url: url.to_string(),
    })
}
