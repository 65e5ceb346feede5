//! Link heuristics: ways of guessing which anchors on a listing page are
//! article links.
//!
//! Each heuristic is a pure selection over a page that has been through
//! [`crate::dom::strip_boilerplate`], so headings and attributes around the
//! anchors are still present. They are interchangeable; which one runs is a
//! configuration choice.

use crate::dom::{Document, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static DOT_HTML: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.html?(?:[?#].*)?$").unwrap());

/// Strategy used to pick candidate article anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LinkHeuristic {
    /// "article" appears in an attribute of the anchor or its parent.
    ArticleInAttributes,
    /// The anchor sits inside an `<article>` at most five levels up.
    InsideArticleTag,
    /// The anchor sits inside an `<li>` at most five levels up.
    #[default]
    InsideListItem,
    /// A heading is a direct child of the anchor or wraps it within two levels.
    NeighbouringHeading,
    /// The href points at an `.html` page.
    DotHtml,
}

impl LinkHeuristic {
    pub const ALL: [LinkHeuristic; 5] = [
        LinkHeuristic::ArticleInAttributes,
        LinkHeuristic::InsideArticleTag,
        LinkHeuristic::InsideListItem,
        LinkHeuristic::NeighbouringHeading,
        LinkHeuristic::DotHtml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkHeuristic::ArticleInAttributes => "article_in_attributes",
            LinkHeuristic::InsideArticleTag => "inside_article_tag",
            LinkHeuristic::InsideListItem => "inside_list_item",
            LinkHeuristic::NeighbouringHeading => "neighbouring_heading",
            LinkHeuristic::DotHtml => "dot_html",
        }
    }

    /// Anchors in `doc` this heuristic accepts, in document order.
    pub fn select(&self, doc: &Document) -> Vec<NodeId> {
        doc.find_all("a")
            .into_iter()
            .filter(|&a| self.accepts(doc, a))
            .collect()
    }

    fn accepts(&self, doc: &Document, anchor: NodeId) -> bool {
        match self {
            LinkHeuristic::ArticleInAttributes => {
                ancestors_within(doc, anchor, 1).any(|n| attr_mentions(doc, n, "article"))
            }
            LinkHeuristic::InsideArticleTag => inside_tag(doc, anchor, "article", 5),
            LinkHeuristic::InsideListItem => inside_tag(doc, anchor, "li", 5),
            LinkHeuristic::NeighbouringHeading => {
                doc.children(anchor)
                    .iter()
                    .any(|&c| doc.tag_name(c).is_some_and(is_heading))
                    || ["h2", "h3", "h4", "h5"]
                        .iter()
                        .any(|h| inside_tag(doc, anchor, h, 2))
            }
            LinkHeuristic::DotHtml => doc
                .attr(anchor, "href")
                .is_some_and(|href| DOT_HTML.is_match(href)),
        }
    }
}

impl fmt::Display for LinkHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `node` and up to `max_depth` of its element ancestors.
fn ancestors_within(doc: &Document, node: NodeId, max_depth: usize) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(node), move |&n| doc.parent(n))
        .take_while(move |&n| !doc.is_root(n))
        .take(max_depth + 1)
}

fn inside_tag(doc: &Document, node: NodeId, tag: &str, max_depth: usize) -> bool {
    ancestors_within(doc, node, max_depth).any(|n| doc.tag_name(n) == Some(tag))
}

fn attr_mentions(doc: &Document, node: NodeId, keyword: &str) -> bool {
    doc.attrs(node).iter().any(|(_, value)| value.contains(keyword))
}

pub(crate) fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::strip_boilerplate;

    const PAGE: &str = r#"
        <body>
          <div class="article-card"><a href="/by-class">Card</a></div>
          <article><div><p><a href="/features/one">In feature</a></p></div></article>
          <ul><li><span><a href="/in-list">In list</a></span></li></ul>
          <div><h3><a href="/under-heading">Headline</a></h3></div>
          <div><a href="/wraps-heading"><h2>Wrapped</h2></a></div>
          <p><a href="/2025/05/story.html">Static page</a></p>
          <p><a href="/about">About</a></p>
        </body>
    "#;

    fn selected(h: LinkHeuristic) -> Vec<String> {
        let doc = strip_boilerplate(&Document::parse(PAGE));
        h.select(&doc)
            .into_iter()
            .filter_map(|a| doc.attr(a, "href").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_article_in_attributes() {
        assert_eq!(selected(LinkHeuristic::ArticleInAttributes), vec!["/by-class"]);
    }

    #[test]
    fn test_inside_article_tag() {
        assert_eq!(selected(LinkHeuristic::InsideArticleTag), vec!["/features/one"]);
    }

    #[test]
    fn test_inside_list_item() {
        assert_eq!(selected(LinkHeuristic::InsideListItem), vec!["/in-list"]);
    }

    #[test]
    fn test_neighbouring_heading() {
        assert_eq!(
            selected(LinkHeuristic::NeighbouringHeading),
            vec!["/under-heading", "/wraps-heading"]
        );
    }

    #[test]
    fn test_dot_html() {
        assert_eq!(selected(LinkHeuristic::DotHtml), vec!["/2025/05/story.html"]);
        assert!(DOT_HTML.is_match("/a/b.htm?ref=home"));
        assert!(!DOT_HTML.is_match("/html/section"));
    }

    #[test]
    fn test_names_round_trip_through_serde() {
        for h in LinkHeuristic::ALL {
            let json = serde_json::to_string(&h).unwrap();
            assert_eq!(json, format!("\"{}\"", h.as_str()));
        }
    }
}
