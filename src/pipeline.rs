//! The feed filter pipeline: fetch → parse → detect → filter → serialize.
//!
//! One call to [`filter_feed`] is one independent request. Every stage runs
//! synchronously after the single upstream fetch, the document is owned by
//! this call alone, and nothing is retried — a failed stage surfaces
//! immediately and the caller owns retry policy.

use thiserror::Error;

use crate::feed::{classify, fetch_feed, FeedKind, FetchError, ATOM_NS};
use crate::item::Item;
use crate::rule::RuleNode;
use crate::xml::{self, Document, Element, Node, XmlError};

/// Marker appended to the feed-level title of a filtered feed.
pub const FILTERED_TITLE_SUFFIX: &str = " (filtered)";

/// Fatal pipeline errors. Anything here aborts the current request only;
/// other in-flight requests and cached rule trees are unaffected.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The upstream fetch failed; nothing was parsed or serialized.
    #[error("Upstream fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The upstream body was not well-formed XML.
    #[error(transparent)]
    Parse(#[from] XmlError),

    /// An RSS document with no `<channel>` cannot be filtered at all.
    #[error("RSS document has no channel element")]
    MissingChannel,
}

/// Non-fatal conditions observed while filtering. These are reported in
/// [`FilteredFeed::diagnostics`] and logged, never raised as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The document was neither RSS nor Atom and was passed through
    /// unmodified.
    UnknownFeedType {
        content_type: String,
        root_tag: String,
    },
    /// The feed has no feed-level title to mark with the filtered suffix.
    MissingTitle,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnknownFeedType {
                content_type,
                root_tag,
            } => write!(
                f,
                "could not detect feed type (content-type {content_type:?}, root <{root_tag}>)"
            ),
            Diagnostic::MissingTitle => write!(f, "feed has no title element to mark"),
        }
    }
}

/// The outcome of a successful pipeline run.
#[derive(Debug)]
pub struct FilteredFeed {
    /// Serialized feed with matching entries removed.
    pub body: Vec<u8>,
    /// Upstream Content-Type, passed through verbatim.
    pub content_type: String,
    /// How many entries were removed.
    pub removed: usize,
    /// Non-fatal conditions observed along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// Fetches the feed at `url`, removes entries matching `rule`, and returns
/// the re-serialized document.
///
/// Entries the rule matches are *removed* — the tree expresses what to
/// exclude, not what to keep. The feed-level title gains the
/// [`FILTERED_TITLE_SUFFIX`] marker. A document that is neither RSS nor Atom
/// is returned unmodified with a [`Diagnostic::UnknownFeedType`].
///
/// The client should be bounded (see
/// [`Settings::build_client`](crate::config::Settings::build_client)); the
/// pipeline adds no timeout of its own and never retries.
///
/// # Errors
///
/// - [`FilterError::Fetch`] - network failure or non-2xx upstream response
/// - [`FilterError::Parse`] - malformed XML
/// - [`FilterError::MissingChannel`] - RSS document without a `<channel>`
pub async fn filter_feed(
    client: &reqwest::Client,
    url: &str,
    rule: &RuleNode,
) -> Result<FilteredFeed, FilterError> {
    let upstream = fetch_feed(client, url).await?;

    let mut doc = xml::parse(&upstream.body)?;
    tracing::debug!(
        url = %url,
        bytes = upstream.body.len(),
        namespaces = doc.namespaces().len(),
        "Parsed upstream feed"
    );

    let kind = classify(&upstream.content_type, doc.root());

    let mut diagnostics = Vec::new();
    let removed = match kind {
        FeedKind::Rss => filter_rss(&mut doc, rule, &mut diagnostics)?,
        FeedKind::Atom => filter_atom(&mut doc, rule, &mut diagnostics),
        FeedKind::Unknown => {
            tracing::warn!(
                url = %url,
                content_type = %upstream.content_type,
                root = doc.root().name(),
                "Could not detect feed type, returning document unmodified"
            );
            diagnostics.push(Diagnostic::UnknownFeedType {
                content_type: upstream.content_type.clone(),
                root_tag: doc.root().name().to_string(),
            });
            0
        }
    };

    let body = doc.to_bytes()?;
    tracing::info!(url = %url, kind = kind.as_str(), removed = removed, "Feed filtered");

    Ok(FilteredFeed {
        body,
        content_type: upstream.content_type,
        removed,
        diagnostics,
    })
}

/// Removes matching `<item>` children of the channel and marks the channel
/// title. A missing channel is fatal; a missing title is not.
fn filter_rss(
    doc: &mut Document,
    rule: &RuleNode,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<usize, FilterError> {
    let channel = doc
        .root_mut()
        .find_child_mut(None, "channel")
        .ok_or(FilterError::MissingChannel)?;

    mark_title(channel, None, diagnostics);

    let mut removed = 0;
    channel.children_mut().retain(|node| match node {
        Node::Element(el) if el.namespace().is_none() && el.local_name() == "item" => {
            let matched = rule.matches(&Item::from_rss_item(el));
            if matched {
                removed += 1;
            }
            !matched
        }
        _ => true,
    });
    Ok(removed)
}

/// Removes matching `<entry>` children of the feed root and marks the feed
/// title.
fn filter_atom(doc: &mut Document, rule: &RuleNode, diagnostics: &mut Vec<Diagnostic>) -> usize {
    let root = doc.root_mut();
    mark_title(root, Some(ATOM_NS), diagnostics);

    let mut removed = 0;
    root.children_mut().retain(|node| match node {
        Node::Element(el) if el.namespace() == Some(ATOM_NS) && el.local_name() == "entry" => {
            let matched = rule.matches(&Item::from_atom_entry(el));
            if matched {
                removed += 1;
            }
            !matched
        }
        _ => true,
    });
    removed
}

fn mark_title(parent: &mut Element, ns: Option<&str>, diagnostics: &mut Vec<Diagnostic>) {
    match parent.find_child_mut(ns, "title") {
        Some(title) => title.append_text(FILTERED_TITLE_SUFFIX),
        None => {
            tracing::warn!("Could not find feed title to mark");
            diagnostics.push(Diagnostic::MissingTitle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_str;
    use pretty_assertions::assert_eq;

    fn title_equals_foo() -> RuleNode {
        RuleNode::from_json(
            r#"{"condition": "AND", "rules": [
                {"id": "title", "field": "Title", "type": "string", "operator": "equal", "value": "foo"}
            ]}"#,
        )
        .unwrap()
    }

    fn title_contains_boring() -> RuleNode {
        RuleNode::from_json(
            r#"{"condition": "AND", "rules": [
                {"id": "title", "field": "Title", "type": "string", "operator": "contains", "value": "Boring"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_rss_title_marked() {
        let mut doc = parse_str("<rss><channel><title>foo</title></channel></rss>").unwrap();
        let mut diags = Vec::new();
        let removed = filter_rss(&mut doc, &title_equals_foo(), &mut diags).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(
            String::from_utf8(doc.to_bytes().unwrap()).unwrap(),
            "<rss><channel><title>foo (filtered)</title></channel></rss>"
        );
    }

    #[test]
    fn test_rss_matching_item_removed_channel_title_kept() {
        let mut doc = parse_str(
            "<rss><channel><title>asdf</title><item><title>foo</title></item></channel></rss>",
        )
        .unwrap();
        let mut diags = Vec::new();
        let removed = filter_rss(&mut doc, &title_equals_foo(), &mut diags).unwrap();
        assert_eq!(removed, 1);

        let channel = doc.root().find_child(None, "channel").unwrap();
        assert!(channel.find_child(None, "item").is_none());
        // The channel title itself must survive even though it gets the marker
        assert_eq!(
            channel.find_child(None, "title").unwrap().text().as_deref(),
            Some("asdf (filtered)")
        );
    }

    #[test]
    fn test_rss_non_matching_item_kept() {
        let mut doc = parse_str(
            "<rss><channel><title>asdf</title><item><title>bar</title></item></channel></rss>",
        )
        .unwrap();
        let mut diags = Vec::new();
        let removed = filter_rss(&mut doc, &title_equals_foo(), &mut diags).unwrap();
        assert_eq!(removed, 0);
        let channel = doc.root().find_child(None, "channel").unwrap();
        assert!(channel.find_child(None, "item").is_some());
    }

    #[test]
    fn test_rss_missing_channel_is_fatal() {
        let mut doc = parse_str("<rss><title>no channel</title></rss>").unwrap();
        let mut diags = Vec::new();
        assert!(matches!(
            filter_rss(&mut doc, &title_equals_foo(), &mut diags),
            Err(FilterError::MissingChannel)
        ));
    }

    #[test]
    fn test_rss_missing_title_is_diagnostic_not_error() {
        let mut doc =
            parse_str("<rss><channel><item><title>foo</title></item></channel></rss>").unwrap();
        let mut diags = Vec::new();
        let removed = filter_rss(&mut doc, &title_equals_foo(), &mut diags).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(diags, vec![Diagnostic::MissingTitle]);
    }

    #[test]
    fn test_rss_two_items_boring_removed() {
        let mut doc = parse_str(
            "<rss version=\"2.0\"><channel><title>News</title>\
             <item><title>Boring stuff</title></item>\
             <item><title>Interesting stuff</title></item>\
             </channel></rss>",
        )
        .unwrap();
        let mut diags = Vec::new();
        let removed = filter_rss(&mut doc, &title_contains_boring(), &mut diags).unwrap();
        assert_eq!(removed, 1);

        let channel = doc.root().find_child(None, "channel").unwrap();
        let titles: Vec<_> = channel
            .child_elements()
            .filter(|el| el.local_name() == "item")
            .filter_map(|el| el.find_child(None, "title").and_then(|t| t.text()))
            .collect();
        assert_eq!(titles, vec!["Interesting stuff".to_string()]);
        assert_eq!(
            channel.find_child(None, "title").unwrap().text().as_deref(),
            Some("News (filtered)")
        );
    }

    #[test]
    fn test_atom_title_marked() {
        let mut doc =
            parse_str("<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>foo</title></feed>")
                .unwrap();
        let mut diags = Vec::new();
        let removed = filter_atom(&mut doc, &title_equals_foo(), &mut diags);
        assert_eq!(removed, 0);
        assert_eq!(
            doc.root()
                .find_child(Some(ATOM_NS), "title")
                .unwrap()
                .text()
                .as_deref(),
            Some("foo (filtered)")
        );
    }

    #[test]
    fn test_atom_matching_entry_removed_feed_title_kept() {
        let mut doc = parse_str(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>asdf</title>\
             <entry><title>foo</title></entry></feed>",
        )
        .unwrap();
        let mut diags = Vec::new();
        let removed = filter_atom(&mut doc, &title_equals_foo(), &mut diags);
        assert_eq!(removed, 1);
        assert!(doc.root().find_child(Some(ATOM_NS), "entry").is_none());
        assert!(doc.root().find_child(Some(ATOM_NS), "title").is_some());
    }

    #[test]
    fn test_atom_non_matching_entry_kept() {
        let mut doc = parse_str(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>asdf</title>\
             <entry><title>bar</title></entry></feed>",
        )
        .unwrap();
        let mut diags = Vec::new();
        let removed = filter_atom(&mut doc, &title_equals_foo(), &mut diags);
        assert_eq!(removed, 0);
        assert!(doc.root().find_child(Some(ATOM_NS), "entry").is_some());
    }

    #[test]
    fn test_filtering_preserves_namespace_declarations() {
        let mut doc = parse_str(
            "<rss version=\"2.0\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><channel>\
             <title>News</title>\
             <item><title>foo</title><dc:creator>alice</dc:creator></item>\
             <item><title>bar</title><dc:creator>bob</dc:creator></item>\
             </channel></rss>",
        )
        .unwrap();
        let mut diags = Vec::new();
        filter_rss(&mut doc, &title_equals_foo(), &mut diags).unwrap();

        let out = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert_eq!(
            out,
            "<rss version=\"2.0\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><channel>\
             <title>News (filtered)</title>\
             <item><title>bar</title><dc:creator>bob</dc:creator></item>\
             </channel></rss>"
        );
    }
}
