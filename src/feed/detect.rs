use crate::feed::ATOM_NS;
use crate::xml::Element;

/// What the upstream document turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Atom,
    /// Neither RSS nor Atom; the pipeline passes the document through
    /// unmodified and records a diagnostic.
    Unknown,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Rss => "rss",
            FeedKind::Atom => "atom",
            FeedKind::Unknown => "unknown",
        }
    }
}

/// Classifies a parsed document from the upstream `Content-Type` header and
/// its root element.
///
/// The content type takes precedence over structural sniffing; media-type
/// parameters (`; charset=...`) are ignored. Structurally, a root whose local
/// name is `rss` is RSS, and a root whose local name is `feed` — bare or in
/// the Atom namespace — is Atom. Tag comparison is exact equality.
///
/// Pure function; classification never mutates or fails.
pub fn classify(content_type: &str, root: &Element) -> FeedKind {
    match media_type(content_type) {
        "application/rss+xml" => return FeedKind::Rss,
        "application/atom+xml" => return FeedKind::Atom,
        _ => {}
    }

    if root.local_name() == "rss" {
        return FeedKind::Rss;
    }
    if root.local_name() == "feed" && root.namespace().map_or(true, |ns| ns == ATOM_NS) {
        return FeedKind::Atom;
    }
    FeedKind::Unknown
}

/// The bare media type, with any `;`-separated parameters stripped.
fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
}
