//! Namespace-preserving XML parsing and serialization.
//!
//! Feeds are round-tripped through an in-memory tree rather than a lossy feed
//! model, because the whole point of the proxy is to hand back the upstream
//! document with only the filtered entries missing. Two things make that
//! work:
//!
//! - [`tree`] - the [`Document`]/[`Element`] tree plus an ordered
//!   [`NamespaceMap`] of every prefix declared in the source
//! - [`codec`] - event-based parse and serialize built on `quick-xml`
//!
//! Namespace declarations stay exactly where the upstream document put them
//! (they are kept as ordinary attributes on their elements), so serializing an
//! unfiltered document reproduces the same elements, attributes, and prefix
//! bindings as the input. The prefix map is recorded per document — there is
//! no process-wide namespace table, so concurrent requests cannot corrupt each
//! other's prefix choices.

pub mod codec;
pub mod tree;

pub use codec::{parse, parse_str};
pub use tree::{Attribute, Document, Element, NamespaceMap, Node, XmlDecl};

use thiserror::Error;

/// Errors from the XML codec.
#[derive(Debug, Error)]
pub enum XmlError {
    /// Malformed XML, including unresolvable entity references.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// The document contains no root element.
    #[error("XML document has no root element")]
    NoRootElement,

    /// Writing the document back out failed.
    #[error("XML serialize error: {0}")]
    Serialize(String),
}
