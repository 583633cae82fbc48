//! Namespace-preserving filtering proxy for RSS and Atom feeds.
//!
//! sift fetches an upstream feed, removes the entries that match a
//! user-authored boolean rule tree, and returns the feed with its structure
//! and XML namespace declarations intact. The rule tree is the JSON a
//! query-builder UI produces, validated once at configuration time; the feed
//! round-trips through a lossless document tree so the output differs from
//! the input only by the removed entries and a " (filtered)" title marker.
//!
//! # Example
//!
//! ```no_run
//! use sift::{filter_feed, RuleNode, Settings};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let rule = RuleNode::from_json(
//!     r#"{"condition": "AND", "rules": [
//!         {"id": "title", "field": "Title", "type": "string",
//!          "operator": "contains", "value": "Boring"}
//!     ]}"#,
//! )?;
//!
//! let client = Settings::default().build_client()?;
//! let filtered = filter_feed(&client, "https://example.com/feed.xml", &rule).await?;
//! assert_eq!(filtered.content_type, "application/rss+xml");
//! # Ok(())
//! # }
//! ```
//!
//! Persistence of filter configurations, HTTP routing, and authentication are
//! the caller's concern; [`FilterConfig`] is the validation gate a
//! configuration passes before being stored.

pub mod config;
pub mod feed;
pub mod item;
pub mod pipeline;
pub mod rule;
pub mod util;
pub mod xml;

pub use config::{FilterConfig, FilterConfigError, Settings, SettingsError};
pub use feed::{classify, FeedKind, FetchError};
pub use item::{Item, ItemField};
pub use pipeline::{filter_feed, Diagnostic, FilterError, FilteredFeed, FILTERED_TITLE_SUFFIX};
pub use rule::{Condition, LeafValue, Operator, RuleError, RuleLeaf, RuleNode};
pub use xml::{Document, XmlError};
