//! Feed-type detection and upstream fetching.
//!
//! - [`detect`] - classifies a parsed document as RSS, Atom, or unknown from
//!   the upstream `Content-Type` header and the root element
//! - [`fetcher`] - single-shot HTTP retrieval with a response-size cap
//!
//! Retries, backoff, and timeouts are deliberately not here: the pipeline
//! performs exactly one fetch per request and the caller owns the retry
//! policy and supplies the bounded client (see [`crate::config::Settings`]).

pub mod detect;
pub mod fetcher;

/// The Atom 1.0 namespace.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

pub use detect::{classify, FeedKind};
pub use fetcher::{fetch_feed, FetchError, UpstreamFeed};
