//! Shared helpers used by the configuration gate and the pipeline.
//!
//! Currently this is just upstream-URL validation:
//!
//! ```
//! use sift::util::validate_upstream_url;
//!
//! let url = validate_upstream_url("https://example.com/feed.xml").unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//! ```

mod url_validator;

pub use url_validator::{validate_upstream_url, UrlValidationError};
