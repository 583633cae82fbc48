use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors raised when an upstream feed URL fails the public-host policy.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL points to a private or link-local address.
    #[error("Private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("Localhost not allowed")]
    Localhost,
}

/// Validates that a URL is a plausible public upstream feed source.
///
/// The pipeline fetches whatever URL a filter configuration names, so the URL
/// is held to a public-host policy to prevent SSRF against the host network:
///
/// - only `http` / `https` schemes
/// - no `localhost` or loopback addresses
/// - no RFC 1918, link-local, or unique-local addresses
///
/// # Errors
///
/// Returns [`UrlValidationError`] naming the specific policy violation.
///
/// # Examples
///
/// ```
/// use sift::util::validate_upstream_url;
///
/// assert!(validate_upstream_url("https://example.com/feed.xml").is_ok());
/// assert!(validate_upstream_url("http://127.0.0.1/feed").is_err());
/// assert!(validate_upstream_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_upstream_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if let Some(host) = url.host_str() {
        if host.eq_ignore_ascii_case("localhost") {
            return Err(UrlValidationError::Localhost);
        }

        // IPv6 hosts arrive bracketed; strip before parsing
        let bare = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if let Ok(ip) = bare.parse::<IpAddr>() {
            if ip.is_loopback() {
                return Err(UrlValidationError::Localhost);
            }
            if !is_public_ip(&ip) {
                return Err(UrlValidationError::PrivateIp(ip.to_string()));
            }
        }
    }

    Ok(url)
}

fn is_public_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified())
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() || v6.is_unspecified() {
                return false;
            }
            let segments = v6.segments();
            // fc00::/7 unique local, fe80::/10 link local
            let unique_local = (segments[0] & 0xfe00) == 0xfc00;
            let link_local = (segments[0] & 0xffc0) == 0xfe80;
            !(unique_local || link_local)
        }
    }
}
