use futures::StreamExt;
use thiserror::Error;

/// Response bodies above this are refused outright.
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors from the single upstream fetch.
///
/// Nothing here is retried: the pipeline performs exactly one GET per request
/// and the caller owns retry and backoff policy.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (DNS, connection, TLS, body read).
    #[error("Request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The caller-configured client timeout elapsed.
    #[error("Request timed out")]
    Timeout,
    /// Upstream answered with a non-2xx status.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the size cap.
    #[error("Response too large")]
    ResponseTooLarge,
    /// Fewer bytes arrived than Content-Length promised.
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A fetched upstream response: raw body plus the Content-Type header to be
/// passed through to the output.
#[derive(Debug)]
pub struct UpstreamFeed {
    pub body: Vec<u8>,
    /// Verbatim upstream `Content-Type`, or `""` when the header was absent.
    pub content_type: String,
}

/// Issues one GET against the upstream feed URL.
///
/// The response body is streamed with a hard size cap and checked against
/// Content-Length for completeness. Timeout behavior comes entirely from the
/// supplied client (see [`crate::config::Settings::build_client`]).
///
/// # Errors
///
/// - [`FetchError::Network`] / [`FetchError::Timeout`] - transport failures
/// - [`FetchError::HttpStatus`] - any non-2xx response, surfaced as-is
/// - [`FetchError::ResponseTooLarge`] - body over the cap
/// - [`FetchError::IncompleteResponse`] - body shorter than Content-Length
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<UpstreamFeed, FetchError> {
    tracing::debug!(url = %url, "Fetching upstream feed");

    let response = client.get(url).send().await.map_err(classify_transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    tracing::debug!(url = %url, bytes = body.len(), content_type = %content_type, "Upstream fetch complete");

    Ok(UpstreamFeed { body, content_type })
}

fn classify_transport(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: refuse before reading when Content-Length already exceeds the cap
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify_transport)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
