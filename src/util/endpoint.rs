use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors raised while validating a configured remote endpoint.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP pointed at a non-loopback host.
    #[error("Insecure endpoint: HTTPS required for {0} (plain HTTP allowed for localhost only)")]
    Insecure(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a feed API or webhook URL taken from configuration.
///
/// HTTPS is required. Plain HTTP is accepted only for loopback hosts
/// (`localhost`, `127.0.0.1`, `::1`) so local mocks and test servers work.
///
/// # Examples
///
/// ```
/// use digest_sync::util::validate_endpoint;
///
/// assert!(validate_endpoint("https://aws.amazon.com/api/dirs/items/search").is_ok());
/// assert!(validate_endpoint("http://127.0.0.1:8080/search").is_ok());
/// assert!(validate_endpoint("http://example.com/search").is_err());
/// assert!(validate_endpoint("file:///etc/passwd").is_err());
/// ```
pub fn validate_endpoint(url_str: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(url_str)?;

    let host = url.host_str().ok_or(EndpointError::MissingHost)?.to_owned();

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(&host) => {
            tracing::warn!(endpoint = %host, "Using plain HTTP endpoint (localhost only)");
            Ok(url)
        }
        "http" => Err(EndpointError::Insecure(host)),
        scheme => Err(EndpointError::UnsupportedScheme(scheme.to_owned())),
    }
}

fn is_loopback_host(host: &str) -> bool {
    if host == "localhost" {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    host_for_parse
        .parse::<IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}
