use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Why a link from the store was refused.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
    #[error("URLs with embedded credentials are not opened")]
    Credentials,
    #[error("Private or local address not allowed: {0}")]
    PrivateAddress(String),
}

/// Validate a link taken from store content before handing it to the
/// system browser.
///
/// Store content is remote data, so links are restricted to public
/// `http`/`https` URLs. Anything else (`file:`, `javascript:`, custom
/// protocol handlers, local network addresses) is refused.
///
/// ```
/// use dailybrief::util::validate_url_for_open;
///
/// assert!(validate_url_for_open("https://news.example.com/a").is_ok());
/// assert!(validate_url_for_open("file:///etc/passwd").is_err());
/// assert!(validate_url_for_open("http://192.168.1.1/admin").is_err());
/// ```
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(UrlValidationError::Credentials);
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if host.eq_ignore_ascii_case("localhost") || host.ends_with(".localhost") {
        return Err(UrlValidationError::PrivateAddress(host.to_owned()));
    }

    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateAddress(ip.to_string()));
        }
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_links_accepted() {
        assert!(validate_url_for_open("https://example.com/story?id=1").is_ok());
        assert!(validate_url_for_open("http://news.example.org").is_ok());
        assert!(validate_url_for_open("  https://example.com/padded  ").is_ok());
    }

    #[test]
    fn test_non_web_schemes_rejected() {
        for url in ["file:///etc/passwd", "javascript:alert(1)", "ftp://example.com", "mailto:a@b.c"] {
            assert!(validate_url_for_open(url).is_err(), "{} should be rejected", url);
        }
    }

    #[test]
    fn test_local_hosts_rejected() {
        assert!(validate_url_for_open("http://localhost:8080/").is_err());
        assert!(validate_url_for_open("http://127.0.0.1/").is_err());
        assert!(validate_url_for_open("http://[::1]/").is_err());
        assert!(validate_url_for_open("http://10.0.0.1/").is_err());
        assert!(validate_url_for_open("http://169.254.169.254/latest").is_err());
        assert!(validate_url_for_open("http://[fe80::1]/").is_err());
        assert!(validate_url_for_open("http://0.0.0.0/").is_err());
    }

    #[test]
    fn test_credentials_rejected() {
        assert!(matches!(
            validate_url_for_open("https://user:pw@example.com/"),
            Err(UrlValidationError::Credentials)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            validate_url_for_open("not a url"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
