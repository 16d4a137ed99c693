//! URL canonicalization for request keys and configured asset paths.

use url::Url;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    Ok(normalize(&parsed))
}

/// Normalize an already parsed URL into its key form.
///
/// The fragment never reaches the network, so two URLs differing only
/// by fragment address the same cached entry.
pub fn normalize(url: &Url) -> Url {
    let mut normalized = url.clone();
    if let Some(host) = url.host_str() {
        let lower = host.to_lowercase();
        if lower != host {
            let _ = normalized.set_host(Some(&lower));
        }
    }
    normalized.set_fragment(None);
    normalized
}

/// Resolve a configured asset path against the application origin.
///
/// Absolute URLs are kept (after canonicalization); relative entries such
/// as `icons/apple.png` resolve from the origin root.
pub fn resolve_asset(origin: &Url, asset: &str) -> Result<Url, UrlError> {
    let trimmed = asset.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if trimmed.contains("://") {
        return canonicalize(trimmed);
    }

    let path = if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") };
    let joined = origin.join(&path).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    Ok(normalize(&joined))
}
