use url::Url;

use crate::{SmoothError, SmoothResult};

/// Path suffix identifying a SmoothStreaming manifest resource.
pub const MANIFEST_SUFFIX: &str = "/Manifest";

/// Append [`MANIFEST_SUFFIX`] unless `url` already ends with it (ASCII case-insensitive).
pub fn normalize_manifest_url(url: &str) -> String {
    let has_suffix = url.len() >= MANIFEST_SUFFIX.len()
        && url.is_char_boundary(url.len() - MANIFEST_SUFFIX.len())
        && url[url.len() - MANIFEST_SUFFIX.len()..].eq_ignore_ascii_case(MANIFEST_SUFFIX);

    if has_suffix {
        url.to_string()
    } else {
        format!("{url}{MANIFEST_SUFFIX}")
    }
}

/// Normalize and parse a manifest URL.
pub fn parse_manifest_url(url: &str) -> SmoothResult<Url> {
    let normalized = normalize_manifest_url(url);
    Url::parse(&normalized).map_err(|e| SmoothError::InvalidUrl(format!("{normalized}: {e}")))
}
