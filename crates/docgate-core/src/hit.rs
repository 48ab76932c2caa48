//! Rendering helpers for search hits.

use crate::codec::encode_file_url;
use crate::error::{DocgateError, Result};
use crate::types::{Document, FIELD_HIGHLIGHTED_TITLE, FIELD_TITLE};

/// The link target of a hit.
///
/// `file://` URLs go through the file-to-HTTP bridge when the index allows
/// it. Any other URL is percent-decoded and every `%` escaped again as
/// `%25`, so file names that really contain `%20` are not fetched as a
/// space.
pub fn hit_href(url: &str, use_file_to_http_bridge: bool) -> Result<String> {
    if url.starts_with("file://") && use_file_to_http_bridge {
        return Ok(encode_file_url(url));
    }

    let decoded = urlencoding::decode(url)
        .map_err(|e| DocgateError::decoding(format!("invalid hit URL '{}': {}", url, e)))?;
    Ok(decoded.replace('%', "%25"))
}

/// The link text of a hit.
///
/// The highlighted title is preferred when highlighting, falling back to
/// the plain title. Without a title, the last path segment of the URL is
/// used.
pub fn link_title(document: &Document, highlight: bool, url: &str) -> String {
    let mut title = if highlight {
        document.get(FIELD_HIGHLIGHTED_TITLE)
    } else {
        document.get(FIELD_TITLE)
    };
    if highlight && title.map_or(true, str::is_empty) {
        title = document.get(FIELD_TITLE);
    }

    match title.map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => match url.rfind('/') {
            Some(pos) => {
                let segment = &url[pos + 1..];
                urlencoding::decode(segment)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| segment.to_string())
            }
            None => url.to_string(),
        },
    }
}
