//! The file URL codec of the file-to-HTTP bridge.
//!
//! Local `file://` documents are served over HTTP under a path of the form
//! `.../file/<encoded name>`. Servlet containers and proxies collapse two
//! adjacent slashes into one, even when one of them is percent-encoded, so
//! the name is structurally escaped before it is percent-encoded:
//!
//! | literal | escaped |
//! |---------|---------|
//! | `$`     | `$$`    |
//! | `//`    | `/$/$`  |
//!
//! Both substitutions happen in a single left-to-right pass, so the output
//! never contains `//`: `a//b` becomes `a/$/$b` and `a///b` becomes
//! `a/$/$/b`. Decoding percent-decodes first and then reverses the
//! substitutions in one pass, trying `$/$` before `$$`.

use crate::error::{DocgateError, Result};
use tracing::trace;

/// Marks the start of the encoded file name in a bridge path
pub const FILE_MARKER: &str = "file/";

const FILE_URL_PREFIX: &str = "file://";

/// Encode a `file://` URL as a bridge path starting with [`FILE_MARKER`].
///
/// ```
/// use docgate_core::codec::{encode_file_url, extract_file_url};
///
/// let href = encode_file_url("file:///srv/docs/a$b.pdf");
/// assert_eq!(href, "file/%24/%24srv/docs/a%24%24b.pdf");
/// assert_eq!(extract_file_url(&href).unwrap(), "file:///srv/docs/a$b.pdf");
/// ```
pub fn encode_file_url(url: &str) -> String {
    let file_name = url_to_file_name(url);
    let escaped = escape(&format!("{}{}", FILE_MARKER, file_name));
    let href = urlencoding::encode(&escaped).replace("%2F", "/");
    trace!(url = url, href = %href, "Encoded file URL");
    href
}

/// Recover the `file://` URL from a bridge request path.
///
/// Everything up to and including the first [`FILE_MARKER`] is ignored.
pub fn extract_file_url(request_path: &str) -> Result<String> {
    let decoded = urlencoding::decode(request_path).map_err(|e| {
        DocgateError::decoding(format!("invalid request path '{}': {}", request_path, e))
    })?;

    let file_pos = decoded.find(FILE_MARKER).ok_or_else(|| {
        DocgateError::decoding(format!(
            "request path '{}' does not contain '{}'",
            request_path, FILE_MARKER
        ))
    })?;

    let file_name = unescape(&decoded[file_pos + FILE_MARKER.len()..]);
    Ok(file_name_to_url(&file_name))
}

/// Strip the `file://` scheme from a URL and turn `%20` into spaces.
pub fn url_to_file_name(url: &str) -> String {
    url.strip_prefix(FILE_URL_PREFIX)
        .unwrap_or(url)
        .replace("%20", " ")
}

/// Inverse of [`url_to_file_name`].
pub fn file_name_to_url(file_name: &str) -> String {
    format!("{}{}", FILE_URL_PREFIX, file_name.replace(' ', "%20"))
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("//") {
            out.push_str("/$/$");
            rest = &rest[2..];
        } else if c == '$' {
            out.push_str("$$");
            rest = &rest[1..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with("$/$") {
            out.push('/');
            rest = &rest[3..];
        } else if rest.starts_with("$$") {
            out.push('$');
            rest = &rest[2..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Models a transport that merges adjacent slashes.
    fn collapse_slashes(path: &str) -> String {
        let mut out = String::with_capacity(path.len());
        for c in path.chars() {
            if c == '/' && out.ends_with('/') {
                continue;
            }
            out.push(c);
        }
        out
    }

    fn through_transport(url: &str) -> String {
        let href = encode_file_url(url);
        let request_path = collapse_slashes(&format!("/search/{}", href));
        extract_file_url(&request_path).unwrap()
    }

    #[test]
    fn test_escape_examples() {
        assert_eq!(escape("a//b"), "a/$/$b");
        assert_eq!(escape("a///b"), "a/$/$/b");
        assert_eq!(escape("a$b"), "a$$b");
        assert_eq!(escape("a$/$b"), "a$$/$$b");
        assert_eq!(escape("a/b"), "a/b");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        for input in ["a//b", "a///b", "a////b", "a$b", "a$/$b", "$$", "/$/", "//$//"] {
            assert_eq!(unescape(&escape(input)), input, "input: {}", input);
        }
    }

    #[test]
    fn test_encoded_path_has_no_double_slash() {
        let href = encode_file_url("file:////server//share///dir/file.txt");
        assert!(!href.contains("//"), "href: {}", href);
    }

    #[test]
    fn test_consecutive_separators() {
        for url in [
            "file://relative.txt",
            "file:///srv/a.txt",
            "file:////server/share/a.txt",
            "file://///server/share/a.txt",
            "file:///srv//a.txt",
            "file:///srv///a.txt",
        ] {
            assert_eq!(through_transport(url), url);
        }
    }

    #[test]
    fn test_dollar_in_file_name() {
        for url in [
            "file:///srv/$report.pdf",
            "file:///srv/a$$b.pdf",
            "file:///srv/a$/$b.pdf",
            "file:///srv/$/x",
        ] {
            assert_eq!(through_transport(url), url);
        }
    }

    #[test]
    fn test_spaces_and_non_ascii() {
        let url = "file:///srv/Jahresbericht%20Gr\u{fc}n.pdf";
        let href = encode_file_url(url);
        assert!(href.contains("%20"));
        assert_eq!(through_transport(url), url);
    }

    #[test]
    fn test_slashes_are_readable() {
        assert_eq!(encode_file_url("file:///srv/docs/a.pdf"), "file/%24/%24srv/docs/a.pdf");
    }

    #[test]
    fn test_extract_requires_marker() {
        assert!(matches!(
            extract_file_url("/search/download/a.pdf"),
            Err(DocgateError::Decoding { .. })
        ));
    }

    #[test]
    fn test_file_name_conversion() {
        assert_eq!(url_to_file_name("file:///srv/my%20file.txt"), "/srv/my file.txt");
        assert_eq!(file_name_to_url("/srv/my file.txt"), "file:///srv/my%20file.txt");
    }

    fn path_segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9._-]{1,8}"
    }

    fn separator() -> impl Strategy<Value = String> {
        (0usize..=4).prop_map(|n| "/".repeat(n))
    }

    proptest! {
        #[test]
        fn prop_round_trip_through_collapsing_transport(
            parts in prop::collection::vec((separator(), path_segment()), 1..5),
            dollars in prop::collection::vec(0usize..64, 0..=2),
        ) {
            let mut name: String = parts.iter().map(|(sep, seg)| format!("{}{}", sep, seg)).collect();
            for pos in dollars {
                let at = name
                    .char_indices()
                    .map(|(i, _)| i)
                    .nth(pos % name.chars().count())
                    .unwrap_or(0);
                name.insert(at, '$');
            }
            let url = format!("file://{}", name);

            prop_assert_eq!(through_transport(&url), url);
        }
    }
}
