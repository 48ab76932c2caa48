//! Page request and response abstraction.
//!
//! The HTTP transport is not part of Docgate. Front ends translate their
//! native request into a [`PageRequest`] and hand a [`PageResponse`]
//! implementation to the file delivery code. Both are deliberately small:
//! the core only needs ordered parameters, a few headers, the request path
//! and the init parameters of the hosting application.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::debug;

/// HTTP-date format (RFC 7231, IMF-fixdate)
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Obsolete forms recipients still have to accept (RFC 850 and asctime)
const OBSOLETE_HTTP_DATE_FORMATS: [&str; 2] =
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %d %H:%M:%S %Y"];

/// An incoming page request.
///
/// Parameters keep the order in which they were supplied; several
/// parameters with the same name are allowed.
///
/// ## Example
///
/// ```
/// use docgate_core::PageRequest;
///
/// let request = PageRequest::from_uri("/search?index=docs&query=budget");
/// assert_eq!(request.parameter("index"), Some("docs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    path: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    init_params: HashMap<String, String>,
}

impl PageRequest {
    /// Create a request for the given path with no parameters.
    pub fn new(path: impl Into<String>) -> Self {
        PageRequest {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a request from a path with an optional query string.
    ///
    /// Query string values are form-decoded (`+` is a space). Pairs that
    /// fail to decode are kept verbatim.
    pub fn from_uri(uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let mut request = PageRequest::new(path);
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                request
                    .params
                    .push((form_decode(name), form_decode(value)));
            }
        }
        request
    }

    /// Add a parameter (appended after all existing ones).
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add an init parameter of the hosting application.
    pub fn with_init_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.init_params.insert(name.into(), value.into());
        self
    }

    /// The request path (without query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All values of a parameter, or `None` if the parameter is absent.
    pub fn parameters(&self, name: &str) -> Option<Vec<&str>> {
        let values: Vec<&str> = self
            .params
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }

    /// All values of a parameter; empty if the parameter is absent.
    pub fn parameters_not_null(&self, name: &str) -> Vec<&str> {
        self.parameters(name).unwrap_or_default()
    }

    /// The first value of a parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Distinct parameter names in order of first appearance.
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.params {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// A header value (case-insensitive name lookup).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// A header parsed as an HTTP date.
    ///
    /// Returns `None` if the header is absent or not a valid date.
    pub fn header_as_date(&self, name: &str) -> Option<DateTime<Utc>> {
        let value = self.header(name)?;
        match parse_http_date(value) {
            Some(date) => Some(date),
            None => {
                debug!(header = name, value = value, "Ignoring unparseable date header");
                None
            }
        }
    }

    /// An init parameter of the hosting application.
    pub fn init_parameter(&self, name: &str) -> Option<&str> {
        self.init_params.get(name).map(String::as_str)
    }
}

/// The response side of a page request.
pub trait PageResponse {
    /// Finish the response with the given status and no body.
    fn send_status(&mut self, status: u16);

    /// Set a response header, replacing any previous value.
    fn set_header(&mut self, name: &str, value: &str);

    /// Set a response header to an HTTP date.
    fn set_header_as_date(&mut self, name: &str, date: DateTime<Utc>) {
        self.set_header(name, &format_http_date(date));
    }

    /// The body stream.
    fn output(&mut self) -> io::Result<&mut dyn Write>;
}

/// A response that keeps everything in memory.
///
/// Used by the CLI and by tests.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for BufferedResponse {
    fn default() -> Self {
        BufferedResponse {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl BufferedResponse {
    /// Create an empty `200` response.
    pub fn new() -> Self {
        Self::default()
    }

    /// The response status.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// A header value (case-insensitive name lookup).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers in the order they were first set.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl PageResponse for BufferedResponse {
    fn send_status(&mut self, status: u16) {
        self.status = status;
        self.body.clear();
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(header) => header.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn output(&mut self) -> io::Result<&mut dyn Write> {
        Ok(&mut self.body)
    }
}

/// Format a timestamp as an HTTP date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date in the preferred form or one of the obsolete ones.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    // asctime pads single-digit days with a second space
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    std::iter::once(HTTP_DATE_FORMAT)
        .chain(OBSOLETE_HTTP_DATE_FORMATS)
        .find_map(|format| chrono::NaiveDateTime::parse_from_str(&collapsed, format).ok())
        .map(|d| d.and_utc())
}

fn form_decode(value: &str) -> String {
    let spaced = value.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
