//! Assembles the query string of a search request.
//!
//! The free-text `query` parameters come first, joined by single spaces.
//! Every `field.<name>` parameter then appends `<name>:"<value>"` and every
//! `fieldNoString.<name>` parameter appends `<name>:<value>`, in the order
//! the parameters were supplied. Field values are trimmed and skipped when
//! empty; literal values are passed through untouched, so callers can send
//! ranges such as `[2000 TO 2010]`. The result is trimmed.

use crate::request::PageRequest;
use tracing::debug;

/// Parameter holding free-text query fragments
pub const QUERY_PARAM: &str = "query";
/// Prefix of parameters holding quoted field values
pub const FIELD_PREFIX: &str = "field.";
/// Prefix of parameters holding literal (non-string) field values
pub const FIELD_PREFIX_NOSTRING: &str = "fieldNoString.";

/// Build the query string of a request.
pub fn build_query_string(request: &PageRequest) -> String {
    let mut query = request.parameters_not_null(QUERY_PARAM).join(" ");

    for param_name in request.parameter_names() {
        if let Some(field_name) = param_name.strip_prefix(FIELD_PREFIX) {
            if let Some(value) = field_value(request, param_name, field_name) {
                query.push(' ');
                query.push_str(field_name);
                query.push_str(":\"");
                query.push_str(value);
                query.push('"');
            }
        }
        if let Some(field_name) = param_name.strip_prefix(FIELD_PREFIX_NOSTRING) {
            if let Some(value) = field_value(request, param_name, field_name) {
                query.push(' ');
                query.push_str(field_name);
                query.push(':');
                query.push_str(value);
            }
        }
    }

    query.trim().to_string()
}

/// The trimmed, non-empty value of a field parameter
fn field_value<'r>(request: &'r PageRequest, param_name: &str, field_name: &str) -> Option<&'r str> {
    if field_name.is_empty() {
        debug!(param = param_name, "Ignoring field parameter without a field name");
        return None;
    }
    request
        .parameter(param_name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
