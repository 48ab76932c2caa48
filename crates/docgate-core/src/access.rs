//! Group-based access control.
//!
//! An index may name an [`AccessController`]. For every request the
//! controller reports the groups the caller belongs to, and every query
//! run against that index is rewritten so that a document must also carry
//! at least one of those groups in its `groups` field.
//!
//! When a controller reports no groups at all, the query is left
//! unrestricted: an empty group set means "everything is visible", not
//! "nothing is visible". Controllers guarding restricted content must
//! therefore always return at least one group.

use crate::config::IndexConfig;
use crate::error::{DocgateError, Result};
use crate::query::{BooleanQuery, Occur, Query};
use crate::request::PageRequest;
use crate::types::FIELD_ACCESS_CONTROL_GROUPS;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Header read by [`HeaderGroupsController`] unless configured otherwise
pub const DEFAULT_GROUPS_HEADER: &str = "X-Search-Groups";

/// Registry name of the built-in [`HeaderGroupsController`]
pub const HEADER_CONTROLLER_NAME: &str = "header";

/// Registry name of the built-in [`HeaderGroupsController::deny_when_missing`]
pub const STRICT_HEADER_CONTROLLER_NAME: &str = "header-strict";

/// Group reported for callers without groups by a strict controller.
///
/// Indexers never assign it, so a query restricted to it matches nothing.
pub const NO_GROUPS: &str = "docgate:no-groups";

/// Reports the access-control groups of the caller of a request.
pub trait AccessController: Send + Sync {
    /// The caller's groups; `None` or an empty list declares no restriction.
    fn user_groups(&self, request: &PageRequest) -> Result<Option<Vec<String>>>;
}

/// Reads the caller's groups from a comma-separated request header.
///
/// Meant for deployments where an authenticating proxy in front of the
/// search front end sets the header.
///
/// By default a request without the header (or with an empty one) reports
/// no groups and therefore sees every document of the index. Unless the
/// proxy always sets the header, use [`deny_when_missing`] so such callers
/// see nothing instead.
///
/// [`deny_when_missing`]: HeaderGroupsController::deny_when_missing
#[derive(Debug, Clone)]
pub struct HeaderGroupsController {
    header: String,
    deny_when_missing: bool,
}

impl HeaderGroupsController {
    pub fn new(header: impl Into<String>) -> Self {
        HeaderGroupsController {
            header: header.into(),
            deny_when_missing: false,
        }
    }

    /// Report [`NO_GROUPS`] for callers without any group
    pub fn deny_when_missing(mut self) -> Self {
        self.deny_when_missing = true;
        self
    }
}

impl Default for HeaderGroupsController {
    fn default() -> Self {
        Self::new(DEFAULT_GROUPS_HEADER)
    }
}

impl AccessController for HeaderGroupsController {
    fn user_groups(&self, request: &PageRequest) -> Result<Option<Vec<String>>> {
        let groups: Option<Vec<String>> = request.header(&self.header).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect()
        });

        if self.deny_when_missing && groups.as_ref().map_or(true, Vec::is_empty) {
            debug!(header = %self.header, "No groups supplied, denying access");
            return Ok(Some(vec![NO_GROUPS.to_string()]));
        }
        Ok(groups)
    }
}

/// Access controllers by the name the configuration refers to them with.
#[derive(Clone, Default)]
pub struct AccessControllerRegistry {
    controllers: HashMap<String, Arc<dyn AccessController>>,
}

impl AccessControllerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in controllers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            HEADER_CONTROLLER_NAME,
            Arc::new(HeaderGroupsController::default()),
        );
        registry.register(
            STRICT_HEADER_CONTROLLER_NAME,
            Arc::new(HeaderGroupsController::default().deny_when_missing()),
        );
        registry
    }

    /// Register (or replace) a controller
    pub fn register(&mut self, name: impl Into<String>, controller: Arc<dyn AccessController>) {
        self.controllers.insert(name.into(), controller);
    }

    /// Look up a controller
    pub fn get(&self, name: &str) -> Option<Arc<dyn AccessController>> {
        self.controllers.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.controllers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Reject groups that can never match the whitespace-tokenized group field.
pub fn check_group_array(controller: &str, groups: Option<&[String]>) -> Result<()> {
    for group in groups.unwrap_or_default() {
        if group.is_empty() || group.chars().any(char::is_whitespace) {
            return Err(DocgateError::InvalidAccessGroup {
                controller: controller.to_string(),
                group: group.clone(),
            });
        }
    }
    Ok(())
}

/// Restrict `query` to documents carrying at least one of `groups`.
///
/// Without groups, a boolean query is returned unchanged and any other
/// query is wrapped in a single required clause.
pub fn add_access_control_to_query(query: Query, groups: Option<&[String]>) -> Query {
    let groups = match groups {
        Some(groups) if !groups.is_empty() => groups,
        _ => {
            if query.is_boolean() {
                return query;
            }
            return BooleanQuery::new().with_clause(query, Occur::Must).into();
        }
    };

    let group_query = groups.iter().fold(BooleanQuery::new(), |q, group| {
        q.with_clause(
            Query::term(FIELD_ACCESS_CONTROL_GROUPS, group.as_str()),
            Occur::Should,
        )
    });

    BooleanQuery::new()
        .with_clause(query, Occur::Must)
        .with_clause(group_query.into(), Occur::Must)
        .into()
}

/// Apply the access control of `index` (if it has any) to `query`.
///
/// The index's controller is asked for the caller's groups once per call.
pub fn restrict_query_for_index(
    query: Query,
    index: &IndexConfig,
    request: &PageRequest,
) -> Result<Query> {
    let controller = match index.access_controller() {
        Some(controller) => controller,
        None => return Ok(query),
    };

    let groups = controller.user_groups(request)?;
    check_group_array(
        index.access_controller_name().unwrap_or_default(),
        groups.as_deref(),
    )?;

    debug!(
        index = index.name(),
        groups = ?groups,
        "Restricting query to access-control groups"
    );

    Ok(add_access_control_to_query(query, groups.as_deref()))
}
