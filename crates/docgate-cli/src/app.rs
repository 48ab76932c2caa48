//! Application state management.

use crate::{FieldKind, RequestArgs};
use docgate_core::builder::{FIELD_PREFIX, FIELD_PREFIX_NOSTRING, QUERY_PARAM};
use docgate_core::config::ConfigFile;
use docgate_core::resolver::INDEX_PARAM;
use docgate_core::{
    AccessControllerRegistry, DiskEngine, PageRequest, SearchConfig, SearchToolkit,
    TomlConfigFactory, DEFAULT_GROUPS_HEADER,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Shared application state.
pub struct App {
    /// The search toolkit, reading indexes from disk
    pub toolkit: SearchToolkit,

    /// Configuration file given on the command line
    config_path: Option<PathBuf>,
}

impl App {
    /// Create a new application instance.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let mut factory = TomlConfigFactory::new(AccessControllerRegistry::with_builtins());
        if let Some(path) = &config_path {
            factory = factory.with_path(path);
        }

        App {
            toolkit: SearchToolkit::new(factory, Arc::new(DiskEngine)),
            config_path,
        }
    }

    /// The configuration file in effect.
    pub fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigFile::default_config_path()?),
        }
    }

    /// Load the search configuration.
    pub fn config(&self) -> anyhow::Result<Arc<SearchConfig>> {
        Ok(self.toolkit.config(&PageRequest::new("/"))?)
    }
}

/// Build the page request a search form would have sent.
pub fn search_request(path: &str, args: &RequestArgs) -> PageRequest {
    let mut request = PageRequest::new(path);

    for text in &args.query {
        request = request.with_param(QUERY_PARAM, text.as_str());
    }
    for (kind, name, value) in args.field_params() {
        let prefix = match kind {
            FieldKind::Quoted => FIELD_PREFIX,
            FieldKind::Raw => FIELD_PREFIX_NOSTRING,
        };
        request = request.with_param(format!("{}{}", prefix, name), value);
    }

    request = with_indexes(request, &args.index);
    with_groups(request, args.groups.as_deref())
}

/// Add an `index` parameter per name
pub fn with_indexes(mut request: PageRequest, indexes: &[String]) -> PageRequest {
    for name in indexes {
        request = request.with_param(INDEX_PARAM, name.as_str());
    }
    request
}

/// Pass the caller's groups the way an authenticating proxy would
pub fn with_groups(request: PageRequest, groups: Option<&str>) -> PageRequest {
    match groups {
        Some(groups) => {
            debug!(groups, "Acting as group member");
            request.with_header(DEFAULT_GROUPS_HEADER, groups)
        }
        None => request,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_core::build_query_string;

    #[test]
    fn test_search_request() {
        let args = RequestArgs {
            query: vec!["budget".to_string(), "2024".to_string()],
            fields: vec![("author".to_string(), " Smith ".to_string())],
            raw_fields: vec![("year".to_string(), "[2000 TO 2010]".to_string())],
            index: vec!["docs".to_string(), "wiki".to_string()],
            groups: Some("staff,board".to_string()),
            ..Default::default()
        };

        let request = search_request("/search", &args);

        assert_eq!(
            build_query_string(&request),
            "budget 2024 author:\"Smith\" year:[2000 TO 2010]"
        );
        assert_eq!(request.parameters("index"), Some(vec!["docs", "wiki"]));
        assert_eq!(request.header(DEFAULT_GROUPS_HEADER), Some("staff,board"));
    }

    #[test]
    fn test_search_request_keeps_interleaved_fields() {
        let args = RequestArgs {
            fields: vec![("author".to_string(), "Smith".to_string())],
            raw_fields: vec![
                ("year".to_string(), "[2000 TO 2010]".to_string()),
                ("lang".to_string(), "de".to_string()),
            ],
            field_order: vec![FieldKind::Raw, FieldKind::Quoted, FieldKind::Raw],
            ..Default::default()
        };

        let request = search_request("/search", &args);

        assert_eq!(
            build_query_string(&request),
            "year:[2000 TO 2010] author:\"Smith\" lang:de"
        );
    }

    #[test]
    fn test_missing_config_file_yields_empty_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let app = App::new(Some(temp_dir.path().join("absent.toml")));

        let config = app.config().unwrap();
        assert!(config.indexes().is_empty());
        assert_eq!(
            app.config_path().unwrap(),
            temp_dir.path().join("absent.toml")
        );
    }
}
