//! Configuration management for Docgate.
//!
//! The search configuration lists every index the front end may search,
//! which of them are default indexes, and how each one is wired (index
//! directory, access controller, parent index, URL rewrite rules). It is
//! stored in TOML format, by default in a platform-appropriate location.
//!
//! Loading happens at most once per process through [`ConfigLoader`]: the
//! first successful load wins and every later caller shares the same
//! immutable [`SearchConfig`].

use crate::access::{AccessController, AccessControllerRegistry};
use crate::error::{DocgateError, Result};
use crate::request::PageRequest;
use directories::ProjectDirs;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the init parameter that points at the configuration file.
pub const CONFIG_FILE_INIT_PARAM: &str = "configFile";

/// On-disk representation of the search configuration.
///
/// ## Example Configuration File (docgate.toml)
///
/// ```toml
/// [search]
/// default_indexes = ["docs"]
/// max_results = 1000
///
/// [[index]]
/// name = "all"
/// directory = "/var/lib/docgate/all"
/// is_parent = true
///
/// [[index]]
/// name = "docs"
/// directory = "/var/lib/docgate/docs"
/// parent = "all"
/// access_controller = "header"
/// rewrite_rules = [["file:///srv/docs", "http://intranet/docs"]]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Settings shared by all indexes
    pub search: SearchSettings,

    /// Index definitions, in configuration order
    #[serde(rename = "index")]
    pub indexes: Vec<IndexDefinition>,
}

/// Settings shared by all indexes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Indexes searched when a request names none
    pub default_indexes: Option<Vec<String>>,

    /// Maximum number of hits kept per search
    pub max_results: usize,

    /// Field searched by query clauses that name no field
    pub default_field: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            default_indexes: None,
            max_results: 1000,
            default_field: crate::types::FIELD_CONTENT.to_string(),
        }
    }
}

/// One `[[index]]` table of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexDefinition {
    /// Unique index name
    pub name: String,

    /// Directory holding the index
    pub directory: PathBuf,

    /// Name of a registered access controller
    pub access_controller: Option<String>,

    /// Name of the parent index this one belongs to
    pub parent: Option<String>,

    /// Whether this index is an aggregator for its children
    pub is_parent: bool,

    /// Serve `file://` hits through the HTTP file bridge
    pub use_file_to_http_bridge: bool,

    /// Open hits in a new browser window
    pub open_in_new_window: bool,

    /// Ordered `[internal, external]` URL prefix pairs
    pub rewrite_rules: Vec<RewriteRule>,
}

impl Default for IndexDefinition {
    fn default() -> Self {
        IndexDefinition {
            name: String::new(),
            directory: PathBuf::new(),
            access_controller: None,
            parent: None,
            is_parent: false,
            use_file_to_http_bridge: true,
            open_in_new_window: false,
            rewrite_rules: Vec::new(),
        }
    }
}

/// A URL rewrite rule: `(internal prefix, external prefix)`.
///
/// Internal URLs are the ones stored in the index by the crawler, external
/// URLs are the ones shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule(pub String, pub String);

impl RewriteRule {
    /// Create a rule from an internal and an external prefix.
    pub fn new(internal: impl Into<String>, external: impl Into<String>) -> Self {
        RewriteRule(internal.into(), external.into())
    }

    /// The prefix as crawled
    pub fn internal(&self) -> &str {
        &self.0
    }

    /// The prefix as shown to users
    pub fn external(&self) -> &str {
        &self.1
    }
}

/// The resolved configuration of one index. Immutable once loaded.
#[derive(Clone)]
pub struct IndexConfig {
    name: String,
    directory: PathBuf,
    access_controller: Option<(String, Arc<dyn AccessController>)>,
    parent: Option<String>,
    is_parent: bool,
    use_file_to_http_bridge: bool,
    open_in_new_window: bool,
    rewrite_rules: Vec<RewriteRule>,
}

impl fmt::Debug for IndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexConfig")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field(
                "access_controller",
                &self.access_controller.as_ref().map(|(name, _)| name),
            )
            .field("parent", &self.parent)
            .field("is_parent", &self.is_parent)
            .finish()
    }
}

impl IndexConfig {
    /// Create an index configuration with default settings.
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        IndexConfig {
            name: name.into(),
            directory: directory.into(),
            access_controller: None,
            parent: None,
            is_parent: false,
            use_file_to_http_bridge: true,
            open_in_new_window: false,
            rewrite_rules: Vec::new(),
        }
    }

    /// Mark this index as a child of `parent`
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Mark this index as a parent (aggregator)
    pub fn as_parent(mut self) -> Self {
        self.is_parent = true;
        self
    }

    /// Attach an access controller
    pub fn with_access_controller(
        mut self,
        name: impl Into<String>,
        controller: Arc<dyn AccessController>,
    ) -> Self {
        self.access_controller = Some((name.into(), controller));
        self
    }

    /// Append a URL rewrite rule
    pub fn with_rewrite_rule(mut self, rule: RewriteRule) -> Self {
        self.rewrite_rules.push(rule);
        self
    }

    /// Enable or disable the file-to-HTTP bridge for hits of this index
    pub fn with_file_to_http_bridge(mut self, enabled: bool) -> Self {
        self.use_file_to_http_bridge = enabled;
        self
    }

    fn from_definition(
        definition: IndexDefinition,
        registry: &AccessControllerRegistry,
    ) -> Result<Self> {
        let access_controller = match definition.access_controller {
            Some(controller_name) => {
                let controller = registry.get(&controller_name).ok_or_else(|| {
                    DocgateError::UnknownAccessController {
                        index: definition.name.clone(),
                        controller: controller_name.clone(),
                        registered: registry.names().join(", "),
                    }
                })?;
                Some((controller_name, controller))
            }
            None => None,
        };

        Ok(IndexConfig {
            name: definition.name,
            directory: definition.directory,
            access_controller,
            parent: definition.parent,
            is_parent: definition.is_parent,
            use_file_to_http_bridge: definition.use_file_to_http_bridge,
            open_in_new_window: definition.open_in_new_window,
            rewrite_rules: definition.rewrite_rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The access controller of this index, if any
    pub fn access_controller(&self) -> Option<&Arc<dyn AccessController>> {
        self.access_controller.as_ref().map(|(_, c)| c)
    }

    /// The configured name of the access controller, if any
    pub fn access_controller_name(&self) -> Option<&str> {
        self.access_controller.as_ref().map(|(n, _)| n.as_str())
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_parent(&self) -> bool {
        self.is_parent
    }

    pub fn use_file_to_http_bridge(&self) -> bool {
        self.use_file_to_http_bridge
    }

    pub fn open_in_new_window(&self) -> bool {
        self.open_in_new_window
    }

    pub fn rewrite_rules(&self) -> &[RewriteRule] {
        &self.rewrite_rules
    }

    /// Translate a crawled URL into its externally visible form.
    ///
    /// The first rule whose internal prefix matches is applied.
    pub fn rewrite_to_external(&self, url: &str) -> String {
        for rule in &self.rewrite_rules {
            if let Some(rest) = url.strip_prefix(rule.internal()) {
                return format!("{}{}", rule.external(), rest);
            }
        }
        url.to_string()
    }

    /// Translate an externally visible URL back into its crawled form.
    ///
    /// The first rule whose external prefix matches is applied.
    pub fn rewrite_to_internal(&self, url: &str) -> String {
        for rule in &self.rewrite_rules {
            if let Some(rest) = url.strip_prefix(rule.external()) {
                return format!("{}{}", rule.internal(), rest);
            }
        }
        url.to_string()
    }
}

/// The loaded search configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    indexes: Vec<Arc<IndexConfig>>,
    default_index_names: Option<Vec<String>>,
    max_results: usize,
    default_field: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig::new(Vec::new(), None)
    }
}

impl SearchConfig {
    /// Build a configuration directly from index configs.
    pub fn new(indexes: Vec<IndexConfig>, default_index_names: Option<Vec<String>>) -> Self {
        let settings = SearchSettings::default();
        SearchConfig {
            indexes: indexes.into_iter().map(Arc::new).collect(),
            default_index_names: default_index_names.filter(|names| !names.is_empty()),
            max_results: settings.max_results,
            default_field: settings.default_field,
        }
    }

    /// Limit the number of hits kept per search
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Build and validate a configuration from its file representation.
    pub fn from_file(file: ConfigFile, registry: &AccessControllerRegistry) -> Result<Self> {
        let mut seen = HashSet::new();
        for definition in &file.indexes {
            if definition.name.trim().is_empty() {
                return Err(DocgateError::config("index without a name"));
            }
            if !seen.insert(definition.name.as_str()) {
                return Err(DocgateError::config(format!(
                    "index '{}' is defined more than once",
                    definition.name
                )));
            }
        }

        if let Some(ref defaults) = file.search.default_indexes {
            if let Some(unknown) = defaults.iter().find(|n| !seen.contains(n.as_str())) {
                return Err(DocgateError::config(format!(
                    "default index '{}' is not defined",
                    unknown
                )));
            }
        }

        let indexes = file
            .indexes
            .into_iter()
            .map(|d| IndexConfig::from_definition(d, registry).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Ok(SearchConfig {
            indexes,
            default_index_names: file.search.default_indexes.filter(|n| !n.is_empty()),
            max_results: file.search.max_results,
            default_field: file.search.default_field,
        })
    }

    /// Load and validate the configuration stored at `path`.
    pub fn load_from(path: &Path, registry: &AccessControllerRegistry) -> Result<Self> {
        let file = ConfigFile::load_from(path)?;
        Self::from_file(file, registry)
    }

    /// Look up an index by name
    pub fn index_config(&self, name: &str) -> Option<Arc<IndexConfig>> {
        self.indexes.iter().find(|c| c.name() == name).cloned()
    }

    /// Names of all indexes in configuration order
    pub fn all_index_names(&self) -> Vec<&str> {
        self.indexes.iter().map(|c| c.name()).collect()
    }

    /// All indexes in configuration order
    pub fn indexes(&self) -> &[Arc<IndexConfig>] {
        &self.indexes
    }

    /// Indexes searched when a request names none
    pub fn default_index_names(&self) -> Option<&[String]> {
        self.default_index_names.as_deref()
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn default_field(&self) -> &str {
        &self.default_field
    }
}

impl ConfigFile {
    /// Load the configuration file from a specific path.
    ///
    /// Returns the default (empty) configuration if no file exists.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(ConfigFile::default());
        }

        info!(path = %path.display(), "Loading search configuration");
        let contents = fs::read_to_string(path)?;
        let config: ConfigFile = toml::from_str(&contents).map_err(|e| DocgateError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "docgate").ok_or_else(|| DocgateError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("docgate.toml"))
    }
}

/// Builds the search configuration on first use.
pub trait ConfigFactory: Send + Sync {
    /// Create the configuration. `request` is the request that triggered
    /// the load; factories may read its init parameters.
    fn create_search_config(&self, request: &PageRequest) -> Result<SearchConfig>;
}

/// Default factory: reads a TOML file.
///
/// The file is taken from, in order: the explicit path given to the
/// factory, the `configFile` init parameter of the request, the default
/// config path.
pub struct TomlConfigFactory {
    path: Option<PathBuf>,
    registry: AccessControllerRegistry,
}

impl TomlConfigFactory {
    pub fn new(registry: AccessControllerRegistry) -> Self {
        TomlConfigFactory {
            path: None,
            registry,
        }
    }

    /// Always read the configuration from `path`.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl ConfigFactory for TomlConfigFactory {
    fn create_search_config(&self, request: &PageRequest) -> Result<SearchConfig> {
        let path = match (&self.path, request.init_parameter(CONFIG_FILE_INIT_PARAM)) {
            (Some(path), _) => path.clone(),
            (None, Some(param)) => PathBuf::from(param),
            (None, None) => ConfigFile::default_config_path()?,
        };
        SearchConfig::load_from(&path, &self.registry)
    }
}

/// Process-wide, load-once holder of the search configuration.
///
/// Concurrent first callers block on a single initialisation; the factory
/// runs exactly once on success. A failed load is not cached, so the next
/// request attempts it again.
pub struct ConfigLoader {
    factory: Box<dyn ConfigFactory>,
    config: OnceCell<Arc<SearchConfig>>,
}

impl ConfigLoader {
    pub fn new(factory: impl ConfigFactory + 'static) -> Self {
        ConfigLoader {
            factory: Box::new(factory),
            config: OnceCell::new(),
        }
    }

    /// Get the configuration, loading it if this is the first call.
    pub fn get(&self, request: &PageRequest) -> Result<Arc<SearchConfig>> {
        self.config
            .get_or_try_init(|| {
                let config = self.factory.create_search_config(request)?;
                info!(
                    indexes = config.indexes().len(),
                    "Search configuration loaded"
                );
                Ok(Arc::new(config))
            })
            .cloned()
    }

    /// Whether the configuration has been loaded already
    pub fn is_loaded(&self) -> bool {
        self.config.get().is_some()
    }
}
