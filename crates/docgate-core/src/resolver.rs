//! Resolves which indexes a request searches.
//!
//! A request names its indexes with repeated `index` parameters. Without
//! any, the configured default indexes apply. Resolution comes in two
//! flavours:
//!
//! - **flat**: exactly the named indexes, in request order
//! - **parent-expanding**: every named parent index is replaced by all of
//!   its children, in configuration order; other indexes pass through
//!
//! Both fail on the first name the configuration does not know.

use crate::config::{IndexConfig, SearchConfig};
use crate::context::{IndexConfigs, RequestSearchContext};
use crate::error::{DocgateError, Result};
use crate::request::PageRequest;
use std::sync::Arc;
use tracing::debug;

/// Parameter naming an index to search
pub const INDEX_PARAM: &str = "index";

/// The index names a request asks for, falling back to the defaults.
pub fn requested_index_names(request: &PageRequest, config: &SearchConfig) -> Result<Vec<String>> {
    if let Some(names) = request.parameters(INDEX_PARAM) {
        return Ok(names.into_iter().map(str::to_string).collect());
    }

    config
        .default_index_names()
        .map(<[String]>::to_vec)
        .ok_or(DocgateError::NoIndexSpecified)
}

fn lookup(config: &SearchConfig, name: &str) -> Result<Arc<IndexConfig>> {
    config
        .index_config(name)
        .ok_or_else(|| DocgateError::UnknownIndex {
            name: name.to_string(),
        })
}

/// The configurations of exactly the named indexes.
pub fn resolve_flat(config: &SearchConfig, names: &[String]) -> Result<Vec<Arc<IndexConfig>>> {
    names.iter().map(|name| lookup(config, name)).collect()
}

/// The configurations of the named indexes with parents replaced by their
/// children.
pub fn resolve_with_parents(
    config: &SearchConfig,
    names: &[String],
) -> Result<Vec<Arc<IndexConfig>>> {
    let mut resolved = Vec::with_capacity(names.len());

    for name in names {
        let index = lookup(config, name)?;
        if !index.is_parent() {
            resolved.push(index);
            continue;
        }

        let before = resolved.len();
        resolved.extend(
            config
                .indexes()
                .iter()
                .filter(|child| child.parent_name() == Some(name.as_str()))
                .cloned(),
        );
        debug!(
            parent = %name,
            children = resolved.len() - before,
            "Expanded parent index"
        );
    }

    Ok(resolved)
}

/// The configurations of every configured index.
pub fn all_index_configs(config: &SearchConfig) -> Result<Vec<Arc<IndexConfig>>> {
    if config.indexes().is_empty() {
        return Err(DocgateError::NoIndexesDefined);
    }
    Ok(config.indexes().to_vec())
}

/// The request's indexes in flat mode, memoized in `ctx`.
pub fn index_configs(
    ctx: &mut RequestSearchContext,
    config: &SearchConfig,
    request: &PageRequest,
) -> Result<IndexConfigs> {
    ctx.index_configs_or_try_init(|| {
        let names = requested_index_names(request, config)?;
        resolve_flat(config, &names)
    })
}

/// The request's indexes in parent-expanding mode, memoized in `ctx`.
pub fn index_configs_with_parent(
    ctx: &mut RequestSearchContext,
    config: &SearchConfig,
    request: &PageRequest,
) -> Result<IndexConfigs> {
    ctx.expanded_index_configs_or_try_init(|| {
        let names = requested_index_names(request, config)?;
        resolve_with_parents(config, &names)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SearchConfig {
        SearchConfig::new(
            vec![
                IndexConfig::new("all", "/data/all").as_parent(),
                IndexConfig::new("manuals", "/data/manuals").with_parent("all"),
                IndexConfig::new("intranet", "/data/intranet"),
                IndexConfig::new("reports", "/data/reports").with_parent("all"),
                IndexConfig::new("archive", "/data/archive").as_parent(),
            ],
            Some(vec!["intranet".to_string()]),
        )
    }

    fn names(configs: &[Arc<IndexConfig>]) -> Vec<&str> {
        configs.iter().map(|c| c.name()).collect()
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parent_expands_to_children_in_config_order() {
        let config = test_config();
        let resolved = resolve_with_parents(&config, &strings(&["all"])).unwrap();
        assert_eq!(names(&resolved), vec!["manuals", "reports"]);
    }

    #[test]
    fn test_expansion_follows_requested_order() {
        let config = test_config();
        let resolved = resolve_with_parents(&config, &strings(&["intranet", "all"])).unwrap();
        assert_eq!(names(&resolved), vec!["intranet", "manuals", "reports"]);
    }

    #[test]
    fn test_non_parent_passes_through() {
        let config = test_config();
        let resolved = resolve_with_parents(&config, &strings(&["manuals"])).unwrap();
        assert_eq!(names(&resolved), vec!["manuals"]);
    }

    #[test]
    fn test_parent_without_children_expands_to_nothing() {
        let config = test_config();
        let resolved = resolve_with_parents(&config, &strings(&["archive"])).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_flat_keeps_parents() {
        let config = test_config();
        let resolved = resolve_flat(&config, &strings(&["all", "intranet"])).unwrap();
        assert_eq!(names(&resolved), vec!["all", "intranet"]);
    }

    #[test]
    fn test_unknown_index_fails_in_both_modes() {
        let config = test_config();
        let requested = strings(&["intranet", "nope"]);

        for result in [
            resolve_flat(&config, &requested),
            resolve_with_parents(&config, &requested),
        ] {
            match result {
                Err(DocgateError::UnknownIndex { name }) => assert_eq!(name, "nope"),
                other => panic!("expected UnknownIndex, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_requested_names_fall_back_to_defaults() {
        let config = test_config();

        let request = PageRequest::new("/search");
        assert_eq!(
            requested_index_names(&request, &config).unwrap(),
            vec!["intranet"]
        );

        let request = PageRequest::new("/search")
            .with_param("index", "manuals")
            .with_param("index", "reports");
        assert_eq!(
            requested_index_names(&request, &config).unwrap(),
            vec!["manuals", "reports"]
        );
    }

    #[test]
    fn test_no_index_and_no_defaults() {
        let config = SearchConfig::new(vec![IndexConfig::new("docs", "/data/docs")], None);
        let request = PageRequest::new("/search");
        assert!(matches!(
            requested_index_names(&request, &config),
            Err(DocgateError::NoIndexSpecified)
        ));
    }

    #[test]
    fn test_all_index_configs() {
        let config = test_config();
        assert_eq!(all_index_configs(&config).unwrap().len(), 5);

        assert!(matches!(
            all_index_configs(&SearchConfig::default()),
            Err(DocgateError::NoIndexesDefined)
        ));
    }

    #[test]
    fn test_modes_are_memoized_separately() {
        let config = test_config();
        let request = PageRequest::new("/search").with_param("index", "all");
        let mut ctx = RequestSearchContext::new();

        let flat = index_configs(&mut ctx, &config, &request).unwrap();
        let expanded = index_configs_with_parent(&mut ctx, &config, &request).unwrap();
        assert_eq!(names(&flat), vec!["all"]);
        assert_eq!(names(&expanded), vec!["manuals", "reports"]);

        let again = index_configs_with_parent(&mut ctx, &config, &request).unwrap();
        assert!(Arc::ptr_eq(&expanded, &again));
    }
}
