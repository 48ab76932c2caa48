//! Indexes command - show which indexes a request resolves to.

use crate::app::{with_indexes, App};
use docgate_core::{PageRequest, RequestSearchContext};

/// Run the indexes command.
pub fn run(app: &App, indexes: Vec<String>, expand: bool) -> anyhow::Result<()> {
    let request = with_indexes(PageRequest::new("/search"), &indexes);
    let mut ctx = RequestSearchContext::new();

    let configs = if expand {
        app.toolkit.index_configs_with_parent(&mut ctx, &request)?
    } else {
        app.toolkit.index_configs(&mut ctx, &request)?
    };

    if configs.is_empty() {
        println!("No indexes (a parent index without children was requested).");
        return Ok(());
    }

    for config in configs.iter() {
        let mut notes = Vec::new();
        if config.is_parent() {
            notes.push("parent".to_string());
        }
        if let Some(parent) = config.parent_name() {
            notes.push(format!("child of {}", parent));
        }
        if let Some(controller) = config.access_controller_name() {
            notes.push(format!("access: {}", controller));
        }
        if config.use_file_to_http_bridge() {
            notes.push("bridged".to_string());
        }

        println!(
            "{:<16} {}  [{}]",
            config.name(),
            config.directory().display(),
            notes.join(", ")
        );

        for rule in config.rewrite_rules() {
            println!("{:<16} {} -> {}", "", rule.internal(), rule.external());
        }
    }

    Ok(())
}
