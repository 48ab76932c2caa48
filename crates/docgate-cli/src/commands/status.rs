//! Status command - show the configuration and the state of each index.

use crate::app::App;
use docgate_core::IndexStore;

/// Run the status command.
pub fn run(app: &App) -> anyhow::Result<()> {
    let config_path = app.config_path()?;
    let config = app.config()?;

    println!("Docgate Status");
    println!("==============");
    println!();
    println!("Configuration: {}", config_path.display());
    if !config_path.exists() {
        println!("  (file not found, using an empty configuration)");
    }

    if config.indexes().is_empty() {
        println!();
        println!("No indexes configured.");
        return Ok(());
    }

    println!();
    println!("Settings:");
    match config.default_index_names() {
        Some(names) => println!("  Default indexes: {}", names.join(", ")),
        None => println!("  Default indexes: (none, requests must name an index)"),
    }
    println!("  Max results:     {}", config.max_results());
    println!("  Default field:   {}", config.default_field());

    println!();
    println!("Indexes:");

    for index in config.indexes() {
        if index.is_parent() {
            let children: Vec<&str> = config
                .indexes()
                .iter()
                .filter(|c| c.parent_name() == Some(index.name()))
                .map(|c| c.name())
                .collect();
            println!("  {} (parent of: {})", index.name(), children.join(", "));
            continue;
        }

        let store = IndexStore::new(index.directory());
        let state = if !store.exists() {
            "⚠ not built".to_string()
        } else {
            match app.toolkit.pool().acquire(index.directory()) {
                Ok(searcher) => format!("✓ {} documents", searcher.document_count()),
                Err(e) => format!("✗ {}", e),
            }
        };

        println!("  {} {}", index.name(), state);
        println!("    Directory: {}", index.directory().display());
        if let Some(controller) = index.access_controller_name() {
            println!("    Access:    {}", controller);
        }
    }

    Ok(())
}
