//! Query command - print the query string a request produces.

use crate::app::{search_request, App};
use crate::RequestArgs;
use docgate_core::{parse_query, RequestSearchContext};

/// Run the query command.
pub fn run(app: &App, args: &RequestArgs) -> anyhow::Result<()> {
    let request = search_request("/search", args);
    let mut ctx = RequestSearchContext::new();

    let query = app.toolkit.search_query(&mut ctx, &request);
    if query.is_empty() {
        eprintln!("The request carries no query.");
        return Ok(());
    }

    println!("{}", query);

    // Show how it parses against the configured default field
    let config = app.config()?;
    let parsed = parse_query(&query, config.default_field())?;
    eprintln!("{:#?}", parsed);

    Ok(())
}
