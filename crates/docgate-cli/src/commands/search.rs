//! Search command - run a search the way the search page does.

use crate::app::{search_request, App};
use crate::{OutputFormat, RequestArgs};
use docgate_core::{RequestSearchContext, SearchHit};

/// Run the search command.
pub fn run(
    app: &App,
    args: &RequestArgs,
    output: OutputFormat,
    show_fields: &[String],
) -> anyhow::Result<()> {
    let request = search_request("/search", args);
    let mut ctx = RequestSearchContext::new();

    let results = match app.toolkit.search_results(&mut ctx, &request) {
        Ok(results) => results,
        Err(e) => {
            ctx.record_error(e.to_string());
            if let OutputFormat::Json = output {
                let error = serde_json::json!({
                    "query": ctx.query().unwrap_or(""),
                    "error": ctx.error_message(),
                });
                println!("{}", serde_json::to_string_pretty(&error)?);
            }
            return Err(e.into());
        }
    };

    if results.query().is_empty() {
        eprintln!("The request carries no query. Use --query or --field.");
        return Ok(());
    }

    match output {
        OutputFormat::Text => {
            for hit in results.hits() {
                println!("{:>4}  {}", hit.score(), hit.title(false));
                println!("      {}", hit.href()?);
                println!("      {} ({})", hit.url(), hit.index_name());
                for (name, value) in stored_fields(hit, show_fields)? {
                    println!("      {}: {}", name, value);
                }
            }

            eprintln!();
            eprintln!(
                "Showing {} of {} hits for '{}' in {:.3}ms",
                results.hit_count(),
                results.total_hits(),
                results.query(),
                results.search_time().as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let hits = results
                .hits()
                .iter()
                .map(|hit| -> anyhow::Result<serde_json::Value> {
                    Ok(serde_json::json!({
                        "index": hit.index_name(),
                        "score": hit.score(),
                        "title": hit.title(false),
                        "url": hit.url(),
                        "href": hit.href()?,
                        "file_to_http_bridge": hit.use_file_to_http_bridge(),
                        "new_window": hit.open_in_new_window(),
                        "fields": stored_fields(hit, show_fields)?
                            .into_iter()
                            .map(|(name, value)| (name, serde_json::Value::String(value)))
                            .collect::<serde_json::Map<_, _>>(),
                    }))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let json = serde_json::json!({
                "query": results.query(),
                "total_hits": results.total_hits(),
                "search_time_ms": results.search_time().as_millis() as u64,
                "hits": hits,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

/// The requested stored fields a hit has, decompressing where needed
fn stored_fields(hit: &SearchHit, names: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    let mut fields = Vec::new();
    for name in names {
        if let Some(value) = hit.field(name)? {
            fields.push((name.clone(), value));
        }
    }
    Ok(fields)
}
