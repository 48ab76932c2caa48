//! Serve command - deliver the file behind a bridge request path.

use crate::app::{with_groups, with_indexes, App};
use anyhow::Context;
use chrono::{DateTime, Utc};
use docgate_core::delivery::IF_MODIFIED_SINCE;
use docgate_core::request::{format_http_date, parse_http_date};
use docgate_core::{BufferedResponse, DeliveryOutcome, PageRequest, RequestSearchContext};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Run the serve command.
pub fn run(
    app: &App,
    path: &str,
    indexes: Vec<String>,
    groups: Option<String>,
    if_modified_since: Option<&str>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut request = with_groups(
        with_indexes(PageRequest::new(path), &indexes),
        groups.as_deref(),
    );
    if let Some(date) = if_modified_since {
        request = request.with_header(IF_MODIFIED_SINCE, format_http_date(parse_date(date)?));
    }

    let mut ctx = RequestSearchContext::new();
    let mut response = BufferedResponse::new();
    let outcome = app
        .toolkit
        .serve_bridged_file(&mut ctx, &request, &mut response)?;

    eprintln!("HTTP {}", response.status());
    for (name, value) in response.headers() {
        eprintln!("{}: {}", name, value);
    }

    if let DeliveryOutcome::Sent { bytes } = outcome {
        match out {
            Some(out) => {
                fs::write(&out, response.body())
                    .with_context(|| format!("writing {}", out.display()))?;
                eprintln!();
                eprintln!("Wrote {} bytes to {}", bytes, out.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(response.body())?;
                stdout.flush()?;
            }
        }
    }

    Ok(())
}

/// Accept an HTTP date or an RFC 3339 timestamp
fn parse_date(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Some(date) = parse_http_date(value) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .with_context(|| format!("invalid date '{}'", value))
}
