//! # Docgate CLI
//!
//! Command-line front end for Docgate. It drives the library the way a
//! search page would, which makes it handy for checking a configuration
//! and for debugging access control.
//!
//! ## Commands
//!
//! - `docgate indexes` - Show which indexes a request resolves to
//! - `docgate query` - Print the query string built from request parameters
//! - `docgate search` - Run a search and print the hits
//! - `docgate encode` / `docgate decode` - The file bridge URL codec
//! - `docgate serve` - Access-check and deliver a bridged file
//! - `docgate import` - Load documents into an index directory
//! - `docgate status` - Show the configuration and its indexes
//!
//! ## Example Usage
//!
//! ```bash
//! # Load documents (one JSON object per line)
//! docgate import docs documents.jsonl
//!
//! # Search the default indexes as a member of "staff"
//! docgate search --query budget --groups staff
//!
//! # Fetch the file behind a hit link
//! docgate serve "/docgate/file/%24/%24srv/docs/budget.pdf" --index docs --out budget.pdf
//! ```

mod app;
mod commands;

use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Docgate - access-controlled search front end
#[derive(Parser)]
#[command(name = "docgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "DOCGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// The parameters of a simulated search request.
#[derive(Args, Debug, Default, Clone)]
pub struct RequestArgs {
    /// Free-text query fragment (can be used multiple times)
    #[arg(long = "query", value_name = "TEXT")]
    pub query: Vec<String>,

    /// Quoted field value, e.g. --field author=Smith
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,

    /// Literal field value, e.g. --field-raw "year=[2000 TO 2010]"
    #[arg(long = "field-raw", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub raw_fields: Vec<(String, String)>,

    /// Index to search (can be used multiple times)
    #[arg(short, long)]
    pub index: Vec<String>,

    /// Comma-separated access groups of the caller
    #[arg(short, long, env = "DOCGATE_GROUPS")]
    pub groups: Option<String>,

    /// Command-line order of the --field and --field-raw values
    #[arg(skip)]
    pub field_order: Vec<FieldKind>,
}

/// How a field value is passed to the query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `--field`, quoted by the builder
    Quoted,
    /// `--field-raw`, passed through as given
    Raw,
}

impl RequestArgs {
    /// Remember how `--field` and `--field-raw` were interleaved.
    pub fn record_field_order(&mut self, matches: &ArgMatches) {
        let quoted = matches
            .indices_of("fields")
            .into_iter()
            .flatten()
            .map(|i| (i, FieldKind::Quoted));
        let raw = matches
            .indices_of("raw_fields")
            .into_iter()
            .flatten()
            .map(|i| (i, FieldKind::Raw));

        let mut positions: Vec<(usize, FieldKind)> = quoted.chain(raw).collect();
        positions.sort_unstable_by_key(|(i, _)| *i);
        self.field_order = positions.into_iter().map(|(_, kind)| kind).collect();
    }

    /// All field values in command-line order.
    ///
    /// Values not covered by the recorded order follow, quoted ones first.
    pub fn field_params(&self) -> Vec<(FieldKind, &str, &str)> {
        let mut quoted = self.fields.iter();
        let mut raw = self.raw_fields.iter();

        let mut params: Vec<(FieldKind, &str, &str)> = Vec::new();
        for kind in &self.field_order {
            let next = match kind {
                FieldKind::Quoted => quoted.next(),
                FieldKind::Raw => raw.next(),
            };
            if let Some((name, value)) = next {
                params.push((*kind, name.as_str(), value.as_str()));
            }
        }
        params.extend(quoted.map(|(n, v)| (FieldKind::Quoted, n.as_str(), v.as_str())));
        params.extend(raw.map(|(n, v)| (FieldKind::Raw, n.as_str(), v.as_str())));
        params
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the index configurations a request resolves to
    Indexes {
        /// Index name (can be used multiple times; defaults apply otherwise)
        #[arg(short, long)]
        index: Vec<String>,

        /// Replace parent indexes by their children
        #[arg(short, long)]
        expand: bool,
    },

    /// Print the query string built from request parameters
    Query {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Run a search
    Search {
        #[command(flatten)]
        request: RequestArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,

        /// Stored field to print with each hit (can be used multiple times)
        #[arg(long = "show-field", value_name = "NAME")]
        show_fields: Vec<String>,
    },

    /// Encode a file URL as a bridge path
    Encode {
        /// The file URL, e.g. file:///srv/docs/report.pdf
        url: String,
    },

    /// Decode the file URL from a bridge request path
    Decode {
        /// The request path
        path: String,
    },

    /// Serve the file behind a bridge request path
    Serve {
        /// The request path
        path: String,

        /// Index that must contain the file (can be used multiple times)
        #[arg(short, long)]
        index: Vec<String>,

        /// Comma-separated access groups of the caller
        #[arg(short, long, env = "DOCGATE_GROUPS")]
        groups: Option<String>,

        /// Only send the file if it changed after this date (HTTP date or RFC 3339)
        #[arg(long, value_name = "DATE")]
        if_modified_since: Option<String>,

        /// Write the body to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Load documents from a JSON Lines file into an index
    Import {
        /// Name of the configured index
        index: String,

        /// Input file with one JSON object per line
        input: PathBuf,

        /// Keep the documents already in the index (same URL replaces)
        #[arg(short, long)]
        append: bool,

        /// Store this field compressed (can be used multiple times)
        #[arg(long, value_name = "NAME")]
        compress: Vec<String>,
    },

    /// Show the configuration and the state of each index
    Status,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    Ok((name.to_string(), value.to_string()))
}

/// Build the CLI from parsed matches, keeping argument order where it matters
fn cli_from_matches(matches: &ArgMatches) -> Result<Cli, clap::Error> {
    let mut cli = Cli::from_arg_matches(matches)?;
    if let (
        Some((_, sub_matches)),
        Commands::Query { request } | Commands::Search { request, .. },
    ) = (matches.subcommand(), &mut cli.command)
    {
        request.record_field_order(sub_matches);
    }
    Ok(cli)
}

fn main() -> anyhow::Result<()> {
    let matches = Cli::command().get_matches();
    let cli = cli_from_matches(&matches)?;

    // Setup logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    let app = app::App::new(cli.config);

    // Execute command
    match cli.command {
        Commands::Indexes { index, expand } => commands::indexes::run(&app, index, expand),
        Commands::Query { request } => commands::query::run(&app, &request),
        Commands::Search {
            request,
            output,
            show_fields,
        } => commands::search::run(&app, &request, output, &show_fields),
        Commands::Encode { url } => commands::codec::encode(&url),
        Commands::Decode { path } => commands::codec::decode(&path),
        Commands::Serve {
            path,
            index,
            groups,
            if_modified_since,
            out,
        } => commands::serve::run(
            &app,
            &path,
            index,
            groups,
            if_modified_since.as_deref(),
            out,
        ),
        Commands::Import {
            index,
            input,
            append,
            compress,
        } => commands::import::run(&app, &index, &input, append, &compress),
        Commands::Status => commands::status::run(&app),
    }
}
