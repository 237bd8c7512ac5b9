mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use odatawire_core::WireError;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// OData verbose-JSON wire-format toolkit.
#[derive(Parser)]
#[command(name = "odw", version, about = "OData verbose-JSON wire-format toolkit")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log parser decisions to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file with optional [service] and [limits] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a $filter expression and print its tree
    Filter {
        /// The expression, already percent-decoded
        expr: String,
    },

    /// Parse an $orderby list
    Orderby {
        /// The list, already percent-decoded
        expr: String,
    },

    /// Parse the system query options of a request URI's query string
    Query {
        /// Raw query string, with or without the leading '?'
        query: String,
    },

    /// Print the structural JSON event stream of a document
    Events {
        /// Path to a JSON document
        file: PathBuf,
    },

    /// Read an EDMX document and summarise the resolved model
    Schema {
        /// Path to the EDMX document
        file: PathBuf,
    },

    /// Parse an entity payload against a schema and write it back as a
    /// verbose-JSON entry
    Entry {
        /// Path to the JSON payload
        file: PathBuf,
        /// Path to the EDMX document
        #[arg(long)]
        schema: PathBuf,
        /// Entity set the payload belongs to
        #[arg(long)]
        set: String,
        /// Service root; overrides [service] base_uri
        #[arg(long)]
        base_uri: Option<String>,
        /// Key predicate used when the payload has no __metadata.uri, e.g. "('c1')"
        #[arg(long)]
        key: Option<String>,
        /// Request time in milliseconds since the epoch (default: now)
        #[arg(long)]
        now: Option<i64>,
    },

    /// Build the __next link for a page of results
    Next {
        /// The request URI that produced the page
        request_uri: String,
        /// Skip token of the last entity sent
        #[arg(long)]
        skip_token: String,
        /// Number of entities in the page
        #[arg(long)]
        emitted: usize,
    },
}

const DEFAULT_BASE_URI: &str = "http://localhost/odata";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => match config::load(path) {
            Ok(c) => c,
            Err(msg) => {
                report_error(&msg, cli.output, cli.quiet);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    match cli.command {
        Commands::Filter { expr } => {
            commands::cmd_filter(&expr, cli.output, cli.quiet);
        }
        Commands::Orderby { expr } => {
            commands::cmd_orderby(&expr, cli.output, cli.quiet);
        }
        Commands::Query { query } => {
            commands::cmd_query(&query, &config.limits, cli.output, cli.quiet);
        }
        Commands::Events { file } => {
            commands::cmd_events(&file, &config.limits, cli.output, cli.quiet);
        }
        Commands::Schema { file } => {
            commands::cmd_schema(&file, cli.output, cli.quiet);
        }
        Commands::Entry {
            file,
            schema,
            set,
            base_uri,
            key,
            now,
        } => {
            let base_uri = base_uri
                .or(config.service.base_uri)
                .unwrap_or_else(|| DEFAULT_BASE_URI.to_owned());
            let request = commands::EntryRequest {
                payload: &file,
                schema: &schema,
                entity_set: &set,
                base_uri: &base_uri,
                key: key.as_deref(),
                now,
            };
            commands::cmd_entry(&request, &config.limits, cli.output, cli.quiet);
        }
        Commands::Next {
            request_uri,
            skip_token,
            emitted,
        } => {
            commands::cmd_next(request_uri, skip_token, emitted, cli.output);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ──────────────────────────────────────────────
// Output helpers
// ──────────────────────────────────────────────

pub(crate) fn print_json<T: Serialize>(value: &T, output: OutputFormat, quiet: bool) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            report_error(&format!("error serializing output: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

/// Report a plain error message on stderr.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}

/// Report a library error and exit with status 1.
///
/// JSON output always carries the structured error, even with `--quiet`.
pub(crate) fn fail(err: impl Into<WireError>, output: OutputFormat, quiet: bool) -> ! {
    let err = err.into();
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&err.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", err));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", err);
            }
        }
    }
    process::exit(1);
}
