//! CLI entry point for fbgraph, a Facebook Graph API client.
//!
//! Builds OAuth dialog URLs, runs token exchanges, and issues authenticated
//! Graph calls, printing responses as JSON on stdout.
//!
//! Exit codes:
//! - 0: success
//! - 1: runtime error (authentication, API error, network failure, ...)
//! - 2: argument validation error (clap handles this automatically)

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fbgraph::auth::TokenExchange;
use fbgraph::client::GraphClient;
use fbgraph::config::ClientConfig;
use fbgraph::error::Result;
use fbgraph::object::GraphObject;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Facebook application (client) ID.
    #[arg(long, env = "FB_APP_ID")]
    app_id: String,

    /// Access token for Graph calls. Prefer setting via the FB_ACCESS_TOKEN
    /// environment variable to keep it out of shell history.
    #[arg(long, env = "FB_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Permissions to request, comma-separated, in the order sent as scope.
    #[arg(long, value_delimiter = ',')]
    permissions: Vec<String>,

    /// Print objects without kind tags.
    #[arg(long)]
    raw: bool,

    /// Increase log verbosity (-v for debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the OAuth dialog URL.
    AuthUrl {
        /// Use the implicit (user_agent) flow instead of the code flow.
        #[arg(long)]
        implicit: bool,

        #[arg(long)]
        redirect_uri: Option<String>,

        /// Opaque value echoed back to the redirect (code flow only).
        #[arg(long, conflicts_with = "implicit")]
        state: Option<String>,
    },

    /// Print the feed dialog URL.
    DialogUrl {
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Exchange an authorization code for an access token.
    Token {
        /// Code returned to the redirect URI by the OAuth dialog.
        #[arg(long)]
        code: String,

        /// Application secret.
        #[arg(long, env = "FB_APP_SECRET", hide_env_values = true)]
        secret: String,

        /// Must match the redirect URI the code was issued for.
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Exchange a short-lived token for a long-lived one.
    Exchange {
        /// The short-lived token.
        #[arg(long)]
        token: String,

        /// Application secret.
        #[arg(long, env = "FB_APP_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Fetch a single object, e.g. `me` or `12345`.
    Get {
        path: String,

        /// Extra encoded query parameters, e.g. `fields=id,name`.
        #[arg(long)]
        params: Option<String>,
    },

    /// Fetch a collection edge, e.g. `photos`, following pages.
    List {
        edge: String,

        /// Object whose edge is listed (defaults to `me`).
        #[arg(long)]
        id: Option<String>,

        /// Stop after this many pages.
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Run a legacy FQL query.
    Query { fql: String },

    /// Post `key=value` fields to an edge of an object.
    Push {
        edge: String,

        /// Object to post to (defaults to `me`).
        #[arg(long)]
        id: Option<String>,

        #[arg(value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Delete an object by ID.
    Delete { id: String },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn init_tracing(verbose: u8) {
    let default = if verbose > 0 { "fbgraph=debug" } else { "fbgraph=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_object(obj: &GraphObject) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(obj.value())?);
    Ok(())
}

fn print_exchange(exchange: &TokenExchange) -> Result<()> {
    let out = json!({
        "access_token": exchange.access_token,
        "expires": exchange.expires_at.map(|d| d.as_secs()),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::new(cli.app_id).raw_data(cli.raw);
    if !cli.permissions.is_empty() {
        config = config.with_permissions(cli.permissions);
    }
    if let Some(token) = cli.access_token {
        config = config.with_access_token(token);
    }
    let mut client = GraphClient::new(config)?;

    match cli.command {
        Command::AuthUrl {
            implicit,
            redirect_uri,
            state,
        } => {
            let url = if implicit {
                client.auth_token_url(redirect_uri.as_deref())?
            } else {
                client.auth_code_url(redirect_uri.as_deref(), state.as_deref())?
            };
            println!("{url}");
        }
        Command::DialogUrl { redirect_uri } => {
            println!("{}", client.dialog_url(redirect_uri.as_deref())?);
        }
        Command::Token {
            code,
            secret,
            redirect_uri,
        } => {
            let exchange = client.get_access_token(&secret, &code, redirect_uri.as_deref())?;
            print_exchange(&exchange)?;
        }
        Command::Exchange { token, secret } => {
            let exchange = client.exchange_token(&secret, &token)?;
            print_exchange(&exchange)?;
        }
        Command::Get { path, params } => {
            print_object(&client.get_one(&path, "object", params.as_deref())?)?;
        }
        Command::List { edge, id, max_pages } => {
            let mut collection = client.get_list(id.as_deref(), &edge, None)?;
            let mut pages = 0;
            while max_pages.is_none_or(|max| pages < max) {
                let Some(page) = collection.next_page()? else {
                    break;
                };
                for item in &page {
                    print_object(item)?;
                }
                pages += 1;
            }
        }
        Command::Query { fql } => {
            for row in client.execute_query(&fql)? {
                print_object(&row)?;
            }
        }
        Command::Push { edge, id, fields } => {
            print_object(&client.push(id.as_deref(), &edge, &fields)?)?;
        }
        Command::Delete { id } => {
            print_object(&client.delete(&id)?)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
