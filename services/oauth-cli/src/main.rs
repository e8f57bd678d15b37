//! OAuth session CLI
//!
//! Authorizes a tool against a MediaWiki-style API and keeps the session on
//! disk between runs:
//! 1. `authorize` prints the URL to open in a browser
//! 2. `complete <callback-url>` exchanges the code for tokens
//! 3. `request key=value...` calls the API, refreshing the token if needed
//!
//! Every command loads the stored session first and saves it afterwards.

mod config;
mod state_file;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use api_session::{Params, RequestOptions, Session};
use oauth_session::{OAuthClient, OAuthOptions};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const USAGE: &str = "usage: oauth-cli [--config PATH] <authorize | complete URL | refresh | request KEY=VALUE... | status>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Authorize,
    Complete(String),
    Refresh,
    Request(Params),
    Status,
}

impl Command {
    /// Parse the command from the arguments left after `--config PATH`.
    fn parse(args: &[String]) -> Result<Self> {
        let (name, rest) = args.split_first().context(USAGE)?;
        let command = match (name.as_str(), rest) {
            ("authorize", []) => Command::Authorize,
            ("complete", [url]) => Command::Complete(url.clone()),
            ("refresh", []) => Command::Refresh,
            ("status", []) => Command::Status,
            ("request", pairs) if !pairs.is_empty() => {
                let mut params = Params::new();
                for pair in pairs {
                    let (key, value) = pair
                        .split_once('=')
                        .with_context(|| format!("expected KEY=VALUE, got {pair}"))?;
                    params.insert(key.to_owned(), value.to_owned());
                }
                Command::Request(params)
            }
            _ => bail!(USAGE),
        };
        Ok(command)
    }
}

/// Split `--config PATH` out of the raw arguments.
fn split_args(args: &[String]) -> (Option<&str>, Vec<String>) {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config_path = iter.next().map(String::as_str);
        } else {
            rest.push(arg.clone());
        }
    }
    (config_path, rest)
}

/// Build the API session and register the OAuth client as its default.
fn build_session(config: &Config) -> Session {
    let mut session = Session::new(
        &config.api.url,
        Params::new(),
        RequestOptions {
            user_agent: Some(config.api.user_agent.clone()),
            ..RequestOptions::default()
        },
    );

    let secret = config
        .oauth
        .client_secret
        .as_ref()
        .map(|secret| secret.expose().clone());
    let client = Arc::new(OAuthClient::new(config.oauth.client_id.clone(), secret));
    oauth_session::set_default_options(
        &mut session,
        OAuthOptions::with_client(client).assert_user(config.oauth.assert_user),
    );
    session
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (cli_config_path, rest) = split_args(&args);
    let command = Command::parse(&rest)?;

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        api_url = %config.api.url,
        client_id = %config.oauth.client_id,
        confidential = config.oauth.client_secret.is_some(),
        state_file = %config.state_file.display(),
        "configuration loaded"
    );

    let mut session = build_session(&config);
    let stored = state_file::load(&config.state_file).await?;
    oauth_session::deserialize(&mut session, &stored, &OAuthOptions::default());

    let result = run(&mut session, &config, command).await;
    // Save even after a failed request: a refresh may have rotated the tokens
    state_file::save(&config.state_file, &oauth_session::serialize(&session)).await?;
    result
}

async fn run(session: &mut Session, config: &Config, command: Command) -> Result<()> {
    let options = OAuthOptions::default();
    match command {
        Command::Authorize => {
            let url = oauth_session::init(session, &options)?;
            println!("{url}");
        }
        Command::Complete(callback_url) => {
            oauth_session::complete(session, &callback_url, &options)
                .await
                .context("completing authorization")?;
            println!("authorized");
        }
        Command::Refresh => {
            oauth_session::refresh(session, &options)
                .await
                .context("refreshing access token")?;
            println!("refreshed");
        }
        Command::Request(params) => {
            if !oauth_session::is_complete(session) {
                bail!("not authorized yet, run `oauth-cli authorize` first");
            }
            let deadline = Instant::now() + Duration::from_secs(config.api.retry_window_secs);
            let body = session
                .request(
                    params,
                    RequestOptions {
                        retry_until: Some(deadline),
                        ..RequestOptions::default()
                    },
                )
                .await
                .context("API request failed")?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Status => {
            let status = if oauth_session::is_complete(session) {
                "authorized"
            } else if oauth_session::serialize(session).code_verifier.is_some() {
                "pending"
            } else {
                "unauthorized"
            };
            println!("{status}");
        }
    }
    Ok(())
}
