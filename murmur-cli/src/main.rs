use clap::Parser;
use commands::{Cli, CliError};
use env::Env;
use murmur_client::client::ApiClient;
use murmur_common::model::{Id, auth::Session};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod env;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error building http client: {0}")]
    HttpClient(reqwest::Error),
    #[error(transparent)]
    Command(#[from] CliError),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "murmur_cli=info,murmur_feed=debug,murmur_client=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Reads `MURMUR_*` settings, from a `.env` file in the working directory if
/// one exists and from the process environment otherwise.
fn load_env() -> Result<Env, InitError> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded settings file"),
        Err(err) if err.not_found() => debug!("No settings file, using the process environment"),
        Err(err) => return Err(err.into()),
    }

    Ok(Env::from_vars(std::env::vars())?)
}

fn build_client(env: &Env) -> Result<ApiClient, InitError> {
    let mut http = reqwest::Client::builder();
    if let Some(secs) = env.request_timeout_secs {
        http = http.timeout(Duration::from_secs(secs.get()));
    }
    let http = http.build().map_err(InitError::HttpClient)?;

    let session = Session::new(env.api_token.clone(), env.user_id.map(Id::new));
    Ok(ApiClient::with_http_client(http, &env.api_base_url, session))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), InitError> {
    let cli = Cli::parse();
    install_tracing();
    let env = load_env()?;
    let api = build_client(&env)?;

    if let Err(err) = commands::run(cli.command, api, env.page_size).await {
        error!(error = %err, transient = err.is_transient(), "Command failed");
        return Err(err.into());
    }

    Ok(())
}
