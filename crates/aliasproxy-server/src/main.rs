//! # aliasproxy
//!
//! Binary that answers Matrix federation alias queries on behalf of a
//! homeserver and publishes signed server keys for the configured domains.
//!
//! ```text
//! aliasproxy [--config config.toml]   run the proxy
//! aliasproxy genkey                   print a new signing key for server_keys
//! ```
//!
//! Startup failures exit with a status per category: config read 2, config
//! parse 3, signing key or pattern 4, homeserver URL 5, listener 10.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use aliasproxy_api::{AppState, build_router};
use aliasproxy_common::config::{self, ConfigError};
use aliasproxy_federation::{
    AliasMapper, DirectoryResolver, FederationError, HomeserverClient, KeySigner, ServerKeyPair,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "aliasproxy", version, about = "Matrix federation alias proxy")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, env = "ALIASPROXY_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an Ed25519 signing key in `server_keys` format.
    Genkey,
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Federation(#[from] FederationError),

    #[error("Error in HTTP listener: {0}")]
    Listener(#[source] std::io::Error),
}

impl StartupError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Config(ConfigError::Read { .. }) => 2,
            Self::Config(ConfigError::Parse(_)) => 3,
            Self::Config(ConfigError::InvalidHomeserverUrl(_)) => 5,
            Self::Federation(
                FederationError::InvalidHomeserver(_) | FederationError::RemoteHttp(..),
            ) => 5,
            Self::Federation(_) => 4,
            Self::Listener(_) => 10,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Some(Command::Genkey) = cli.command {
        println!("{}", ServerKeyPair::generate().to_config_string());
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aliasproxy=info,tower_http=info".into()),
        )
        .with_target(true)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = config::load(&cli.config)?;
    tracing::info!("Starting aliasproxy v{}", env!("CARGO_PKG_VERSION"));

    let signer = KeySigner::from_config(&config.server_keys)?;
    let aliases = AliasMapper::from_config(&config.aliases, &config.patterns)?;
    let homeserver = config.homeserver_base_url()?;
    tracing::info!(
        "{} static aliases, {} patterns, homeserver {}",
        config.aliases.len(),
        aliases.rule_count(),
        homeserver.host_str().unwrap_or_default()
    );

    let client = HomeserverClient::new(homeserver, config.upstream_timeout())?;
    let state = AppState {
        aliases: Arc::new(aliases),
        directory: Arc::new(DirectoryResolver::new(client, config.cache_ttl())),
        signer: Arc::new(signer),
        server_well_known: config.server_well_known.clone(),
    };
    let router = build_router(state);

    let listener =
        tokio::net::TcpListener::bind(&config.listen).await.map_err(StartupError::Listener)?;
    tracing::info!("Listening on {}", config.listen);
    axum::serve(listener, router).await.map_err(StartupError::Listener)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_failure_category() {
        let read = config::load("/nonexistent/aliasproxy.toml").unwrap_err();
        assert_eq!(StartupError::from(read).exit_code(), 2);

        let parse = config::AppConfig::from_toml_str("homeserver_url = [").unwrap_err();
        assert_eq!(StartupError::from(parse).exit_code(), 3);

        let key = FederationError::InvalidServerKey { domain: "d".into(), reason: "r".into() };
        assert_eq!(StartupError::from(key).exit_code(), 4);

        let url = ConfigError::InvalidHomeserverUrl("bad".into());
        assert_eq!(StartupError::from(url).exit_code(), 5);

        let io = std::io::Error::from(std::io::ErrorKind::AddrInUse);
        assert_eq!(StartupError::Listener(io).exit_code(), 10);
    }

    #[test]
    fn cli_parses_genkey_and_config() {
        let cli = Cli::try_parse_from(["aliasproxy", "--config", "/etc/ap.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/ap.toml"));
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["aliasproxy", "genkey"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Genkey)));
    }
}
