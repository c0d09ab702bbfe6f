//! FoodCam session CLI - log in, inspect and end a FoodCam API session.
//!
//! Drives the same request pipeline the web client uses, which makes it
//! handy for checking a backend's token endpoints from a terminal.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use foodcam_session_core::auth::{CredentialKey, FileBackend, KeyringBackend, StorageBackend};
use foodcam_session_core::{ApiClient, CredentialStore, Session, SessionConfig, SessionNavigator};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the configured backend URL
const BASE_URL_ENV: &str = "FOODCAM_BASE_URL";

/// Environment variable naming a directory for daily log files
const LOG_DIR_ENV: &str = "FOODCAM_LOG_DIR";

/// Environment variable supplying the password non-interactively
const PASSWORD_ENV: &str = "FOODCAM_PASSWORD";

#[derive(Parser)]
#[command(name = "foodcam-session", version, about = "Manage a FoodCam API session")]
struct Cli {
    /// Config file (defaults to ~/.config/foodcam-session/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where credentials are kept
    #[arg(long, global = true, value_enum, default_value_t = StoreKind::File)]
    store: StoreKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    File,
    Keyring,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the token pair
    Login {
        username: String,
        /// Keep the session for the extended lifetime
        #[arg(long)]
        remember: bool,
    },
    /// Show the logged-in user, refreshing the access token if needed
    Whoami,
    /// Blacklist the refresh token and clear local credentials
    Logout,
    /// Report stored credentials without contacting the server
    Status,
}

/// Terminal stand-in for the web router's login redirect
struct TerminalNavigator;

impl SessionNavigator for TerminalNavigator {
    fn current_route(&self) -> Option<String> {
        None
    }

    fn navigate_to(&self, route: &str) {
        eprintln!("Session expired ({route}): run `foodcam-session login <username>`");
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "foodcam-session.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => SessionConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SessionConfig::load().context("Failed to load config")?,
    };
    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        config.base_url = base_url;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_store(kind: StoreKind, config: &SessionConfig) -> Result<CredentialStore> {
    let backend: Box<dyn StorageBackend> = match kind {
        StoreKind::File => {
            let dir = SessionConfig::cache_dir().context("Failed to locate credential directory")?;
            Box::new(FileBackend::new(dir))
        }
        StoreKind::Keyring => Box::new(KeyringBackend::new()),
    };
    Ok(CredentialStore::from_config(backend, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing();

    let config = load_config(cli.config.as_ref())?;
    let store = Arc::new(open_store(cli.store, &config)?);
    if !store.probe() {
        eprintln!("Warning: credential storage is not writable; the session will not persist");
    }

    let api = ApiClient::new(config, store, Arc::new(TerminalNavigator))
        .context("Failed to create API client")?;
    let session = Session::new(api);

    match cli.command {
        Command::Login { username, remember } => {
            let password = match std::env::var(PASSWORD_ENV) {
                Ok(password) => password,
                Err(_) => rpassword::prompt_password("Password: ")
                    .context("Failed to read password")?,
            };
            session
                .login(&username, &password, remember)
                .await
                .context("Login failed")?;
            info!(username = %username, "Session started");
            println!("Logged in as {}", username);
        }
        Command::Whoami => match session.current_user().await.context("Failed to fetch user")? {
            Some(user) => {
                println!("{}", serde_json::to_string_pretty(&user)?);
            }
            None => anyhow::bail!("Not logged in"),
        },
        Command::Logout => {
            session.logout().await;
            println!("Logged out");
        }
        Command::Status => {
            let store = session.store();
            let present = |key: CredentialKey| if store.get(key).is_some() { "present" } else { "absent" };
            println!("access_token:  {}", present(CredentialKey::AccessToken));
            println!("refresh_token: {}", present(CredentialKey::RefreshToken));
            if session.is_authenticated() {
                println!("session:       {:?}", store.session_ttl());
            }
        }
    }

    Ok(())
}
