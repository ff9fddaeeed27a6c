use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use grill_analytics::{
    backend::RestBackend,
    classify::{EnvironmentSnapshot, StaticEnvironment},
    config::{Config, LogFormat},
    storage::SqliteStore,
    AppState,
};

/// Site analytics client: record page visits and read the admin dashboard.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a visit to a page
    Track {
        /// Page path, e.g. /meny
        path: String,

        /// Viewport width in CSS pixels
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Referrer URL
        #[arg(long, default_value = "")]
        referrer: String,

        /// User agent string
        #[arg(long)]
        user_agent: Option<String>,
    },

    /// Print this client's session id
    Session,

    /// Check for an active admin session
    Check,

    /// Sign in and print the analytics dashboard
    Dashboard {
        /// Admin email
        #[arg(long)]
        email: Option<String>,

        /// Admin password
        #[arg(long)]
        password: Option<String>,
    },

    /// End the admin session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let store = match SqliteStore::new(&config.storage).await {
        Ok(s) => {
            info!(path = %config.storage.path.display(), "Client storage opened");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to open client storage");
            return Err(e.into());
        }
    };

    let backend = match RestBackend::new(&config.backend, config.request.clone()) {
        Ok(b) => Arc::new(b.with_session_store(store.clone())),
        Err(e) => {
            error!(error = %e, "Failed to initialize backend client");
            return Err(e.into());
        }
    };

    let mut snapshot = EnvironmentSnapshot::default();
    if let Command::Track {
        width,
        referrer,
        user_agent,
        ..
    } = &cli.command
    {
        snapshot.viewport_width = *width;
        snapshot.referrer = referrer.clone();
        if let Some(ua) = user_agent {
            snapshot.user_agent = ua.clone();
        }
    }
    let environment = Arc::new(StaticEnvironment::new(snapshot));

    let state = AppState::new(config, backend, store, environment);

    match cli.command {
        Command::Track { path, .. } => {
            let route = state.navigate(&path);
            state.flush().await;
            println!("Tracked {} ({})", path, route);
        }
        Command::Session => {
            println!("{}", state.identity.session_id().await);
        }
        Command::Check => {
            let active = state.gate.check_session().await;
            println!("{}", state.gate.state().await);
            if !active {
                std::process::exit(2);
            }
        }
        Command::Dashboard { email, password } => {
            if !state.gate.check_session().await {
                let email = email.unwrap_or_default();
                let password = password.unwrap_or_default();
                if let Err(e) = state.gate.login(&email, &password).await {
                    eprintln!("Login failed: {}", e);
                    std::process::exit(2);
                }
            }
            let data = state.dashboard.load().await?;
            print!("{}", data.render_report());
        }
        Command::Logout => {
            state.gate.logout().await;
            println!("{}", state.gate.state().await);
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
