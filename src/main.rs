use anyhow::{Context, Result};
use authgate::auth::PasswordHasher;
use authgate::config::{config_source, Config};
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Session-cookie authentication service.
#[derive(Parser, Debug)]
#[command(name = "authgate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP gateway
    Serve {
        /// Config file (defaults to the platform config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override `gateway.host`
        #[arg(long)]
        host: Option<String>,

        /// Override `gateway.port`
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration as TOML
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print a bcrypt hash of PASSWORD
    HashPassword {
        password: String,

        #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
        cost: u32,
    },
}

fn init_tracing(default_level: &str) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => {
            let source = config_source(config.as_deref());
            let config = Config::load_with(config.as_deref(), |c| {
                if let Some(host) = host {
                    c.gateway.host = host;
                }
                if let Some(port) = port {
                    c.gateway.port = port;
                }
            })?;

            init_tracing(&config.log.level);
            match &source {
                Some(path) => tracing::info!(config = %path.display(), "authgate starting"),
                None => tracing::info!("authgate starting with built-in defaults"),
            }
            authgate::gateway::run_gateway(config).await
        }
        Command::Config { config } => {
            let config = Config::load(config.as_deref())?;
            let rendered =
                toml::to_string_pretty(&config).context("failed to render configuration")?;
            print!("{rendered}");
            Ok(())
        }
        Command::HashPassword { password, cost } => {
            let hasher = PasswordHasher::new(cost)?;
            println!("{}", hasher.hash(&password)?);
            Ok(())
        }
    }
}
