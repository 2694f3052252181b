//! Online Accounts Mock - Entry Point
//!
//! Runs the OAuth 1.0a and/or OAuth 2.0 mock until interrupted.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use online_accounts_mock::{MockConfig, MockKind, MockServer};

#[derive(Parser, Debug)]
#[command(name = "online-accounts-mock")]
#[command(about = "Mock OAuth servers for online accounts end-to-end tests")]
#[command(version)]
struct Cli {
    /// Port of the OAuth 1.0a mock
    #[arg(long, env = "OAM_OAUTH1_PORT")]
    oauth1_port: Option<u16>,

    /// Port of the OAuth 2.0 mock
    #[arg(long, env = "OAM_OAUTH2_PORT")]
    oauth2_port: Option<u16>,

    /// PEM file with certificate and private key for the OAuth 2.0 mock
    #[arg(long, env = "OAM_CERT_PATH")]
    cert: Option<PathBuf>,

    /// Serve the OAuth 2.0 mock over plain HTTP
    #[arg(long)]
    no_tls: bool,

    /// Which mocks to run
    #[arg(long, default_value = "both")]
    mode: Mode,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum Mode {
    /// OAuth 1.0a only
    Oauth1,
    /// OAuth 2.0 only
    Oauth2,
    /// Both mocks
    #[default]
    Both,
}

impl Mode {
    fn kinds(self) -> &'static [MockKind] {
        match self {
            Self::Oauth1 => &[MockKind::OAuth1],
            Self::Oauth2 => &[MockKind::OAuth2],
            Self::Both => &[MockKind::OAuth1, MockKind::OAuth2],
        }
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?cli.mode,
        "Starting online accounts mock"
    );

    let mut config = MockConfig::from_env()?;
    if let Some(port) = cli.oauth1_port {
        config.oauth1_port = port;
    }
    if let Some(port) = cli.oauth2_port {
        config.oauth2_port = port;
    }
    if let Some(cert) = cli.cert {
        config.cert_path = Some(cert);
    }
    if cli.no_tls {
        config.cert_path = None;
    }

    let mut servers = Vec::new();
    for &kind in cli.mode.kinds() {
        let server = MockServer::start(kind, &config).await?;
        tracing::info!(kind = ?kind, url = %server.base_url(), "Listening");
        servers.push(server);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, shutting down");

    for server in servers {
        server.shutdown().await?;
    }

    Ok(())
}
