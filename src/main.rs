use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snip::config::Config;

#[derive(Parser)]
#[command(name = "snip")]
#[command(about = "In-memory URL shortener with click analytics", long_about = None)]
struct Cli {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
    /// MaxMind City database (overrides GEOIP_CITY_DB_PATH)
    #[arg(long)]
    geoip_db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
        if std::env::var("BASE_URL").is_err() {
            config.base_url = format!("http://localhost:{port}");
        }
    }
    if let Some(path) = cli.geoip_db {
        config.analytics.geoip_city_db_path = Some(path);
    }
    info!("Loaded configuration");

    snip::server::run(config).await
}
