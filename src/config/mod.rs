use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Public origin used to build short links, e.g. `http://localhost:8000`
    pub base_url: String,
    pub links: LinkConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Validity applied when a creation request omits one
    pub default_validity_minutes: u32,
    /// Interval between expiry sweeps
    pub sweep_interval_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            default_validity_minutes: 30,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the socket address only
    #[default]
    None,
    /// Honour Forwarded / X-Forwarded-For
    Standard,
    /// Honour CF-Connecting-IP
    Cloudflare,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub geoip_city_db_path: Option<String>,
    pub ip_anonymization: bool,
    pub trusted_proxy_mode: TrustedProxyMode,
    pub trusted_proxies: Vec<IpNet>,
    pub num_trusted_proxies: Option<usize>,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn parse_trusted_proxies(raw: &str) -> Vec<IpNet> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|entry| {
            // Bare addresses are accepted as single-host networks
            let parsed = entry.parse::<IpNet>().ok().or_else(|| {
                let ip = entry.parse::<IpAddr>().ok()?;
                let prefix_len = if ip.is_ipv4() { 32 } else { 128 };
                IpNet::new(ip, prefix_len).ok()
            });
            if parsed.is_none() {
                tracing::warn!("Ignoring invalid TRUSTED_PROXIES entry '{entry}'");
            }
            parsed
        })
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{port}"));

        let default_validity_minutes = std::env::var("DEFAULT_VALIDITY_MINUTES")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u32>()
            .context("DEFAULT_VALIDITY_MINUTES must be a positive integer")?;
        if default_validity_minutes == 0 {
            anyhow::bail!("DEFAULT_VALIDITY_MINUTES must be greater than zero");
        }

        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .context("SWEEP_INTERVAL_SECS must be a positive integer")?;
        if sweep_interval_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be greater than zero");
        }

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => TrustedProxyMode::None,
            "standard" => TrustedProxyMode::Standard,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = std::env::var("TRUSTED_PROXIES")
            .map(|raw| parse_trusted_proxies(&raw))
            .unwrap_or_default();

        let num_trusted_proxies = std::env::var("NUM_TRUSTED_PROXIES")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("NUM_TRUSTED_PROXIES must be a non-negative integer")?;

        Ok(Config {
            server: ServerConfig { host, port },
            base_url,
            links: LinkConfig {
                default_validity_minutes,
                sweep_interval_secs,
            },
            analytics: AnalyticsConfig {
                geoip_city_db_path: std::env::var("GEOIP_CITY_DB_PATH").ok(),
                ip_anonymization: env_flag("IP_ANONYMIZATION"),
                trusted_proxy_mode,
                trusted_proxies,
                num_trusted_proxies,
            },
        })
    }
}
