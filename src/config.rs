use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub video: VideoConfig,
    pub payment: PaymentConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
    /// Where sessions are written on shutdown and read back on startup.
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct VideoConfig {
    pub app_id: u32,
    pub server_secret: SecretString,
    pub max_users: u8,
}

impl Clone for VideoConfig {
    fn clone(&self) -> Self {
        Self {
            app_id: self.app_id,
            server_secret: SecretString::from(self.server_secret.expose_secret().to_owned()),
            max_users: self.max_users,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub key_id: String,
    pub currency: String,
    pub merchant_name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Server configuration
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        // Store configuration
        let backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse::<StoreBackend>()
            .map_err(anyhow::Error::msg)
            .context("Failed to parse STORE_BACKEND")?;
        let database_url = env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }
        let max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10)?;
        let min_connections = parse_or("DATABASE_MIN_CONNECTIONS", 1)?;

        // Sessions
        let ttl_hours: u64 = parse_or("SESSION_TTL_HOURS", 24)?;
        let snapshot_path = env::var("SESSION_SNAPSHOT_PATH").ok().map(PathBuf::from);

        // Video rooms
        let app_id = parse_or("VIDEO_APP_ID", 0)?;
        let server_secret = env::var("VIDEO_SERVER_SECRET").unwrap_or_default();
        let max_users = parse_or("VIDEO_MAX_USERS", 2)?;

        // Payments
        let key_id = env::var("PAYMENT_KEY_ID").unwrap_or_default();
        let currency = env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string());

        // App configuration
        let environment = env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .parse()
            .unwrap_or_default();
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "AI Mentor".to_string());
        let static_dir = env::var("STATIC_DIR").ok();

        Ok(Config {
            server: ServerConfig { host, port },
            store: StoreConfig {
                backend,
                database_url,
                max_connections,
                min_connections,
            },
            session: SessionConfig {
                ttl: session_ttl(ttl_hours).context("Invalid SESSION_TTL_HOURS")?,
                snapshot_path,
            },
            video: VideoConfig {
                app_id,
                server_secret: SecretString::from(server_secret),
                max_users,
            },
            payment: PaymentConfig {
                key_id,
                currency,
                merchant_name: app_name.clone(),
            },
            app: AppConfig {
                name: app_name,
                environment,
                static_dir,
            },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == Environment::Production
    }
}

/// Longest accepted session lifetime, one year.
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;

fn session_ttl(hours: u64) -> Result<Duration> {
    if hours == 0 || hours > MAX_SESSION_TTL_HOURS {
        anyhow::bail!(
            "session TTL must be between 1 and {MAX_SESSION_TTL_HOURS} hours, got {hours}"
        );
    }
    let secs = hours
        .checked_mul(60 * 60)
        .context("session TTL overflows")?;
    Ok(Duration::from_secs(secs))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse()
            .with_context(|| format!("Failed to parse {key}")),
        Err(_) => Ok(default),
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Unknown store backend: {}", s)),
        }
    }
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

// Use once_cell for a global config instance that's initialized once
use once_cell::sync::OnceCell;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ttl_is_bounded() {
        assert_eq!(session_ttl(24).unwrap(), Duration::from_secs(24 * 60 * 60));
        assert!(session_ttl(MAX_SESSION_TTL_HOURS).is_ok());
        assert!(session_ttl(0).is_err());
        assert!(session_ttl(MAX_SESSION_TTL_HOURS + 1).is_err());
        assert!(session_ttl(u64::MAX).is_err());
    }
}
