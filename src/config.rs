use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "forum", about = "A server-rendered discussion forum")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory uploaded post images are written to
    pub path: Option<PathBuf>,
    pub max_image_bytes: usize,
}

/// Costs the bcrypt crate accepts.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    /// Client-side lifetime of the session cookie
    pub session_hours: u64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_token".to_string(),
            session_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        config.resolve_paths(&data_dir);
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later, on the first request that needs them.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            BCRYPT_COST_RANGE.contains(&self.auth.bcrypt_cost),
            "auth.bcrypt_cost must be between {} and {}, got {}",
            BCRYPT_COST_RANGE.start(),
            BCRYPT_COST_RANGE.end(),
            self.auth.bcrypt_cost
        );
        Ok(())
    }

    /// Fill in any unset paths relative to the data directory.
    pub fn resolve_paths(&mut self, data_dir: &std::path::Path) {
        if self.database.path.is_none() {
            self.database.path = Some(data_dir.join("forum.db"));
        }
        if self.storage.path.is_none() {
            self.storage.path = Some(data_dir.join("uploads"));
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".forum")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("forum.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }
}
