use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerConfig,
    pub tmdb: TmdbConfig,
    pub omdb: OmdbConfig,
    pub watchlist: WatchlistConfig,
    #[serde(rename = "staticDir")]
    pub static_dir: PathBuf,
    #[serde(rename = "requestTimeoutSeconds")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TmdbConfig {
    #[serde(rename = "apikey")]
    pub api_key: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "imageBaseUrl")]
    pub image_base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OmdbConfig {
    #[serde(rename = "apikey")]
    pub api_key: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchlistConfig {
    pub path: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tmdb: TmdbConfig::default(),
            omdb: OmdbConfig::default(),
            watchlist: WatchlistConfig::default(),
            static_dir: PathBuf::from("static"),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
        }
    }
}

impl Default for OmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.omdbapi.com".to_string(),
        }
    }
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/watchlist.json"),
        }
    }
}

impl Configuration {
    /// Reads the YAML file at `path`, or starts from defaults when it does not
    /// exist, then applies environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("invalid config file {:?}", path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overrides values from the environment. `lookup` is injected so tests do
    /// not have to touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("TMDB_API_KEY") {
            self.tmdb.api_key = key;
        }
        if let Some(key) = lookup("OMDB_API_KEY") {
            self.omdb.api_key = key;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        }
        if let Some(path) = lookup("WATCHLIST_PATH") {
            self.watchlist.path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        check_api_key("TMDB_API_KEY", &self.tmdb.api_key)?;
        check_api_key("OMDB_API_KEY", &self.omdb.api_key)?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.server.host, self.server.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn check_api_key(name: &str, value: &str) -> anyhow::Result<()> {
    if value.trim().is_empty() || value == "demo_key" {
        bail!("{} is required. Set it in the environment or a .env file", name);
    }
    Ok(())
}

/// First few characters of a secret, for startup logs.
pub fn key_preview(key: &str) -> String {
    let preview: String = key.chars().take(8).collect();
    format!("{}...", preview)
}
