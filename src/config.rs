use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub anthropic_api_key: Option<String>,

    #[serde(default = "default_news_interval")]
    pub news_interval_minutes: u64,

    #[serde(default = "default_raid_interval")]
    pub raid_interval_hours: u64,

    #[serde(default = "default_scrape_on_startup")]
    pub scrape_on_startup: bool,

    /// Wait after each Pokebattler page load for late-rendered content.
    #[serde(default = "default_render_settle")]
    pub render_settle_secs: u64,

    /// Pause between consecutive boss detail fetches.
    #[serde(default = "default_detail_delay")]
    pub detail_delay_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pogo-digest");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
        .join("pokemon_go_news.db")
        .to_string_lossy()
        .to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_news_interval() -> u64 {
    30
}

fn default_raid_interval() -> u64 {
    6
}

fn default_scrape_on_startup() -> bool {
    true
}

fn default_render_settle() -> u64 {
    4
}

fn default_detail_delay() -> u64 {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            port: default_port(),
            anthropic_api_key: None,
            news_interval_minutes: default_news_interval(),
            raid_interval_hours: default_raid_interval(),
            scrape_on_startup: default_scrape_on_startup(),
            render_settle_secs: default_render_settle(),
            detail_delay_secs: default_detail_delay(),
        }
    }
}

impl Config {
    /// Loads the optional TOML file, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let config = Self::from_file(&Self::config_path())?;
        let config = config.with_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.db_path = sqlite_path(&url);
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .map_err(|_| AppError::Config(format!("PORT must be a valid number, got {port:?}")))?;
        }
        if let Some(minutes) = lookup("SCRAPE_INTERVAL") {
            self.news_interval_minutes = minutes.parse().map_err(|_| {
                AppError::Config(format!("SCRAPE_INTERVAL must be minutes, got {minutes:?}"))
            })?;
        }
        if let Some(hours) = lookup("RAID_SCRAPE_INTERVAL") {
            self.raid_interval_hours = hours.parse().map_err(|_| {
                AppError::Config(format!("RAID_SCRAPE_INTERVAL must be hours, got {hours:?}"))
            })?;
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.anthropic_api_key = Some(key);
        }
        if let Some(flag) = lookup("SCRAPE_ON_STARTUP") {
            self.scrape_on_startup = !matches!(flag.to_lowercase().as_str(), "0" | "false" | "no");
        }
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.news_interval_minutes == 0 {
            return Err(AppError::Config("news interval must be at least one minute".into()));
        }
        if self.raid_interval_hours == 0 {
            return Err(AppError::Config("raid interval must be at least one hour".into()));
        }
        Ok(())
    }

    pub fn news_interval(&self) -> Duration {
        Duration::from_secs(self.news_interval_minutes * 60)
    }

    pub fn raid_interval(&self) -> Duration {
        Duration::from_secs(self.raid_interval_hours * 60 * 60)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_secs(self.render_settle_secs)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_secs(self.detail_delay_secs)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pogo-digest")
            .join("config.toml")
    }
}

/// Accepts a bare path or a `sqlite://` / `sqlite:///` style URL.
fn sqlite_path(url: &str) -> String {
    url.strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url)
        .to_string()
}
