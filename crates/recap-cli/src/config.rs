use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use recap_scrape::ScrapeConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderEntry,

    #[serde(default)]
    pub site: SiteEntry,

    #[serde(default)]
    pub browser: BrowserEntry,

    #[serde(default)]
    pub scrape: ScrapeEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderEntry {
    /// Anthropic API key. Falls back to $ANTHROPIC_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteEntry {
    /// Index page with the episode table. Defaults to the Andor Season 2 wiki page.
    #[serde(default)]
    pub index_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEntry {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chrome/Chromium binary path.
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Pass --no-sandbox to Chrome (required when running as root).
    #[serde(default)]
    pub no_sandbox: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BrowserEntry {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            no_sandbox: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeEntry {
    /// Cached browser session lifetime, seconds.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Per-navigation timeout, seconds.
    #[serde(default = "default_nav_timeout")]
    pub nav_timeout_secs: u64,

    /// Episode-page attempts (initial + retries).
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Backoff between episode-page attempts, seconds.
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,
}

fn default_session_ttl() -> u64 {
    300
}

fn default_nav_timeout() -> u64 {
    30
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff() -> u64 {
    1
}

impl Default for ScrapeEntry {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            nav_timeout_secs: default_nav_timeout(),
            attempts: default_attempts(),
            backoff_secs: default_backoff(),
        }
    }
}

impl Config {
    /// Load from the given path, or `~/.config/recap/config.toml`. A missing
    /// file yields defaults; the API key can still come from the environment
    /// or flags.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.clone(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else if path.is_some() {
            anyhow::bail!("Config file not found: {}", config_path.display())
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("recap").join("config.toml"))
    }

    pub fn scrape_config(&self, index_url_override: Option<&str>) -> ScrapeConfig {
        let mut config = ScrapeConfig {
            nav_timeout: Duration::from_secs(self.scrape.nav_timeout_secs),
            attempts: self.scrape.attempts,
            backoff: Duration::from_secs(self.scrape.backoff_secs),
            ..Default::default()
        };
        if let Some(url) = index_url_override.or(self.site.index_url.as_deref()) {
            config.index_url = url.to_string();
        }
        config
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.scrape.session_ttl_secs)
    }

    /// Resolve the API key: flag > config file > environment.
    pub fn api_key(&self, flag: Option<&str>) -> Result<String> {
        if let Some(key) = flag {
            return Ok(key.to_string());
        }
        if let Some(key) = &self.provider.api_key {
            return Ok(key.clone());
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            return Ok(key);
        }
        anyhow::bail!(
            "No API key configured. Set $ANTHROPIC_API_KEY, pass --api-key, or create \
             ~/.config/recap/config.toml with:\n\n\
             [provider]\n\
             api_key = \"sk-ant-...\"\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [provider]
            api_key = "sk-ant-test"
            model = "claude-sonnet-4-5"

            [site]
            index_url = "https://wiki.test/Andor_Season_2#episodes"

            [browser]
            headless = false

            [scrape]
            attempts = 5
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-ant-test"));
        assert!(!config.browser.headless);
        assert_eq!(config.scrape.attempts, 5);
        // Unset knobs keep their defaults.
        assert_eq!(config.scrape.nav_timeout_secs, 30);
        assert_eq!(config.scrape.backoff_secs, 1);
    }

    #[test]
    fn test_empty_config_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.browser.headless);
        assert_eq!(config.scrape.session_ttl_secs, 300);
        assert!(config.site.index_url.is_none());
    }

    #[test]
    fn test_scrape_config_respects_override() {
        let config = Config::default();
        let scrape = config.scrape_config(Some("https://other.test/page"));
        assert_eq!(scrape.index_url, "https://other.test/page");
        assert_eq!(scrape.attempts, 3);

        let scrape = config.scrape_config(None);
        assert_eq!(scrape.index_url, recap_scrape::DEFAULT_INDEX_URL);
    }
}
