use crate::model::{ConfigError, ListingId, ScheduleSpec};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "RATE_SNIPER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Chromium,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_engine")]
    pub engine: EngineKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_price_selector")]
    pub price_selector: String,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_element_timeout")]
    pub element_timeout_secs: u64,
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,
    #[serde(default = "default_browser_args")]
    pub browser_args: Vec<String>,
    /// Fixed RNG seed for delays and fingerprints; random when absent.
    #[serde(default)]
    pub pacing_seed: Option<u64>,
}

impl ScraperConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            base_url: default_base_url(),
            query: default_query(),
            price_selector: default_price_selector(),
            navigation_timeout_secs: default_navigation_timeout(),
            element_timeout_secs: default_element_timeout(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            user_agents: default_user_agents(),
            headless: true,
            viewport: default_viewport(),
            browser_args: default_browser_args(),
            pacing_seed: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: i64,
    #[serde(default = "default_location")]
    pub location: String,
    pub listings: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub concurrency_limit: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub combined_report: bool,
    #[serde(default)]
    pub keep_alive_addr: Option<String>,
    #[serde(default)]
    pub schedule: Option<ScheduleSpec>,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

impl AppConfig {
    /// Listing identifiers in configured order, duplicates dropped.
    pub fn listing_ids(&self) -> Vec<ListingId> {
        let mut ids: Vec<ListingId> = Vec::with_capacity(self.listings.len());
        for raw in &self.listings {
            let id = ListingId::new(raw.trim());
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_bot_token.trim().is_empty() {
            return Err(ConfigError::Invalid("telegram_bot_token is empty".into()));
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::Invalid("concurrency_limit must be at least 1".into()));
        }
        if self.listings.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigError::Invalid("listings contain an empty identifier".into()));
        }
        let scraper = &self.scraper;
        if scraper.min_delay_ms > scraper.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "min_delay_ms ({}) exceeds max_delay_ms ({})",
                scraper.min_delay_ms, scraper.max_delay_ms
            )));
        }
        if scraper.user_agents.len() < 3 {
            return Err(ConfigError::Invalid("user_agents needs at least 3 entries".into()));
        }
        if scraper.price_selector.trim().is_empty() {
            return Err(ConfigError::Invalid("price_selector is empty".into()));
        }
        Ok(())
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

fn default_engine() -> EngineKind {
    EngineKind::Chromium
}
fn default_base_url() -> String {
    "https://www.booking.com/hotel/pl".to_string()
}
fn default_query() -> String {
    "group_adults=2&no_rooms=1&group_children=0".to_string()
}
fn default_price_selector() -> String {
    "span.prco-valign-middle-helper".to_string()
}
fn default_navigation_timeout() -> u64 {
    60
}
fn default_element_timeout() -> u64 {
    20
}
fn default_min_delay() -> u64 {
    4_000
}
fn default_max_delay() -> u64 {
    10_000
}
fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/116.0.1938.69 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36".to_string(),
    ]
}
fn default_true() -> bool {
    true
}
fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}
fn default_browser_args() -> Vec<String> {
    vec!["--disable-blink-features=AutomationControlled".to_string()]
}
fn default_location() -> String {
    "prices".to_string()
}
fn default_concurrency() -> usize {
    3
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}
