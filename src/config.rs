use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OMDB_BASE_URL: &str = "https://www.omdbapi.com/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} must be a whole number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
}

/// Settings read from `.env` and the environment.
/// The bot token itself is picked up by teloxide (`TELOXIDE_TOKEN`).
#[derive(Debug, Clone)]
pub struct Config {
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub omdb_timeout: Duration,
    /// SQLite file for dialogues; dialogues live in memory when unset.
    pub dialogue_db: Option<PathBuf>,
    /// Answering slower than this counts as having left the game.
    pub away_after: Duration,
    pub distractor_attempts: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(name) {
                Some(value) => value.trim().parse().map_err(|_| ConfigError::NotANumber { name, value }),
                None => Ok(default),
            }
        };

        Ok(Self {
            omdb_api_key: var("OMDB_API_KEY").ok_or(ConfigError::Missing("OMDB_API_KEY"))?,
            omdb_base_url: var("OMDB_BASE_URL").unwrap_or_else(|| DEFAULT_OMDB_BASE_URL.to_string()),
            omdb_timeout: Duration::from_secs(number("OMDB_TIMEOUT_SECS", 10)?),
            dialogue_db: var("QUIZ_DIALOGUE_DB").map(PathBuf::from),
            away_after: Duration::from_secs(number("QUIZ_AWAY_AFTER_SECS", 60)?),
            distractor_attempts: number("QUIZ_DISTRACTOR_ATTEMPTS", 12)? as usize,
        })
    }
}
