//! Configuration loading.
//!
//! Layers, lowest to highest precedence: built-in defaults, `GITHUB_TOKEN`
//! and `GITHUB_USERNAME`, `RECAP_API_URL` and `RECAP_PER_PAGE`, then
//! command-line flags.

use std::fmt;

use figment::Figment;
use figment::providers::{Env, Serialized};
use recap_github::DEFAULT_API_URL;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Cli;

/// Largest page size the events API accepts.
const MAX_PER_PAGE: u32 = 100;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source held a value of the wrong type.
    #[error("failed to load configuration")]
    Load(#[source] Box<figment::Error>),
    /// Page size outside `1..=100`.
    #[error("RECAP_PER_PAGE must be between 1 and {MAX_PER_PAGE}, got {0}")]
    InvalidPerPage(u32),
    /// Neither a username nor a token to detect one from.
    #[error(
        "no GitHub user given: pass --user, set GITHUB_USERNAME, or provide a token to detect it"
    )]
    MissingUser,
}

/// Resolved settings for one run.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// GitHub access token.
    pub token: Option<String>,
    /// Login whose activity is summarized.
    pub username: Option<String>,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
    /// Events requested per page.
    pub per_page: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("api_url", &self.api_url)
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            username: None,
            api_url: DEFAULT_API_URL.to_string(),
            per_page: MAX_PER_PAGE,
        }
    }
}

/// A string-valued override layer.
///
/// Values are serialized as strings so a numeric login stays a string.
#[derive(Serialize)]
struct Overrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

impl Config {
    /// Loads configuration from the environment and `cli`.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let github_token = std::env::var("GITHUB_TOKEN").ok();
        let github_username = std::env::var("GITHUB_USERNAME").ok();
        let github_env = Overrides {
            token: non_blank(github_token.as_deref()),
            username: non_blank(github_username.as_deref()),
        };
        let flags = Overrides {
            token: non_blank(cli.token.as_deref()),
            username: non_blank(cli.user.as_deref()),
        };

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Serialized::defaults(github_env))
            .merge(Env::prefixed("RECAP_").only(&["api_url", "per_page"]))
            .merge(Serialized::defaults(flags))
            .extract()
            .map_err(|err| ConfigError::Load(Box::new(err)))?;

        config.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(ConfigError::InvalidPerPage(self.per_page));
        }
        Ok(self)
    }
}

/// Trims a flag or variable value. Blank values count as unset.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
