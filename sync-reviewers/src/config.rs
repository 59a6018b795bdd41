use crate::errors::Failure;
use log::debug;
use reqwest::Url;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG_FILE: &str = ".env.local";
pub const CONFIG_FILE: &str = ".env";

const URL_KEY: &str = "bitbucket_url";
const USER_KEY: &str = "bitbucket_user";
const PASSWORD_KEY: &str = "bitbucket_password";
const PROJECT_KEY: &str = "bitbucket_project";

/// Where and as whom to talk to the server. Loaded once, never changed.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: Url,
    pub username: String,
    pub password: SecretString,
    pub project_key: String,
}

impl ServerConfig {
    /// Load the configuration from `.env.local` in `dir`, or `.env` if the
    /// former does not exist.
    pub fn load(dir: &Path) -> Result<Self, Failure> {
        let local = dir.join(LOCAL_CONFIG_FILE);
        let fallback = dir.join(CONFIG_FILE);
        let path = if local.is_file() {
            local
        } else if fallback.is_file() {
            fallback
        } else {
            return Err(Failure::ConfigMissing { local, fallback });
        };
        debug!("loading configuration from {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| invalid(&path, e))?;
        Self::from_values(&path, parse_pairs(&content))
    }

    fn from_values(path: &Path, mut values: HashMap<String, String>) -> Result<Self, Failure> {
        let mut take = |key: &str| {
            values
                .remove(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| invalid(path, format!("missing `{key}`")))
        };

        let raw_url = take(URL_KEY)?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| invalid(path, format!("`{URL_KEY}` is not a valid url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid(
                path,
                format!("`{URL_KEY}` cannot be used as a base url: {raw_url}"),
            ));
        }

        Ok(ServerConfig {
            base_url,
            username: take(USER_KEY)?,
            password: SecretString::from(take(PASSWORD_KEY)?),
            project_key: take(PROJECT_KEY)?,
        })
    }

    /// The server url without a trailing slash, as shown to the user.
    pub fn display_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

/// `KEY=value` lines split at the first `=`. Values are taken verbatim:
/// nothing is unquoted, unescaped or expanded. Blank lines, `#` comments and
/// lines without `=` are skipped.
fn parse_pairs(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .collect()
}

fn invalid(path: &Path, reason: impl ToString) -> Failure {
    Failure::ConfigInvalid {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}
