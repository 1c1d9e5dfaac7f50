use std::borrow::Cow;

use serde::Deserialize;
use time::Duration;

use crate::{
    crypto::Key,
    error::{Error, Result},
};

/// Default session lifetime in the store: 10 days.
pub const DEFAULT_TIMEOUT: Duration = Duration::days(10);

/// Default token delimiter.
pub const DEFAULT_DELIMITER: char = '_';

/// Default cache key prefix.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "token:";

/// Prefix of the environment variables read by [`TokenSettings::from_env`].
pub const ENV_PREFIX: &str = "TOKEN_SESSION_";

#[derive(Debug, Clone)]
pub struct TokenSessionConfig {
    pub(crate) excluded_paths: Vec<String>,
    pub(crate) cache_key_prefix: Cow<'static, str>,
    pub(crate) timeout: Duration,
    pub(crate) max_refresh: Duration,
    pub(crate) multi_login: bool,
    pub(crate) delimiter: char,
}

impl Default for TokenSessionConfig {
    fn default() -> Self {
        Self {
            excluded_paths: vec!["/login".to_string()],
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.into(),
            timeout: DEFAULT_TIMEOUT,
            max_refresh: DEFAULT_TIMEOUT / 2,
            multi_login: false,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl TokenSessionConfig {
    /// Replace the list of paths that do not require a token.
    ///
    /// A pattern ending in `/*` excludes every path starting with the part before
    /// it; any other pattern excludes exactly that path.
    #[must_use]
    pub fn with_excluded_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_cache_key_prefix<P: Into<Cow<'static, str>>>(mut self, prefix: P) -> Self {
        self.cache_key_prefix = prefix.into();
        self
    }

    /// Lifetime of a session record in the store after its last write.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Length of the sliding refresh window.
    #[must_use]
    pub fn with_max_refresh(mut self, max_refresh: Duration) -> Self {
        self.max_refresh = max_refresh;
        self
    }

    #[must_use]
    pub fn with_multi_login(mut self, multi_login: bool) -> Self {
        self.multi_login = multi_login;
        self
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }

    pub fn cache_key_prefix(&self) -> &str {
        &self.cache_key_prefix
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_refresh(&self) -> Duration {
        self.max_refresh
    }

    pub fn multi_login(&self) -> bool {
        self.multi_login
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Check the settings for combinations the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_ascii_hexdigit() || self.delimiter.is_whitespace() {
            return Err(Error::Config(format!(
                "delimiter {:?} collides with session ids or header parsing",
                self.delimiter
            )));
        }
        if self.timeout < Duration::SECOND {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        if !self.max_refresh.is_positive() {
            return Err(Error::Config("refresh window must be positive".into()));
        }
        if self.max_refresh > self.timeout {
            return Err(Error::Config(format!(
                "refresh window ({}) exceeds timeout ({})",
                self.max_refresh, self.timeout
            )));
        }
        Ok(())
    }

    pub(crate) fn cache_key(&self, user_key: &str) -> String {
        format!("{}{user_key}", self.cache_key_prefix)
    }

    pub(crate) fn store_ttl(&self) -> std::time::Duration {
        self.timeout.unsigned_abs()
    }
}

/// Settings as read from a configuration source.
///
/// Durations are milliseconds. A missing `refresh` defaults to half the timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub exclude: Vec<String>,
    pub cache_key: String,
    pub timeout: i64,
    pub refresh: Option<i64>,
    pub encrypt_key: Option<String>,
    pub multi_login: bool,
    pub delimiter: char,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            exclude: vec!["/login".to_string()],
            cache_key: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT.whole_milliseconds() as i64,
            refresh: None,
            encrypt_key: None,
            multi_login: false,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl TokenSettings {
    /// Read settings from `TOKEN_SESSION_*` environment variables.
    ///
    /// `TOKEN_SESSION_EXCLUDE` is a comma separated list.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(format!("{ENV_PREFIX}{name}").as_str());
        let mut settings = Self::default();

        if let Some(exclude) = var("EXCLUDE") {
            settings.exclude = exclude
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(cache_key) = var("CACHE_KEY") {
            settings.cache_key = cache_key;
        }
        if let Some(timeout) = var("TIMEOUT_MS") {
            settings.timeout = parse_var("TIMEOUT_MS", &timeout)?;
        }
        if let Some(refresh) = var("REFRESH_MS") {
            settings.refresh = Some(parse_var("REFRESH_MS", &refresh)?);
        }
        settings.encrypt_key = var("ENCRYPT_KEY");
        if let Some(multi_login) = var("MULTI_LOGIN") {
            settings.multi_login = parse_var("MULTI_LOGIN", &multi_login)?;
        }
        if let Some(delimiter) = var("DELIMITER") {
            settings.delimiter = parse_var("DELIMITER", &delimiter)?;
        }

        Ok(settings)
    }

    /// Split the settings into the engine configuration and the encryption key.
    pub fn build(self) -> Result<(TokenSessionConfig, Key)> {
        let raw_key = self
            .encrypt_key
            .as_deref()
            .ok_or_else(|| Error::Config("encrypt_key is required".into()))?;
        let key = Key::parse(raw_key).map_err(|err| Error::Config(err.to_string()))?;

        let timeout = Duration::milliseconds(self.timeout);
        let max_refresh = self
            .refresh
            .map(Duration::milliseconds)
            .unwrap_or(timeout / 2);

        let config = TokenSessionConfig::default()
            .with_excluded_paths(self.exclude)
            .with_cache_key_prefix(self.cache_key)
            .with_timeout(timeout)
            .with_max_refresh(max_refresh)
            .with_multi_login(self.multi_login)
            .with_delimiter(self.delimiter);
        config.validate()?;

        Ok((config, key))
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| Error::Config(format!("{ENV_PREFIX}{name}: {err}")))
}
