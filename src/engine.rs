//! Token issuance, validation and sliding refresh.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, trace};

use crate::{
    cache::TokenCache,
    config::TokenSessionConfig,
    crypto::{self, TokenCipher},
    error::{CacheError, Error, Result},
    extract,
    format::{self, DecryptedToken},
    path::PathMatcher,
    record::{self, SessionRecord},
};

/// A freshly minted token together with the identity sealed inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub user_key: String,
    pub session_id: String,
    pub token: String,
}

struct Inner<C, K> {
    config: TokenSessionConfig,
    paths: PathMatcher,
    cipher: K,
    cache: C,
}

/// Issues and validates encrypted session tokens.
///
/// The engine holds no mutable state of its own; every session lives in the
/// cache, so clones can be shared freely across request handlers.
pub struct TokenEngine<C, K> {
    inner: Arc<Inner<C, K>>,
}

impl<C, K> Clone for TokenEngine<C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, K> std::fmt::Debug for TokenEngine<C, K>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEngine")
            .field("config", &self.inner.config)
            .field("cipher", &self.inner.cipher)
            .finish_non_exhaustive()
    }
}

impl<C: TokenCache, K: TokenCipher> TokenEngine<C, K> {
    /// Build an engine, rejecting configurations it cannot honour.
    pub fn new(config: TokenSessionConfig, cipher: K, cache: C) -> Result<Self> {
        config.validate()?;
        let paths = PathMatcher::new(config.excluded_paths());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                paths,
                cipher,
                cache,
            }),
        })
    }

    pub fn config(&self) -> &TokenSessionConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &C {
        &self.inner.cache
    }

    /// Whether `path` needs a token at all.
    pub fn is_protected(&self, path: &str) -> bool {
        self.inner.paths.is_protected(path)
    }

    /// Log `user_key` in and return a token for the session.
    ///
    /// With multi-login enabled, a live session for the same user is reused: the
    /// returned token is new but points at the existing session, and `payload` is
    /// not written. Otherwise a new session replaces any previous one, which
    /// invalidates every token issued for it.
    pub async fn generate<T>(&self, user_key: &str, payload: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        if user_key.is_empty() {
            return Err(Error::InvalidUserKey("user key is empty".into()));
        }

        if self.inner.config.multi_login {
            match self.load_session(user_key).await {
                Ok(existing) => {
                    let issued = self.encrypt_token(user_key, Some(&existing.session_id))?;
                    debug!(user_key = %user_key, "reusing live session for multi-login");
                    return Ok(issued.token);
                }
                Err(Error::SessionNotFound) => {}
                Err(Error::CacheRead(CacheError::Decode(err))) => {
                    debug!(user_key = %user_key, err = %err, "replacing undecodable session");
                }
                Err(err) => return Err(err),
            }
        }

        let data = serde_json::to_value(payload)?;
        let issued = self.encrypt_token(user_key, None)?;
        let record = SessionRecord::new(
            user_key,
            issued.session_id,
            data,
            record::now_millis(),
            self.inner.config.max_refresh,
        );
        self.store(&record).await?;

        debug!(user_key = %user_key, refresh_at = record.refresh_at, "session created");
        Ok(issued.token)
    }

    /// Seal `user_key` and a session id into a token.
    ///
    /// A fresh session id is generated when `session_id` is `None`. A supplied id
    /// must be non-empty and free of the delimiter. Nothing is written to the cache.
    pub fn encrypt_token(&self, user_key: &str, session_id: Option<&str>) -> Result<IssuedToken> {
        if user_key.is_empty() {
            return Err(Error::InvalidUserKey("user key is empty".into()));
        }

        let delimiter = self.inner.config.delimiter;
        let session_id = match session_id {
            Some("") => return Err(Error::InvalidSessionId("session id is empty".into())),
            Some(id) if id.contains(delimiter) => {
                return Err(Error::InvalidSessionId(format!(
                    "session id contains the delimiter {delimiter:?}"
                )));
            }
            Some(id) => id.to_string(),
            None => crypto::new_session_id(),
        };
        let token = format::encode_token(&self.inner.cipher, delimiter, user_key, &session_id)?;

        Ok(IssuedToken {
            user_key: user_key.to_string(),
            session_id,
            token,
        })
    }

    /// Open a token without touching the cache.
    pub fn decrypt_token(&self, token: &str) -> Result<DecryptedToken> {
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }
        format::decode_token(&self.inner.cipher, self.inner.config.delimiter, token)
    }

    /// Validate a token and return its session.
    ///
    /// This may write to the cache: an access past the record's refresh deadline
    /// re-stamps the record.
    pub async fn validate_token<T>(&self, token: &str) -> Result<SessionRecord<T>>
    where
        T: DeserializeOwned,
    {
        let decrypted = self.decrypt_token(token)?;
        let record = self.load_session(&decrypted.user_key).await?;

        if record.session_id != decrypted.session_id {
            debug!(user_key = %decrypted.user_key, "token belongs to a superseded session");
            return Err(Error::SessionMismatch);
        }

        Ok(record.into_typed()?)
    }

    /// Extract a token from request parts and validate it.
    pub async fn authenticate<T: DeserializeOwned>(
        &self,
        auth_header: Option<&str>,
        query_token: Option<&str>,
    ) -> Result<SessionRecord<T>> {
        let token = extract::extract_token(auth_header, query_token)?;
        self.validate_token(token).await
    }

    /// Fetch the record for `user_key`, applying the sliding refresh.
    async fn load_session(&self, user_key: &str) -> Result<SessionRecord> {
        let cache_key = self.inner.config.cache_key(user_key);
        let value = self
            .inner
            .cache
            .get(&cache_key)
            .await
            .map_err(Error::CacheRead)?
            .ok_or(Error::SessionNotFound)?;
        let mut record: SessionRecord = format::decode_record(&value).map_err(Error::CacheRead)?;

        let now = record::now_millis();
        if record.needs_refresh(now) {
            record.restamp(now, self.inner.config.max_refresh);
            self.store(&record).await?;
            debug!(user_key = %user_key, refresh_at = record.refresh_at, "session refreshed");
        } else {
            trace!(
                user_key = %user_key,
                refresh_at = record.refresh_at,
                "session within refresh window"
            );
        }

        Ok(record)
    }

    async fn store(&self, record: &SessionRecord) -> Result<()> {
        let value = format::encode_record(record).map_err(Error::CacheWrite)?;
        self.inner
            .cache
            .set_with_expiry(
                &self.inner.config.cache_key(&record.key),
                value,
                self.inner.config.store_ttl(),
            )
            .await
            .map_err(Error::CacheWrite)
    }
}
