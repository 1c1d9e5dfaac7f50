//! Encrypted bearer-token sessions with sliding expiration.
//!
//! [`TokenEngine::generate`] mints an opaque token for a user key and stores the
//! session record in a [`TokenCache`]. [`TokenEngine::validate_token`] opens the
//! token, loads the record, moves its refresh deadline forward when it has passed,
//! and rejects tokens whose session has been replaced by a later login.
//!
//! [`TokenAuthLayer`] applies the same checks to every request on a protected path
//! and inserts the [`SessionRecord`] into the request extensions.
//!
//! # Security
//! Tokens are sealed with an authenticated cipher (`aes-gcm` feature, enabled by
//! default, or `chacha20poly1305`). The [`Key`] never leaves the process: it is not
//! part of tokens, records, or `Debug` output. Logging out is not supported; a
//! session ends when the store expires it or when the user logs in again.

mod cache;
mod config;
mod crypto;
mod engine;
mod error;
#[cfg(feature = "axum-core")]
mod extractor;
pub mod extract;
pub mod format;
pub mod layer;
mod path;
mod record;

pub use crate::cache::{DEFAULT_MAX_ENTRIES, MemoryCache, TokenCache};
pub use crate::config::{
    DEFAULT_CACHE_KEY_PREFIX, DEFAULT_DELIMITER, DEFAULT_TIMEOUT, TokenSessionConfig,
    TokenSettings,
};
pub use crate::crypto::{Key, SESSION_ID_LEN, TokenCipher, new_session_id};
pub use crate::engine::{IssuedToken, TokenEngine};
pub use crate::error::{CacheError, CryptoError, Error, Result};
pub use crate::extract::{extract_token, token_from_request};
pub use crate::format::DecryptedToken;
pub use crate::layer::TokenAuthLayer;
pub use crate::path::PathMatcher;
pub use crate::record::SessionRecord;

#[cfg(feature = "redis")]
pub use crate::cache::RedisCache;

#[cfg(feature = "aes-gcm")]
pub use crate::crypto::Aes256GcmCipher;

#[cfg(feature = "chacha20poly1305")]
pub use crate::crypto::ChaCha20Poly1305Cipher;

#[cfg(feature = "axum-core")]
pub use crate::extractor::Authenticated;
