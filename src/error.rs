//! Error types for token issuance and validation.

use http::StatusCode;

/// Failure reported by a [`TokenCache`](crate::TokenCache) backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing store could not be reached or rejected the command.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A session record could not be serialized for storage.
    #[error("cache encode error: {0}")]
    Encode(String),

    /// A stored value could not be deserialized into a session record.
    #[error("cache decode error: {0}")]
    Decode(String),
}

/// Failure reported by a [`TokenCipher`](crate::TokenCipher) or by key parsing.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),
}

/// Error type for token session operations.
///
/// Every variant is scoped to a single request; none of them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The `Authorization` header is present but is not `Bearer <token>`.
    #[error("malformed authorization header")]
    MalformedAuthHeader,

    /// No token was supplied.
    #[error("token is empty")]
    EmptyToken,

    /// The token could not be decoded, decrypted or split.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The cache holds no session for the token's user key.
    #[error("not logged in or session timed out")]
    SessionNotFound,

    /// The token belongs to a session that has since been replaced.
    #[error("token does not match the active session")]
    SessionMismatch,

    #[error("token encryption failed: {0}")]
    Encryption(#[source] CryptoError),

    #[error("session cache read failed: {0}")]
    CacheRead(#[source] CacheError),

    #[error("session cache write failed: {0}")]
    CacheWrite(#[source] CacheError),

    #[error("invalid user key: {0}")]
    InvalidUserKey(String),

    /// A caller supplied session id that cannot be sealed into a token.
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    /// The session payload could not be converted to or from JSON.
    #[error("session payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status a middleware should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MalformedAuthHeader | Error::InvalidUserKey(_) | Error::InvalidSessionId(_) => {
                StatusCode::BAD_REQUEST
            }

            Error::EmptyToken
            | Error::MalformedToken(_)
            | Error::SessionNotFound
            | Error::SessionMismatch => StatusCode::UNAUTHORIZED,

            Error::Encryption(_)
            | Error::CacheRead(_)
            | Error::CacheWrite(_)
            | Error::Payload(_)
            | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MalformedAuthHeader => "MALFORMED_AUTH_HEADER",
            Error::EmptyToken => "EMPTY_TOKEN",
            Error::MalformedToken(_) => "MALFORMED_TOKEN",
            Error::SessionNotFound => "SESSION_NOT_FOUND",
            Error::SessionMismatch => "SESSION_MISMATCH",
            Error::Encryption(_) => "ENCRYPTION_ERROR",
            Error::CacheRead(_) => "CACHE_READ_ERROR",
            Error::CacheWrite(_) => "CACHE_WRITE_ERROR",
            Error::InvalidUserKey(_) => "INVALID_USER_KEY",
            Error::InvalidSessionId(_) => "INVALID_SESSION_ID",
            Error::Payload(_) => "PAYLOAD_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether the failure is the client's fault rather than the server's.
    pub fn is_rejection(&self) -> bool {
        self.status_code().is_client_error()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_map_to_unauthorized() {
        for err in [
            Error::EmptyToken,
            Error::MalformedToken("bad base64".into()),
            Error::SessionNotFound,
            Error::SessionMismatch,
        ] {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
            assert!(err.is_rejection());
        }
    }

    #[test]
    fn malformed_header_is_bad_request() {
        assert_eq!(
            Error::MalformedAuthHeader.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::MalformedAuthHeader.code(), "MALFORMED_AUTH_HEADER");

        let err = Error::InvalidSessionId("session id is empty".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_SESSION_ID");
    }

    #[test]
    fn store_failures_are_server_errors() {
        let err = Error::CacheRead(CacheError::Backend("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_rejection());
        assert_eq!(
            err.to_string(),
            "session cache read failed: cache backend error: connection refused"
        );
    }
}
