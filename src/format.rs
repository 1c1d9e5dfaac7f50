//! Helpers for the token wire format and the cache value format.
//!
//! This is primarily useful for testing and debugging.
//!
//! A token is `base64url(nonce || ciphertext)` where the plaintext is
//! `user_key + delimiter + session_id`. A cache value is the JSON encoding of a
//! [`SessionRecord`].

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    crypto::TokenCipher,
    error::{CacheError, Error, Result},
    record::SessionRecord,
};

/// The identity sealed inside a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedToken {
    pub user_key: String,
    pub session_id: String,
}

/// Seal `user_key` and `session_id` into a transport-safe token.
pub fn encode_token<K: TokenCipher>(
    cipher: &K,
    delimiter: char,
    user_key: &str,
    session_id: &str,
) -> Result<String> {
    let plaintext = format!("{user_key}{delimiter}{session_id}");
    let sealed = cipher.encrypt(plaintext.as_bytes()).map_err(Error::Encryption)?;
    Ok(URL_SAFE_NO_PAD.encode(sealed))
}

/// Open a token produced by [`encode_token`].
///
/// The plaintext is split at the last delimiter: session ids are hex, so a
/// delimiter inside the user key is harmless.
pub fn decode_token<K: TokenCipher>(
    cipher: &K,
    delimiter: char,
    token: &str,
) -> Result<DecryptedToken> {
    let sealed = URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .map_err(|err| Error::MalformedToken(err.to_string()))?;
    let plaintext = cipher
        .decrypt(&sealed)
        .map_err(|err| Error::MalformedToken(err.to_string()))?;
    let plaintext =
        String::from_utf8(plaintext).map_err(|err| Error::MalformedToken(err.to_string()))?;

    match plaintext.rsplit_once(delimiter) {
        Some((user_key, session_id)) if !user_key.is_empty() && !session_id.is_empty() => {
            Ok(DecryptedToken {
                user_key: user_key.to_string(),
                session_id: session_id.to_string(),
            })
        }
        _ => Err(Error::MalformedToken("token has fewer than two parts".into())),
    }
}

/// Encode a session record into the cache value.
pub fn encode_record<T: Serialize>(
    record: &SessionRecord<T>,
) -> std::result::Result<Vec<u8>, CacheError> {
    serde_json::to_vec(record).map_err(|err| CacheError::Encode(err.to_string()))
}

/// Decode a cache value into a session record.
pub fn decode_record<T: DeserializeOwned>(
    value: &[u8],
) -> std::result::Result<SessionRecord<T>, CacheError> {
    serde_json::from_slice(value).map_err(|err| CacheError::Decode(err.to_string()))
}

#[cfg(all(test, feature = "aes-gcm"))]
mod tests {
    use serde_json::json;
    use time::Duration;

    use super::*;
    use crate::crypto::{Aes256GcmCipher, Key};

    fn cipher() -> Aes256GcmCipher {
        Aes256GcmCipher::new(&Key::generate())
    }

    #[test]
    fn token_roundtrip() {
        let cipher = cipher();
        let token = encode_token(&cipher, '_', "alice", "0f0f").expect("token encodes");

        assert!(!token.contains('='));
        assert_eq!(
            decode_token(&cipher, '_', &token).expect("token decodes"),
            DecryptedToken {
                user_key: "alice".into(),
                session_id: "0f0f".into(),
            }
        );
    }

    #[test]
    fn same_identity_yields_distinct_tokens() {
        let cipher = cipher();
        let a = encode_token(&cipher, '_', "alice", "0f0f").expect("token encodes");
        let b = encode_token(&cipher, '_', "alice", "0f0f").expect("token encodes");
        assert_ne!(a, b);
    }

    #[test]
    fn user_key_may_contain_delimiter() {
        let cipher = cipher();
        let token = encode_token(&cipher, '_', "tenant_alice", "beef").expect("token encodes");
        let decoded = decode_token(&cipher, '_', &token).expect("token decodes");

        assert_eq!(decoded.user_key, "tenant_alice");
        assert_eq!(decoded.session_id, "beef");
    }

    #[test]
    fn rejects_garbage_and_missing_delimiter() {
        let cipher = cipher();
        assert!(matches!(
            decode_token(&cipher, '_', "not a token!"),
            Err(Error::MalformedToken(_))
        ));

        let sealed = URL_SAFE_NO_PAD.encode(cipher.encrypt(b"nodelimiter").expect("encrypts"));
        assert!(matches!(
            decode_token(&cipher, '_', &sealed),
            Err(Error::MalformedToken(_))
        ));

        let sealed = URL_SAFE_NO_PAD.encode(cipher.encrypt(b"alice_").expect("encrypts"));
        assert!(matches!(
            decode_token(&cipher, '_', &sealed),
            Err(Error::MalformedToken(_))
        ));
    }

    #[test]
    fn record_codec() {
        let record = SessionRecord::new("alice", "beef", json!({"n": 1}), 5, Duration::seconds(1));
        let bytes = encode_record(&record).expect("record encodes");
        let decoded: SessionRecord = decode_record(&bytes).expect("record decodes");
        assert_eq!(decoded, record);

        assert!(matches!(
            decode_record::<serde_json::Value>(b"{not json"),
            Err(CacheError::Decode(_))
        ));
    }
}
