//! Symmetric encryption for tokens and random session identifiers.

use std::fmt::{self, Debug};

use base64::{Engine as _, engine::general_purpose};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Size of the symmetric key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the AEAD nonce prepended to every ciphertext.
pub const NONCE_SIZE: usize = 12;

/// Length of the hex string returned by [`new_session_id`].
pub const SESSION_ID_LEN: usize = 64;

/// A 256-bit symmetric key used to encrypt tokens.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    /// Generate a random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Build a key from exactly 32 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    /// Parse key material from configuration.
    ///
    /// Accepts 64 hex characters, standard or URL-safe base64 of 32 bytes, or a
    /// 32 byte string used as-is.
    pub fn parse(raw: &str) -> Result<Self, CryptoError> {
        let trimmed = raw.trim();

        if trimmed.len() == KEY_SIZE * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            let bytes = hex::decode(trimmed)
                .map_err(|err| CryptoError::InvalidKeyFormat(err.to_string()))?;
            return Self::from_bytes(&bytes);
        }

        for engine in [general_purpose::URL_SAFE_NO_PAD, general_purpose::STANDARD] {
            if let Ok(bytes) = engine.decode(trimmed)
                && bytes.len() == KEY_SIZE
            {
                return Self::from_bytes(&bytes);
            }
        }

        if trimmed.len() == KEY_SIZE {
            return Self::from_bytes(trimmed.as_bytes());
        }

        Err(CryptoError::InvalidKeyFormat(format!(
            "expected 64 hex chars, base64 of {KEY_SIZE} bytes, or {KEY_SIZE} raw bytes"
        )))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}

/// Symmetric cipher used to seal token plaintexts.
///
/// Implementations must be authenticated: a tampered ciphertext has to fail
/// [`decrypt`](TokenCipher::decrypt) rather than yield garbage.
pub trait TokenCipher: Debug + Clone + Send + Sync + 'static {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

#[cfg(any(feature = "aes-gcm", feature = "chacha20poly1305"))]
fn random_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

#[cfg(any(feature = "aes-gcm", feature = "chacha20poly1305"))]
fn seal(nonce: [u8; NONCE_SIZE], ciphertext: Vec<u8>) -> Vec<u8> {
    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&ciphertext);
    payload
}

#[cfg(any(feature = "aes-gcm", feature = "chacha20poly1305"))]
fn split_sealed(payload: &[u8]) -> Result<(&[u8], &[u8]), CryptoError> {
    if payload.len() <= NONCE_SIZE {
        return Err(CryptoError::Decrypt(format!(
            "ciphertext too short ({} bytes)",
            payload.len()
        )));
    }
    Ok(payload.split_at(NONCE_SIZE))
}

/// AES-256-GCM with a random 96-bit nonce per token.
#[cfg(feature = "aes-gcm")]
#[derive(Clone)]
pub struct Aes256GcmCipher {
    cipher: aes_gcm::Aes256Gcm,
}

#[cfg(feature = "aes-gcm")]
impl Aes256GcmCipher {
    pub fn new(key: &Key) -> Self {
        use aes_gcm::KeyInit as _;

        Self {
            cipher: aes_gcm::Aes256Gcm::new(aes_gcm::Key::<aes_gcm::Aes256Gcm>::from_slice(
                key.as_bytes(),
            )),
        }
    }
}

#[cfg(feature = "aes-gcm")]
impl Debug for Aes256GcmCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256GcmCipher")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

#[cfg(feature = "aes-gcm")]
impl TokenCipher for Aes256GcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use aes_gcm::aead::Aead as _;

        let nonce = random_nonce();
        let ciphertext = self
            .cipher
            .encrypt(aes_gcm::Nonce::from_slice(&nonce), plaintext)
            .map_err(|err| CryptoError::Encrypt(err.to_string()))?;
        Ok(seal(nonce, ciphertext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use aes_gcm::aead::Aead as _;

        let (nonce, ciphertext) = split_sealed(ciphertext)?;
        self.cipher
            .decrypt(aes_gcm::Nonce::from_slice(nonce), ciphertext)
            .map_err(|err| CryptoError::Decrypt(err.to_string()))
    }
}

/// ChaCha20-Poly1305 with a random 96-bit nonce per token.
#[cfg(feature = "chacha20poly1305")]
#[derive(Clone)]
pub struct ChaCha20Poly1305Cipher {
    cipher: chacha20poly1305::ChaCha20Poly1305,
}

#[cfg(feature = "chacha20poly1305")]
impl ChaCha20Poly1305Cipher {
    pub fn new(key: &Key) -> Self {
        use chacha20poly1305::KeyInit as _;

        Self {
            cipher: chacha20poly1305::ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(
                key.as_bytes(),
            )),
        }
    }
}

#[cfg(feature = "chacha20poly1305")]
impl Debug for ChaCha20Poly1305Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaCha20Poly1305Cipher")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

#[cfg(feature = "chacha20poly1305")]
impl TokenCipher for ChaCha20Poly1305Cipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use chacha20poly1305::aead::Aead as _;

        let nonce = random_nonce();
        let ciphertext = self
            .cipher
            .encrypt(chacha20poly1305::Nonce::from_slice(&nonce), plaintext)
            .map_err(|err| CryptoError::Encrypt(err.to_string()))?;
        Ok(seal(nonce, ciphertext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use chacha20poly1305::aead::Aead as _;

        let (nonce, ciphertext) = split_sealed(ciphertext)?;
        self.cipher
            .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
            .map_err(|err| CryptoError::Decrypt(err.to_string()))
    }
}

/// Create a fresh session identifier: the hex SHA-256 digest of 32 random bytes.
pub fn new_session_id() -> String {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    hex::encode(Sha256::digest(seed))
}
