#![cfg(feature = "chacha20poly1305")]

// The engine with ChaCha20-Poly1305 tokens instead of the default cipher.
use serde_json::{Value, json};
use tower_bearer_sessions::{
    ChaCha20Poly1305Cipher, Error, Key, MemoryCache, TokenEngine, TokenSessionConfig,
};

fn engine(key: &Key) -> TokenEngine<MemoryCache, ChaCha20Poly1305Cipher> {
    TokenEngine::new(
        TokenSessionConfig::default(),
        ChaCha20Poly1305Cipher::new(key),
        MemoryCache::new(),
    )
    .expect("engine builds")
}

#[tokio::test]
async fn chacha_tokens_round_trip() {
    let engine = engine(&Key::generate());
    let token = engine
        .generate("alice", &json!({"plan": "pro"}))
        .await
        .expect("generate succeeds");

    let session = engine
        .validate_token::<Value>(&token)
        .await
        .expect("token validates");
    assert_eq!(session.data["plan"], "pro");
}

#[tokio::test]
async fn tampered_token_is_malformed() {
    let engine = engine(&Key::generate());
    let token = engine
        .generate("alice", &json!(null))
        .await
        .expect("generate succeeds");

    let mut bytes = token.into_bytes();
    let last = bytes.len() - 1;
    bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).expect("token is ascii");

    assert!(matches!(
        engine.validate_token::<Value>(&tampered).await,
        Err(Error::MalformedToken(_))
    ));
}
