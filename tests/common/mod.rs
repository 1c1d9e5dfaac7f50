#![allow(dead_code)]

// Shared helpers for integration tests.
use std::convert::Infallible;

use axum::body::Body;
use http::{Request, Response, header};
use http_body_util::BodyExt as _;
use tower_bearer_sessions::{
    Aes256GcmCipher, Key, MemoryCache, SessionRecord, TokenEngine, TokenSessionConfig,
};

pub type Engine = TokenEngine<MemoryCache, Aes256GcmCipher>;

pub fn make_engine(config: TokenSessionConfig) -> Engine {
    TokenEngine::new(
        config,
        Aes256GcmCipher::new(&Key::generate()),
        MemoryCache::new(),
    )
    .expect("engine builds")
}

pub async fn body_string(body: Body) -> String {
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Echo the authenticated user key, if any.
    let body = req
        .extensions()
        .get::<SessionRecord>()
        .map(|session| session.key.clone())
        .unwrap_or_default();
    Ok(Response::new(Body::from(body)))
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        let (name, value) = bearer(token);
        builder = builder.header(name, value);
    }
    builder
        .body(Body::empty())
        .expect("request builds successfully")
}
