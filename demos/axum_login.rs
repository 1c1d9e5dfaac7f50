use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::Duration;
use tower_bearer_sessions::{
    Aes256GcmCipher, Authenticated, Key, MemoryCache, TokenAuthLayer, TokenEngine,
    TokenSessionConfig,
};
use tracing_subscriber::EnvFilter;

type Engine = TokenEngine<MemoryCache, Aes256GcmCipher>;

#[derive(Debug, Deserialize)]
struct Login {
    user: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Profile {
    user: String,
    logged_in_at: i64,
}

async fn login(
    State(engine): State<Engine>,
    Json(login): Json<Login>,
) -> Result<String, StatusCode> {
    let profile = Profile {
        user: login.user.clone(),
        logged_in_at: time::OffsetDateTime::now_utc().unix_timestamp(),
    };
    engine
        .generate(&login.user, &profile)
        .await
        .map_err(|err| err.status_code())
}

async fn me(Authenticated(session): Authenticated<Profile>) -> String {
    format!(
        "user={} since={} refresh_at={}",
        session.data.user, session.data.logged_in_at, session.refresh_at
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tower_bearer_sessions=debug,info")),
        )
        .init();

    let config = TokenSessionConfig::default()
        // Default: ["/login"]
        .with_excluded_paths(["/login", "/health"])
        // Default: "token:"
        .with_cache_key_prefix("demo:")
        // Default: 10 days
        .with_timeout(Duration::hours(2))
        // Default: half the timeout
        .with_max_refresh(Duration::minutes(30))
        // Default: false
        .with_multi_login(true);
    let engine = TokenEngine::new(
        config,
        Aes256GcmCipher::new(&Key::generate()),
        MemoryCache::new(),
    )
    .expect("engine config is valid");

    let app = Router::new()
        .route("/login", post(login))
        .route("/health", get(|| async { "ok" }))
        .route("/me", get(me))
        .layer(TokenAuthLayer::new(engine.clone()))
        .with_state(engine);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("tcp listener binds successfully");
    let local_addr = listener.local_addr().expect("local address is available");
    println!("listening at http://{local_addr}");

    axum::serve(listener, app)
        .await
        .expect("server runs successfully");
}
