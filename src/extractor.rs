//! Axum extractor for sessions authenticated by [`TokenAuthLayer`](crate::TokenAuthLayer).

use std::ops::Deref;

use axum_core::extract::FromRequestParts;
use http::{StatusCode, request::Parts};
use serde::de::DeserializeOwned;

use crate::record::SessionRecord;

/// The session of an authenticated request, with its payload as `T`.
///
/// Rejects with `401 Unauthorized` when the request did not pass through the
/// layer (or hit an excluded path), and with `500` when the payload is not a `T`.
#[derive(Debug, Clone)]
pub struct Authenticated<T = serde_json::Value>(pub SessionRecord<T>);

impl<T> Authenticated<T> {
    pub fn into_inner(self) -> SessionRecord<T> {
        self.0
    }
}

impl<T> Deref for Authenticated<T> {
    type Target = SessionRecord<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for Authenticated<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<SessionRecord>()
            .cloned()
            .ok_or((StatusCode::UNAUTHORIZED, "not logged in"))?;

        session.into_typed().map(Authenticated).map_err(|err| {
            tracing::error!(err = %err, "session payload has an unexpected shape");
            (StatusCode::INTERNAL_SERVER_ERROR, "invalid session payload")
        })
    }
}
