use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use http::{HeaderValue, Request, Response, StatusCode, header};
use tower_layer::Layer;
use tower_service::Service;

use crate::{
    cache::TokenCache, crypto::TokenCipher, engine::TokenEngine, error::Error, extract,
    record::SessionRecord,
};

/// Layer that requires a valid bearer token on every protected path.
///
/// Authenticated requests carry their [`SessionRecord`] in the request extensions.
#[derive(Debug)]
pub struct TokenAuthLayer<C, K> {
    engine: TokenEngine<C, K>,
}

impl<C, K> Clone for TokenAuthLayer<C, K> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<C: TokenCache, K: TokenCipher> TokenAuthLayer<C, K> {
    #[must_use]
    pub fn new(engine: TokenEngine<C, K>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TokenEngine<C, K> {
        &self.engine
    }
}

#[derive(Debug)]
pub struct TokenAuth<S, C, K> {
    inner: S,
    engine: TokenEngine<C, K>,
}

impl<S: Clone, C, K> Clone for TokenAuth<S, C, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<S, C, K> Layer<S> for TokenAuthLayer<C, K> {
    type Service = TokenAuth<S, C, K>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenAuth {
            inner,
            engine: self.engine.clone(),
        }
    }
}

fn reject<ResBody: Default>(err: &Error) -> Response<ResBody> {
    let mut res = Response::default();
    *res.status_mut() = err.status_code();
    if res.status() == StatusCode::UNAUTHORIZED {
        res.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
}

impl<ReqBody, ResBody, S, C, K> Service<Request<ReqBody>> for TokenAuth<S, C, K>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send,
    C: TokenCache,
    K: TokenCipher,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let engine = self.engine.clone();

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if !engine.is_protected(req.uri().path()) {
                return inner.call(req).await;
            }

            let session = match extract::token_from_request(&req) {
                Ok(token) => engine.validate_token::<serde_json::Value>(&token).await,
                Err(err) => Err(err),
            };

            let session: SessionRecord = match session {
                Ok(session) => session,
                Err(err) if err.is_rejection() => {
                    tracing::warn!(
                        err = %err,
                        path = %req.uri().path(),
                        "request authentication rejected"
                    );
                    return Ok(reject(&err));
                }
                Err(err) => {
                    tracing::error!(err = %err, "request authentication failed");
                    return Ok(reject(&err));
                }
            };

            req.extensions_mut().insert(session);
            inner.call(req).await
        })
    }
}
