//! Pulls a bearer token out of an HTTP request.

use http::{Request, header};

use crate::error::{Error, Result};

/// Name of the query parameter consulted when no `Authorization` header is sent.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Choose the token from an `Authorization` header value or a query parameter.
///
/// A non-empty header wins and must have the form `Bearer <token>`.
pub fn extract_token<'a>(
    auth_header: Option<&'a str>,
    query_token: Option<&'a str>,
) -> Result<&'a str> {
    match auth_header.filter(|h| !h.is_empty()) {
        Some(header) => match header.split_once(' ') {
            Some(("Bearer", token)) if !token.is_empty() => Ok(token),
            _ => Err(Error::MalformedAuthHeader),
        },
        None => query_token
            .filter(|t| !t.is_empty())
            .ok_or(Error::EmptyToken),
    }
}

/// Extract the token from a request's `Authorization` header or `token` query parameter.
pub fn token_from_request<B>(req: &Request<B>) -> Result<String> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| Error::MalformedAuthHeader))
        .transpose()?;

    let query_token = req.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == TOKEN_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
    });

    extract_token(auth_header, query_token.as_deref()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header() {
        assert_eq!(
            extract_token(Some("Bearer abc123"), None).expect("token extracted"),
            "abc123"
        );
    }

    #[test]
    fn header_wins_over_query() {
        assert_eq!(
            extract_token(Some("Bearer from-header"), Some("from-query")).expect("token extracted"),
            "from-header"
        );
    }

    #[test]
    fn wrong_scheme_is_malformed() {
        assert!(matches!(
            extract_token(Some("Basic abc"), None),
            Err(Error::MalformedAuthHeader)
        ));
        assert!(matches!(
            extract_token(Some("bearer abc"), None),
            Err(Error::MalformedAuthHeader)
        ));
        assert!(matches!(
            extract_token(Some("Bearer"), Some("xyz")),
            Err(Error::MalformedAuthHeader)
        ));
    }

    #[test]
    fn bearer_without_token_is_malformed() {
        assert!(matches!(
            extract_token(Some("Bearer "), Some("xyz")),
            Err(Error::MalformedAuthHeader)
        ));
    }

    #[test]
    fn query_fallback() {
        assert_eq!(
            extract_token(None, Some("xyz")).expect("token extracted"),
            "xyz"
        );
        assert_eq!(
            extract_token(Some(""), Some("xyz")).expect("token extracted"),
            "xyz"
        );
        assert!(matches!(extract_token(None, Some("")), Err(Error::EmptyToken)));
        assert!(matches!(extract_token(None, None), Err(Error::EmptyToken)));
    }

    #[test]
    fn from_request_header_and_query() {
        let req = Request::builder()
            .uri("/account")
            .header(header::AUTHORIZATION, "Bearer abc123")
            .body(())
            .expect("request builds successfully");
        assert_eq!(token_from_request(&req).expect("token extracted"), "abc123");

        let req = Request::builder()
            .uri("/account?page=2&token=a%2Bb-c")
            .body(())
            .expect("request builds successfully");
        assert_eq!(token_from_request(&req).expect("token extracted"), "a+b-c");

        let req = Request::builder()
            .uri("/account?page=2")
            .body(())
            .expect("request builds successfully");
        assert!(matches!(token_from_request(&req), Err(Error::EmptyToken)));
    }

    #[test]
    fn from_request_rejects_non_utf8_header() {
        let req = Request::builder()
            .uri("/account")
            .header(
                header::AUTHORIZATION,
                http::HeaderValue::from_bytes(b"Bearer \xff").expect("opaque header value"),
            )
            .body(())
            .expect("request builds successfully");
        assert!(matches!(
            token_from_request(&req),
            Err(Error::MalformedAuthHeader)
        ));
    }
}
