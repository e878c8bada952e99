use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;
use crate::ApiError;

const MISSING_TOKEN: &str = "Missing or invalid token";

/// Bearer-token gate. Verifies signature and expiry, then hands the decoded
/// claims to the handler through request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_from_header(req.headers())
        .ok_or_else(|| ApiError::Unauthorized(MISSING_TOKEN.into()))?;
    let claims = state
        .jwt
        .verify(&token)
        .map_err(|_| ApiError::Unauthorized(MISSING_TOKEN.into()))?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn bearer_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_tokens_are_extracted() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_from_header(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn other_schemes_and_missing_headers_yield_none() {
        assert_eq!(bearer_from_header(&HeaderMap::new()), None);
        assert_eq!(bearer_from_header(&headers_with("Basic dXNlcg==")), None);
        assert_eq!(bearer_from_header(&headers_with("bearer abc")), None);
    }
}
