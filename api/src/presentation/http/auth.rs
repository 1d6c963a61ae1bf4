use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use subtle::ConstantTimeEq;

use crate::bootstrap::config::Config;

pub struct Bearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .map(|t| Bearer(t.trim().to_string()))
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Admin endpoints accept only the configured token.
pub(crate) fn require_admin(cfg: &Config, bearer: Bearer) -> Result<(), StatusCode> {
    let expected = cfg.admin_token.as_bytes();
    if !expected.is_empty() && bool::from(expected.ct_eq(bearer.0.as_bytes())) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
