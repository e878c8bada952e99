use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::user::Role;
use crate::security::jwt::Claims;
use crate::ApiError;

/// Runs behind `require_auth` and rejects every role but Admin.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    match req.extensions().get::<Claims>() {
        Some(claims) if claims.role == Role::Admin => Ok(next.run(req).await),
        Some(_) => Err(ApiError::Forbidden("Admin access required".into())),
        None => Err(ApiError::Unauthorized("Missing or invalid token".into())),
    }
}
