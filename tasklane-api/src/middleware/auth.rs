/// Authentication middleware
///
/// [`jwt_auth_layer`] validates the `Authorization: Bearer <token>` header
/// and inserts an [`AuthContext`] into the request extensions.
/// [`require_admin_layer`] runs after it on admin routes and rejects
/// non-admin principals.
///
/// Every authentication failure (missing header, other scheme, bad
/// signature, expired token) is a 401. A valid non-admin token on an admin
/// route is a 403.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tasklane_shared::auth::{authorization, context::AuthContext, jwt};

use crate::{app::AppState, error::ApiError};

fn bearer_token(request: &Request) -> Result<&str, ApiError> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::Unauthorized("Expected Bearer token".to_string()));
    }

    Ok(token.trim())
}

/// JWT authentication middleware layer
pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = jwt::validate_token(bearer_token(&req)?, state.jwt_secret()).map_err(|err| {
        tracing::debug!(error = %err, "Rejected bearer token");
        ApiError::from(err)
    })?;
    let auth_context = AuthContext::from_claims(&claims)?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Admin gate; must run inside [`jwt_auth_layer`]
pub async fn require_admin_layer(req: Request, next: Next) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    if let Err(err) = authorization::require_admin(auth) {
        tracing::warn!(user_id = auth.user_id, username = %auth.username, "Admin route denied");
        return Err(err.into());
    }

    Ok(next.run(req).await)
}
