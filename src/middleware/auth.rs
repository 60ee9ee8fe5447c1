use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// JWT authentication middleware that validates tokens and attaches the claims
///
/// A missing credential is rejected with 401, an unusable one with 403.
/// On success the decoded [`Claims`](crate::auth::Claims) are inserted into
/// the request extensions.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers)?;

    let claims = state.jwt.validate(token).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        ApiError::forbidden("Invalid or expired token")
    })?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Extract the token from the Authorization header.
///
/// Both `Bearer <token>` and a bare token are accepted.
fn extract_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::forbidden("Invalid Authorization header format"))?
        .trim();

    let token = match auth_str.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if auth_str.eq_ignore_ascii_case("bearer") => "",
        _ => auth_str,
    };

    if token.is_empty() {
        return Err(ApiError::unauthorized("Missing bearer token"));
    }
    Ok(token)
}
