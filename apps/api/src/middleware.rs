//! Request middleware: bearer authentication and the revocation gate.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tessera_core::{AppError, AuthenticatedUser};

use crate::error::ApiResult;
use crate::state::AppState;

/// Verifies the bearer token, applies the revocation gate, and inserts the
/// caller identity plus the verified claims into request extensions.
///
/// Verification and the gate both answer with the same generic unauthorized
/// error; a revoked token is indistinguishable from an invalid one from the
/// outside.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    let claims = state.token_codec.verify(token)?;

    // Tokens without a jti predate the ledger and skip the gate.
    if let Some(jti) = claims.jti.as_deref()
        && state.revocation_service.is_revoked(jti).await?
    {
        return Err(AppError::Unauthorized("invalid or expired token".to_owned()).into());
    }

    let identity = claims.to_authenticated_user()?;
    request.extensions_mut().insert(identity);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;

    let scheme = header_value.get(..7)?;
    if scheme.eq_ignore_ascii_case("bearer ") {
        let token = header_value[7..].trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}
