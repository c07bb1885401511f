use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use skyledger_core::{BookingError, Role};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

/// The caller's role for this request; `None` when no token was presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal(pub Option<Role>);

// ============================================================================
// Principal Middleware
// ============================================================================

/// Resolves the bearer token, if any, into a [`Principal`] extension. A missing header
/// means an anonymous caller; a header that does not hold a valid token is rejected.
/// Whether the role may do anything is decided later by the services.
pub async fn principal_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let role = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => {
            let token = value
                .to_str()
                .ok()
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or_else(|| {
                    BookingError::Unauthenticated("expected a Bearer token".to_string())
                })?;

            let token_data = decode::<Claims>(
                token,
                &DecodingKey::from_secret(state.auth.secret.as_bytes()),
                &Validation::default(),
            )
            .map_err(|e| {
                tracing::debug!("Rejected token: {}", e);
                BookingError::Unauthenticated("invalid or expired token".to_string())
            })?;

            Some(token_data.claims.role)
        }
    };

    req.extensions_mut().insert(Principal(role));
    Ok(next.run(req).await)
}
