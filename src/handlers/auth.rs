use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::app::state::AppState;
use crate::error::PaymentError;
use crate::models::principal::Principal;

/// Caller identity if a known bearer token was presented.
pub struct MaybePrincipal(pub Option<Principal>);

/// Like [`MaybePrincipal`] but rejects anonymous requests with 401.
pub struct AuthenticatedPrincipal(pub Principal);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = PaymentError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(
            bearer_token(parts).and_then(|token| state.sessions.resolve(token)),
        ))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedPrincipal {
    type Rejection = PaymentError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybePrincipal(principal) = MaybePrincipal::from_request_parts(parts, state).await?;
        principal
            .map(AuthenticatedPrincipal)
            .ok_or(PaymentError::Unauthenticated)
    }
}
