use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::app::state::AppState;
use crate::error::PaymentError;
use crate::handlers::auth::{AuthenticatedPrincipal, MaybePrincipal};
use crate::models::callback::CallbackAck;
use crate::models::payment::{PaymentAttempt, PushPaymentRequest, PushPaymentResponse};

pub async fn push_payment(
    State(state): State<AppState>,
    MaybePrincipal(principal): MaybePrincipal,
    body: Bytes,
) -> Result<Json<PushPaymentResponse>, PaymentError> {
    let principal = principal.ok_or(PaymentError::Unauthenticated)?;

    let request: PushPaymentRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("Invalid payment request: {}", e);
        PaymentError::InvalidField {
            field: "body",
            reason: e.to_string(),
        }
    })?;

    let initiated = state.payments.initiate_push(Some(&principal), request).await?;
    info!(attempt_id = %initiated.attempt.id, "STK push accepted");

    Ok(Json(PushPaymentResponse {
        success: true,
        checkout_accepted: true,
        message: initiated.message,
        payment_id: initiated.attempt.id,
        provider_data: initiated.provider_data,
    }))
}

/// Gateway-facing endpoint: unauthenticated, and always answered with 200.
pub async fn payment_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<CallbackAck>) {
    let disposition = state.payments.handle_callback(&body).await;
    (StatusCode::OK, Json(disposition.ack()))
}

pub async fn get_payment(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentAttempt>, PaymentError> {
    let attempt = state.payments.get_attempt(&principal, id).await?;
    Ok(Json(attempt))
}
