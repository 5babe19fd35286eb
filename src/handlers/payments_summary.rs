use axum::{extract::State, response::Json};
use tracing::info;

use crate::app::state::AppState;
use crate::error::PaymentError;
use crate::handlers::auth::AuthenticatedPrincipal;
use crate::services::SummaryResult;

pub async fn get_summary(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<SummaryResult>, PaymentError> {
    info!(user_id = %principal.id, "Getting payments summary");
    let summary = state.payments.get_summary(&principal).await?;
    Ok(Json(summary))
}
