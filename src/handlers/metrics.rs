use axum::{extract::State, response::Json};

use crate::app::state::AppState;
use crate::error::PaymentError;
use crate::handlers::auth::AuthenticatedPrincipal;

pub async fn get_metrics(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Json<serde_json::Value>, PaymentError> {
    let snapshot = state.payments.get_metrics(&principal)?;

    let callbacks_seen = snapshot.callbacks_received.max(1);
    Ok(Json(serde_json::json!({
        "pushes": {
            "requested": snapshot.pushes_requested,
            "accepted": snapshot.pushes_accepted,
            "rejected": snapshot.pushes_rejected,
        },
        "callbacks": {
            "received": snapshot.callbacks_received,
            "applied": snapshot.callbacks_applied,
            "duplicate": snapshot.callbacks_duplicate,
            "unmatched": snapshot.callbacks_unmatched,
            "malformed": snapshot.callbacks_malformed,
            "duplicate_rate": snapshot.callbacks_duplicate as f64 / callbacks_seen as f64,
        },
        "persistence_failures": snapshot.persistence_failures,
    })))
}
