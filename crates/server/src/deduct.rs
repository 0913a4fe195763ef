use api_types::deduct::{DeductRequest, DeductResponse};
use axum::{Json, extract::State};
use engine::MoneyCents;

use crate::{ServerError, receipts::view, server::ServerState};

pub async fn deduct(
    State(state): State<ServerState>,
    Json(payload): Json<DeductRequest>,
) -> Result<Json<DeductResponse>, ServerError> {
    let selection = state
        .engine
        .deduct(payload.user_id.as_deref(), MoneyCents::new(payload.amount_minor))
        .await?;

    Ok(Json(DeductResponse {
        receipts: selection.receipts.iter().map(view).collect(),
        total_minor: selection.total.cents(),
        target_minor: selection.target.cents(),
        remainder_minor: selection.remainder().cents(),
    }))
}
