//! Settlement planning and recording endpoints

use api_types::settlement::{SettlementNew, SettlementPlanResponse, SettlementsGet, TransferView};
use api_types::transaction::TransactionCreated;
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;
use engine::{Money, SettlementCmd};

use crate::{ServerError, server::ServerState, user};

/// Handle requests for the transfers that would settle a group today.
pub async fn get_suggested(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SettlementsGet>,
) -> Result<Json<SettlementPlanResponse>, ServerError> {
    let plan = state
        .engine
        .suggested_settlements(&payload.group_id, &user.username)
        .await?;

    let transfers = plan
        .transfers
        .into_iter()
        .map(|transfer| TransferView {
            from: transfer.from_user,
            to: transfer.to_user,
            amount_minor: transfer.amount.minor_units(),
        })
        .collect();

    Ok(Json(SettlementPlanResponse {
        version: plan.version,
        transfers,
    }))
}

/// Handle requests for recording a settlement payment.
pub async fn settlement_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SettlementNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let mut cmd = SettlementCmd::new(
        &payload.group_id,
        &user.username,
        &payload.from,
        &payload.to,
        Money::new(payload.amount_minor),
        payload.occurred_at.with_timezone(&Utc),
    );
    if let Some(version) = payload.expected_version {
        cmd = cmd.expected_version(version);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let settlement = state.engine.record_settlement(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionCreated { id: settlement.id }),
    ))
}
