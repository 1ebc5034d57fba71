//! Balance read endpoints

use api_types::balance::{BalanceView, BalancesGet, BalancesResponse};
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::ServerState, user};

/// Handle requests for a group's per-member net balances.
pub async fn get_balances(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BalancesGet>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let balances = state
        .engine
        .group_balances(&payload.group_id, &user.username)
        .await?
        .into_iter()
        .map(|(username, amount)| BalanceView {
            username,
            amount_minor: amount.minor_units(),
        })
        .collect();

    Ok(Json(BalancesResponse { balances }))
}
