//! Ledger entry API endpoints

use api_types::transaction::{
    ExpenseNew, PersonalExpenseNew, SplitView, TransactionCreated, TransactionDetailResponse,
    TransactionGet, TransactionKind as ApiKind, TransactionList, TransactionListResponse,
    TransactionView,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::{FixedOffset, Utc};
use engine::{ExpenseCmd, Money, PersonalExpenseCmd, Split};

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Expense => ApiKind::Expense,
        engine::TransactionKind::Settlement => ApiKind::Settlement,
    }
}

fn map_api_kind(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Expense => engine::TransactionKind::Expense,
        ApiKind::Settlement => engine::TransactionKind::Settlement,
    }
}

fn to_view(tx: engine::Transaction, utc: FixedOffset) -> TransactionView {
    TransactionView {
        id: tx.id,
        group_id: tx.group_id,
        kind: map_kind(tx.kind),
        occurred_at: tx.occurred_at.with_timezone(&utc),
        amount_minor: tx.amount.minor_units(),
        description: tx.description,
        created_by: tx.created_by,
    }
}

/// Handle requests for recording a shared expense.
pub async fn expense_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let splits = payload
        .splits
        .iter()
        .map(|split| {
            Split::new(
                &split.username,
                Money::new(split.paid_minor),
                Money::new(split.owed_minor),
            )
        })
        .collect();

    let mut cmd = ExpenseCmd::new(
        &payload.group_id,
        &user.username,
        Money::new(payload.amount_minor),
        payload.occurred_at.with_timezone(&Utc),
    )
    .splits(splits);
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let id = state.engine.record_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

/// Handle requests for recording a personal (groupless) expense.
pub async fn personal_expense_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<PersonalExpenseNew>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let mut cmd = PersonalExpenseCmd::new(
        &user.username,
        Money::new(payload.amount_minor),
        payload.occurred_at.with_timezone(&Utc),
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }

    let id = state.engine.record_personal_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

/// Handle requests for listing ledger entries, newest first.
///
/// Without a `group_id` the caller's personal entries are listed instead.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let engine = &state.engine;

    let limit = payload.limit.unwrap_or(50);
    let from = payload.from.map(|dt| dt.with_timezone(&Utc));
    let to = payload.to.map(|dt| dt.with_timezone(&Utc));
    let kinds = payload
        .kinds
        .map(|kinds| kinds.into_iter().map(map_api_kind).collect::<Vec<_>>());

    let filter = engine::TransactionListFilter { from, to, kinds };

    let (txs, next_cursor) = match payload.group_id {
        Some(group_id) => {
            engine
                .list_group_transactions(
                    &group_id,
                    &user.username,
                    limit,
                    payload.cursor.as_deref(),
                    &filter,
                )
                .await?
        }
        None => {
            engine
                .list_personal_transactions(&user.username, limit, payload.cursor.as_deref(), &filter)
                .await?
        }
    };

    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    let transactions = txs.into_iter().map(|tx| to_view(tx, utc)).collect();

    Ok(Json(TransactionListResponse {
        transactions,
        next_cursor,
    }))
}

/// Handle requests for one entry with its full split breakdown.
pub async fn get_detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionGet>,
) -> Result<Json<TransactionDetailResponse>, ServerError> {
    let tx = state
        .engine
        .transaction_detail(&payload.group_id, payload.id, &user.username)
        .await?;

    let utc = FixedOffset::east_opt(0)
        .ok_or_else(|| ServerError::Generic("invalid UTC offset".to_string()))?;
    let splits = tx
        .splits
        .iter()
        .map(|split| SplitView {
            username: split.user_id.clone(),
            paid_minor: split.paid.minor_units(),
            owed_minor: split.owed.minor_units(),
        })
        .collect();
    let transaction = to_view(tx, utc);

    Ok(Json(TransactionDetailResponse {
        transaction,
        splits,
    }))
}
