use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod balances;
mod groups;
mod memberships;
mod server;
mod settlements;
mod transactions;
mod user;

pub mod types {
    pub mod group {
        pub use api_types::group::{
            Group, GroupInfoResponse, GroupNew, GroupView, GroupsResponse,
        };
    }

    pub mod membership {
        pub use api_types::membership::{
            MemberUpsert, MemberView, MembersResponse, MembershipRole,
        };
    }

    pub mod transaction {
        pub use api_types::transaction::{
            ExpenseNew, PersonalExpenseNew, SplitNew, SplitView, TransactionCreated,
            TransactionDetailResponse, TransactionGet, TransactionKind, TransactionList,
            TransactionListResponse, TransactionView,
        };
    }

    pub mod balance {
        pub use api_types::balance::{BalanceView, BalancesGet, BalancesResponse};
    }

    pub mod settlement {
        pub use api_types::settlement::{
            SettlementNew, SettlementPlanResponse, SettlementsGet, TransferView,
        };
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Conflict(_) | EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
        EngineError::Overflow(_) | EngineError::Integrity(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Server-side failures are logged in full and masked in the response body.
fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Integrity(detail) => {
            tracing::error!("ledger integrity violated: {detail}");
            "internal server error".to_string()
        }
        EngineError::Overflow(detail) => {
            tracing::error!("amount overflow: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
