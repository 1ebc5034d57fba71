use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
    }

    /// Group reference, by id or by name.
    ///
    /// Used both as a request body (lookups, deletes) and as a response.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Group {
        pub id: Option<String>,
        pub name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: String,
        pub name: String,
        pub owner: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupInfoResponse {
        pub id: String,
        pub name: String,
        pub owner: String,
        pub members: Vec<super::membership::MemberView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupsResponse {
        pub groups: Vec<GroupView>,
    }
}

pub mod membership {
    use super::*;

    /// Role of a user in a group.
    ///
    /// The server treats roles as:
    /// - `owner`: full access and can manage members.
    /// - `member`: can record entries and read balances.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipRole {
        Owner,
        Member,
    }

    impl MembershipRole {
        /// Returns the canonical role string used by the engine/database.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Owner => "owner",
                Self::Member => "member",
            }
        }
    }

    /// Request body for adding/updating a member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberUpsert {
        pub username: String,
        pub role: MembershipRole,
    }

    /// Response body for listing members.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }

    /// A member with their role.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub username: String,
        pub role: MembershipRole,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Expense,
        Settlement,
    }

    /// One user's share of a transaction.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitNew {
        pub username: String,
        pub paid_minor: i64,
        pub owed_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub group_id: String,
        /// Total amount in minor units; must equal both split sums.
        pub amount_minor: i64,
        pub splits: Vec<SplitNew>,
        pub description: Option<String>,
        /// Optional idempotency key for safely retrying the same create request.
        pub idempotency_key: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PersonalExpenseNew {
        pub amount_minor: i64,
        pub description: Option<String>,
        /// Optional idempotency key for safely retrying the same create request.
        pub idempotency_key: Option<String>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionCreated {
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionList {
        /// Group ledger to page through; absent means the caller's personal
        /// entries.
        pub group_id: Option<String>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        pub cursor: Option<String>,
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub kinds: Option<Vec<TransactionKind>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub group_id: Option<String>,
        pub kind: TransactionKind,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub created_by: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionGet {
        pub group_id: String,
        pub id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SplitView {
        pub username: String,
        pub paid_minor: i64,
        pub owed_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionDetailResponse {
        pub transaction: TransactionView,
        pub splits: Vec<SplitView>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesGet {
        pub group_id: String,
    }

    /// A member's net position: positive means the group owes them.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub username: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<BalanceView>,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementsGet {
        pub group_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferView {
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
    }

    /// Suggested transfers and the ledger version they were computed from.
    ///
    /// Pass `version` back as `expected_version` when recording one of the
    /// transfers to detect a ledger that moved in between.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementPlanResponse {
        pub version: u64,
        pub transfers: Vec<TransferView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub group_id: String,
        pub from: String,
        pub to: String,
        pub amount_minor: i64,
        pub description: Option<String>,
        /// Optional idempotency key for safely retrying the same create request.
        pub idempotency_key: Option<String>,
        /// Ledger version the caller's plan was computed from.
        pub expected_version: Option<u64>,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
    }
}
