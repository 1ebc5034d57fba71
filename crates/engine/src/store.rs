//! Storage capability for ledger reads and writes.
//!
//! The balance and settlement logic never touches the database directly: it
//! works on a [`GroupSnapshot`] fetched through [`LedgerStore`] and appends
//! entries through the same trait. The trait keeps the pure core testable
//! against in-memory data and pins the concurrency rules to one boundary.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Money, ResultEngine,
    commands::{ExpenseCmd, SettlementCmd},
    settle::Transfer,
};

/// One split row joined with its transaction, the unit the aggregator folds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitRecord {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub paid: Money,
    pub owed: Money,
    pub occurred_at: DateTime<Utc>,
}

/// A consistent read of one group's ledger.
///
/// `version` counts the entries recorded so far. The ledger is append-only,
/// so the count grows monotonically and works as an optimistic lock token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub group_id: String,
    pub version: u64,
    pub members: Vec<String>,
    pub records: Vec<SplitRecord>,
}

/// A recorded settlement entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Transfers that would zero the balances seen at `version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementPlan {
    pub version: u64,
    pub transfers: Vec<Transfer>,
}

/// Serialized access to a group's ledger.
///
/// Implementations must run each call inside a single database transaction so
/// that validation and append cannot interleave with a concurrent writer.
pub trait LedgerStore {
    /// Reads members, entries and the current version in one consistent view.
    fn fetch_snapshot(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> impl Future<Output = ResultEngine<GroupSnapshot>> + Send;

    /// Validates and appends an expense entry, returning its id.
    fn append_expense(&self, cmd: ExpenseCmd) -> impl Future<Output = ResultEngine<Uuid>> + Send;

    /// Validates and appends a settlement entry.
    fn append_settlement(
        &self,
        cmd: SettlementCmd,
    ) -> impl Future<Output = ResultEngine<Settlement>> + Send;
}
