//! Command structs for engine operations.
//!
//! These types group parameters for ledger writes (expenses and settlements),
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};

use crate::{Money, splits::Split};

/// Common metadata for ledger entry creation.
#[derive(Clone, Debug)]
pub struct TxMeta {
    pub description: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TxMeta {
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            description: None,
            idempotency_key: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Record a shared expense inside a group.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub group_id: String,
    pub amount: Money,
    pub splits: Vec<Split>,
    pub meta: TxMeta,
    pub user_id: String,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            amount,
            splits: Vec::new(),
            meta: TxMeta::new(occurred_at),
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn split(mut self, split: Split) -> Self {
        self.splits.push(split);
        self
    }

    #[must_use]
    pub fn splits(mut self, splits: Vec<Split>) -> Self {
        self.splits = splits;
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: TxMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}

/// Record a personal expense outside any group.
#[derive(Clone, Debug)]
pub struct PersonalExpenseCmd {
    pub amount: Money,
    pub meta: TxMeta,
    pub user_id: String,
}

impl PersonalExpenseCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: Money, occurred_at: DateTime<Utc>) -> Self {
        Self {
            amount,
            meta: TxMeta::new(occurred_at),
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn meta(mut self, meta: TxMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}

/// Record a settlement payment between two group members.
#[derive(Clone, Debug)]
pub struct SettlementCmd {
    pub group_id: String,
    pub from_user: String,
    pub to_user: String,
    pub amount: Money,
    /// When set, recording fails unless the ledger is still at this version.
    pub expected_version: Option<u64>,
    pub meta: TxMeta,
    pub user_id: String,
}

impl SettlementCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        from_user: impl Into<String>,
        to_user: impl Into<String>,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            from_user: from_user.into(),
            to_user: to_user.into(),
            amount,
            expected_version: None,
            meta: TxMeta::new(occurred_at),
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: TxMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}
