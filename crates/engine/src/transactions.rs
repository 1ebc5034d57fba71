//! Transaction primitives.
//!
//! A `Transaction` is an atomic ledger entry that changes balances via one or
//! more `Split`s. Entries are append-only; recording a correction means
//! recording a new entry.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

use super::splits;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Settlement,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Settlement => "settlement",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "settlement" => Ok(Self::Settlement),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// `None` marks a personal entry outside any shared ledger.
    pub group_id: Option<String>,
    pub kind: TransactionKind,
    pub occurred_at: DateTime<Utc>,
    pub amount: Money,
    pub description: Option<String>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
    pub splits: Vec<splits::Split>,
}

impl Transaction {
    pub fn new(
        group_id: Option<String>,
        kind: TransactionKind,
        occurred_at: DateTime<Utc>,
        amount: Money,
        description: Option<String>,
        created_by: String,
        idempotency_key: Option<String>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            kind,
            occurred_at,
            amount,
            description,
            created_by,
            idempotency_key,
            splits: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: Option<String>,
    pub kind: String,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
    #[sea_orm(has_many = "super::splits::Entity")]
    Splits,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Splits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            group_id: ActiveValue::Set(tx.group_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            amount_minor: ActiveValue::Set(tx.amount.minor_units()),
            description: ActiveValue::Set(tx.description.clone()),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            idempotency_key: ActiveValue::Set(tx.idempotency_key.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            group_id: model.group_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            occurred_at: model.occurred_at,
            amount: Money::new(model.amount_minor),
            description: model.description,
            created_by: model.created_by,
            idempotency_key: model.idempotency_key,
            splits: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "Validation(\"amount must be > 0\")")]
    fn fail_new_with_zero_amount() {
        Transaction::new(
            None,
            TransactionKind::Expense,
            Utc::now(),
            Money::ZERO,
            None,
            "foo".to_string(),
            None,
        )
        .unwrap();
    }

    #[test]
    fn kind_round_trips_through_str() {
        assert_eq!(
            TransactionKind::try_from("settlement").unwrap(),
            TransactionKind::Settlement
        );
        assert_eq!(TransactionKind::Expense.as_str(), "expense");
        assert!(TransactionKind::try_from("refund").is_err());
    }
}
