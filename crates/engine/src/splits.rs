//! Expense splits.
//!
//! A [`Split`] is one participant's share of a
//! [`Transaction`](crate::Transaction): how much the user paid towards the
//! total and how much of the total the user owes.
//!
//! Amounts are non-negative [`Money`] minor units. In the engine, *every*
//! change to balances happens via splits.

use std::collections::HashSet;

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub user_id: String,
    pub paid: Money,
    pub owed: Money,
}

impl Split {
    pub fn new(user_id: &str, paid: Money, owed: Money) -> Self {
        Self {
            user_id: user_id.to_string(),
            paid,
            owed,
        }
    }

    pub(crate) fn active_model(&self, transaction_id: Uuid) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            transaction_id: ActiveValue::Set(transaction_id.to_string()),
            user_id: ActiveValue::Set(self.user_id.clone()),
            paid_minor: ActiveValue::Set(self.paid.minor_units()),
            owed_minor: ActiveValue::Set(self.owed.minor_units()),
        }
    }
}

/// Checks a transaction's splits against the ledger rules.
///
/// A transaction is accepted whole or rejected whole. The rules:
///
/// - at least one split;
/// - every split user is a group member, listed at most once;
/// - paid and owed amounts are non-negative;
/// - paid amounts sum to `total`, owed amounts sum to `total`.
///
/// `members` holds the usernames allowed to appear in splits.
pub fn validate_splits(total: Money, splits: &[Split], members: &[String]) -> ResultEngine<()> {
    if splits.is_empty() {
        return Err(EngineError::Validation(
            "transaction requires at least one split".to_string(),
        ));
    }
    if !total.is_positive() {
        return Err(EngineError::Validation("amount must be > 0".to_string()));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut paid_total = Money::ZERO;
    let mut owed_total = Money::ZERO;

    for split in splits {
        if split.paid.is_negative() || split.owed.is_negative() {
            return Err(EngineError::Validation(format!(
                "split amounts for {} must be non-negative",
                split.user_id
            )));
        }
        if !members.contains(&split.user_id) {
            return Err(EngineError::Validation(format!(
                "user {} is not a member of the group",
                split.user_id
            )));
        }
        if !seen.insert(split.user_id.as_str()) {
            return Err(EngineError::Validation(format!(
                "duplicate split for user {}",
                split.user_id
            )));
        }
        paid_total = paid_total
            .checked_add(split.paid)
            .ok_or_else(|| EngineError::Validation("paid amounts overflow".to_string()))?;
        owed_total = owed_total
            .checked_add(split.owed)
            .ok_or_else(|| EngineError::Validation("owed amounts overflow".to_string()))?;
    }

    if paid_total != total || owed_total != total {
        return Err(EngineError::Validation(format!(
            "split sums must match the total: paid {paid_total}, owed {owed_total}, total {total}"
        )));
    }

    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub transaction_id: String,
    pub user_id: String,
    pub paid_minor: i64,
    pub owed_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Split {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: model.user_id,
            paid: Money::new(model.paid_minor),
            owed: Money::new(model.owed_minor),
        })
    }
}
