use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, ExpenseCmd, PersonalExpenseCmd, ResultEngine, Transaction, TransactionKind,
    splits, splits::Split, store::LedgerStore, transactions,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Filters for listing ledger entries.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<TransactionKind>>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::Validation(
            "kinds must not be empty".to_string(),
        ));
    }
    Ok(())
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
            self = self.filter(transactions::Column::Kind.is_in(kinds));
        }

        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    occurred_at: DateTime<Utc>,
    transaction_id: String,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Records a shared expense in a group, returning the new entry id.
    ///
    /// The caller's splits must pass the all-or-nothing ledger checks; on a
    /// repeated idempotency key the original entry id comes back instead.
    pub async fn record_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Uuid> {
        self.append_expense(cmd).await
    }

    /// Records a personal expense outside any group.
    ///
    /// The entry gets a single self-split (paid and owed both equal to the
    /// total), so personal history folds to a zero balance like any other
    /// slice of the ledger.
    pub async fn record_personal_expense(&self, cmd: PersonalExpenseCmd) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, &cmd.user_id).await?;

            let description = normalize_optional_text(cmd.meta.description.as_deref());
            let mut tx = Transaction::new(
                None,
                TransactionKind::Expense,
                cmd.meta.occurred_at,
                cmd.amount,
                description,
                cmd.user_id.clone(),
                cmd.meta.idempotency_key.clone(),
            )?;
            tx.splits = vec![Split::new(&cmd.user_id, cmd.amount, cmd.amount)];

            self.insert_entry(&db_tx, &tx).await
        })
    }

    /// Lists a group's entries, newest first, with cursor-based pagination.
    ///
    /// Pages move from newest to older by `(occurred_at DESC, transaction_id
    /// DESC)`.
    pub async fn list_group_transactions(
        &self,
        group_id: &str,
        user_id: &str,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, group_id, user_id).await?;
            validate_list_filter(filter)?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::GroupId.eq(group.id))
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = TransactionsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }
            query = query.apply_tx_filters(filter);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Transaction> = Vec::with_capacity(rows.len().min(limit as usize));
            for tx_model in rows.into_iter().take(limit as usize) {
                out.push(Transaction::try_from(tx_model)?);
            }

            let next_cursor = out.last().map(|tx| TransactionsCursor {
                occurred_at: tx.occurred_at,
                transaction_id: tx.id.to_string(),
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Lists the user's personal entries, newest first, with cursor-based
    /// pagination.
    pub async fn list_personal_transactions(
        &self,
        user_id: &str,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;
            validate_list_filter(filter)?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::GroupId.is_null())
                .filter(transactions::Column::CreatedBy.eq(user_id.to_string()))
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = TransactionsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }
            query = query.apply_tx_filters(filter);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Transaction> = Vec::with_capacity(rows.len().min(limit as usize));
            for tx_model in rows.into_iter().take(limit as usize) {
                out.push(Transaction::try_from(tx_model)?);
            }

            let next_cursor = out.last().map(|tx| TransactionsCursor {
                occurred_at: tx.occurred_at,
                transaction_id: tx.id.to_string(),
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Returns one group entry with its splits filled in.
    pub async fn transaction_detail(
        &self,
        group_id: &str,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, group_id, user_id).await?;

            let tx_model = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::GroupId.eq(group.id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;

            let split_models: Vec<splits::Model> = splits::Entity::find()
                .filter(splits::Column::TransactionId.eq(tx_model.id.clone()))
                .order_by_asc(splits::Column::UserId)
                .all(&db_tx)
                .await?;

            let mut tx = Transaction::try_from(tx_model)?;
            tx.splits = split_models
                .into_iter()
                .map(Split::try_from)
                .collect::<ResultEngine<Vec<Split>>>()?;

            Ok(tx)
        })
    }
}
