use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseCmd, Money, ResultEngine, SettlementCmd, Transaction, TransactionKind,
    compute_balances, splits,
    splits::Split,
    store::{GroupSnapshot, LedgerStore, Settlement, SplitRecord},
    transactions, validate_splits,
};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Loads every split in the group joined with its entry, oldest first.
    pub(in crate::ops) async fn load_split_records(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<SplitRecord>> {
        let rows: Vec<(splits::Model, Option<transactions::Model>)> = splits::Entity::find()
            .find_also_related(transactions::Entity)
            .filter(transactions::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(transactions::Column::OccurredAt)
            .order_by_asc(transactions::Column::Id)
            .all(db_tx)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (split_model, tx_model) in rows {
            let Some(tx_model) = tx_model else {
                continue;
            };
            records.push(SplitRecord {
                transaction_id: Uuid::parse_str(&tx_model.id)
                    .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
                user_id: split_model.user_id,
                paid: Money::new(split_model.paid_minor),
                owed: Money::new(split_model.owed_minor),
                occurred_at: tx_model.occurred_at,
            });
        }
        Ok(records)
    }

    /// Number of entries recorded in the group so far.
    pub(in crate::ops) async fn ledger_version(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<u64> {
        transactions::Entity::find()
            .filter(transactions::Column::GroupId.eq(group_id.to_string()))
            .count(db_tx)
            .await
            .map_err(Into::into)
    }

    pub(in crate::ops) async fn find_entry_by_idempotency_key(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: Option<&str>,
        created_by: &str,
        key: &str,
    ) -> ResultEngine<Option<transactions::Model>> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::CreatedBy.eq(created_by.to_string()))
            .filter(transactions::Column::IdempotencyKey.eq(key.to_string()));
        query = match group_id {
            Some(group_id) => query.filter(transactions::Column::GroupId.eq(group_id.to_string())),
            None => query.filter(transactions::Column::GroupId.is_null()),
        };
        query.one(db_tx).await.map_err(Into::into)
    }

    /// Inserts an entry with its splits.
    ///
    /// When the insert collides with an already recorded idempotency key (a
    /// retry racing its original), the original entry id is returned instead
    /// of an error.
    pub(in crate::ops) async fn insert_entry(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &Transaction,
    ) -> ResultEngine<Uuid> {
        if let Some(key) = tx.idempotency_key.as_deref()
            && let Some(existing) = self
                .find_entry_by_idempotency_key(db_tx, tx.group_id.as_deref(), &tx.created_by, key)
                .await?
        {
            return Uuid::parse_str(&existing.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()));
        }

        if let Err(err) = transactions::ActiveModel::from(tx).insert(db_tx).await {
            if let Some(key) = tx.idempotency_key.as_deref()
                && let Some(existing) = self
                    .find_entry_by_idempotency_key(
                        db_tx,
                        tx.group_id.as_deref(),
                        &tx.created_by,
                        key,
                    )
                    .await?
            {
                return Uuid::parse_str(&existing.id)
                    .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()));
            }
            return Err(err.into());
        }
        for split in &tx.splits {
            split.active_model(tx.id).insert(db_tx).await?;
        }

        Ok(tx.id)
    }

    /// Rebuilds a [`Settlement`] from a stored settlement entry.
    async fn settlement_from_model(
        &self,
        db_tx: &DatabaseTransaction,
        model: transactions::Model,
    ) -> ResultEngine<Settlement> {
        if model.kind != TransactionKind::Settlement.as_str() {
            return Err(EngineError::Validation(
                "idempotency key already used by a different entry".to_string(),
            ));
        }
        let split_models: Vec<splits::Model> = splits::Entity::find()
            .filter(splits::Column::TransactionId.eq(model.id.clone()))
            .all(db_tx)
            .await?;
        let tx = Transaction::try_from(model)?;
        let group_id = tx.group_id.ok_or_else(|| {
            EngineError::Integrity("settlement entry outside any group".to_string())
        })?;

        let mut from_user = None;
        let mut to_user = None;
        for split_model in split_models {
            let split = Split::try_from(split_model)?;
            if split.paid.is_positive() {
                from_user = Some(split.user_id);
            } else if split.owed.is_positive() {
                to_user = Some(split.user_id);
            }
        }
        let (Some(from_user), Some(to_user)) = (from_user, to_user) else {
            return Err(EngineError::Integrity(
                "settlement entry is missing its payer or payee split".to_string(),
            ));
        };

        Ok(Settlement {
            id: tx.id,
            group_id,
            from_user,
            to_user,
            amount: tx.amount,
            occurred_at: tx.occurred_at,
        })
    }
}

impl LedgerStore for Engine {
    async fn fetch_snapshot(&self, group_id: &str, user_id: &str) -> ResultEngine<GroupSnapshot> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, group_id, user_id).await?;
            let members = self.member_usernames(&db_tx, &group.id).await?;
            let version = self.ledger_version(&db_tx, &group.id).await?;
            let records = self.load_split_records(&db_tx, &group.id).await?;

            Ok(GroupSnapshot {
                group_id: group.id,
                version,
                members,
                records,
            })
        })
    }

    async fn append_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let group = self
                .require_group_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;
            let members = self.member_usernames(&db_tx, &group.id).await?;
            validate_splits(cmd.amount, &cmd.splits, &members)?;

            let description = normalize_optional_text(cmd.meta.description.as_deref());
            let mut tx = Transaction::new(
                Some(group.id.clone()),
                TransactionKind::Expense,
                cmd.meta.occurred_at,
                cmd.amount,
                description,
                cmd.user_id.clone(),
                cmd.meta.idempotency_key.clone(),
            )?;
            tx.splits = cmd.splits;

            self.insert_entry(&db_tx, &tx).await
        })
    }

    async fn append_settlement(&self, cmd: SettlementCmd) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let group = self
                .require_group_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;
            let members = self.member_usernames(&db_tx, &group.id).await?;

            if cmd.from_user == cmd.to_user {
                return Err(EngineError::Validation(
                    "settlement requires two distinct users".to_string(),
                ));
            }
            // A settlement is a regular entry: the payer paid the amount and
            // owes nothing, the payee owes the amount and paid nothing.
            let settlement_splits = vec![
                Split::new(&cmd.from_user, cmd.amount, Money::ZERO),
                Split::new(&cmd.to_user, Money::ZERO, cmd.amount),
            ];
            validate_splits(cmd.amount, &settlement_splits, &members)?;

            // Replays of an already recorded settlement come back before any
            // version check, so retrying a committed payment stays safe.
            if let Some(key) = cmd.meta.idempotency_key.as_deref()
                && let Some(existing) = self
                    .find_entry_by_idempotency_key(&db_tx, Some(&group.id), &cmd.user_id, key)
                    .await?
            {
                return self.settlement_from_model(&db_tx, existing).await;
            }

            let version = self.ledger_version(&db_tx, &group.id).await?;
            if let Some(expected) = cmd.expected_version
                && expected != version
            {
                return Err(EngineError::Conflict(format!(
                    "ledger moved to version {version}, expected {expected}"
                )));
            }

            // Both parties must move towards zero: a payment larger than the
            // outstanding debt would flip signs instead of settling.
            let records = self.load_split_records(&db_tx, &group.id).await?;
            let balances = compute_balances(&records)?;
            let payer_balance = balances
                .get(&cmd.from_user)
                .copied()
                .unwrap_or(Money::ZERO);
            let payee_balance = balances.get(&cmd.to_user).copied().unwrap_or(Money::ZERO);

            let payer_debt = Money::ZERO.checked_sub(payer_balance).ok_or_else(|| {
                EngineError::Overflow(format!(
                    "balance for {} leaves the i64 range",
                    cmd.from_user
                ))
            })?;
            if !payer_debt.is_positive() || cmd.amount > payer_debt {
                return Err(EngineError::Conflict(format!(
                    "{} owes {}, cannot settle {}",
                    cmd.from_user, payer_debt, cmd.amount
                )));
            }
            if !payee_balance.is_positive() || cmd.amount > payee_balance {
                return Err(EngineError::Conflict(format!(
                    "{} is owed {}, cannot settle {}",
                    cmd.to_user, payee_balance, cmd.amount
                )));
            }

            let description = normalize_optional_text(cmd.meta.description.as_deref());
            let mut tx = Transaction::new(
                Some(group.id.clone()),
                TransactionKind::Settlement,
                cmd.meta.occurred_at,
                cmd.amount,
                description,
                cmd.user_id.clone(),
                cmd.meta.idempotency_key.clone(),
            )?;
            tx.splits = settlement_splits;

            let id = self.insert_entry(&db_tx, &tx).await?;
            Ok(Settlement {
                id,
                group_id: group.id,
                from_user: cmd.from_user,
                to_user: cmd.to_user,
                amount: cmd.amount,
                occurred_at: cmd.meta.occurred_at,
            })
        })
    }
}
