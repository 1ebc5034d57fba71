//! Balance aggregation.
//!
//! Net balances are always recomputed from the ledger, never stored. The fold
//! is pure and deterministic: the same records produce the same map whatever
//! order they arrive in, so replaying a group's history is always safe.

use std::collections::BTreeMap;

use crate::{EngineError, Money, ResultEngine, store::SplitRecord};

/// Folds split records into net balances per user.
///
/// Each record moves its user by `paid - owed`: positive means the group owes
/// the user, negative means the user owes the group.
///
/// Fails with [`EngineError::Overflow`] when a running balance leaves the
/// `i64` range and with [`EngineError::Integrity`] when the resulting
/// balances do not sum to zero. An integrity failure means the stored ledger
/// is corrupt; it is reported, never repaired.
pub fn compute_balances(records: &[SplitRecord]) -> ResultEngine<BTreeMap<String, Money>> {
    let mut balances: BTreeMap<String, Money> = BTreeMap::new();

    for record in records {
        let delta = record.paid.checked_sub(record.owed).ok_or_else(|| {
            EngineError::Overflow(format!(
                "split for {} leaves the i64 range",
                record.user_id
            ))
        })?;
        let entry = balances
            .entry(record.user_id.clone())
            .or_insert(Money::ZERO);
        *entry = entry.checked_add(delta).ok_or_else(|| {
            EngineError::Overflow(format!(
                "balance for {} leaves the i64 range",
                record.user_id
            ))
        })?;
    }

    let mut sum = Money::ZERO;
    for amount in balances.values() {
        sum = sum.checked_add(*amount).ok_or_else(|| {
            EngineError::Overflow("balance total leaves the i64 range".to_string())
        })?;
    }
    if !sum.is_zero() {
        return Err(EngineError::Integrity(format!(
            "group balances sum to {sum}, expected 0.00"
        )));
    }

    Ok(balances)
}
