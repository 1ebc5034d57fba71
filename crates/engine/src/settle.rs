//! Settlement planning.
//!
//! Given net balances, the planner proposes pairwise transfers that bring
//! every balance to zero. Planning is read-only; recording a settlement is a
//! separate write that appends a regular ledger entry.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// A planned repayment from a debtor to a creditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from_user: String,
    pub to_user: String,
    pub amount: Money,
}

/// Heap entry ordered by amount, with ties broken towards the smaller
/// username so pops are fully deterministic.
#[derive(PartialEq, Eq)]
struct Party {
    amount: Money,
    user_id: String,
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount
            .cmp(&other.amount)
            .then_with(|| other.user_id.cmp(&self.user_id))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Plans transfers that zero out the given balances.
///
/// Repeatedly matches the largest creditor with the largest debtor and moves
/// `min(credit, debt)` between them, so the plan needs at most one transfer
/// fewer than the number of nonzero balances. The greedy match does not
/// always find the globally smallest number of transfers, but its output is
/// stable: equal inputs produce the same plan, with amount ties broken by
/// username.
///
/// Balances that do not sum to zero are corrupt input; the planner fails
/// with [`EngineError::Integrity`] and never tries to repair them.
pub fn plan_settlements(balances: &BTreeMap<String, Money>) -> ResultEngine<Vec<Transfer>> {
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

    let mut creditors: BinaryHeap<Party> = BinaryHeap::new();
    let mut debtors: BinaryHeap<Party> = BinaryHeap::new();
    for (user_id, amount) in balances {
        if amount.is_positive() {
            creditors.push(Party {
                amount: *amount,
                user_id: user_id.clone(),
            });
        } else if amount.is_negative() {
            let debt = Money::ZERO.checked_sub(*amount).ok_or_else(|| {
                EngineError::Overflow(format!("balance for {user_id} leaves the i64 range"))
            })?;
            debtors.push(Party {
                amount: debt,
                user_id: user_id.clone(),
            });
        }
    }

    let mut transfers = Vec::new();
    while let (Some(mut creditor), Some(mut debtor)) = (creditors.pop(), debtors.pop()) {
        let amount = creditor.amount.min(debtor.amount);
        transfers.push(Transfer {
            from_user: debtor.user_id.clone(),
            to_user: creditor.user_id.clone(),
            amount,
        });
        creditor.amount -= amount;
        debtor.amount -= amount;
        if creditor.amount.is_positive() {
            creditors.push(creditor);
        }
        if debtor.amount.is_positive() {
            debtors.push(debtor);
        }
    }

    Ok(transfers)
}
