use std::collections::BTreeMap;

use crate::{
    Money, ResultEngine, SettlementCmd, compute_balances, plan_settlements,
    store::{LedgerStore, Settlement, SettlementPlan},
};

use super::Engine;

impl Engine {
    /// Net balances for a group, one per member.
    ///
    /// Members without any recorded split show up at zero. Users who left the
    /// group are dropped; leaving requires a settled balance, so nothing is
    /// lost.
    pub async fn group_balances(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<BTreeMap<String, Money>> {
        let snapshot = self.fetch_snapshot(group_id, user_id).await?;
        let mut balances = compute_balances(&snapshot.records)?;
        balances.retain(|user, _| snapshot.members.contains(user));
        for member in &snapshot.members {
            balances.entry(member.clone()).or_insert(Money::ZERO);
        }
        Ok(balances)
    }

    /// Proposes transfers that would settle the group today.
    ///
    /// The returned plan carries the ledger version it was computed against;
    /// pass it back when recording a settlement to detect entries recorded in
    /// between.
    pub async fn suggested_settlements(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<SettlementPlan> {
        let snapshot = self.fetch_snapshot(group_id, user_id).await?;
        let balances = compute_balances(&snapshot.records)?;
        let transfers = plan_settlements(&balances)?;

        Ok(SettlementPlan {
            version: snapshot.version,
            transfers,
        })
    }

    /// Records a settlement payment as a ledger entry.
    pub async fn record_settlement(&self, cmd: SettlementCmd) -> ResultEngine<Settlement> {
        self.append_settlement(cmd).await
    }
}
