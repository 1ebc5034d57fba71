use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, Money, ResultEngine, compute_balances, group_memberships};

use super::{Engine, access::MembershipRole, with_tx};

impl Engine {
    /// Adds a group member or updates an existing member's role (owner-only).
    pub async fn upsert_group_member(
        &self,
        group_id: &str,
        member_username: &str,
        role: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_owner(&db_tx, group_id, user_id).await?;
            self.require_user_exists(&db_tx, member_username).await?;

            let _role = MembershipRole::try_from(role)?;
            if member_username == group.user_id {
                return Err(EngineError::Validation(
                    "cannot change the group owner role".to_string(),
                ));
            }

            let active = group_memberships::ActiveModel {
                group_id: ActiveValue::Set(group.id.clone()),
                user_id: ActiveValue::Set(member_username.to_string()),
                role: ActiveValue::Set(role.to_string()),
            };

            // Upsert: insert if missing, otherwise update role.
            match group_memberships::Entity::find_by_id((
                group.id.clone(),
                member_username.to_string(),
            ))
            .one(&db_tx)
            .await?
            {
                Some(_) => {
                    active.update(&db_tx).await?;
                }
                None => {
                    active.insert(&db_tx).await?;
                }
            }

            Ok(())
        })
    }

    /// Removes a group member (owner-only).
    ///
    /// The owner cannot be removed, and neither can a member whose balance is
    /// not settled: the remaining balances would stop summing to zero.
    pub async fn remove_group_member(
        &self,
        group_id: &str,
        member_username: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_owner(&db_tx, group_id, user_id).await?;
            if member_username == group.user_id {
                return Err(EngineError::Validation(
                    "cannot remove the group owner".to_string(),
                ));
            }

            let records = self.load_split_records(&db_tx, &group.id).await?;
            let balances = compute_balances(&records)?;
            let balance = balances
                .get(member_username)
                .copied()
                .unwrap_or(Money::ZERO);
            if !balance.is_zero() {
                return Err(EngineError::Validation(format!(
                    "member {member_username} has a balance of {balance}, settle it first"
                )));
            }

            group_memberships::Entity::delete_by_id((
                group.id.clone(),
                member_username.to_string(),
            ))
            .exec(&db_tx)
            .await?;

            Ok(())
        })
    }

    /// Lists group members as `(username, role)` pairs.
    pub async fn list_group_members(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<(String, String)>> {
        with_tx!(self, |db_tx| {
            let group = self.require_group_member(&db_tx, group_id, user_id).await?;

            let rows = group_memberships::Entity::find()
                .filter(group_memberships::Column::GroupId.eq(group.id))
                .order_by_asc(group_memberships::Column::UserId)
                .all(&db_tx)
                .await?;
            Ok(rows.into_iter().map(|m| (m.user_id, m.role)).collect())
        })
    }
}
