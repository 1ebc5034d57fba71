use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{EngineError, Group, ResultEngine, group_memberships, groups};

use super::{Engine, access::MembershipRole, normalize_required_name, with_tx};

impl Engine {
    /// Add a new group. The creator becomes its owner and first member.
    pub async fn new_group(&self, name: &str, user_id: &str) -> ResultEngine<String> {
        let name = normalize_required_name(name, "group")?;

        let new_group = Group::new(name.clone(), user_id);
        let new_group_id = new_group.id.clone();
        let group_entry: groups::ActiveModel = (&new_group).into();
        with_tx!(self, |db_tx| {
            // Enforce unique group names per owner (case-insensitive) to avoid
            // ambiguous name lookups.
            let exists = groups::Entity::find()
                .filter(groups::Column::UserId.eq(user_id.to_string()))
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            group_entry.insert(&db_tx).await?;

            let membership = group_memberships::ActiveModel {
                group_id: ActiveValue::Set(new_group_id.clone()),
                user_id: ActiveValue::Set(user_id.to_string()),
                role: ActiveValue::Set(MembershipRole::Owner.as_str().to_string()),
            };
            membership.insert(&db_tx).await?;

            Ok(new_group_id)
        })
    }

    /// Return a group with its member list as `(username, role)` pairs.
    ///
    /// The group resolves by id or, when the id is absent, by name among the
    /// caller's groups.
    pub async fn group_details(
        &self,
        group_id: Option<&str>,
        group_name: Option<String>,
        user_id: &str,
    ) -> ResultEngine<(Group, Vec<(String, String)>)> {
        if group_id.is_none() && group_name.is_none() {
            return Err(EngineError::KeyNotFound(
                "missing group id or name".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let group_model = if let Some(id) = group_id {
                self.require_group_member(&db_tx, id, user_id).await?
            } else {
                let name = group_name.ok_or_else(|| {
                    EngineError::KeyNotFound("missing group id or name".to_string())
                })?;
                self.require_group_by_name(&db_tx, &name, user_id).await?
            };

            let members: Vec<group_memberships::Model> = group_memberships::Entity::find()
                .filter(group_memberships::Column::GroupId.eq(group_model.id.clone()))
                .order_by_asc(group_memberships::Column::UserId)
                .all(&db_tx)
                .await?;

            Ok((
                Group::from(group_model),
                members
                    .into_iter()
                    .map(|member| (member.user_id, member.role))
                    .collect(),
            ))
        })
    }

    /// List the groups the user belongs to, owned or joined.
    pub async fn list_user_groups(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let rows = group_memberships::Entity::find()
                .filter(group_memberships::Column::UserId.eq(user_id.to_string()))
                .find_also_related(groups::Entity)
                .order_by_asc(groups::Column::Name)
                .order_by_asc(groups::Column::Id)
                .all(&db_tx)
                .await?;

            Ok(rows
                .into_iter()
                .filter_map(|(_, group)| group.map(Group::from))
                .collect())
        })
    }

    /// Delete a group and every entry recorded in it. Owner only.
    pub async fn delete_group(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group_model = self.require_group_owner(&db_tx, group_id, user_id).await?;
            let group_db_id = group_model.id;

            // Cascade delete within one DB transaction. Not every FK declares
            // ON DELETE CASCADE, so the order is explicit.
            let backend = self.database.get_database_backend();

            // 1) splits for entries in this group
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM splits WHERE transaction_id IN (SELECT id FROM transactions WHERE group_id = ?);",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            // 2) entries
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM transactions WHERE group_id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            // 3) memberships
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM group_memberships WHERE group_id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            // 4) group
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM groups WHERE id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            Ok(())
        })
    }
}
