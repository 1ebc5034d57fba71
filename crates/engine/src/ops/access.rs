use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};

use crate::{EngineError, ResultEngine, group_memberships, groups, users};

use super::{Engine, normalize_required_name};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum MembershipRole {
    Owner,
    Member,
}

impl MembershipRole {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }

    pub(super) fn can_manage_members(self) -> bool {
        matches!(self, Self::Owner)
    }
}

impl TryFrom<&str> for MembershipRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "owner" => Ok(Self::Owner),
            "member" => Ok(Self::Member),
            other => Err(EngineError::Validation(format!(
                "invalid membership role: {other}"
            ))),
        }
    }
}

impl Engine {
    async fn find_group_by_id(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Option<groups::Model>> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn group_membership_role(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<MembershipRole>> {
        let row =
            group_memberships::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
                .one(db)
                .await?;
        row.as_ref()
            .map(|m| MembershipRole::try_from(m.role.as_str()))
            .transpose()
    }

    /// Non-members get the same "not exists" answer as callers of unknown
    /// groups, so membership checks never leak which groups exist.
    pub(super) async fn require_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        if self
            .group_membership_role(db, group_id, user_id)
            .await?
            .is_none()
        {
            return Err(EngineError::KeyNotFound("group not exists".to_string()));
        }
        Ok(model)
    }

    pub(super) async fn require_group_owner(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        let role = self
            .group_membership_role(db, group_id, user_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        if !role.can_manage_members() {
            return Err(EngineError::Forbidden(
                "group owner role required".to_string(),
            ));
        }
        Ok(model)
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }

    pub(super) async fn require_group_by_name(
        &self,
        db: &DatabaseTransaction,
        group_name: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let group_name = normalize_required_name(group_name, "group")?;
        let group_name_lower = group_name.to_lowercase();
        let models: Vec<groups::Model> = groups::Entity::find()
            .filter(Expr::cust("LOWER(name)").eq(group_name_lower))
            .all(db)
            .await?;

        let mut out: Option<groups::Model> = None;
        for model in models {
            if self
                .group_membership_role(db, &model.id, user_id)
                .await?
                .is_some()
            {
                if out.is_some() {
                    return Err(EngineError::Validation("ambiguous group name".to_string()));
                }
                out = Some(model);
            }
        }

        out.ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))
    }

    /// Usernames of all group members, ordered for stable validation output.
    pub(super) async fn member_usernames(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<String>> {
        let rows: Vec<group_memberships::Model> = group_memberships::Entity::find()
            .filter(group_memberships::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(group_memberships::Column::UserId)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|row| row.user_id).collect())
    }
}
