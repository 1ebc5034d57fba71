//! A `Group` is the boundary of a shared ledger. Every expense, balance and
//! settlement lives inside exactly one group; the user who creates the group
//! owns it.

use sea_orm::{ActiveValue, prelude::*};
use uuid::Uuid;

/// A shared ledger and the user who administers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub user_id: String,
}

impl Group {
    pub fn new(name: String, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            user_id: user_id.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub user_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_memberships::Entity")]
    GroupMemberships,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::group_memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMemberships.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(value: &Group) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            user_id: ActiveValue::Set(value.user_id.clone()),
        }
    }
}

impl From<Model> for Group {
    fn from(value: Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            user_id: value.user_id,
        }
    }
}
