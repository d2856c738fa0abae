use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role entity — a named permission group.
///
/// A disabled role (`status == false`) grants nothing even while still
/// linked to users and resources; the permission index skips it on rebuild
/// and the authentication filter skips it when resolving granted roles.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    pub description: Option<String>,

    /// Enabled flag
    pub status: bool,

    /// Soft-delete flag
    pub del: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_role::Entity")]
    UserRoles,
    #[sea_orm(has_many = "super::role_resource::Entity")]
    RoleResources,
    #[sea_orm(has_many = "super::role_menu::Entity")]
    RoleMenus,
}

impl Related<super::user_role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRoles.def()
    }
}

impl Related<super::role_resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleResources.def()
    }
}

impl Related<super::role_menu::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleMenus.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        super::user_role::Relation::User.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::user_role::Relation::Role.def().rev())
    }
}

impl Related<super::resource::Entity> for Entity {
    fn to() -> RelationDef {
        super::role_resource::Relation::Resource.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::role_resource::Relation::Role.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
