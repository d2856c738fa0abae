use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Resource entity — a protected URL pattern.
///
/// `pattern` supports wildcard segments (`*` for one segment, a terminal
/// `**` for any remainder). `method` restricts the rule to one HTTP method;
/// NULL means any method. Resources are the unit the permission index is
/// built from.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "resources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub pattern: String,

    pub method: Option<String>,

    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::role_resource::Entity")]
    RoleResources,
}

impl Related<super::role_resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleResources.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        super::role_resource::Relation::Role.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::role_resource::Relation::Resource.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
