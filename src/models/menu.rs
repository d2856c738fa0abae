use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Menu entity — a node of the console navigation tree.
///
/// `parent_id == 0` marks a root node. Menus are a presentation projection
/// of what a user may see; they play no part in enforcement.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "menus")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub parent_id: i32,

    pub title: String,

    /// Router name (unique within the front-end route table)
    pub name: String,

    pub icon: Option<String>,

    /// Front-end component reference
    pub component: String,

    pub path: String,

    pub hidden: bool,

    pub sort: i32,

    pub create_time: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::role_menu::Entity")]
    RoleMenus,
}

impl Related<super::role_menu::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleMenus.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
