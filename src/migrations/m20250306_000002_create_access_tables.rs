use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ── Create resources table ──
        manager
            .create_table(
                Table::create()
                    .table(Resources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Resources::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Resources::Name).string().not_null())
                    .col(ColumnDef::new(Resources::Pattern).string().not_null())
                    .col(ColumnDef::new(Resources::Method).string().null())
                    .col(ColumnDef::new(Resources::Description).string().null())
                    .to_owned(),
            )
            .await?;

        // ── Create role_resources junction table ──
        manager
            .create_table(
                Table::create()
                    .table(RoleResources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleResources::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleResources::RoleId).integer().not_null())
                    .col(
                        ColumnDef::new(RoleResources::ResourceId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_resources_resource")
                            .from(RoleResources::Table, RoleResources::ResourceId)
                            .to(Resources::Table, Resources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_resources_unique")
                    .table(RoleResources::Table)
                    .col(RoleResources::RoleId)
                    .col(RoleResources::ResourceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ── Create menus table ──
        manager
            .create_table(
                Table::create()
                    .table(Menus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Menus::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Menus::ParentId)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Menus::Title).string().not_null())
                    .col(ColumnDef::new(Menus::Name).string().not_null())
                    .col(ColumnDef::new(Menus::Icon).string().null())
                    .col(ColumnDef::new(Menus::Component).string().not_null())
                    .col(ColumnDef::new(Menus::Path).string().not_null())
                    .col(
                        ColumnDef::new(Menus::Hidden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Menus::Sort).integer().not_null().default(0))
                    .col(ColumnDef::new(Menus::CreateTime).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ── Create role_menus junction table ──
        manager
            .create_table(
                Table::create()
                    .table(RoleMenus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleMenus::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleMenus::RoleId).integer().not_null())
                    .col(ColumnDef::new(RoleMenus::MenuId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_menus_menu")
                            .from(RoleMenus::Table, RoleMenus::MenuId)
                            .to(Menus::Table, Menus::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_menus_unique")
                    .table(RoleMenus::Table)
                    .col(RoleMenus::RoleId)
                    .col(RoleMenus::MenuId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoleMenus::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Menus::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleResources::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Resources::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Resources {
    Table,
    Id,
    Name,
    Pattern,
    Method,
    Description,
}

#[derive(Iden)]
enum RoleResources {
    Table,
    Id,
    RoleId,
    ResourceId,
}

#[derive(Iden)]
enum Menus {
    Table,
    Id,
    ParentId,
    Title,
    Name,
    Icon,
    Component,
    Path,
    Hidden,
    Sort,
    CreateTime,
}

#[derive(Iden)]
enum RoleMenus {
    Table,
    Id,
    RoleId,
    MenuId,
}
