use crate::entities::prelude::*;
use crate::entities::{permissions, role_permissions, roles};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Reference roles seeded alongside the permission catalog. The provisioning
/// workflow re-upserts its own reference roles on every run, so these are a
/// convenience baseline, not a dependency.
const SEED_ROLES: &[&str] = &["admin", "user", "moderator"];

const SEED_PERMISSIONS: &[&str] = &["read", "write", "delete", "manage_users"];

/// role name -> granted permission names
const SEED_GRANTS: &[(&str, &[&str])] = &[
    ("admin", &["read", "write", "delete", "manage_users"]),
    ("user", &["read", "write"]),
    ("moderator", &["read", "write", "delete"]),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Permissions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(RolePermissions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let conn = manager.get_connection();

        for name in SEED_ROLES {
            let insert = Roles::insert(roles::ActiveModel {
                name: Set((*name).to_string()),
                ..Default::default()
            })
            .on_conflict(
                OnConflict::column(roles::Column::Name)
                    .do_nothing()
                    .to_owned(),
            );
            ignore_conflict(insert.exec(conn).await)?;
        }

        for name in SEED_PERMISSIONS {
            let insert = Permissions::insert(permissions::ActiveModel {
                name: Set((*name).to_string()),
                ..Default::default()
            })
            .on_conflict(
                OnConflict::column(permissions::Column::Name)
                    .do_nothing()
                    .to_owned(),
            );
            ignore_conflict(insert.exec(conn).await)?;
        }

        for (role_name, permission_names) in SEED_GRANTS {
            let role_id = lookup_role_id(conn, role_name).await?;

            for permission_name in *permission_names {
                let permission_id = lookup_permission_id(conn, permission_name).await?;

                let insert = RolePermissions::insert(role_permissions::ActiveModel {
                    role_id: Set(role_id),
                    permission_id: Set(permission_id),
                })
                .on_conflict(
                    OnConflict::columns([
                        role_permissions::Column::RoleId,
                        role_permissions::Column::PermissionId,
                    ])
                    .do_nothing()
                    .to_owned(),
                );
                ignore_conflict(insert.exec(conn).await)?;
            }
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RolePermissions).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permissions).to_owned())
            .await?;

        Ok(())
    }
}

fn ignore_conflict<T>(result: Result<T, DbErr>) -> Result<(), DbErr> {
    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(err) => Err(err),
    }
}

async fn lookup_role_id<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    Roles::find()
        .filter(roles::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|r| r.id)
        .ok_or_else(|| DbErr::Custom(format!("seed role '{name}' missing after insert")))
}

async fn lookup_permission_id<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    Permissions::find()
        .filter(permissions::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|p| p.id)
        .ok_or_else(|| DbErr::Custom(format!("seed permission '{name}' missing after insert")))
}
