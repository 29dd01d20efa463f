use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{permissions, prelude::*, roles};

pub struct RoleRepository {
    conn: DatabaseConnection,
}

impl RoleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<roles::Model>> {
        let role = Roles::find()
            .filter(roles::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query role by name")?;

        Ok(role)
    }

    /// Every role with the permissions granted to it, ordered by role name.
    pub async fn list_grants(&self) -> Result<Vec<(roles::Model, Vec<permissions::Model>)>> {
        let rows = Roles::find()
            .find_with_related(Permissions)
            .order_by_asc(roles::Column::Name)
            .order_by_asc(permissions::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list role permission grants")?;

        Ok(rows)
    }
}
