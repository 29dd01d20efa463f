use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::entities::{accounts, prelude::*, roles};

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<accounts::Model>> {
        let account = Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account by username")?;

        Ok(account)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<accounts::Model>> {
        let account = Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(account)
    }

    /// All accounts with their assigned roles, ordered by username.
    pub async fn list_with_roles(&self) -> Result<Vec<(accounts::Model, Vec<roles::Model>)>> {
        let rows = Accounts::find()
            .find_with_related(Roles)
            .order_by_asc(accounts::Column::Username)
            .order_by_asc(roles::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list accounts with roles")?;

        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64> {
        let total = Accounts::find()
            .count(&self.conn)
            .await
            .context("Failed to count accounts")?;

        Ok(total)
    }
}
