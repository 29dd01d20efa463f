use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{accounts, permissions, roles, sessions};

pub mod migrator;
pub mod repositories;

pub use repositories::session::{generate_session_token, hash_session_token};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn role_repo(&self) -> repositories::role::RoleRepository {
        repositories::role::RoleRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<accounts::Model>> {
        self.account_repo().get_by_username(username).await
    }

    pub async fn get_account(&self, id: i32) -> Result<Option<accounts::Model>> {
        self.account_repo().get_by_id(id).await
    }

    pub async fn list_accounts_with_roles(
        &self,
    ) -> Result<Vec<(accounts::Model, Vec<roles::Model>)>> {
        self.account_repo().list_with_roles().await
    }

    pub async fn account_count(&self) -> Result<u64> {
        self.account_repo().count().await
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<Option<roles::Model>> {
        self.role_repo().get_by_name(name).await
    }

    pub async fn list_role_grants(
        &self,
    ) -> Result<Vec<(roles::Model, Vec<permissions::Model>)>> {
        self.role_repo().list_grants().await
    }

    pub async fn list_active_sessions(
        &self,
    ) -> Result<Vec<(sessions::Model, Option<accounts::Model>)>> {
        self.session_repo().list_active().await
    }

    pub async fn sessions_for_account(&self, account_id: i32) -> Result<Vec<sessions::Model>> {
        self.session_repo().list_for_account(account_id).await
    }

    pub async fn session_count_for_account(&self, account_id: i32) -> Result<u64> {
        self.session_repo().count_for_account(account_id).await
    }
}
