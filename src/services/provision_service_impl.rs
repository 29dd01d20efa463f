//! `SeaORM` implementation of the `ProvisionService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ProvisioningConfig;
use crate::db::repositories::session::{generate_session_token, hash_session_token};
use crate::db::Store;
use crate::entities::{account_roles, accounts, prelude::*, roles, sessions};
use crate::services::provision_service::{
    AccountInput, ConflictPolicy, ProvisionError, ProvisionResult, ProvisionService,
    ProvisionedAccount,
};

pub struct SeaOrmProvisionService {
    store: Store,
    policy: ConflictPolicy,
    default_role: String,
    reference_roles: Vec<String>,
    session_ttl_hours: i64,
}

impl SeaOrmProvisionService {
    #[must_use]
    pub fn new(store: Store, settings: &ProvisioningConfig) -> Self {
        Self {
            store,
            policy: settings.conflict_policy,
            default_role: settings.default_role.clone(),
            reference_roles: settings.reference_roles.clone(),
            session_ttl_hours: settings.session_ttl_hours,
        }
    }
}

#[async_trait]
impl ProvisionService for SeaOrmProvisionService {
    async fn provision_accounts(
        &self,
        candidates: &[AccountInput],
    ) -> Result<ProvisionResult, ProvisionError> {
        // One transaction scoped to the whole batch. Early returns drop the
        // transaction uncommitted, which rolls it back in full.
        let txn = self.store.conn.begin().await?;

        for role in &self.reference_roles {
            ensure_role(&txn, role).await?;
        }
        let default_role_id = lookup_role(&txn, &self.default_role).await?;

        let mut result = ProvisionResult::default();

        for candidate in candidates {
            candidate.validate()?;

            let Some(account_id) = insert_account(&txn, candidate).await? else {
                match self.policy {
                    ConflictPolicy::Skip => {
                        debug!("'{}' already provisioned, skipping", candidate.username);
                        result.skipped.push(candidate.username.clone());
                        continue;
                    }
                    ConflictPolicy::Abort => {
                        return Err(ProvisionError::Conflict {
                            username: candidate.username.clone(),
                        });
                    }
                }
            };

            assign_role(&txn, account_id, default_role_id).await?;
            let session_token =
                create_session(&txn, account_id, self.session_ttl_hours).await?;

            debug!("Provisioned '{}' (id {})", candidate.username, account_id);
            result.created.push(ProvisionedAccount {
                account_id,
                username: candidate.username.clone(),
                session_token,
            });
        }

        txn.commit().await?;

        info!(
            "Provisioned {} account(s), skipped {}",
            result.created.len(),
            result.skipped.len()
        );

        Ok(result)
    }
}

/// Insert-if-absent on the unique role name, then resolve the id.
async fn ensure_role<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, ProvisionError> {
    let insert = Roles::insert(roles::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(roles::Column::Name)
            .do_nothing()
            .to_owned(),
    );

    match insert.exec(conn).await {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(err) => return Err(err.into()),
    }

    lookup_role(conn, name).await
}

async fn lookup_role<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, ProvisionError> {
    Roles::find()
        .filter(roles::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|r| r.id)
        .ok_or_else(|| DbErr::Custom(format!("role '{name}' missing after upsert")).into())
}

/// Insert an account, returning its generated id, or `None` when the store
/// reports a uniqueness violation on username or email.
async fn insert_account<C: ConnectionTrait>(
    conn: &C,
    candidate: &AccountInput,
) -> Result<Option<i32>, ProvisionError> {
    let insert = Accounts::insert(accounts::ActiveModel {
        username: Set(candidate.username.clone()),
        email: Set(candidate.email.clone()),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    });

    match insert.exec(conn).await {
        Ok(res) => Ok(Some(res.last_insert_id)),
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Ok(None),
            _ => Err(err.into()),
        },
    }
}

async fn assign_role<C: ConnectionTrait>(
    conn: &C,
    account_id: i32,
    role_id: i32,
) -> Result<(), ProvisionError> {
    let insert = AccountRoles::insert(account_roles::ActiveModel {
        account_id: Set(account_id),
        role_id: Set(role_id),
    })
    .on_conflict(
        OnConflict::columns([
            account_roles::Column::AccountId,
            account_roles::Column::RoleId,
        ])
        .do_nothing()
        .to_owned(),
    );

    match insert.exec(conn).await {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Issue a session for the account and return the raw token.
async fn create_session<C: ConnectionTrait>(
    conn: &C,
    account_id: i32,
    ttl_hours: i64,
) -> Result<String, ProvisionError> {
    let token = generate_session_token();
    let now = Utc::now();

    Sessions::insert(sessions::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        account_id: Set(account_id),
        token_hash: Set(hash_session_token(&token)),
        expires_at: Set((now + Duration::hours(ttl_hours)).to_rfc3339()),
        created_at: Set(now.to_rfc3339()),
    })
    .exec(conn)
    .await?;

    Ok(token)
}
