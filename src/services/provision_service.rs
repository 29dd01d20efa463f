//! Domain service for transactional account provisioning.
//!
//! Validates candidate accounts and creates accounts, default role
//! assignments, and sessions atomically within a single transaction.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

/// Errors specific to the provisioning workflow.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A candidate failed field validation. Always aborts the whole batch.
    #[error("Validation failed for '{username}': {reason}")]
    Validation { username: String, reason: String },

    /// A uniqueness violation under the abort policy.
    #[error("Account '{username}' already exists")]
    Conflict { username: String },

    /// Infrastructure fault. Always fatal to the call; the transaction is
    /// rolled back in full.
    #[error("Transaction failed: {0}")]
    Transaction(#[from] sea_orm::DbErr),
}

/// What to do when a candidate collides with an existing account.
///
/// Exactly one policy applies to a whole workflow instance; the two are
/// never mixed within a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Treat the candidate as already provisioned, record it as skipped,
    /// and keep going. Safe for repeated runs over the same input.
    #[default]
    Skip,

    /// Fail the call; the transaction rolls back and nothing from the
    /// batch is persisted.
    Abort,
}

/// A candidate account to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInput {
    pub username: String,
    pub email: String,
}

impl AccountInput {
    #[must_use]
    pub fn new(username: &str, email: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
        }
    }

    /// Field validation, first failing rule wins: username length is
    /// checked before the email pattern.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.username.chars().count() < 3 {
            return Err(self.invalid("username must be at least 3 characters"));
        }
        if self.username.chars().count() > 50 {
            return Err(self.invalid("username must be at most 50 characters"));
        }
        if !email_regex().is_match(&self.email) {
            return Err(self.invalid("invalid email format"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> ProvisionError {
        ProvisionError::Validation {
            username: self.username.clone(),
            reason: reason.to_string(),
        }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Invalid regex pattern defined in code")
    })
}

/// One successfully provisioned account.
///
/// `session_token` is the raw session secret, surfaced to the caller
/// exactly once. Only its hash is stored.
#[derive(Debug, Clone)]
pub struct ProvisionedAccount {
    pub account_id: i32,
    pub username: String,
    pub session_token: String,
}

/// Final disposition of a provisioning call.
#[derive(Debug, Default)]
pub struct ProvisionResult {
    pub created: Vec<ProvisionedAccount>,
    pub skipped: Vec<String>,
}

impl ProvisionResult {
    #[must_use]
    pub fn created_ids(&self) -> Vec<i32> {
        self.created.iter().map(|a| a.account_id).collect()
    }
}

/// Domain service trait for account provisioning.
#[async_trait::async_trait]
pub trait ProvisionService: Send + Sync {
    /// Provisions a batch of candidate accounts in one atomic transaction.
    ///
    /// Reference roles are upserted first, then each candidate is
    /// validated, inserted, given the default role, and issued a session.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] if any candidate fails field
    /// validation (the whole batch rolls back),
    /// [`ProvisionError::Conflict`] for a duplicate under the abort
    /// policy, and [`ProvisionError::Transaction`] for store-level faults.
    async fn provision_accounts(
        &self,
        candidates: &[AccountInput],
    ) -> Result<ProvisionResult, ProvisionError>;
}
