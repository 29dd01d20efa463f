//! Integration tests for the transactional provisioning workflow.

use provisr::config::ProvisioningConfig;
use provisr::db::{hash_session_token, Store};
use provisr::services::provision_service::{
    AccountInput, ConflictPolicy, ProvisionError, ProvisionService,
};
use provisr::services::provision_service_impl::SeaOrmProvisionService;

async fn fresh_store() -> Store {
    let db_path =
        std::env::temp_dir().join(format!("provisr-test-{}.db", uuid::Uuid::new_v4()));

    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to create test store")
}

fn service(store: Store, policy: ConflictPolicy) -> SeaOrmProvisionService {
    let settings = ProvisioningConfig {
        conflict_policy: policy,
        ..Default::default()
    };
    SeaOrmProvisionService::new(store, &settings)
}

fn input(username: &str, email: &str) -> AccountInput {
    AccountInput::new(username, email)
}

#[tokio::test]
async fn provisions_batch_with_roles_and_sessions() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let result = svc
        .provision_accounts(&[
            input("alice", "alice@example.com"),
            input("bob", "bob@example.com"),
        ])
        .await
        .expect("batch should provision");

    assert_eq!(result.created.len(), 2);
    assert!(result.skipped.is_empty());

    let ids = result.created_ids();
    assert_ne!(ids[0], ids[1]);

    let accounts = store.list_accounts_with_roles().await.unwrap();
    assert_eq!(accounts.len(), 2);

    for (account, roles) in &accounts {
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert!(
            names.contains(&"user"),
            "{} should hold the default role",
            account.username
        );

        let sessions = store.sessions_for_account(account.id).await.unwrap();
        assert_eq!(sessions.len(), 1, "exactly one session per new account");
    }
}

#[tokio::test]
async fn session_expires_roughly_a_day_out() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let result = svc
        .provision_accounts(&[input("alice", "alice@example.com")])
        .await
        .unwrap();

    let account_id = result.created[0].account_id;
    let sessions = store.sessions_for_account(account_id).await.unwrap();
    let expires = chrono::DateTime::parse_from_rfc3339(&sessions[0].expires_at)
        .expect("expires_at should be RFC 3339");

    let expected = chrono::Utc::now() + chrono::Duration::hours(24);
    let drift = (expected - expires.with_timezone(&chrono::Utc))
        .num_seconds()
        .abs();
    assert!(drift < 5, "expiry drifted {drift}s from now+24h");
}

#[tokio::test]
async fn raw_token_is_returned_once_and_only_its_hash_stored() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let result = svc
        .provision_accounts(&[input("alice", "alice@example.com")])
        .await
        .unwrap();

    let created = &result.created[0];
    let sessions = store.sessions_for_account(created.account_id).await.unwrap();
    let stored = &sessions[0].token_hash;

    assert!(stored.starts_with("sha256:"));
    assert!(!stored.contains(&created.session_token));
    assert_eq!(*stored, hash_session_token(&created.session_token));
}

#[tokio::test]
async fn short_username_fails_validation_and_persists_nothing() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let err = svc
        .provision_accounts(&[input("al", "al@example.com")])
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Validation { .. }));
    assert!(store.get_account_by_username("al").await.unwrap().is_none());
    assert_eq!(store.account_count().await.unwrap(), 0);
}

#[tokio::test]
async fn long_username_fails_validation() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let long = "a".repeat(51);
    let err = svc
        .provision_accounts(&[input(&long, "long@example.com")])
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Validation { .. }));
    assert_eq!(store.account_count().await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_email_fails_validation_and_persists_nothing() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let err = svc
        .provision_accounts(&[input("alice", "not-an-email")])
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Validation { .. }));
    assert_eq!(store.account_count().await.unwrap(), 0);
}

#[tokio::test]
async fn username_rule_wins_when_both_fields_are_bad() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let err = svc
        .provision_accounts(&[input("al", "bad")])
        .await
        .unwrap_err();

    match err {
        ProvisionError::Validation { username, reason } => {
            assert_eq!(username, "al");
            assert!(reason.contains("at least 3 characters"));
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert_eq!(store.account_count().await.unwrap(), 0);
}

#[tokio::test]
async fn validation_failure_rolls_back_earlier_candidates_in_batch() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    let err = svc
        .provision_accounts(&[
            input("alice", "alice@example.com"),
            input("x", "x@example.com"),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Validation { .. }));

    // Nothing from the batch survives, including the valid first candidate.
    assert_eq!(store.account_count().await.unwrap(), 0);
    assert!(store.list_active_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn store_fault_mid_batch_rolls_back_earlier_candidates() {
    use sea_orm::ConnectionTrait;

    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    // Simulate an infrastructure fault: session writes fail for every
    // candidate, so the first account insert must not survive either.
    store
        .conn
        .execute_unprepared("DROP TABLE sessions")
        .await
        .unwrap();

    let err = svc
        .provision_accounts(&[
            input("alice", "alice@example.com"),
            input("bob", "bob@example.com"),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Transaction(_)));
    assert_eq!(store.account_count().await.unwrap(), 0);
}

#[tokio::test]
async fn skip_policy_is_idempotent_across_calls() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);
    let candidate = input("alice", "alice@example.com");

    let first = svc.provision_accounts(&[candidate.clone()]).await.unwrap();
    assert_eq!(first.created.len(), 1);

    let second = svc.provision_accounts(&[candidate]).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.skipped, vec!["alice".to_string()]);

    assert_eq!(store.account_count().await.unwrap(), 1);

    // A skipped candidate gets no extra session.
    let account_id = first.created[0].account_id;
    assert_eq!(store.session_count_for_account(account_id).await.unwrap(), 1);
}

#[tokio::test]
async fn duplicate_email_counts_as_already_provisioned() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    svc.provision_accounts(&[input("alice", "alice@example.com")])
        .await
        .unwrap();

    let result = svc
        .provision_accounts(&[input("dave", "alice@example.com")])
        .await
        .unwrap();

    assert!(result.created.is_empty());
    assert_eq!(result.skipped, vec!["dave".to_string()]);
    assert_eq!(store.account_count().await.unwrap(), 1);
}

#[tokio::test]
async fn skip_policy_commits_remaining_candidates_around_a_duplicate() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    svc.provision_accounts(&[input("alice", "alice@example.com")])
        .await
        .unwrap();

    let result = svc
        .provision_accounts(&[
            input("alice", "alice@example.com"),
            input("bob", "bob@example.com"),
        ])
        .await
        .unwrap();

    assert_eq!(result.skipped, vec!["alice".to_string()]);
    assert_eq!(result.created.len(), 1);
    assert_eq!(result.created[0].username, "bob");
    assert_eq!(store.account_count().await.unwrap(), 2);
}

#[tokio::test]
async fn abort_policy_rolls_back_the_whole_batch_on_duplicate() {
    let store = fresh_store().await;

    service(store.clone(), ConflictPolicy::Skip)
        .provision_accounts(&[input("alice", "alice@example.com")])
        .await
        .unwrap();

    let strict = service(store.clone(), ConflictPolicy::Abort);
    let err = strict
        .provision_accounts(&[
            input("bob", "bob@example.com"),
            input("alice", "alice@example.com"),
        ])
        .await
        .unwrap_err();

    match err {
        ProvisionError::Conflict { username } => assert_eq!(username, "alice"),
        other => panic!("expected conflict error, got {other}"),
    }

    // Bob was inserted before the conflict but must not survive the rollback.
    assert!(store.get_account_by_username("bob").await.unwrap().is_none());
    assert_eq!(store.account_count().await.unwrap(), 1);
}

#[tokio::test]
async fn reference_roles_exist_after_any_provisioning_run() {
    let store = fresh_store().await;
    let svc = service(store.clone(), ConflictPolicy::Skip);

    svc.provision_accounts(&[]).await.unwrap();

    assert!(store.get_role_by_name("user").await.unwrap().is_some());
    assert!(store.get_role_by_name("admin").await.unwrap().is_some());
}

#[tokio::test]
async fn seeded_permission_grants_are_present() {
    let store = fresh_store().await;

    let grants = store.list_role_grants().await.unwrap();
    let admin = grants
        .iter()
        .find(|(role, _)| role.name == "admin")
        .expect("admin role should be seeded");

    let names: Vec<&str> = admin.1.iter().map(|p| p.name.as_str()).collect();
    assert!(names.contains(&"manage_users"));

    let user = grants.iter().find(|(role, _)| role.name == "user").unwrap();
    let names: Vec<&str> = user.1.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["read", "write"]);
}
