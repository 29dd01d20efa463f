//! Smoke tests for the store and migration runner.

use provisr::config::ProvisioningConfig;
use provisr::db::Store;
use provisr::services::provision_service::{AccountInput, ConflictPolicy, ProvisionService};
use provisr::services::provision_service_impl::SeaOrmProvisionService;

fn temp_db_url() -> String {
    let db_path =
        std::env::temp_dir().join(format!("provisr-store-test-{}.db", uuid::Uuid::new_v4()));
    format!("sqlite:{}", db_path.display())
}

#[tokio::test]
async fn store_connects_and_pings() {
    let store = Store::new(&temp_db_url()).await.expect("store");
    store.ping().await.expect("ping should succeed");
}

#[tokio::test]
async fn in_memory_url_connects_without_creating_a_file() {
    // A single-connection pool keeps every statement on the one in-memory
    // database. The path setup must not mistake ":memory:" for a file.
    let store = Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("in-memory store");
    store.ping().await.expect("ping");
    assert!(!std::path::Path::new(":memory:").exists());
}

#[tokio::test]
async fn migrations_are_idempotent_across_reconnects() {
    let url = temp_db_url();

    {
        let store = Store::new(&url).await.expect("first connect");
        let settings = ProvisioningConfig::default();
        SeaOrmProvisionService::new(store.clone(), &settings)
            .provision_accounts(&[AccountInput::new("alice", "alice@example.com")])
            .await
            .expect("provision");
        assert_eq!(store.account_count().await.unwrap(), 1);
    }

    // Reconnecting re-runs the migrator against an already-migrated schema
    // and must neither fail nor disturb existing rows.
    let store = Store::new(&url).await.expect("second connect");
    assert_eq!(store.account_count().await.unwrap(), 1);
    assert!(
        store
            .get_account_by_username("alice")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn accounts_list_is_ordered_by_username() {
    let store = Store::new(&temp_db_url()).await.expect("store");
    let settings = ProvisioningConfig {
        conflict_policy: ConflictPolicy::Skip,
        ..Default::default()
    };
    let svc = SeaOrmProvisionService::new(store.clone(), &settings);

    svc.provision_accounts(&[
        AccountInput::new("charlie", "charlie@example.com"),
        AccountInput::new("alice", "alice@example.com"),
        AccountInput::new("bob", "bob@example.com"),
    ])
    .await
    .unwrap();

    let usernames: Vec<String> = store
        .list_accounts_with_roles()
        .await
        .unwrap()
        .into_iter()
        .map(|(account, _)| account.username)
        .collect();

    assert_eq!(usernames, vec!["alice", "bob", "charlie"]);
}
