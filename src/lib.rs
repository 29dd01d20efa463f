pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod services;

use clap::Parser;
pub use config::Config;
use db::Store;
use services::provision_service::{AccountInput, ProvisionService};
use services::provision_service_impl::SeaOrmProvisionService;
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        Some(cli::Commands::Provision { username, email }) => {
            cmd_provision(&config, &[AccountInput::new(&username, &email)]).await
        }

        Some(cli::Commands::Seed) => {
            let batch = [
                AccountInput::new("alice", "alice@example.com"),
                AccountInput::new("bob", "bob@example.com"),
                AccountInput::new("charlie", "charlie@example.com"),
            ];
            cmd_provision(&config, &batch).await?;
            cmd_list(&config).await
        }

        Some(cli::Commands::List) => cmd_list(&config).await,

        Some(cli::Commands::Sessions) => cmd_sessions(&config).await,

        Some(cli::Commands::Grants) => cmd_grants(&config).await,

        Some(cli::Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("✓ Config file created. Edit config.toml and run again.");
            } else {
                println!("Config file already exists.");
            }
            Ok(())
        }

        None => {
            use clap::CommandFactory;
            cli::Cli::command().print_help()?;
            Ok(())
        }
    }
}

async fn open_store(config: &Config) -> anyhow::Result<Store> {
    Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
}

async fn cmd_provision(config: &Config, candidates: &[AccountInput]) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let service = SeaOrmProvisionService::new(store, &config.provisioning);

    let result = service.provision_accounts(candidates).await?;

    for account in &result.created {
        println!("✓ Created: {} (ID: {})", account.username, account.account_id);
        println!("  Session token (shown once): {}", account.session_token);
    }

    for username in &result.skipped {
        println!("• Skipped: {} (already provisioned)", username);
    }

    println!();
    println!(
        "Provisioned {} account(s), skipped {}.",
        result.created.len(),
        result.skipped.len()
    );

    Ok(())
}

async fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let accounts = store.list_accounts_with_roles().await?;

    if accounts.is_empty() {
        println!("No accounts provisioned.");
        println!();
        println!("Add one with: provisr provision <username> <email>");
        return Ok(());
    }

    println!("Accounts ({} total)", accounts.len());
    println!("{:-<70}", "");

    for (account, roles) in accounts {
        let role_names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        println!("• {} ({})", account.username, account.email);
        println!(
            "  ID: {} | Roles: {} | Created: {}",
            account.id,
            role_names.join(", "),
            account.created_at
        );
    }

    Ok(())
}

async fn cmd_sessions(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let sessions = store.list_active_sessions().await?;

    if sessions.is_empty() {
        println!("No active sessions.");
        return Ok(());
    }

    println!("Active Sessions ({} total)", sessions.len());
    println!("{:-<70}", "");

    for (session, account) in sessions {
        let username = account
            .map(|a| a.username)
            .unwrap_or_else(|| format!("account #{}", session.account_id));
        println!("• {} - expires {}", username, session.expires_at);
    }

    Ok(())
}

async fn cmd_grants(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let grants = store.list_role_grants().await?;

    println!("Roles and Permissions");
    println!("{:-<70}", "");

    for (role, permissions) in grants {
        let names: Vec<&str> = permissions.iter().map(|p| p.name.as_str()).collect();
        if names.is_empty() {
            println!("• {} - (no grants)", role.name);
        } else {
            println!("• {} - {}", role.name, names.join(", "));
        }
    }

    Ok(())
}
