use std::sync::Arc;

use factom_open_api::application::SyncManager;
use factom_open_api::config::AppConfig;
use factom_open_api::infrastructure::factom::FactomdClient;
use factom_open_api::infrastructure::persistence::{DbPool, RepositoryFactory};
use factom_open_api::infrastructure::wallet::{Wallet, WalletdWallet};
use factom_open_api::utils::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let config = AppConfig::from_env();

    logging::log_factom_connection_details(
        &config.factom.url,
        &config.wallet.url,
        config.factom.user.is_some(),
    );

    let db_pool = DbPool::connect(&config.database).await?;
    let repositories = RepositoryFactory::create_repositories(&db_pool);

    let factomd = FactomdClient::new(&config.factom)?;
    let wallet = WalletdWallet::new(&config.wallet, factomd.clone())?;

    match wallet.balance().await {
        Ok(balance) => logging::log_info(&format!("Entry Credit balance: {}", balance)),
        Err(e) => logging::log_warning(&format!(
            "Entry Credit balance unavailable, writes will be retried: {}",
            e
        )),
    }

    let mut sync_manager = SyncManager::new(
        config,
        Arc::new(repositories),
        Arc::new(factomd),
        Arc::new(wallet),
    );
    sync_manager.start_all();

    let cancel = sync_manager.cancel_token();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                logging::log_error(&format!("Failed to listen for Ctrl+C: {}", e));
            }
            logging::log_info("Shutting down");
        }
        _ = cancel.cancelled() => {
            logging::log_error("Background tasks cancelled, shutting down");
        }
    }

    sync_manager.stop_all().await;

    Ok(())
}
