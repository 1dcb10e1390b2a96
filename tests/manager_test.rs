mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{bytes, Harness};
use factom_open_api::application::SyncManager;
use factom_open_api::config::{AppConfig, DatabaseConfig, FactomConfig, SyncConfig, WalletConfig};
use factom_open_api::domain::models::{Status, WORKER_FINISHED};
use factom_open_api::infrastructure::wallet::Wallet;

fn config() -> AppConfig {
    AppConfig {
        factom: FactomConfig {
            url: "http://localhost:8088/v2".to_string(),
            user: None,
            password: None,
            rpc_timeout: Duration::from_secs(1),
        },
        wallet: WalletConfig {
            url: "http://localhost:8089/v2".to_string(),
            ec_address: None,
            rpc_timeout: Duration::from_secs(1),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/factom".to_string(),
            ping_interval: Duration::from_millis(10),
            max_connections: 2,
            connect_timeout: Duration::from_secs(1),
        },
        sync: SyncConfig {
            workers: 2,
            scan_interval: Duration::from_millis(10),
            queue_process_interval: Duration::from_millis(10),
            queue_clear_interval: Duration::from_millis(10),
            ..SyncConfig::default()
        },
    }
}

fn manager(h: &Harness) -> SyncManager {
    let wallet: Arc<dyn Wallet> = h.wallet.clone();
    SyncManager::new(config(), h.store_dyn(), h.ledger_dyn(), wallet)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_background_tasks_process_and_backfill() {
    let h = Harness::new();
    let created = h
        .chains
        .create_chain(bytes(&["a"]), b"b".to_vec(), 1)
        .await
        .unwrap();
    let (chain_id, _) = h.ledger.publish_chain(bytes(&["a"]), b"b");

    let mut manager = manager(&h);
    manager.start_all();

    let wallet = h.wallet.clone();
    wait_for(move || !wallet.committed_chains().is_empty()).await;

    let store = h.store.clone();
    let id = chain_id.clone();
    wait_for(move || store.chain(&id).map_or(false, |c| c.worker_id == WORKER_FINISHED)).await;

    let chain = h.store.chain(&chain_id).unwrap();
    assert_eq!(chain.status, Status::Completed);
    assert_eq!(chain.synced, Some(true));
    assert_eq!(
        h.store.entry(&created.first_entry_hash).unwrap().status,
        Status::Completed
    );

    manager.stop_all().await;
    assert!(manager.cancel_token().is_cancelled());
}

#[tokio::test]
async fn test_lost_database_cancels_tasks() {
    let h = Harness::new();
    let mut manager = manager(&h);
    let cancel = manager.cancel_token();

    manager.start_all();
    h.store.set_ping_failure(true);

    tokio::time::timeout(Duration::from_secs(2), cancel.cancelled())
        .await
        .expect("watchdog did not cancel");

    tokio::time::timeout(Duration::from_secs(2), manager.stop_all())
        .await
        .expect("tasks did not stop");
}
