mod common;

use std::sync::Arc;

use common::{bytes, MemoryStore, MockLedger};
use factom_open_api::application::sync::{BackfillOutcome, Backfiller, EntryBlockWalker};
use factom_open_api::domain::errors::SyncError;
use factom_open_api::domain::models::{Chain, Status, ZERO_HASH};
use factom_open_api::infrastructure::factom::LedgerClient;
use factom_open_api::infrastructure::persistence::Store;

/// A ledger chain of three blocks: genesis with the first entry, then two blocks of two entries
fn three_block_chain(ledger: &MockLedger) -> (String, Vec<String>) {
    let (chain_id, genesis) = ledger.publish_chain(bytes(&["a"]), b"b");
    let second = ledger.append_block(
        &chain_id,
        vec![(bytes(&["x"]), b"1".to_vec()), (vec![], b"2".to_vec())],
    );
    let third = ledger.append_block(
        &chain_id,
        vec![(bytes(&["y", "z"]), b"3".to_vec()), (vec![], b"4".to_vec())],
    );
    (chain_id, vec![genesis, second, third])
}

fn walker(store: &Arc<MemoryStore>, ledger: &Arc<MockLedger>) -> EntryBlockWalker {
    let store: Arc<dyn Store> = store.clone();
    let ledger: Arc<dyn LedgerClient> = ledger.clone();
    EntryBlockWalker::new(store, ledger)
}

#[tokio::test]
async fn test_full_walk_reaches_genesis() {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let (chain_id, blocks) = three_block_chain(&ledger);
    store.put_chain(Chain::discovered(&chain_id, Status::Completed, Some(blocks[2].clone())));

    let walked = walker(&store, &ledger)
        .walk(&chain_id, &blocks[2], ZERO_HASH, true)
        .await
        .unwrap();

    assert_eq!(walked, 3);
    assert_eq!(store.eblock_count(), 3);
    assert_eq!(store.binding_count(), 5);

    let entries = store.entries_of(&chain_id);
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(|e| e.status == Status::Completed));
    assert!(entries.iter().all(|e| e.factom_time.is_some()));

    let chain = store.chain(&chain_id).unwrap();
    assert_eq!(chain.synced, Some(true));
    assert_eq!(chain.ext_ids, bytes(&["a"]));
    assert_eq!(chain.earliest_entry_block.as_deref(), Some(blocks[0].as_str()));
}

#[tokio::test]
async fn test_walk_excludes_lower_boundary() {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let (chain_id, blocks) = three_block_chain(&ledger);
    store.put_chain(Chain::discovered(&chain_id, Status::Completed, Some(blocks[0].clone())));

    let walked = walker(&store, &ledger)
        .walk(&chain_id, &blocks[2], &blocks[0], false)
        .await
        .unwrap();

    assert_eq!(walked, 2);
    assert_eq!(ledger.block_fetches(), vec![blocks[2].clone(), blocks[1].clone()]);
    assert_eq!(store.entries_of(&chain_id).len(), 4);

    let chain = store.chain(&chain_id).unwrap();
    assert_eq!(chain.synced, Some(false));
    assert_eq!(chain.earliest_entry_block, None);
}

#[tokio::test]
async fn test_interrupted_walk_resumes_from_earliest_block() {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let (chain_id, blocks) = three_block_chain(&ledger);
    store.put_chain(Chain::discovered(&chain_id, Status::Completed, Some(blocks[2].clone())));

    ledger.fail_block(&blocks[0]);
    let result = walker(&store, &ledger)
        .walk(&chain_id, &blocks[2], ZERO_HASH, true)
        .await;
    assert!(matches!(result, Err(SyncError::LedgerError(_))));

    let chain = store.chain(&chain_id).unwrap();
    assert_eq!(chain.earliest_entry_block.as_deref(), Some(blocks[1].as_str()));
    assert_eq!(chain.synced, Some(false));
    assert_eq!(store.entries_of(&chain_id).len(), 4);

    ledger.heal_block(&blocks[0]);
    let store_dyn: Arc<dyn Store> = store.clone();
    let ledger_dyn: Arc<dyn LedgerClient> = ledger.clone();
    let outcome = Backfiller::new(store_dyn, ledger_dyn)
        .backfill(0, &chain_id)
        .await
        .unwrap();

    // The head block is not fetched again
    assert_eq!(outcome, BackfillOutcome::Synced { blocks: 2 });
    assert_eq!(
        ledger.block_fetches(),
        vec![
            blocks[2].clone(),
            blocks[1].clone(),
            blocks[0].clone(),
            blocks[1].clone(),
            blocks[0].clone()
        ]
    );

    // Same result as an uninterrupted walk
    let mut hashes: Vec<String> = store
        .entries_of(&chain_id)
        .into_iter()
        .map(|e| e.entry_hash)
        .collect();
    hashes.sort();
    hashes.dedup();
    assert_eq!(hashes.len(), 5);
    assert_eq!(store.entries_of(&chain_id).len(), 5);

    let chain = store.chain(&chain_id).unwrap();
    assert_eq!(chain.synced, Some(true));
    assert_eq!(chain.ext_ids, bytes(&["a"]));
}

#[tokio::test]
async fn test_entries_take_listed_timestamps() {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let (chain_id, blocks) = three_block_chain(&ledger);

    walker(&store, &ledger)
        .walk(&chain_id, &blocks[1], &blocks[0], false)
        .await
        .unwrap();

    let block = ledger.entry_block(&blocks[1]).await.unwrap();
    for listed in &block.entries {
        let stored = store.entry(&listed.entry_hash).unwrap();
        assert_eq!(
            stored.factom_time.map(|t| t.timestamp()),
            Some(listed.timestamp)
        );
    }
}

#[tokio::test]
async fn test_rewalk_is_idempotent() {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let (chain_id, blocks) = three_block_chain(&ledger);
    store.put_chain(Chain::discovered(&chain_id, Status::Completed, None));

    let walker = walker(&store, &ledger);
    walker.walk(&chain_id, &blocks[2], ZERO_HASH, true).await.unwrap();
    walker.walk(&chain_id, &blocks[2], ZERO_HASH, true).await.unwrap();

    assert_eq!(store.entries_of(&chain_id).len(), 5);
    assert_eq!(store.eblock_count(), 3);
    assert_eq!(store.binding_count(), 5);
}

#[tokio::test]
async fn test_walk_runs_on_spawned_task() {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let (chain_id, blocks) = three_block_chain(&ledger);
    store.put_chain(Chain::discovered(&chain_id, Status::Completed, Some(blocks[2].clone())));

    let walker = walker(&store, &ledger);
    let id = chain_id.clone();
    let head = blocks[2].clone();
    let walked = tokio::spawn(async move { walker.walk(&id, &head, ZERO_HASH, true).await })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(walked, 3);
    assert_eq!(store.entries_of(&chain_id).len(), 5);
    assert!(store.chain(&chain_id).unwrap().is_synced());
}
