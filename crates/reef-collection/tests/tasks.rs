mod common;
use common::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use bson::Document;
use reef_collection::{CancellationToken, Collection, CollectionError};
use reef_query::{FilterNode, FindOptions, ProjectionSpec, Update, UpdateOp, field};
use reef_store::{BulkItem, DocumentStream, ItemAck, Store, StoreError, WriteAck};

#[tokio::test]
async fn task_surface_runs_the_same_core() {
    let orders = seeded();
    let tasks = orders.tasks();
    let cancel = CancellationToken::new();

    let open = tasks
        .find(
            Some(field("status").eq("open")),
            FindOptions::default(),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(open.len(), 2);

    let result = tasks
        .update_one(
            field("_id").eq("ord-1"),
            Update::new().inc("total", 1),
            false,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(result.modified_count, 1);

    let count = tasks.count(None, &cancel).await.unwrap();
    assert_eq!(count, 5);
}

#[tokio::test]
async fn bulk_submit_task() {
    let orders = seeded();
    let cancel = CancellationToken::new();

    let mut bulk = orders.bulk();
    bulk.insert(&order("ord-6", "kay", "open", 1.0, &[], "Faro"))
        .unwrap();
    bulk.delete_many(field("status").eq("cancelled")).unwrap();

    let result = bulk.submit_task(&cancel).await.unwrap();
    assert_eq!(result.inserted_count, 1);
    assert_eq!(result.deleted_count, 1);
}

/// A store whose writes block until released, counting every attempt.
struct GatedStore {
    attempts: AtomicUsize,
    gate: Mutex<mpsc::Receiver<()>>,
    release: Mutex<mpsc::Sender<()>>,
}

impl GatedStore {
    fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            attempts: AtomicUsize::new(0),
            gate: Mutex::new(receiver),
            release: Mutex::new(sender),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn release(&self) {
        let _ = self.release.lock().unwrap().send(());
    }

    fn blocked_write(&self) -> Result<WriteAck, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        // Bounded so a failing test cannot wedge runtime shutdown.
        let _ = self.gate.lock().unwrap().recv_timeout(Duration::from_secs(5));
        Ok(WriteAck {
            acknowledged: true,
            matched: 1,
            modified: 1,
            ..WriteAck::default()
        })
    }
}

impl Store for GatedStore {
    fn find(
        &self,
        _collection: &str,
        _filter: Option<&FilterNode>,
        _projection: Option<&ProjectionSpec>,
        _options: &FindOptions,
    ) -> Result<DocumentStream, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(std::iter::empty()))
    }

    fn insert_one(&self, _collection: &str, _document: Document) -> Result<WriteAck, StoreError> {
        self.blocked_write()
    }

    fn insert_many(
        &self,
        _collection: &str,
        _documents: Vec<Document>,
    ) -> Result<WriteAck, StoreError> {
        self.blocked_write()
    }

    fn replace_one(
        &self,
        _collection: &str,
        _filter: &FilterNode,
        _document: Document,
        _upsert: bool,
    ) -> Result<WriteAck, StoreError> {
        self.blocked_write()
    }

    fn update_one(
        &self,
        _collection: &str,
        _filter: &FilterNode,
        _ops: &[UpdateOp],
        _upsert: bool,
    ) -> Result<WriteAck, StoreError> {
        self.blocked_write()
    }

    fn update_many(
        &self,
        _collection: &str,
        _filter: &FilterNode,
        _ops: &[UpdateOp],
    ) -> Result<WriteAck, StoreError> {
        self.blocked_write()
    }

    fn delete_one(&self, _collection: &str, _filter: &FilterNode) -> Result<WriteAck, StoreError> {
        self.blocked_write()
    }

    fn delete_many(&self, _collection: &str, _filter: &FilterNode) -> Result<WriteAck, StoreError> {
        self.blocked_write()
    }

    fn bulk_write(
        &self,
        _collection: &str,
        _items: &[BulkItem],
    ) -> Result<Vec<ItemAck>, StoreError> {
        self.blocked_write().map(|ack| vec![ItemAck::Applied(ack)])
    }

    fn count(&self, _collection: &str, _filter: Option<&FilterNode>) -> Result<u64, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

#[tokio::test]
async fn cancelled_token_short_circuits_before_dispatch() {
    let store = Arc::new(GatedStore::new());
    let orders: Collection<Order, GatedStore> = Collection::new(Arc::clone(&store));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orders
        .tasks()
        .update_one(
            field("_id").eq("ord-1"),
            Update::new().set("status", "held"),
            false,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CollectionError::Cancelled));
    assert_eq!(store.attempts(), 0);
}

#[tokio::test]
async fn cancelling_in_flight_write_attempts_at_most_once() {
    let store = Arc::new(GatedStore::new());
    let orders: Collection<Order, GatedStore> = Collection::new(Arc::clone(&store));
    let cancel = CancellationToken::new();

    let pending = {
        let tasks = orders.tasks();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tasks
                .replace_one(
                    field("_id").eq("ord-1"),
                    order("ord-1", "ada", "open", 1.0, &[], "Lisbon"),
                    false,
                    &cancel,
                )
                .await
        })
    };

    // Wait for the write to reach the store, then cancel mid-flight.
    while store.attempts() == 0 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    cancel.cancel();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(CollectionError::Cancelled)));
    assert_eq!(store.attempts(), 1);

    // Let the abandoned worker finish so the runtime can shut down.
    store.release();
}
