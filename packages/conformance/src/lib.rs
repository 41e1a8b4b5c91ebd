//! Shared helpers for the portfolio conformance test suite.
//!
//! Provides [`spawn_server`], which binds a `TcpListener` on an ephemeral
//! port, wires up an in-process server backed by `MemoryStorage`, and returns
//! both the local URL and the storage so tests can seed records without going
//! through HTTP. [`RecordingStorage`] is a storage that does nothing and
//! counts how often it was asked to.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use portfolio::{Predicate, Record, RecordSchema, Row};
use portfolio_server::{
    build_router,
    storage::{memory::MemoryStorage, Storage, StorageError},
    ResourceRegistry,
};

/// Start an ephemeral in-process server and return `(base_url, storage)`.
///
/// The server runs in a background `tokio` task bound to an OS-assigned port
/// on `127.0.0.1`. The returned `String` is the base URL, e.g.
/// `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_server() -> (String, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let base_url = spawn_server_with(Arc::clone(&storage) as Arc<dyn Storage>).await;
    (base_url, storage)
}

/// Start an ephemeral in-process server over `storage` and return its base URL.
pub async fn spawn_server_with(storage: Arc<dyn Storage>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let router = build_router(storage, ResourceRegistry::portfolio());
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance server error");
    });

    format!("http://{addr}")
}

/// A storage that answers every call with an empty result and counts it.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    calls: AtomicUsize,
}

impl RecordingStorage {
    /// Number of storage calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn create(
        &self,
        _schema: &'static RecordSchema,
        row: Row,
    ) -> Result<Record, StorageError> {
        self.record();
        Ok(Record::new(1, row))
    }

    async fn get(
        &self,
        _schema: &'static RecordSchema,
        _pk: i64,
    ) -> Result<Option<Record>, StorageError> {
        self.record();
        Ok(None)
    }

    async fn filter(
        &self,
        _schema: &'static RecordSchema,
        _predicates: &[Predicate],
    ) -> Result<Vec<Record>, StorageError> {
        self.record();
        Ok(Vec::new())
    }

    async fn delete(&self, _schema: &'static RecordSchema, _pk: i64) -> Result<bool, StorageError> {
        self.record();
        Ok(false)
    }

    async fn delete_matching(
        &self,
        _schema: &'static RecordSchema,
        _predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        self.record();
        Ok(0)
    }
}
