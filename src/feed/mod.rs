pub mod client;
pub mod firestore;
pub mod local;

use std::future::Future;

use futures::stream::BoxStream;
use thiserror::Error;

use crate::common::{NewRecord, Snapshot};

pub use client::FeedClient;
pub use firestore::FirestoreFeed;
pub use local::LocalFeed;

/// Field the collection is ordered by.
pub const ORDER_FIELD: &str = "timestamp";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("malformed feed response: {0}")]
    Decode(String),
    #[error("feed closed")]
    Closed,
}

pub type FeedResult<T> = Result<T, FeedError>;

pub type SnapshotStream = BoxStream<'static, FeedResult<Snapshot>>;

/// Realtime ordered collection the chat reads from and appends to.
pub trait FeedBackend: Clone + Send + Sync + 'static {
    /// Adds a record; the backend assigns the id and the server timestamp.
    fn append(&self, record: NewRecord) -> impl Future<Output = FeedResult<String>> + Send;

    /// Yields the full ordered record list on every change. An `Err` item is
    /// terminal: the stream ends after it.
    fn subscribe_ordered(&self, order_field: &str, ascending: bool) -> SnapshotStream;
}
