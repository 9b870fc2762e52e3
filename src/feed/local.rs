use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use tokio::sync::watch;
use uuid::Uuid;

use crate::common::{MessageRecord, NewRecord, Snapshot};

use super::{FeedBackend, FeedError, FeedResult, ORDER_FIELD, SnapshotStream};

/// How long a record stays unstamped under latency compensation.
const PENDING_DELAY: Duration = Duration::from_millis(250);

/// In-process feed. Records live in a `watch` channel, so every subscriber
/// sees the latest full list after each append.
#[derive(Clone)]
pub struct LocalFeed {
    records: Arc<watch::Sender<Vec<MessageRecord>>>,
    /// Publish a just-appended record without a timestamp first, the way
    /// hosted stores show pending server timestamps.
    latency_compensation: bool,
}

impl LocalFeed {
    pub fn new(latency_compensation: bool) -> Self {
        Self::with_records(Vec::new(), latency_compensation)
    }

    pub fn with_records(records: Vec<MessageRecord>, latency_compensation: bool) -> Self {
        let (sender, _) = watch::channel(records);
        Self {
            records: Arc::new(sender),
            latency_compensation,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.borrow().len()
    }
}

/// Orders by `sent_at`; records still waiting for a timestamp go last.
fn ordered(mut records: Snapshot, ascending: bool) -> Snapshot {
    records.sort_by(|a, b| match (&a.sent_at, &b.sent_at) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    if !ascending {
        records.reverse();
    }
    records
}

impl FeedBackend for LocalFeed {
    async fn append(&self, record: NewRecord) -> FeedResult<String> {
        let id = Uuid::new_v4().simple().to_string();

        if self.latency_compensation {
            self.records
                .send_modify(|records| records.push(record.into_record(id.clone(), None)));
            tokio::time::sleep(PENDING_DELAY).await;
            self.records.send_modify(|records| {
                if let Some(pending) = records.iter_mut().find(|pending| pending.id == id) {
                    pending.sent_at = Some(Utc::now());
                }
            });
        } else {
            let stamped = record.into_record(id.clone(), Some(Utc::now()));
            self.records.send_modify(|records| records.push(stamped));
        }

        log::debug!("Local feed appended {id} ({} records)", self.record_count());
        Ok(id)
    }

    fn subscribe_ordered(&self, order_field: &str, ascending: bool) -> SnapshotStream {
        if order_field != ORDER_FIELD {
            let err = FeedError::Decode(format!("local feed cannot order by `{order_field}`"));
            return stream::once(async move { Err(err) }).boxed();
        }

        let receiver = self.records.subscribe();
        stream::unfold((receiver, true), move |(mut receiver, first)| async move {
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let snapshot = ordered(receiver.borrow_and_update().clone(), ascending);
            Some((Ok(snapshot), (receiver, false)))
        })
        .boxed()
    }
}
