use super::types::Snapshot;

/// Events sent from the feed task up to the UI.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Snapshot(Snapshot),
    /// The subscription is gone for good; no more snapshots will follow.
    SubscriptionFailed(String),
    Appended { request_id: u64, id: String },
    AppendFailed { request_id: u64, reason: String },
}
