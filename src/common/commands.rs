use super::types::NewRecord;

/// Commands sent from the UI to the feed task.
#[derive(Debug, Clone)]
pub enum FeedCommand {
    /// Append a record; the outcome comes back as `Appended` or `AppendFailed`
    /// tagged with the same `request_id`.
    Append { request_id: u64, record: NewRecord },
}
