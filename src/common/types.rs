use chrono::{DateTime, Utc};

/// Discriminator of a feed record. Only `User` records are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    User,
    Other(String),
}

impl RecordKind {
    pub const USER: &'static str = "user";

    pub fn as_str(&self) -> &str {
        match self {
            RecordKind::User => Self::USER,
            RecordKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for RecordKind {
    fn from(value: &str) -> Self {
        if value == Self::USER {
            RecordKind::User
        } else {
            RecordKind::Other(value.to_string())
        }
    }
}

/// A message document as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub display_name: String,
    pub color: String,
    /// Server-assigned; `None` while the backend has not stamped the record yet.
    pub sent_at: Option<DateTime<Utc>>,
    pub kind: RecordKind,
}

/// Outgoing record. The feed assigns `id` and `sent_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub text: String,
    pub author_id: String,
    pub display_name: String,
    pub color: String,
    pub kind: RecordKind,
}

impl NewRecord {
    pub fn into_record(self, id: String, sent_at: Option<DateTime<Utc>>) -> MessageRecord {
        MessageRecord {
            id,
            text: self.text,
            author_id: self.author_id,
            display_name: self.display_name,
            color: self.color,
            sent_at,
            kind: self.kind,
        }
    }
}

/// Full ordered list of records, delivered on every feed change.
pub type Snapshot = Vec<MessageRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_preserved() {
        let kind = RecordKind::from("join");
        assert_eq!(kind, RecordKind::Other("join".to_string()));
        assert_eq!(kind.as_str(), "join");
        assert_eq!(RecordKind::from("user"), RecordKind::User);
    }
}
