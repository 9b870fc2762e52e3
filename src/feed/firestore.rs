//! Cloud Firestore over its REST API.
//!
//! Appends go through `documents:commit` with a server-timestamp transform so
//! the store, not the client, decides ordering. The REST API has no push
//! channel, so the subscription polls `documents:runQuery` and only emits when
//! the ordered result changed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::{self, MissedTickBehavior};

use crate::common::{MessageRecord, NewRecord, RecordKind, Snapshot};

use super::{FeedBackend, FeedError, FeedResult, SnapshotStream};

pub const API_ROOT: &str = "https://firestore.googleapis.com/v1";
const DOCUMENT_ID_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    /// `API_ROOT` outside tests and emulators.
    pub api_root: String,
    pub project_id: String,
    pub database: String,
    pub collection: String,
    pub api_key: Option<String>,
    pub poll_interval: Duration,
    /// Upper bound for one HTTP exchange, connect to last body byte.
    pub request_timeout: Duration,
}

impl FirestoreSettings {
    fn database_path(&self) -> String {
        format!(
            "projects/{}/databases/{}/documents",
            self.project_id, self.database
        )
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}:{method}", self.api_root, self.database_path())
    }

    fn document_name(&self, document_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.database_path(),
            self.collection,
            document_id
        )
    }
}

#[derive(Clone)]
pub struct FirestoreFeed {
    http: reqwest::Client,
    settings: Arc<FirestoreSettings>,
}

impl FirestoreFeed {
    pub fn new(settings: FirestoreSettings) -> FeedResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("anon_chat/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            http,
            settings: Arc::new(settings),
        })
    }

    async fn post(&self, method: &str, body: &Value) -> FeedResult<String> {
        let mut request = self.http.post(self.settings.endpoint(method)).json(body);
        if let Some(key) = &self.settings.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FeedError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn run_query(&self, order_field: &str, ascending: bool) -> FeedResult<Snapshot> {
        let body = query_body(&self.settings.collection, order_field, ascending);
        let response = self.post("runQuery", &body).await?;
        decode_run_query(&response)
    }
}

fn new_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LEN)
        .map(char::from)
        .collect()
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn commit_body(settings: &FirestoreSettings, document_id: &str, record: &NewRecord) -> Value {
    json!({
        "writes": [{
            "update": {
                "name": settings.document_name(document_id),
                "fields": {
                    "text": string_value(&record.text),
                    "userId": string_value(&record.author_id),
                    "userName": string_value(&record.display_name),
                    "userColor": string_value(&record.color),
                    "type": string_value(record.kind.as_str()),
                }
            },
            "updateTransforms": [{
                "fieldPath": super::ORDER_FIELD,
                "setToServerValue": "REQUEST_TIME"
            }],
            "currentDocument": { "exists": false }
        }]
    })
}

fn query_body(collection: &str, order_field: &str, ascending: bool) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": collection }],
            "orderBy": [{
                "field": { "fieldPath": order_field },
                "direction": if ascending { "ASCENDING" } else { "DESCENDING" }
            }]
        }
    })
}

#[derive(Debug, Deserialize)]
struct QueryItem {
    document: Option<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl Document {
    fn string(&self, field: &str) -> Option<&str> {
        self.fields.get(field)?.get("stringValue")?.as_str()
    }

    fn timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>, String> {
        let Some(raw) = self
            .fields
            .get(field)
            .and_then(|value| value.get("timestampValue"))
            .and_then(Value::as_str)
        else {
            return Ok(None);
        };

        DateTime::parse_from_rfc3339(raw)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|err| format!("bad timestamp `{raw}`: {err}"))
    }

    fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// `None` for documents this client cannot show; they are logged and skipped.
    fn into_record(self) -> Option<MessageRecord> {
        let (Some(text), Some(author_id), Some(kind)) = (
            self.string("text"),
            self.string("userId"),
            self.string("type"),
        ) else {
            log::warn!("Skipping document {} with missing fields", self.name);
            return None;
        };

        let sent_at = match self.timestamp(super::ORDER_FIELD) {
            Ok(sent_at) => sent_at,
            Err(reason) => {
                log::warn!("Skipping document {}: {reason}", self.name);
                return None;
            }
        };

        Some(MessageRecord {
            id: self.id().to_string(),
            text: text.to_string(),
            author_id: author_id.to_string(),
            display_name: self.string("userName").unwrap_or_default().to_string(),
            color: self.string("userColor").unwrap_or_default().to_string(),
            sent_at,
            kind: RecordKind::from(kind),
        })
    }
}

fn decode_run_query(body: &str) -> FeedResult<Snapshot> {
    let items: Vec<QueryItem> =
        serde_json::from_str(body).map_err(|err| FeedError::Decode(err.to_string()))?;

    Ok(items
        .into_iter()
        .filter_map(|item| item.document)
        .filter_map(Document::into_record)
        .collect())
}

impl FeedBackend for FirestoreFeed {
    async fn append(&self, record: NewRecord) -> FeedResult<String> {
        let document_id = new_document_id();
        let body = commit_body(&self.settings, &document_id, &record);
        self.post("commit", &body).await?;
        log::debug!("Committed document {document_id}");
        Ok(document_id)
    }

    fn subscribe_ordered(&self, order_field: &str, ascending: bool) -> SnapshotStream {
        let mut ticker = time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let state = PollState {
            feed: self.clone(),
            order_field: order_field.to_string(),
            ascending,
            ticker,
            last: None,
            finished: false,
        };

        stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }
            loop {
                state.ticker.tick().await;
                let result = state
                    .feed
                    .run_query(&state.order_field, state.ascending)
                    .await;
                match result {
                    Ok(snapshot) if state.last.as_ref() == Some(&snapshot) => continue,
                    Ok(snapshot) => {
                        state.last = Some(snapshot.clone());
                        return Some((Ok(snapshot), state));
                    }
                    Err(err) => {
                        state.finished = true;
                        return Some((Err(err), state));
                    }
                }
            }
        })
        .boxed()
    }
}

struct PollState {
    feed: FirestoreFeed,
    order_field: String,
    ascending: bool,
    ticker: time::Interval,
    last: Option<Snapshot>,
    finished: bool,
}
