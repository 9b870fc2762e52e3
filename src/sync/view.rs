use std::collections::HashSet;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::common::{MessageRecord, RecordKind};
use crate::identity::SessionContext;

pub const JUST_NOW: &str = "just now";
pub const SUBSCRIPTION_FAILED_NOTICE: &str = "Failed to load messages. Restart the app.";

/// Sender decoration for messages written by someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderLabel {
    pub name: String,
    pub color: String,
}

/// One rendered message. `text` is kept verbatim; the renderer shows it as
/// plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub id: String,
    pub text: String,
    pub time: String,
    /// `None` for own messages.
    pub sender: Option<SenderLabel>,
}

impl MessageEntry {
    pub fn is_own(&self) -> bool {
        self.sender.is_none()
    }
}

/// What the chat area shows: the projected message list and the pinned notice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageView {
    pub entries: Vec<MessageEntry>,
    pub notice: Option<String>,
}

pub fn format_sent_at<Tz: TimeZone>(sent_at: Option<&DateTime<Utc>>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match sent_at {
        Some(sent_at) => sent_at.with_timezone(tz).format("%H:%M").to_string(),
        None => JUST_NOW.to_string(),
    }
}

/// Rebuilds the view from a full snapshot. The previous message list is
/// discarded; only its pinned notice carries over.
pub fn reconcile<Tz: TimeZone>(
    previous: &MessageView,
    snapshot: &[MessageRecord],
    session: &SessionContext,
    tz: &Tz,
) -> MessageView
where
    Tz::Offset: std::fmt::Display,
{
    let mut seen = HashSet::new();
    let entries = snapshot
        .iter()
        .filter(|record| seen.insert(record.id.clone()))
        .filter(|record| record.kind == RecordKind::User)
        .map(|record| MessageEntry {
            id: record.id.clone(),
            text: record.text.clone(),
            time: format_sent_at(record.sent_at.as_ref(), tz),
            sender: (!session.is_own(&record.author_id)).then(|| SenderLabel {
                name: record.display_name.clone(),
                color: record.color.clone(),
            }),
        })
        .collect();

    MessageView {
        entries,
        notice: previous.notice.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Subscribed,
    /// Terminal. Reconnecting means restarting the app.
    Errored,
}

/// Holds the rendered view and applies feed updates to it.
pub struct Synchronizer<Tz: TimeZone = Local> {
    session: SessionContext,
    tz: Tz,
    state: SyncState,
    view: MessageView,
    scroll_pending: bool,
}

impl Synchronizer<Local> {
    pub fn new(session: SessionContext) -> Self {
        Self::with_timezone(session, Local)
    }
}

impl<Tz: TimeZone> Synchronizer<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    pub fn with_timezone(session: SessionContext, tz: Tz) -> Self {
        Self {
            session,
            tz,
            state: SyncState::Subscribed,
            view: MessageView::default(),
            scroll_pending: false,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn view(&self) -> &MessageView {
        &self.view
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn apply_snapshot(&mut self, snapshot: &[MessageRecord]) {
        if self.state == SyncState::Errored {
            log::debug!(
                "Ignoring snapshot of {} records after subscription failure",
                snapshot.len()
            );
            return;
        }

        self.view = reconcile(&self.view, snapshot, &self.session, &self.tz);
        self.scroll_pending = true;
        log::debug!(
            "Rendered {} of {} records",
            self.view.entries.len(),
            snapshot.len()
        );
    }

    pub fn apply_subscription_error(&mut self, reason: &str) {
        if self.state == SyncState::Errored {
            return;
        }
        log::error!("Message subscription failed: {reason}");
        self.state = SyncState::Errored;
        self.show_notice(SUBSCRIPTION_FAILED_NOTICE);
    }

    pub fn show_notice(&mut self, text: impl Into<String>) {
        self.view.notice = Some(text.into());
        self.scroll_pending = true;
    }

    /// Returns true once after every re-render so the chat area can jump to
    /// the newest message.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }
}
