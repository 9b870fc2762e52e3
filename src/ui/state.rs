use chrono::{Local, TimeZone};

use crate::common::{FeedCommand, FeedEvent};
use crate::identity::SessionContext;
use crate::sync::{Composer, Submit, SyncState, Synchronizer};

/// Local UI state: the synchronized message view plus the input box.
pub struct AppState<Tz: TimeZone = Local> {
    pub sync: Synchronizer<Tz>,
    pub composer: Composer,
    pub online_count: u32,
    connected: bool,
}

impl AppState<Local> {
    pub fn new(session: SessionContext) -> Self {
        Self::with_sync(Synchronizer::new(session), true)
    }

    /// State for an app whose startup failed: shows `notice`, never sends.
    pub fn disconnected(session: SessionContext, notice: &str) -> Self {
        let mut state = Self::with_sync(Synchronizer::new(session), false);
        state.sync.show_notice(notice);
        state
    }
}

impl<Tz: TimeZone> AppState<Tz>
where
    Tz::Offset: std::fmt::Display,
{
    pub fn with_sync(sync: Synchronizer<Tz>, connected: bool) -> Self {
        Self {
            sync,
            composer: Composer::new(),
            online_count: 0,
            connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Connected and the subscription has not failed.
    pub fn is_live(&self) -> bool {
        self.is_connected() && self.sync.state() == SyncState::Subscribed
    }

    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Snapshot(snapshot) => self.sync.apply_snapshot(&snapshot),
            FeedEvent::SubscriptionFailed(reason) => self.sync.apply_subscription_error(&reason),
            FeedEvent::Appended { request_id, id } => {
                log::debug!("Append {request_id} stored as {id}");
                self.composer.on_appended(request_id);
            }
            FeedEvent::AppendFailed { request_id, reason } => {
                log::warn!("Send failed: {reason}");
                self.send_failed(request_id);
            }
        }
    }

    /// Turns the current input into a feed command, if there is anything to send.
    pub fn submit(&mut self) -> Option<FeedCommand> {
        let session = self.connected.then(|| self.sync.session());
        match self.composer.submit(session) {
            Submit::Ignored => None,
            Submit::Notice(notice) => {
                self.sync.show_notice(notice);
                None
            }
            Submit::Append { request_id, record } => {
                Some(FeedCommand::Append { request_id, record })
            }
        }
    }

    pub fn send_failed(&mut self, request_id: u64) {
        if let Some(notice) = self.composer.on_append_failed(request_id) {
            self.sync.show_notice(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{MessageRecord, RecordKind};
    use crate::sync::compose::{NOT_CONNECTED_NOTICE, SEND_FAILED_NOTICE};
    use chrono::Utc;

    fn session() -> SessionContext {
        SessionContext {
            id: "user_me".to_string(),
            color: "#a8edea".to_string(),
            display_name: "Anonymous Relaxed".to_string(),
        }
    }

    fn state(connected: bool) -> AppState<Utc> {
        AppState::with_sync(Synchronizer::with_timezone(session(), Utc), connected)
    }

    fn mine(id: &str, text: &str) -> MessageRecord {
        MessageRecord {
            id: id.to_string(),
            text: text.to_string(),
            author_id: "user_me".to_string(),
            display_name: "Anonymous Relaxed".to_string(),
            color: "#a8edea".to_string(),
            sent_at: None,
            kind: RecordKind::User,
        }
    }

    fn request_id(command: Option<FeedCommand>) -> u64 {
        match command {
            Some(FeedCommand::Append { request_id, .. }) => request_id,
            None => panic!("expected a command"),
        }
    }

    #[test]
    fn ack_clears_input_before_snapshot_arrives() {
        let mut state = state(true);
        state.composer.input = "hello".to_string();
        let id = request_id(state.submit());

        state.handle_event(FeedEvent::Appended {
            request_id: id,
            id: "doc".to_string(),
        });

        assert!(state.composer.input.is_empty());
        assert!(state.sync.view().entries.is_empty());

        state.handle_event(FeedEvent::Snapshot(vec![mine("doc", "hello")]));
        assert_eq!(state.sync.view().entries.len(), 1);
        assert!(state.sync.view().entries[0].is_own());
    }

    #[test]
    fn failed_append_keeps_input_and_shows_notice() {
        let mut state = state(true);
        state.composer.input = "hello".to_string();
        let id = request_id(state.submit());

        state.handle_event(FeedEvent::AppendFailed {
            request_id: id,
            reason: "403".to_string(),
        });

        assert_eq!(state.composer.input, "hello");
        assert_eq!(state.sync.view().notice.as_deref(), Some(SEND_FAILED_NOTICE));
    }

    #[test]
    fn whitespace_input_sends_nothing() {
        let mut state = state(true);
        state.composer.input = "   ".to_string();
        assert!(state.submit().is_none());
        assert!(state.sync.view().notice.is_none());
    }

    #[test]
    fn disconnected_state_only_shows_notice() {
        let mut state = state(false);
        state.composer.input = "hello".to_string();

        assert!(state.submit().is_none());
        assert_eq!(state.sync.view().notice.as_deref(), Some(NOT_CONNECTED_NOTICE));
        assert!(!state.is_connected());
        assert!(!state.is_live());
    }

    #[test]
    fn subscription_failure_keeps_messages() {
        let mut state = state(true);
        state.handle_event(FeedEvent::Snapshot(vec![mine("1", "hi")]));
        state.handle_event(FeedEvent::SubscriptionFailed("unreachable".to_string()));

        assert_eq!(state.sync.view().entries.len(), 1);
        assert!(state.sync.view().notice.is_some());
        assert!(!state.is_live());
    }
}
