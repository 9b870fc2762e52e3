use crate::common::NewRecord;
use crate::identity::SessionContext;

pub const SEND_FAILED_NOTICE: &str = "Failed to send message. Try again.";
pub const NOT_CONNECTED_NOTICE: &str = "Chat is not connected. Restart the app.";

/// Result of pressing send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submit {
    /// Nothing to do (blank input or a send already in flight).
    Ignored,
    Notice(&'static str),
    Append { request_id: u64, record: NewRecord },
}

/// Owns the input box text and turns it into append requests.
///
/// The input is only cleared once the feed acknowledges the append; a
/// rejected append leaves the text in place so the user can press send again.
#[derive(Debug, Default)]
pub struct Composer {
    pub input: String,
    next_request_id: u64,
    in_flight: Option<u64>,
    /// Trimmed text of the in-flight request.
    sent_text: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// `session` is `None` when startup failed and there is no feed to send to.
    pub fn submit(&mut self, session: Option<&SessionContext>) -> Submit {
        let text = self.input.trim();
        if text.is_empty() || self.in_flight.is_some() {
            return Submit::Ignored;
        }

        let Some(session) = session else {
            return Submit::Notice(NOT_CONNECTED_NOTICE);
        };

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.in_flight = Some(request_id);
        self.sent_text = text.to_string();

        Submit::Append {
            request_id,
            record: session.new_record(self.sent_text.clone()),
        }
    }

    /// Clears the input unless the user already typed something new.
    pub fn on_appended(&mut self, request_id: u64) {
        if self.in_flight == Some(request_id) {
            self.in_flight = None;
            if self.input.trim() == self.sent_text {
                self.input.clear();
            }
            self.sent_text.clear();
        }
    }

    /// Returns the notice to show, or `None` for a stale request id.
    pub fn on_append_failed(&mut self, request_id: u64) -> Option<&'static str> {
        if self.in_flight == Some(request_id) {
            self.in_flight = None;
            self.sent_text.clear();
            Some(SEND_FAILED_NOTICE)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionContext {
        SessionContext {
            id: "user_me".to_string(),
            color: "#43e97b".to_string(),
            display_name: "Netizen Fun".to_string(),
        }
    }

    fn composer(input: &str) -> Composer {
        let mut composer = Composer::new();
        composer.input = input.to_string();
        composer
    }

    #[test]
    fn blank_input_is_never_sent() {
        for input in ["", "   ", "\t\n "] {
            let mut composer = composer(input);
            assert_eq!(composer.submit(Some(&session())), Submit::Ignored);
            assert!(!composer.is_sending());
        }
    }

    #[test]
    fn submit_trims_and_builds_record() {
        let mut composer = composer("  hello there \n");

        let Submit::Append { record, .. } = composer.submit(Some(&session())) else {
            panic!("expected an append");
        };

        assert_eq!(record.text, "hello there");
        assert_eq!(record.author_id, "user_me");
        assert_eq!(record.display_name, "Netizen Fun");
        assert!(composer.is_sending());
    }

    #[test]
    fn disconnected_app_shows_notice() {
        let mut composer = composer("hi");
        assert_eq!(composer.submit(None), Submit::Notice(NOT_CONNECTED_NOTICE));
        assert_eq!(composer.input, "hi");
    }

    #[test]
    fn ack_clears_input() {
        let mut composer = composer("hi");
        let Submit::Append { request_id, .. } = composer.submit(Some(&session())) else {
            panic!("expected an append");
        };

        composer.on_appended(request_id);

        assert!(composer.input.is_empty());
        assert!(!composer.is_sending());
    }

    #[test]
    fn rejected_append_keeps_input_and_reports() {
        let mut composer = composer("hi");
        let Submit::Append { request_id, .. } = composer.submit(Some(&session())) else {
            panic!("expected an append");
        };

        assert_eq!(composer.on_append_failed(request_id), Some(SEND_FAILED_NOTICE));
        assert_eq!(composer.input, "hi");

        // the user can retry by hand
        assert!(matches!(
            composer.submit(Some(&session())),
            Submit::Append { .. }
        ));
    }

    #[test]
    fn second_submit_waits_for_first() {
        let mut composer = composer("hi");
        assert!(matches!(
            composer.submit(Some(&session())),
            Submit::Append { .. }
        ));
        assert_eq!(composer.submit(Some(&session())), Submit::Ignored);
    }

    #[test]
    fn ack_keeps_text_typed_after_send() {
        let mut composer = composer("first");
        let Submit::Append { request_id, .. } = composer.submit(Some(&session())) else {
            panic!("expected an append");
        };

        composer.input = "second thought".to_string();
        composer.on_appended(request_id);

        assert_eq!(composer.input, "second thought");
        assert!(!composer.is_sending());
    }

    #[test]
    fn stale_results_are_ignored() {
        let mut composer = composer("hi");
        composer.on_appended(42);
        assert_eq!(composer.input, "hi");
        assert_eq!(composer.on_append_failed(42), None);
    }
}
