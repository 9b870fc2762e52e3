use std::error::Error;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::common::{FeedCommand, FeedEvent, NewRecord};

use super::{FeedBackend, FeedError, ORDER_FIELD};

/// Bridges a feed backend and the UI: forwards snapshots up, runs appends
/// coming down.
pub struct FeedClient<B: FeedBackend> {
    backend: B,
    event_sender: mpsc::Sender<FeedEvent>,
    command_receiver: mpsc::Receiver<FeedCommand>,
}

impl<B: FeedBackend> FeedClient<B> {
    pub fn new(
        backend: B,
        event_sender: mpsc::Sender<FeedEvent>,
        command_receiver: mpsc::Receiver<FeedCommand>,
    ) -> Self {
        Self {
            backend,
            event_sender,
            command_receiver,
        }
    }

    /// Runs until the UI drops its command sender.
    pub async fn run(mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut updates = self.backend.subscribe_ordered(ORDER_FIELD, true);
        let mut subscribed = true;
        log::info!("Feed event loop started");

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                }
                update = updates.next(), if subscribed => {
                    match update {
                        Some(Ok(snapshot)) => {
                            log::debug!("Snapshot with {} records", snapshot.len());
                            self.event_sender.send(FeedEvent::Snapshot(snapshot)).await?;
                        }
                        Some(Err(err)) => {
                            subscribed = false;
                            log::error!("Subscription failed: {err}");
                            self.event_sender
                                .send(FeedEvent::SubscriptionFailed(err.to_string()))
                                .await?;
                        }
                        None => {
                            subscribed = false;
                            log::warn!("Subscription ended without an error");
                            self.event_sender
                                .send(FeedEvent::SubscriptionFailed(FeedError::Closed.to_string()))
                                .await?;
                        }
                    }
                }
            }
        }

        log::info!("Feed event loop stopped");
        Ok(())
    }

    fn handle_command(&self, command: FeedCommand) {
        match command {
            FeedCommand::Append { request_id, record } => self.spawn_append(request_id, record),
        }
    }

    /// Appends run on their own task; the written record shows up through the
    /// subscription, only the ack or failure comes back here.
    fn spawn_append(&self, request_id: u64, record: NewRecord) {
        let backend = self.backend.clone();
        let event_sender = self.event_sender.clone();

        tokio::spawn(async move {
            let event = match backend.append(record).await {
                Ok(id) => FeedEvent::Appended { request_id, id },
                Err(err) => {
                    log::warn!("Append {request_id} failed: {err}");
                    FeedEvent::AppendFailed {
                        request_id,
                        reason: err.to_string(),
                    }
                }
            };

            if let Err(err) = event_sender.send(event).await {
                log::warn!("Failed to notify UI about append {request_id}: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RecordKind, Snapshot};
    use crate::feed::{FeedResult, LocalFeed, SnapshotStream};
    use futures::stream;

    fn new_record(text: &str) -> NewRecord {
        NewRecord {
            text: text.to_string(),
            author_id: "user_me".to_string(),
            display_name: "Virtual Pal Fun".to_string(),
            color: "#38f9d7".to_string(),
            kind: RecordKind::User,
        }
    }

    /// Rejects every append and fails the subscription after one snapshot.
    #[derive(Clone)]
    struct BrokenFeed;

    impl FeedBackend for BrokenFeed {
        async fn append(&self, _record: NewRecord) -> FeedResult<String> {
            Err(FeedError::Rejected {
                status: 403,
                body: "permission denied".to_string(),
            })
        }

        fn subscribe_ordered(&self, _order_field: &str, _ascending: bool) -> SnapshotStream {
            let items: Vec<FeedResult<Snapshot>> = vec![Ok(Vec::new()), Err(FeedError::Closed)];
            stream::iter(items).boxed()
        }
    }

    fn start<B: FeedBackend>(
        backend: B,
    ) -> (mpsc::Sender<FeedCommand>, mpsc::Receiver<FeedEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(16);
        tokio::spawn(FeedClient::new(backend, event_tx, cmd_rx).run());
        (cmd_tx, event_rx)
    }

    #[tokio::test]
    async fn appended_record_comes_back_through_snapshot() {
        let (cmd_tx, mut events) = start(LocalFeed::new(false));

        assert!(matches!(events.recv().await, Some(FeedEvent::Snapshot(s)) if s.is_empty()));

        cmd_tx
            .send(FeedCommand::Append {
                request_id: 1,
                record: new_record("hello"),
            })
            .await
            .unwrap();

        let mut acked = None;
        let mut seen_text = false;
        while acked.is_none() || !seen_text {
            match events.recv().await.unwrap() {
                FeedEvent::Appended { request_id, id } => acked = Some((request_id, id)),
                FeedEvent::Snapshot(snapshot) => {
                    seen_text |= snapshot.iter().any(|record| record.text == "hello")
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(acked.map(|(request_id, _)| request_id), Some(1));
    }

    #[tokio::test]
    async fn failures_become_events() {
        let (cmd_tx, mut events) = start(BrokenFeed);

        assert!(matches!(events.recv().await, Some(FeedEvent::Snapshot(_))));
        assert!(matches!(
            events.recv().await,
            Some(FeedEvent::SubscriptionFailed(_))
        ));

        cmd_tx
            .send(FeedCommand::Append {
                request_id: 7,
                record: new_record("hi"),
            })
            .await
            .unwrap();

        match events.recv().await {
            Some(FeedEvent::AppendFailed { request_id, reason }) => {
                assert_eq!(request_id, 7);
                assert!(reason.contains("403"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    /// Emits one snapshot, then the stream simply ends.
    #[derive(Clone)]
    struct EndingFeed;

    impl FeedBackend for EndingFeed {
        async fn append(&self, _record: NewRecord) -> FeedResult<String> {
            Ok("unused".to_string())
        }

        fn subscribe_ordered(&self, _order_field: &str, _ascending: bool) -> SnapshotStream {
            stream::iter(vec![Ok(Vec::new())]).boxed()
        }
    }

    #[tokio::test]
    async fn ended_subscription_reports_closed_feed() {
        let (_cmd_tx, mut events) = start(EndingFeed);

        assert!(matches!(events.recv().await, Some(FeedEvent::Snapshot(_))));
        match events.recv().await {
            Some(FeedEvent::SubscriptionFailed(reason)) => {
                assert_eq!(reason, FeedError::Closed.to_string())
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn loop_stops_when_ui_goes_away() {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let (event_tx, mut events) = mpsc::channel(16);
        let handle = tokio::spawn(FeedClient::new(LocalFeed::new(false), event_tx, cmd_rx).run());

        events.recv().await.unwrap();
        drop(cmd_tx);

        assert!(handle.await.unwrap().is_ok());
    }
}
