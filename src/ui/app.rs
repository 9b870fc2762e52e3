use eframe::egui;
use tokio::sync::{mpsc, watch};

use crate::common::{FeedCommand, FeedEvent};
use crate::identity::SessionContext;

use super::components::{chat_area, header, input_bar};
use super::state::AppState;

/// Channels to the feed task.
pub struct FeedLink {
    pub command_sender: mpsc::Sender<FeedCommand>,
    pub event_receiver: mpsc::Receiver<FeedEvent>,
}

pub struct ChatApp {
    state: AppState,
    feed: Option<FeedLink>,
    online_count: watch::Receiver<u32>,
    focus_input: bool,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        session: SessionContext,
        feed: FeedLink,
        online_count: watch::Receiver<u32>,
    ) -> Self {
        Self {
            state: AppState::new(session),
            feed: Some(feed),
            online_count,
            focus_input: true,
        }
    }

    /// App that failed to start: shows the notice and stays inert.
    pub fn disconnected(
        _cc: &eframe::CreationContext<'_>,
        session: SessionContext,
        notice: &str,
        online_count: watch::Receiver<u32>,
    ) -> Self {
        Self {
            state: AppState::disconnected(session, notice),
            feed: None,
            online_count,
            focus_input: true,
        }
    }

    fn handle_feed_events(&mut self) {
        let Some(feed) = self.feed.as_mut() else {
            return;
        };
        let was_sending = self.state.composer.is_sending();
        while let Ok(event) = feed.event_receiver.try_recv() {
            self.state.handle_event(event);
        }
        // the text box was locked during the send; hand focus back
        if was_sending && !self.state.composer.is_sending() {
            self.focus_input = true;
        }
    }

    fn send_message(&mut self) {
        let Some(command) = self.state.submit() else {
            return;
        };
        let FeedCommand::Append { request_id, .. } = &command;
        let request_id = *request_id;

        let delivered = self
            .feed
            .as_ref()
            .map(|feed| feed.command_sender.try_send(command));
        match delivered {
            Some(Ok(())) => {}
            Some(Err(err)) => {
                log::warn!("Failed to send command to feed: {err}");
                self.state.send_failed(request_id);
            }
            None => self.state.send_failed(request_id),
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_feed_events();
        self.state.online_count = *self.online_count.borrow();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            header::render(
                ui,
                &self.state.sync.session().display_name,
                self.state.online_count,
                self.state.is_live(),
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let scroll = self.state.sync.take_scroll_request();
            chat_area::render(ui, self.state.sync.view(), scroll);

            ui.separator();
            let sending = self.state.composer.is_sending();
            let focus = std::mem::take(&mut self.focus_input);
            if input_bar::render(ui, &mut self.state.composer.input, sending, focus) {
                self.send_message();
            }
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
