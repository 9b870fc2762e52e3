use eframe::egui;

/// Returns true when the user asked to send. The text is left in place; the
/// caller clears it once the feed accepted the message.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, sending: bool, focus: bool) -> bool {
    let mut send = false;
    ui.horizontal(|ui| {
        // locked until the pending send is acknowledged or fails
        let response = ui.add_enabled(
            !sending,
            egui::TextEdit::singleline(input_text)
                .hint_text("Type a message...")
                .desired_width(ui.available_width() - 70.0),
        );
        if focus && !sending {
            response.request_focus();
        }

        if ui
            .add_enabled(!sending, egui::Button::new("Send"))
            .clicked()
        {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
            response.request_focus();
        }
    });

    send && !sending
}
