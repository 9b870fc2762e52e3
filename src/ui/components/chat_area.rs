use eframe::egui;

use crate::sync::{MessageEntry, MessageView};

const FALLBACK_COLOR: egui::Color32 = egui::Color32::GRAY;

fn sender_color(hex: &str) -> egui::Color32 {
    egui::Color32::from_hex(hex).unwrap_or(FALLBACK_COLOR)
}

fn render_entry(ui: &mut egui::Ui, entry: &MessageEntry) {
    // own messages hug the right edge
    let align = if entry.is_own() {
        egui::Align::Max
    } else {
        egui::Align::Min
    };

    ui.with_layout(egui::Layout::top_down(align), |ui| {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            if let Some(sender) = &entry.sender {
                ui.colored_label(
                    sender_color(&sender.color),
                    egui::RichText::new(sender.name.as_str()).strong(),
                );
            }
            // Plain label: message text is never interpreted as markup.
            ui.label(entry.text.as_str());
            ui.label(egui::RichText::new(entry.time.as_str()).small().weak());
        });
    });
    ui.add_space(4.0);
}

pub fn render(ui: &mut egui::Ui, view: &MessageView, scroll_to_bottom: bool) {
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .max_height((ui.available_height() - 40.0).max(0.0))
        .show(ui, |ui| {
            for entry in &view.entries {
                render_entry(ui, entry);
            }

            if let Some(notice) = &view.notice {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new(notice.as_str())
                            .italics()
                            .color(egui::Color32::LIGHT_RED),
                    );
                });
            }

            if scroll_to_bottom {
                ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
            }
        });
}
