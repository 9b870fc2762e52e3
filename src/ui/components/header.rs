use eframe::egui;

/// `live` is false once the feed is gone; the dot turns red.
pub fn render(ui: &mut egui::Ui, display_name: &str, online_count: u32, live: bool) {
    ui.horizontal(|ui| {
        ui.heading("Anonymous Chat");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(format!("{online_count} online"));
            let dot = if live {
                egui::Color32::GREEN
            } else {
                egui::Color32::RED
            };
            ui.colored_label(dot, "●");
            ui.label(egui::RichText::new(format!("you are {display_name}")).weak());
        });
    });
}
