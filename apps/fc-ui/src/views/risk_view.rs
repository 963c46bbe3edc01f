use egui::Color32;
use fc_app::{RiskLevel, RiskQuery, RiskReport};

pub enum RiskAction {
    SaveReport,
}

#[derive(Default)]
pub struct RiskView {
    query: String,
    report: Option<RiskReport>,
    error: Option<String>,
}

fn level_color(level: RiskLevel) -> Color32 {
    match level {
        RiskLevel::High => Color32::from_rgb(0xdc, 0x26, 0x26),
        RiskLevel::Medium => Color32::from_rgb(0xca, 0x8a, 0x04),
        RiskLevel::Low => Color32::from_rgb(0x16, 0xa3, 0x4a),
    }
}

impl RiskView {
    pub fn report(&self) -> Option<&RiskReport> {
        self.report.as_ref()
    }

    fn run_query(&mut self) {
        match RiskQuery::parse(&self.query) {
            Ok(query) => {
                self.report = Some(RiskReport::assess(query));
                self.error = None;
            }
            Err(e) => {
                self.report = None;
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<RiskAction> {
        let mut action = None;
        ui.heading("Query risk by location");
        let edit = ui.add(
            egui::TextEdit::singleline(&mut self.query).hint_text("Address or \"lat, lon\""),
        );
        let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if ui.button("Query risk").clicked() || submitted {
            self.run_query();
        }
        if ui
            .add_enabled(self.report.is_some(), egui::Button::new("Download report"))
            .clicked()
        {
            action = Some(RiskAction::SaveReport);
        }
        if let Some(error) = &self.error {
            ui.colored_label(Color32::RED, error);
        }

        if let Some(report) = &self.report {
            ui.separator();
            ui.strong("Risk report summary");
            ui.label(format!("Location: {}", report.query));
            for hazard in &report.hazards {
                ui.label(hazard.to_string());
            }
            ui.horizontal(|ui| {
                ui.label("Overall risk rating:");
                ui.colored_label(level_color(report.overall), report.overall.to_string());
            });
        }
        action
    }
}
