use egui::Color32;
use fc_core::RunKey;
use fc_results::{RunRecord, RunStatus};

pub enum RunsAction {
    Refresh,
    Select(RunKey),
    Download,
}

#[derive(Default)]
pub struct RunsView;

fn status_color(status: RunStatus) -> Color32 {
    match status {
        RunStatus::Pending => Color32::from_rgb(0xd9, 0x77, 0x06),
        RunStatus::Completed => Color32::from_rgb(0x16, 0xa3, 0x4a),
        RunStatus::Failed => Color32::from_rgb(0xdc, 0x26, 0x26),
    }
}

impl RunsView {
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        records: &[RunRecord],
        selection: Option<&RunKey>,
    ) -> Option<RunsAction> {
        use egui_extras::{Column, TableBuilder};

        let mut action = None;
        ui.horizontal(|ui| {
            ui.heading("Runs");
            if ui.button("⟳ Refresh").clicked() {
                action = Some(RunsAction::Refresh);
            }
            let selected_done = selection
                .and_then(|k| records.iter().rev().find(|r| r.matches(k)))
                .is_some_and(|r| r.status == RunStatus::Completed);
            if ui
                .add_enabled(selected_done, egui::Button::new("Download result"))
                .clicked()
            {
                action = Some(RunsAction::Download);
            }
        });

        if records.is_empty() {
            ui.label("No runs yet");
            return action;
        }

        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::initial(90.0).at_least(60.0)) // id
            .column(Column::initial(80.0).at_least(60.0)) // user
            .column(Column::initial(80.0)) // start
            .column(Column::initial(80.0)) // end
            .column(Column::initial(60.0)) // years
            .column(Column::initial(110.0)) // average annual loss
            .column(Column::initial(110.0)) // standard deviation
            .column(Column::remainder()) // status
            .header(22.0, |mut header| {
                for title in [
                    "ID",
                    "User",
                    "Start",
                    "End",
                    "Years",
                    "Avg annual loss",
                    "Std deviation",
                    "Status",
                ] {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for record in records {
                    let is_selected = selection.is_some_and(|k| record.matches(k));
                    body.row(24.0, |mut row| {
                        row.col(|ui| {
                            if ui.selectable_label(is_selected, &record.id).clicked() {
                                action = Some(RunsAction::Select(record.key()));
                            }
                        });
                        row.col(|ui| {
                            ui.label(&record.owner);
                        });
                        row.col(|ui| {
                            ui.label(&record.start_time);
                        });
                        row.col(|ui| {
                            ui.label(&record.end_time);
                        });
                        row.col(|ui| {
                            ui.label(record.sample_years.to_string());
                        });
                        row.col(|ui| {
                            ui.label(format!("{:.2}", record.average_annual_loss));
                        });
                        row.col(|ui| {
                            ui.label(format!("{:.2}", record.standard_deviation));
                        });
                        row.col(|ui| {
                            let label =
                                ui.colored_label(status_color(record.status), record.status.label());
                            if let Some(reason) = &record.failure {
                                label.on_hover_text(reason);
                            }
                        });
                    });
                }
            });
        action
    }
}
