use fc_app::RunParams;
use std::path::PathBuf;

pub enum SubmitAction {
    Submit,
    PickPropertyFile,
}

/// The catastrophe-model run form.
pub struct SubmitView {
    project_id: String,
    owner: String,
    sample_years: u32,
    start_date: String,
    end_date: String,
    property_file: Option<PathBuf>,
}

impl Default for SubmitView {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            owner: String::new(),
            sample_years: 10_000,
            start_date: String::new(),
            end_date: String::new(),
            property_file: None,
        }
    }
}

impl SubmitView {
    pub fn set_property_file(&mut self, path: PathBuf) {
        self.property_file = Some(path);
    }

    /// Form contents as run parameters; reads the property file if one was picked.
    pub fn params(&self) -> std::io::Result<RunParams> {
        let blank_to_none = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        let mut params = RunParams::new(&self.project_id, &self.owner, self.sample_years);
        params.start_date = blank_to_none(&self.start_date);
        params.end_date = blank_to_none(&self.end_date);
        if let Some(path) = &self.property_file {
            let contents = std::fs::read(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            params = params.with_property_file(name, contents);
        }
        Ok(params)
    }

    /// Keep the owner, clear the per-run fields.
    pub fn reset_after_submit(&mut self) {
        self.project_id.clear();
        self.property_file = None;
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<SubmitAction> {
        let mut action = None;
        ui.heading("Run catastrophe model");
        egui::Grid::new("submit_form")
            .num_columns(2)
            .spacing([8.0, 6.0])
            .show(ui, |ui| {
                ui.label("Project ID");
                ui.text_edit_singleline(&mut self.project_id);
                ui.end_row();

                ui.label("User name");
                ui.text_edit_singleline(&mut self.owner);
                ui.end_row();

                ui.label("Sample years");
                ui.add(
                    egui::DragValue::new(&mut self.sample_years)
                        .speed(100.0)
                        .range(1..=1_000_000),
                );
                ui.end_row();

                ui.label("Start date");
                ui.add(egui::TextEdit::singleline(&mut self.start_date).hint_text("YYYY-MM-DD"));
                ui.end_row();

                ui.label("End date");
                ui.add(egui::TextEdit::singleline(&mut self.end_date).hint_text("YYYY-MM-DD"));
                ui.end_row();

                ui.label("Property file");
                ui.horizontal(|ui| {
                    let label = self
                        .property_file
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "input_table.csv (default)".to_string());
                    ui.label(label);
                    if ui.small_button("Choose…").clicked() {
                        action = Some(SubmitAction::PickPropertyFile);
                    }
                    if self.property_file.is_some() && ui.small_button("✕").clicked() {
                        self.property_file = None;
                    }
                });
                ui.end_row();
            });

        ui.add_space(4.0);
        if ui.button("Run").clicked() {
            action = Some(SubmitAction::Submit);
        }
        action
    }
}
