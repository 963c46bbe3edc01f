use crate::views::{
    LayerView, MapView, RiskAction, RiskView, RunsAction, RunsView, SubmitAction, SubmitView,
};
use egui_file_dialog::FileDialog;
use fc_app::{
    AppError, AppResult, BackgroundTask, DashboardSession, LayerState, PollEvent, PollPolicy,
    SelectOutcome, SelectStart, TaskState, ValidatedRun, load_config,
};
use fc_backend::HttpBackend;
use fc_config::DashboardConfig;
use fc_config::defaults::{
    PAGE_ASSET_MANAGEMENT, PAGE_CATASTROPHE_MODEL, PAGE_DISASTER_EVENTS, PAGE_RISK_MAP,
    PAGE_URBAN_ELEMENTS, default_config,
};
use fc_core::RunKey;
use fc_overlay::Overlay;
use fc_results::RunRecord;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct FloodcatApp {
    config: DashboardConfig,
    session: DashboardSession,
    layers: LayerState,
    page: Page,
    file_dialog: FileDialog,
    file_dialog_action: Option<FileDialogAction>,
    submit_view: SubmitView,
    runs_view: RunsView,
    map_view: MapView,
    layer_view: LayerView,
    risk_view: RiskView,
    in_flight: InFlight,
    status_message: Option<String>,
}

/// Backend requests running off the UI thread, at most one of each kind.
#[derive(Default)]
struct InFlight {
    refresh: Option<BackgroundTask<AppResult<Vec<RunRecord>>>>,
    upload: Option<BackgroundTask<(ValidatedRun, AppResult<()>)>>,
    overlay: Option<BackgroundTask<(RunKey, AppResult<Overlay>)>>,
    download: Option<BackgroundTask<AppResult<PathBuf>>>,
}

impl InFlight {
    fn any(&self) -> bool {
        self.refresh.is_some()
            || self.upload.is_some()
            || self.overlay.is_some()
            || self.download.is_some()
    }
}

/// Takes the outcome out of `slot` once the task has one. `Err` carries the
/// label of a task that died without reporting.
fn settle<T: Send + 'static>(
    slot: &mut Option<BackgroundTask<T>>,
) -> Option<Result<T, &'static str>> {
    let state = slot.as_ref()?.poll();
    match state {
        TaskState::Running => None,
        TaskState::Done(value) => {
            *slot = None;
            Some(Ok(value))
        }
        TaskState::Lost => Some(Err(slot.take().map_or("request", |t| t.label()))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Page {
    UrbanElements,
    DisasterEvents,
    RiskMap,
    AssetManagement,
    CatastropheModel,
}

impl Page {
    const ALL: [Page; 5] = [
        Page::UrbanElements,
        Page::DisasterEvents,
        Page::RiskMap,
        Page::AssetManagement,
        Page::CatastropheModel,
    ];

    fn preset_key(self) -> &'static str {
        match self {
            Page::UrbanElements => PAGE_URBAN_ELEMENTS,
            Page::DisasterEvents => PAGE_DISASTER_EVENTS,
            Page::RiskMap => PAGE_RISK_MAP,
            Page::AssetManagement => PAGE_ASSET_MANAGEMENT,
            Page::CatastropheModel => PAGE_CATASTROPHE_MODEL,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Page::UrbanElements => "1. Urban Elements",
            Page::DisasterEvents => "2. Disaster Events",
            Page::RiskMap => "3. Risk Map",
            Page::AssetManagement => "4. Asset Management",
            Page::CatastropheModel => "5. Catastrophe Model",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileDialogAction {
    PickPropertyFile,
    DownloadResult,
    SaveRiskReport,
}

impl FloodcatApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config_path: Option<PathBuf>) -> Self {
        let (config, mut status_message) = match load_config(config_path.as_deref(), None) {
            Ok(config) => (config, None),
            Err(e) => (
                default_config(),
                Some(format!("Using built-in configuration: {e}")),
            ),
        };
        let session = match DashboardSession::from_config(&config) {
            Ok(session) => session,
            Err(e) => {
                // Only the archive cache can fail here; run without it.
                status_message = Some(format!("Result cache disabled: {e}"));
                uncached_session(&config)
            }
        }
        .with_background_persist();
        let page = Page::CatastropheModel;
        let layers = LayerState::for_page(&config, page.preset_key())
            .unwrap_or_else(|_| LayerState::from_config(&config));

        let mut app = Self {
            config,
            session,
            layers,
            page,
            file_dialog: FileDialog::new(),
            file_dialog_action: None,
            submit_view: SubmitView::default(),
            runs_view: RunsView,
            map_view: MapView::default(),
            layer_view: LayerView::default(),
            risk_view: RiskView::default(),
            in_flight: InFlight::default(),
            status_message,
        };
        app.refresh_runs();
        app
    }

    fn set_page(&mut self, page: Page) {
        if self.page == page {
            return;
        }
        self.page = page;
        match LayerState::for_page(&self.config, page.preset_key()) {
            Ok(layers) => self.layers = layers,
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    fn refresh_runs(&mut self) {
        if self.in_flight.refresh.is_some() {
            return;
        }
        let job = self.session.runs_job();
        self.in_flight.refresh = Some(BackgroundTask::spawn("fetch runs", job));
        self.status_message = Some("Loading runs...".to_string());
    }

    fn poll_session(&mut self) {
        for (event, _) in self.session.pump() {
            self.status_message = Some(match event {
                PollEvent::Completed { key, .. } => format!("Run {key} completed"),
                PollEvent::Failed { key, reason } => format!("Run {key} failed: {reason}"),
            });
        }
    }

    /// Apply whatever background requests have finished since the last frame.
    fn poll_tasks(&mut self) {
        if let Some(done) = settle(&mut self.in_flight.refresh) {
            self.status_message = Some(match done {
                Ok(Ok(records)) => match self.session.apply_run_list(records) {
                    Ok(count) => {
                        let resumed = self.session.resume_pending();
                        if resumed > 0 {
                            format!("Loaded {count} run(s); watching {resumed} pending")
                        } else {
                            format!("Loaded {count} run(s)")
                        }
                    }
                    Err(e) => format!("Could not load runs: {e}"),
                },
                Ok(Err(e)) => format!("Could not load runs: {e}"),
                Err(label) => format!("Request '{label}' ended unexpectedly"),
            });
        }
        if let Some(done) = settle(&mut self.in_flight.upload) {
            match done {
                Ok((run, Ok(()))) => self.register_run(run),
                Ok((_, Err(e))) => self.status_message = Some(format!("Submission failed: {e}")),
                Err(label) => {
                    self.status_message = Some(format!("Request '{label}' ended unexpectedly"))
                }
            }
        }
        if let Some(done) = settle(&mut self.in_flight.overlay) {
            match done {
                Ok((key, loaded)) => {
                    if let Some(outcome) = self.session.finish_select(&key, loaded) {
                        self.show_select_outcome(&key, outcome);
                    }
                }
                Err(label) => {
                    self.status_message = Some(format!("Request '{label}' ended unexpectedly"))
                }
            }
        }
        if let Some(done) = settle(&mut self.in_flight.download) {
            self.status_message = Some(match done {
                Ok(Ok(saved)) => format!("Saved {}", saved.display()),
                Ok(Err(e)) => format!("Download failed: {e}"),
                Err(label) => format!("Request '{label}' ended unexpectedly"),
            });
        }
    }

    fn submit_run(&mut self) {
        if self.in_flight.upload.is_some() {
            self.status_message = Some("A property file upload is still in progress".to_string());
            return;
        }
        let params = match self.submit_view.params() {
            Ok(params) => params,
            Err(e) => {
                self.status_message = Some(format!("Could not read property file: {e}"));
                return;
            }
        };
        let run = match self.session.prepare_submit(&params) {
            Ok(run) => run,
            Err(e) => {
                self.status_message = Some(e.to_string());
                return;
            }
        };
        if run.property_file.is_some() {
            self.status_message = Some(format!("Uploading property file for {}...", run.key));
            let job = self.session.upload_job(run);
            self.in_flight.upload = Some(BackgroundTask::spawn("upload property file", job));
        } else {
            self.register_run(run);
        }
    }

    fn register_run(&mut self, run: ValidatedRun) {
        match self.session.register(run) {
            Ok(key) => {
                self.status_message = Some(format!("Submitted run {key}"));
                self.submit_view.reset_after_submit();
            }
            Err(e @ (AppError::Validation(_) | AppError::DuplicateRun { .. })) => {
                self.status_message = Some(e.to_string());
            }
            Err(e) => self.status_message = Some(format!("Submission failed: {e}")),
        }
    }

    fn select_run(&mut self, key: RunKey) {
        self.map_view.clear_inspection();
        match self.session.begin_select(&key) {
            Ok(SelectStart::Finished(outcome)) => {
                self.in_flight.overlay = None;
                self.show_select_outcome(&key, outcome);
            }
            Ok(SelectStart::FetchArchive) => {
                let job = self.session.overlay_job(&key);
                self.status_message = Some(format!("Loading result for {key}..."));
                self.in_flight.overlay =
                    Some(BackgroundTask::spawn("load result", move || (key, job())));
            }
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    fn show_select_outcome(&mut self, key: &RunKey, outcome: SelectOutcome) {
        self.status_message = Some(match outcome {
            SelectOutcome::OverlayLoaded { features } => {
                self.map_view.request_fit();
                format!("Showing {features} feature(s) for {key}")
            }
            SelectOutcome::NotCompleted(status) => format!("Run {key} is {}", status.label()),
            SelectOutcome::LoadFailed(reason) => {
                format!("Could not load result for {key}: {reason}")
            }
            SelectOutcome::Empty => format!("Result for {key} has no features"),
        });
    }

    fn start_download(&mut self, dir: PathBuf) {
        let Some(key) = self.session.selection().cloned() else {
            self.status_message = Some(AppError::NoSelection.to_string());
            return;
        };
        match self.session.download_job(&key, &dir) {
            Ok(job) => {
                self.status_message = Some(format!("Downloading result for {key}..."));
                self.in_flight.download = Some(BackgroundTask::spawn("download result", job));
            }
            Err(e) => self.status_message = Some(format!("Download failed: {e}")),
        }
    }

    fn handle_selected_path(&mut self, action: FileDialogAction, path: PathBuf) {
        match action {
            FileDialogAction::PickPropertyFile => self.submit_view.set_property_file(path),
            FileDialogAction::DownloadResult => self.start_download(path),
            FileDialogAction::SaveRiskReport => {
                if let Some(report) = self.risk_view.report() {
                    self.status_message = Some(match report.save(&path) {
                        Ok(saved) => format!("Saved {}", saved.display()),
                        Err(e) => format!("Could not save report: {e}"),
                    });
                }
            }
        }
    }
}

fn uncached_session(config: &DashboardConfig) -> DashboardSession {
    let backend = HttpBackend::new(
        &config.backend.base_url,
        Duration::from_secs(config.backend.timeout_s),
    );
    DashboardSession::new(Arc::new(backend), PollPolicy::from_config(&config.poll))
}

impl eframe::App for FloodcatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_tasks();
        self.poll_session();
        if self.in_flight.any() || self.session.persist_pending() {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else if self.session.active_pollers() > 0 {
            ctx.request_repaint_after(Duration::from_millis(500));
        }

        egui::TopBottomPanel::top("pages").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong(&self.config.name);
                ui.separator();
                let mut next = self.page;
                for page in Page::ALL {
                    ui.selectable_value(&mut next, page, page.title());
                }
                self.set_page(next);
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.in_flight.any() {
                    ui.spinner();
                }
                if let Some(message) = &self.status_message {
                    ui.label(message);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.weak(&self.config.wms.attribution);
                    ui.weak(&self.config.map.basemap.attribution);
                });
            });
        });

        self.file_dialog.update(ctx);
        if let Some(path) = self.file_dialog.take_selected() {
            if let Some(action) = self.file_dialog_action.take() {
                self.handle_selected_path(action, path);
            }
        }

        egui::SidePanel::left("layers")
            .default_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.layer_view.show(
                        ui,
                        &mut self.layers,
                        &self.config.legend,
                        self.map_view.view(),
                    );
                });
            });

        match self.page {
            Page::CatastropheModel => {
                let mut submit_action = None;
                let mut runs_action = None;
                egui::SidePanel::right("catastrophe_model")
                    .default_width(640.0)
                    .show(ctx, |ui| {
                        submit_action = self.submit_view.show(ui);
                        ui.separator();
                        runs_action =
                            self.runs_view
                                .show(ui, self.session.records(), self.session.selection());
                    });
                match submit_action {
                    Some(SubmitAction::Submit) => self.submit_run(),
                    Some(SubmitAction::PickPropertyFile) => {
                        self.file_dialog_action = Some(FileDialogAction::PickPropertyFile);
                        self.file_dialog.select_file();
                    }
                    None => {}
                }
                match runs_action {
                    Some(RunsAction::Refresh) => self.refresh_runs(),
                    Some(RunsAction::Select(key)) => self.select_run(key),
                    Some(RunsAction::Download) => {
                        self.file_dialog_action = Some(FileDialogAction::DownloadResult);
                        self.file_dialog.select_directory();
                    }
                    None => {}
                }
            }
            Page::RiskMap => {
                let mut risk_action = None;
                egui::SidePanel::right("risk_analysis")
                    .default_width(320.0)
                    .show(ctx, |ui| {
                        risk_action = self.risk_view.show(ui);
                    });
                if let Some(RiskAction::SaveReport) = risk_action {
                    self.file_dialog_action = Some(FileDialogAction::SaveRiskReport);
                    self.file_dialog.select_directory();
                }
            }
            Page::UrbanElements | Page::DisasterEvents | Page::AssetManagement => {}
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            let overlay = match self.page {
                Page::CatastropheModel => self.session.overlay(),
                _ => None,
            };
            self.map_view.show(
                ui,
                overlay,
                &self.config.legend,
                self.config.map.center,
                self.config.map.zoom,
            );
        });
    }
}
