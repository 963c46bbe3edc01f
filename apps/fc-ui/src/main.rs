#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![allow(clippy::collapsible_if)]

mod app;
mod views;

use app::FloodcatApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();

    // An optional dashboard configuration path as the only argument.
    let config_path = std::env::args_os().nth(1).map(std::path::PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Flood Catastrophe Insurance System"),
        ..Default::default()
    };

    eframe::run_native(
        "Floodcat",
        options,
        Box::new(move |cc| Ok(Box::new(FloodcatApp::new(cc, config_path)))),
    )
}
