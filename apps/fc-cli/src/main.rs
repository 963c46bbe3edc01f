use clap::{Args, Parser, Subcommand};
use fc_app::{
    AppError, AppResult, DashboardSession, LayerState, PollEvent, RiskQuery, RiskReport,
    RunParams, SelectOutcome, load_config,
};
use fc_config::DashboardConfig;
use fc_core::{BoundingBox, RunKey};
use fc_results::RunRecord;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "floodcat")]
#[command(about = "Floodcat CLI - flood catastrophe model runs and map layers", long_about = None)]
struct Cli {
    /// Dashboard configuration (YAML or JSON); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the analysis backend base URL
    #[arg(long, global = true)]
    backend: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the dashboard configuration
    ValidateConfig,
    /// List WMS layers and their visibility
    Layers {
        /// Page preset to apply (e.g. risk-map, urban-elements)
        #[arg(long)]
        page: Option<String>,
    },
    /// Print a WMS GetMap URL for one layer
    WmsUrl {
        /// Layer key from the catalog
        key: String,
        /// minx,miny,maxx,maxy in degrees
        #[arg(long, value_parser = parse_bbox)]
        bbox: Option<BoundingBox>,
        #[arg(long, default_value_t = 768)]
        width: u32,
        #[arg(long, default_value_t = 768)]
        height: u32,
    },
    /// List runs known to the backend
    Runs,
    /// Submit a catastrophe-model run
    Submit(SubmitArgs),
    /// Poll every pending run until it finishes
    Watch {
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Load a completed run's result overlay and summarize its features
    Overlay {
        #[command(flatten)]
        run: RunArg,
        /// Print at most this many features
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Save a run's result archive as <owner><id>.zip
    Download {
        #[command(flatten)]
        run: RunArg,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Produce a location risk report
    RiskReport {
        /// Address, or "lat, lon"
        query: String,
        /// Directory to save Risk_Report_<millis>.txt into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArg {
    /// Run owner (user name)
    #[arg(long)]
    user: String,
    /// Run (project) id
    #[arg(long)]
    id: String,
}

impl RunArg {
    fn key(&self) -> RunKey {
        RunKey::new(self.user.trim(), self.id.trim())
    }
}

#[derive(Args)]
struct SubmitArgs {
    #[command(flatten)]
    run: RunArg,
    /// Number of simulated years
    #[arg(long)]
    samples: u32,
    /// YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    end: Option<String>,
    /// Property portfolio CSV to upload
    #[arg(long)]
    property_file: Option<PathBuf>,
    /// Block until the run completes or fails
    #[arg(long)]
    wait: bool,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.backend.as_deref())?;

    match cli.command {
        Commands::ValidateConfig => cmd_validate_config(&config, cli.config.as_deref()),
        Commands::Layers { page } => cmd_layers(&config, page.as_deref()),
        Commands::WmsUrl {
            key,
            bbox,
            width,
            height,
        } => cmd_wms_url(&config, &key, bbox, width, height),
        Commands::Runs => cmd_runs(&config),
        Commands::Submit(args) => cmd_submit(&config, &args),
        Commands::Watch { timeout } => cmd_watch(&config, timeout.map(Duration::from_secs)),
        Commands::Overlay { run, limit } => cmd_overlay(&config, &run.key(), limit),
        Commands::Download { run, output } => cmd_download(&config, &run.key(), &output),
        Commands::RiskReport { query, output } => cmd_risk_report(&query, output.as_deref()),
    }
}

fn parse_bbox(text: &str) -> Result<BoundingBox, String> {
    let values: Vec<f64> = text
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<_, _>>()?;
    match values.as_slice() {
        [min_x, min_y, max_x, max_y] => {
            BoundingBox::new(*min_x, *min_y, *max_x, *max_y).map_err(|e| e.to_string())
        }
        _ => Err(format!("expected minx,miny,maxx,maxy, got {} values", values.len())),
    }
}

/// View extent around the configured map centre.
fn default_bbox(config: &DashboardConfig) -> AppResult<BoundingBox> {
    let c = config.map.center;
    Ok(BoundingBox::new(c.lon - 0.35, c.lat - 0.25, c.lon + 0.35, c.lat + 0.25)?)
}

fn cmd_validate_config(config: &DashboardConfig, path: Option<&Path>) -> AppResult<()> {
    match path {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!("Validating built-in configuration"),
    }
    println!("✓ Configuration is valid (version {})", config.version);
    println!("  Backend: {}", config.backend.base_url);
    println!("  WMS: {}", config.wms.url);
    println!(
        "  {} layers, {} legend bands, {} page presets",
        config.layers.len(),
        config.legend.len(),
        config.presets.len()
    );
    Ok(())
}

fn cmd_layers(config: &DashboardConfig, page: Option<&str>) -> AppResult<()> {
    let state = match page {
        Some(page) => LayerState::for_page(config, page)?,
        None => LayerState::from_config(config),
    };
    println!("Layers:");
    for (layer, visible) in state.layers() {
        let mark = if visible { "x" } else { " " };
        println!("  [{mark}] {:<20} {} ({})", layer.key, layer.name, layer.layer.trim());
    }
    if !config.legend.is_empty() {
        println!("Flood depth legend (m):");
        for band in &config.legend {
            println!("  {} {}", band.color, band.label);
        }
    }
    Ok(())
}

fn cmd_wms_url(
    config: &DashboardConfig,
    key: &str,
    bbox: Option<BoundingBox>,
    width: u32,
    height: u32,
) -> AppResult<()> {
    let bbox = match bbox {
        Some(bbox) => bbox,
        None => default_bbox(config)?,
    };
    let state = LayerState::from_config(config);
    println!("{}", state.get_map_url(key, &bbox, width, height)?);
    Ok(())
}

fn print_runs(records: &[RunRecord]) {
    if records.is_empty() {
        println!("No runs found");
        return;
    }
    println!(
        "{:<12} {:<16} {:<11} {:<11} {:>7} {:>16} {:>16}  {}",
        "user", "id", "start", "end", "years", "avg annual loss", "std deviation", "status"
    );
    for r in records {
        println!(
            "{:<12} {:<16} {:<11} {:<11} {:>7} {:>16.2} {:>16.2}  {}",
            r.owner,
            r.id,
            r.start_time,
            r.end_time,
            r.sample_years,
            r.average_annual_loss,
            r.standard_deviation,
            r.status.label()
        );
        if let Some(reason) = &r.failure {
            println!("{:>14} {}", "failure:", reason);
        }
    }
}

fn cmd_runs(config: &DashboardConfig) -> AppResult<()> {
    let mut session = DashboardSession::from_config(config)?;
    session.refresh()?;
    print_runs(session.records());
    Ok(())
}

fn cmd_submit(config: &DashboardConfig, args: &SubmitArgs) -> AppResult<()> {
    let mut session = DashboardSession::from_config(config)?;
    if let Err(e) = session.refresh() {
        tracing::warn!(error = %e, "could not fetch existing runs; duplicate check is local only");
    }

    let mut params = RunParams::new(&args.run.id, &args.run.user, args.samples)
        .with_dates(args.start.as_deref(), args.end.as_deref());
    if let Some(path) = &args.property_file {
        let contents = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Validation(format!("bad property file name: {}", path.display())))?;
        params = params.with_property_file(name, contents);
    }

    let key = session.submit(&params)?;
    println!("✓ Submitted run {key}");
    if !args.wait {
        // Joining the poller waits for its create request.
        session.shutdown();
        return Ok(());
    }
    wait_for_runs(&mut session, None)?;
    print_runs(session.records());
    Ok(())
}

fn cmd_watch(config: &DashboardConfig, timeout: Option<Duration>) -> AppResult<()> {
    let mut session = DashboardSession::from_config(config)?;
    session.refresh()?;
    let started = session.resume_pending();
    if started == 0 {
        println!("No pending runs");
        return Ok(());
    }
    println!("Watching {started} pending run(s)...");
    wait_for_runs(&mut session, timeout)?;
    print_runs(session.records());
    Ok(())
}

fn wait_for_runs(session: &mut DashboardSession, timeout: Option<Duration>) -> AppResult<()> {
    let deadline = timeout.map(|t| Instant::now() + t);
    while session.active_pollers() > 0 {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            println!("Timed out with {} run(s) still pending", session.active_pollers());
            break;
        }
        if let Some((event, _)) = session.wait_next(Duration::from_millis(500)) {
            match event {
                PollEvent::Completed { key, metrics } => println!(
                    "✓ {key} completed: average annual loss {:.2}, std deviation {:.2}",
                    metrics.average_annual_loss, metrics.standard_deviation
                ),
                PollEvent::Failed { key, reason } => println!("✗ {key} failed: {reason}"),
            }
        }
    }
    Ok(())
}

fn cmd_overlay(config: &DashboardConfig, key: &RunKey, limit: usize) -> AppResult<()> {
    let mut session = DashboardSession::from_config(config)?;
    session.refresh()?;
    match session.select(key)? {
        SelectOutcome::OverlayLoaded { features } => {
            println!("✓ Loaded {features} feature(s) for {key}");
        }
        SelectOutcome::NotCompleted(status) => {
            println!("Run {key} is {}; no result to show", status.label());
            return Ok(());
        }
        SelectOutcome::LoadFailed(reason) => {
            return Err(AppError::Overlay(reason));
        }
        SelectOutcome::Empty => {
            println!("Result for {key} has no features");
            return Ok(());
        }
    }
    if let Some(overlay) = session.overlay() {
        if let Some(b) = overlay.fit_bounds() {
            println!("  Bounds: {}", b.to_wms_param());
        }
        for (i, feature) in overlay.features().iter().take(limit).enumerate() {
            println!("  #{} {}", i + 1, feature.geometry.kind());
            for line in feature.popup_text().lines() {
                println!("      {line}");
            }
        }
        if overlay.len() > limit {
            println!("  ... {} more", overlay.len() - limit);
        }
    }
    Ok(())
}

fn cmd_download(config: &DashboardConfig, key: &RunKey, output: &Path) -> AppResult<()> {
    let mut session = DashboardSession::from_config(config)?;
    session.refresh()?;
    let path = session.download_run(key, output)?;
    println!("✓ Saved {}", path.display());
    Ok(())
}

fn cmd_risk_report(query: &str, output: Option<&Path>) -> AppResult<()> {
    let report = RiskReport::assess(RiskQuery::parse(query)?);
    println!("{}", report.render_text());
    if let Some(dir) = output {
        let path = report.save(dir)?;
        println!();
        println!("✓ Saved {}", path.display());
    }
    Ok(())
}
