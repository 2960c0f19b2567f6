use canbus::{random_frame, CanBus, CanId, VirtualBus};
use canscope_core::{
    load_settings_file, PresentError, Presenter, RowHandle, Series, Settings,
};
use canscope_runtime::Controller;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "canscope", version, about = "Live per-id CAN payload plotting core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream from a configured bus and report the observed ids
    Run {
        #[arg(long, default_value = "virtual")]
        interface: String,
        #[arg(long, default_value = "can0")]
        channel: String,
        #[arg(long, default_value_t = 500_000)]
        bitrate: u32,
        #[arg(long, default_value_t = 60)]
        duration_seconds: u64,
        /// Settings file (JSON); command-line bus options take precedence
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Generate random traffic on a virtual bus and stream it
    Demo {
        #[arg(long, default_value_t = 10)]
        duration_seconds: u64,
    },
}

struct RowState {
    id: CanId,
    label: String,
    latest: f64,
    updates: u64,
}

type SharedRows = Arc<Mutex<BTreeMap<u64, RowState>>>;

/// Console stand-in for a plotting toolkit: rows are tracked, not drawn.
struct ConsolePresenter {
    rows: SharedRows,
    next_handle: u64,
}

impl ConsolePresenter {
    fn new() -> (Self, SharedRows) {
        let rows: SharedRows = Arc::new(Mutex::new(BTreeMap::new()));
        (
            Self {
                rows: Arc::clone(&rows),
                next_handle: 0,
            },
            rows,
        )
    }

    fn with_row<R>(
        &self,
        handle: RowHandle,
        f: impl FnOnce(&mut RowState) -> R,
    ) -> Result<R, PresentError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.get_mut(&handle.0)
            .map(f)
            .ok_or_else(|| PresentError(format!("unknown row handle {}", handle.0)))
    }
}

impl Presenter for ConsolePresenter {
    fn create_row(
        &mut self,
        id: CanId,
        label: &str,
        series: &Series,
        height: u32,
    ) -> Result<RowHandle, PresentError> {
        self.next_handle += 1;
        let handle = RowHandle(self.next_handle);
        log::info!(
            "row {label} added ({} samples, height {height})",
            series.y.len()
        );
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).insert(
            handle.0,
            RowState {
                id,
                label: label.to_string(),
                latest: series.y.last().copied().unwrap_or(0.0),
                updates: 0,
            },
        );
        Ok(handle)
    }

    fn update_row(&mut self, handle: RowHandle, series: &Series) -> Result<(), PresentError> {
        let latest = series.y.last().copied().unwrap_or(0.0);
        self.with_row(handle, |row| {
            row.latest = latest;
            row.updates += 1;
        })
    }

    fn set_row_height(&mut self, handle: RowHandle, _height: u32) -> Result<(), PresentError> {
        self.with_row(handle, |_| ())
    }

    fn set_row_label(&mut self, handle: RowHandle, label: &str) -> Result<(), PresentError> {
        self.with_row(handle, |row| {
            row.label = label.to_string();
        })
    }

    fn remove_row(&mut self, handle: RowHandle) -> Result<(), PresentError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| PresentError(format!("unknown row handle {}", handle.0)))
    }
}

fn print_summary(rows: &SharedRows) {
    let rows = rows.lock().unwrap_or_else(|e| e.into_inner());
    if rows.is_empty() {
        println!("no frames observed");
        return;
    }
    let mut states: Vec<&RowState> = rows.values().collect();
    states.sort_by_key(|row| row.id);
    println!("{:<12} {:>12} {:>10}", "id", "latest", "updates");
    for row in states {
        println!("{:<12} {:>12} {:>10}", row.label, row.latest, row.updates);
    }
}

fn stream(settings: &Settings, duration: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let (presenter, rows) = ConsolePresenter::new();
    let mut controller = Controller::new(Box::new(presenter), settings);
    controller.apply_settings(&settings.bus_config())?;
    controller.start()?;
    thread::sleep(duration);
    controller.stop();
    print_summary(&rows);
    Ok(())
}

fn cmd_run(
    interface: String,
    channel: String,
    bitrate: u32,
    duration_seconds: u64,
    settings_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = match settings_path {
        Some(path) => load_settings_file(&path)?,
        None => Settings::default(),
    };
    settings.interface = interface;
    settings.channel = channel;
    settings.bitrate = bitrate;
    stream(&settings, Duration::from_secs(duration_seconds))
}

fn cmd_demo(duration_seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::default();
    settings.channel = "demo".to_string();

    let generator_bus = VirtualBus::open(&settings.channel);
    let stop = Arc::new(AtomicBool::new(false));
    let generator_stop = Arc::clone(&stop);
    let generator = thread::spawn(move || {
        let mut rng = rand::thread_rng();
        while !generator_stop.load(Ordering::Relaxed) {
            if generator_bus.send(&random_frame(&mut rng)).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
    });

    let result = stream(&settings, Duration::from_secs(duration_seconds));

    stop.store(true, Ordering::Relaxed);
    let _ = generator.join();
    result
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            interface,
            channel,
            bitrate,
            duration_seconds,
            settings,
        } => cmd_run(interface, channel, bitrate, duration_seconds, settings),
        Commands::Demo { duration_seconds } => cmd_demo(duration_seconds),
    };
    if let Err(err) = result {
        eprintln!("canscope: {err}");
        std::process::exit(1);
    }
    Ok(())
}
