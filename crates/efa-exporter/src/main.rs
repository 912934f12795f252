//! efa-exporter - Amazon EFA hardware counter exporter.
//!
//! Reads `/sys/class/infiniband` and prints every EFA port counter in the
//! Prometheus text format, once or every `--interval` seconds. With
//! `--output` the exposition is replaced atomically so node_exporter's
//! textfile collector never sees a partial file.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use efa_exporter_core::collector::{CollectError, EfaClass, EfaCollector, FileSystem, RealFs, Update};
use efa_exporter_core::metrics::{DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM, render_text};

/// Amazon EFA hardware counter exporter.
#[derive(Parser, Debug)]
#[command(name = "efa-exporter", about = "Amazon EFA hardware counter exporter", version)]
struct Args {
    /// Sysfs mountpoint.
    #[arg(long = "path.sysfs", value_name = "PATH", default_value = "/sys")]
    sysfs_path: PathBuf,

    /// Metric namespace (first name component).
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Metric subsystem (second name component).
    #[arg(long, default_value = DEFAULT_SUBSYSTEM)]
    subsystem: String,

    /// Write to this file instead of stdout. The file is replaced atomically,
    /// suitable for node_exporter's --collector.textfile.directory.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the parsed device topology as JSON instead of metrics.
    #[arg(long)]
    json: bool,

    /// Repeat the scrape every SECS seconds until interrupted.
    #[arg(short, long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Failure of one scrape-and-write cycle.
#[derive(Debug)]
enum ExportError {
    Collect(CollectError),
    Json(serde_json::Error),
    Write { path: String, source: io::Error },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Collect(e) => write!(f, "{}", e),
            ExportError::Json(e) => write!(f, "failed to encode JSON: {}", e),
            ExportError::Write { path, source } => write!(f, "failed to write {}: {}", path, source),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Collect(e) => Some(e),
            ExportError::Json(e) => Some(e),
            ExportError::Write { source, .. } => Some(source),
        }
    }
}

impl From<CollectError> for ExportError {
    fn from(e: CollectError) -> Self {
        ExportError::Collect(e)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json(e)
    }
}

/// JSON document printed with `--json`.
#[derive(Serialize)]
struct TopologyReport<'a> {
    scraped_at: String,
    devices: &'a EfaClass,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["efa_exporter", "efa_exporter_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Stdout carries the exposition.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Runs one scrape and renders it in the requested format.
fn render<F: FileSystem>(collector: &EfaCollector<F>, json: bool) -> Result<String, ExportError> {
    if json {
        let devices = match collector.read_class() {
            Ok(devices) => devices,
            Err(e) if e.is_absent() => {
                debug!("Amazon EFA statistics not found: {}", e);
                EfaClass::new()
            }
            Err(e) => return Err(CollectError::from(e).into()),
        };
        let report = TopologyReport {
            scraped_at: Utc::now().to_rfc3339(),
            devices: &devices,
        };
        let mut out = serde_json::to_string_pretty(&report)?;
        out.push('\n');
        return Ok(out);
    }

    let mut samples = Vec::new();
    match collector.update(&mut samples)? {
        Update::Collected {
            devices,
            ports,
            samples: count,
            elapsed,
        } => debug!(
            "Scraped {} devices, {} ports, {} samples in {:?}",
            devices, ports, count, elapsed
        ),
        Update::NoData => debug!("No EFA devices, writing empty exposition"),
    }
    Ok(render_text(&samples))
}

/// Replaces `path` with `data` via a temp file in the same directory.
fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;

    // Temp files are created 0600; the textfile collector may run as another user.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), ExportError> {
    match output {
        Some(path) => write_atomic(path, content.as_bytes()).map_err(|source| ExportError::Write {
            path: path.display().to_string(),
            source,
        }),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|source| ExportError::Write {
                    path: "stdout".to_string(),
                    source,
                })
        }
    }
}

fn run_once<F: FileSystem>(collector: &EfaCollector<F>, args: &Args) -> Result<(), ExportError> {
    let content = render(collector, args.json)?;
    write_output(args.output.as_deref(), &content)
}

fn run_loop<F: FileSystem>(collector: &EfaCollector<F>, args: &Args, interval: Duration) {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting scrape loop, interval={}s", interval.as_secs());

    let mut scrape_count: u64 = 0;
    while running.load(Ordering::SeqCst) {
        scrape_count += 1;
        match run_once(collector, args) {
            Ok(()) => debug!("Scrape #{} written", scrape_count),
            Err(e) => error!("Scrape #{} failed: {}", scrape_count, e),
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down after {} scrapes", scrape_count);
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    debug!(
        "Config: sysfs={}, namespace={:?}, subsystem={:?}, output={}",
        args.sysfs_path.display(),
        args.namespace,
        args.subsystem,
        args.output
            .as_deref()
            .map_or_else(|| "stdout".to_string(), |p| p.display().to_string())
    );

    let collector = EfaCollector::new(RealFs::new(), &args.sysfs_path)
        .with_namespace(&args.namespace, &args.subsystem);

    match args.interval {
        Some(secs) => run_loop(&collector, &args, Duration::from_secs(secs)),
        None => {
            if let Err(e) = run_once(&collector, &args) {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }
}
