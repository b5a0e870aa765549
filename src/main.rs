use anyhow::{Context, Result};
use classifier::{ClassifierParams, StatusClassifier};
use clap::{Parser, Subcommand};
use configuration::{AuditConfig, DetectorKind, init_tracing, load_config, validate};
use core_types::{AnomalyMap, AnomalyStatus, LongTable, TableSchema};
use frame::AggregatedFrame;
use latest_report::{LatestPeriodReport, LatestReport};
use peer_scanner::{PeerGroupOutlierScanner, PeerParams, PeerScan};
use rolling_scanner::{RollingParams, RollingScan, RollingTimeSeriesScanner};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Scan(args) => {
            args.apply(&mut config);
            validate(&config)?;
            handle_scan(&args, &config)?;
        }
        Commands::Classify(args) => handle_classify(&args, &config)?,
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Audits ledger time series for anomalous values.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration. Defaults to `audit.toml` when present.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured scanners over a long-format JSON table.
    Scan(ScanArgs),
    /// Classify a single value against a history given on the command line.
    Classify(ClassifyArgs),
}

#[derive(Parser)]
struct ScanArgs {
    /// JSON file holding `{ "columns": [...], "rows": [[...], ...] }`.
    #[arg(long, short)]
    input: PathBuf,

    /// Where to write the findings. Defaults to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Trailing window of the rolling scan.
    #[arg(long)]
    window: Option<usize>,

    /// Minimum positive history for the latest-period report.
    #[arg(long)]
    min_history: Option<usize>,

    /// IQR fence multiplier.
    #[arg(long)]
    k: Option<f64>,

    /// Outlier detector for the peer scan.
    #[arg(long, value_enum)]
    detector: Option<DetectorKind>,

    /// Skip the latest-period report.
    #[arg(long)]
    no_latest: bool,

    /// Skip the rolling time-series scan.
    #[arg(long)]
    no_rolling: bool,

    /// Skip the peer-group scan.
    #[arg(long)]
    no_peer: bool,
}

impl ScanArgs {
    fn apply(&self, config: &mut AuditConfig) {
        if let Some(window) = self.window {
            config.rolling.window = window;
        }
        if let Some(min_history) = self.min_history {
            config.latest.min_history = min_history;
        }
        if let Some(k) = self.k {
            config.thresholds.k = k;
        }
        if let Some(detector) = self.detector {
            config.peer.detector = detector;
        }
        config.latest.enabled &= !self.no_latest;
        config.rolling.enabled &= !self.no_rolling;
        config.peer.enabled &= !self.no_peer;
    }
}

#[derive(Parser)]
struct ClassifyArgs {
    /// The value to classify.
    #[arg(long, allow_hyphen_values = true)]
    current: f64,

    /// Earlier values, oldest first, comma separated.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    history: Vec<f64>,
}

// ==============================================================================
// Scan Command Logic
// ==============================================================================

/// Everything one `scan` run produced. Disabled scanners are omitted.
#[derive(Serialize)]
struct AuditOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<LatestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rolling: Option<RollingScan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    peer: Option<PeerScan>,
    /// Peer findings keyed by group and `peer.item_column`, when one is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    peer_cells: Option<AnomalyMap<AnomalyStatus>>,
}

impl AuditOutput {
    fn new(
        latest: Option<LatestReport>,
        rolling: Option<RollingScan>,
        peer: Option<PeerScan>,
        item_column: Option<&str>,
    ) -> Self {
        let peer_cells = peer
            .as_ref()
            .zip(item_column)
            .map(|(scan, item)| scan.anomaly_map(item));
        Self {
            latest,
            rolling,
            peer,
            peer_cells,
        }
    }
}

fn classifier_params(config: &AuditConfig) -> ClassifierParams {
    ClassifierParams {
        min_history: config.latest.min_history,
        k: config.thresholds.k,
        pct_threshold_1: config.thresholds.pct_threshold_1,
        pct_threshold_2: config.thresholds.pct_threshold_2,
    }
}

fn schema_for(config: &AuditConfig, dimensions: Option<&Vec<String>>) -> TableSchema {
    let schema = config.columns.schema();
    match dimensions {
        Some(dimensions) => schema.with_dimensions(dimensions),
        None => schema,
    }
}

/// One schema covering the columns of every enabled scanner, so a single
/// check can name everything the run is missing.
fn required_schema(config: &AuditConfig) -> TableSchema {
    let base = &config.columns.dimensions;
    let mut sources: Vec<&Vec<String>> = Vec::new();
    if config.latest.enabled {
        sources.push(config.latest.dimensions.as_ref().unwrap_or(base));
    }
    if config.rolling.enabled {
        sources.push(config.rolling.dimensions.as_ref().unwrap_or(base));
    }
    if config.peer.enabled {
        sources.push(&config.peer.group_by);
    }

    let mut dimensions: Vec<String> = Vec::new();
    for name in sources.into_iter().flatten() {
        if !dimensions.contains(name) {
            dimensions.push(name.clone());
        }
    }
    config.columns.schema().with_dimensions(&dimensions)
}

fn handle_scan(args: &ScanArgs, config: &AuditConfig) -> Result<()> {
    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open input table {}", args.input.display()))?;
    let table: LongTable = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse input table {}", args.input.display()))?;
    info!(rows = table.len(), columns = table.columns.len(), "Loaded input table");

    // Shape check up front, so a wrong column name fails before any scan starts.
    frame::resolve(&table, &required_schema(config))?;

    let params = classifier_params(config);
    let peer_scanner = if config.peer.enabled {
        Some(PeerGroupOutlierScanner::from_settings(&config.peer)?)
    } else {
        None
    };

    let run_latest = || -> Result<Option<LatestReport>> {
        if !config.latest.enabled {
            return Ok(None);
        }
        let schema = schema_for(config, config.latest.dimensions.as_ref());
        let frame = AggregatedFrame::from_table(&table, &schema)?;
        Ok(Some(LatestPeriodReport::new().build(&frame.pivot(), &params)))
    };

    let run_rolling = || -> Result<Option<RollingScan>> {
        if !config.rolling.enabled {
            return Ok(None);
        }
        let schema = schema_for(config, config.rolling.dimensions.as_ref());
        let frame = AggregatedFrame::from_table(&table, &schema)?;
        let rolling = RollingParams {
            window: config.rolling.window,
            thresholds: params,
        };
        Ok(Some(RollingTimeSeriesScanner::new().scan(&frame, &rolling)))
    };

    let run_peer = || -> Result<Option<PeerScan>> {
        let Some(scanner) = &peer_scanner else {
            return Ok(None);
        };
        let scan = scanner.scan(&table, &config.columns.schema(), &PeerParams::from(&config.peer))?;
        Ok(Some(scan))
    };

    let (latest, (rolling, peer)) = rayon::join(run_latest, || rayon::join(run_rolling, run_peer));
    let output = AuditOutput::new(latest?, rolling?, peer?, config.peer.item_column.as_deref());

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &output)?;
            writer.flush()?;
            info!(path = %path.display(), "Findings written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &output)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}

// ==============================================================================
// Classify Command Logic
// ==============================================================================

fn handle_classify(args: &ClassifyArgs, config: &AuditConfig) -> Result<()> {
    let result = StatusClassifier::new().classify(args.current, &args.history, &classifier_params(config));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
