//! Command-line interface for probe-payload.
//!
//! Feeds payload files (or stdin) for one target through a parser and
//! prints the resulting snapshot.

use crate::core::{Config, ConfigBuilder, LoggingConfig, PayloadError, Result};
use crate::metrics::MetricSnapshot;
use crate::payload::{Parser as PayloadParser, SnapshotStore};
use clap::Parser;
use std::path::PathBuf;

/// Parse external probe payloads into labeled metric snapshots
#[derive(Parser, Debug)]
#[command(name = "probe-payload")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, env = "PROBE_PAYLOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target the payloads were collected for
    #[arg(short, long, env = "PROBE_PAYLOAD_TARGET", default_value = "localhost")]
    pub target: String,

    /// Accumulate payloads regardless of the configured aggregate_in_core
    #[arg(long)]
    pub aggregate: bool,

    /// Enable debug logging
    #[arg(short, long, env = "PROBE_PAYLOAD_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Payload files, processed in order. Reads stdin when empty.
    pub payloads: Vec<PathBuf>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration from the given file (or defaults), then apply CLI overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        if let Some(path) = &self.config {
            let content = std::fs::read_to_string(path).map_err(|e| {
                PayloadError::config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            builder = builder.from_yaml(&content)?;
        }

        if self.aggregate {
            builder = builder.aggregate_in_core(true);
        }

        builder.build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self, logging: &LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level = std::env::var("PROBE_PAYLOAD_LOG_LEVEL")
            .unwrap_or_else(|_| logging.level.as_str().to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = if logging.structured {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .compact()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_line_number(false)
                .compact()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| PayloadError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }

    /// Read every payload in order and return the target's final snapshot.
    ///
    /// Rejected payloads are logged and skipped; the stored snapshot is only
    /// replaced by accepted ones. Returns the last rejection if nothing was
    /// accepted.
    pub fn run(&self, parser: &PayloadParser) -> Result<MetricSnapshot> {
        let store = SnapshotStore::new();
        let mut last_error = None;

        let payloads = if self.payloads.is_empty() {
            vec![("<stdin>".to_string(), std::io::read_to_string(std::io::stdin())?)]
        } else {
            self.payloads
                .iter()
                .map(|path| -> Result<(String, String)> {
                    Ok((path.display().to_string(), std::fs::read_to_string(path)?))
                })
                .collect::<Result<Vec<_>>>()?
        };

        for (source, payload) in &payloads {
            match store.ingest(parser, &self.target, payload) {
                Ok(snapshot) => {
                    tracing::debug!(source = %source, metrics = snapshot.len(), "Accepted payload");
                },
                Err(e) => {
                    tracing::warn!(
                        source = %source,
                        category = e.category(),
                        "Rejected payload: {}",
                        e
                    );
                    last_error = Some(e);
                },
            }
        }

        match store.get(&self.target) {
            Some(snapshot) => Ok(snapshot),
            None => Err(last_error
                .unwrap_or_else(|| PayloadError::config("no payloads were provided"))),
        }
    }
}

/// Execute the probe-payload command.
pub fn execute(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    cli.init_logging(&config.logging)?;

    let parser = PayloadParser::from_config(&config)?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Probe: {} ({})", parser.probe_name(), parser.probe_type());
        println!("  Aggregate in core: {}", parser.aggregates());
        println!("  Metric kind: {}", parser.kind().as_str());
        for name in parser.dist_metric_names() {
            if let Some(bounds) = parser.bucket_bounds(name) {
                println!("  Distribution {}: {:?}", name, bounds);
            }
        }
        return Ok(());
    }

    tracing::info!(target_name = %cli.target, payloads = cli.payloads.len(), "Processing payloads");
    let snapshot = cli.run(&parser)?;
    println!("{}", snapshot);

    Ok(())
}
