use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;

mod aggregate;
mod analysis;
mod breaks;
mod config;
mod error;
mod idle;
mod ingest;
mod intervals;
mod linker;
mod models;
mod report;

use analysis::{Analysis, AnalysisOutcome};
use config::{AnalysisConfig, BreakWindow};

#[derive(Parser)]
#[command(name = "idle-time-analyzer")]
#[command(about = "Time without management per agent from a contact attempt log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key figures and idle time per agent
    Summary {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Every idle interval that meets the threshold
    Detail {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Idle minutes by weekday and hour
    Heatmap {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Agent by hour matrix with totals
    Matrix {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write every aggregate as JSON
    Json {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, default_value = "analysis.json")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// CSV with FchCreacion, HraCreacion, Gestor and GstCodigo columns
    #[arg(long)]
    csv: PathBuf,
    /// JSON file with analysis settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Minimum interval in minutes
    #[arg(long)]
    min_interval: Option<f64>,
    /// Daily break to exclude, repeatable
    #[arg(long = "break", value_name = "HH:MM-HH:MM")]
    breaks: Vec<String>,
    /// Do not exclude any break
    #[arg(long, conflicts_with = "breaks")]
    no_breaks: bool,
    /// Qualifying status code, repeatable
    #[arg(long = "code")]
    codes: Vec<String>,
    #[arg(long)]
    start_hour: Option<u32>,
    #[arg(long)]
    end_hour: Option<u32>,
    /// Charge each interval to the hour of its closing event
    #[arg(long)]
    bucket_by_event: bool,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Restrict to these agents, repeatable
    #[arg(long = "agent")]
    agents: Vec<String>,
}

impl AnalysisArgs {
    fn to_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(min) = self.min_interval {
            config.min_interval_minutes = min;
        }
        if self.no_breaks {
            config.breaks.clear();
        } else if !self.breaks.is_empty() {
            config.breaks = self
                .breaks
                .iter()
                .map(|spec| BreakWindow::parse(spec))
                .collect::<Result<Vec<_>, _>>()?;
        }
        if !self.codes.is_empty() {
            config.set_qualifying_codes(&self.codes);
        }
        if let Some(hour) = self.start_hour {
            config.start_hour = hour;
        }
        if let Some(hour) = self.end_hour {
            config.end_hour = hour;
        }
        if self.bucket_by_event {
            config.exact_overlap = false;
        }
        if self.from.is_some() {
            config.date_from = self.from;
        }
        if self.to.is_some() {
            config.date_to = self.to;
        }
        if !self.agents.is_empty() {
            config.agents = self.agents.iter().map(|a| a.trim().to_string()).collect();
        }

        config.validate()?;
        Ok(config)
    }

    fn analyze(&self) -> anyhow::Result<Option<(AnalysisConfig, Analysis)>> {
        let config = self.to_config()?;
        let (events, stats) = ingest::load_events(&self.csv)?;
        info!("loaded {} events from {}", stats.events, self.csv.display());

        match analysis::run(events, &config)? {
            AnalysisOutcome::Ready(analysis) => Ok(Some((config, *analysis))),
            AnalysisOutcome::NoEventsInScope => {
                println!("No data for the selected filters.");
                Ok(None)
            }
            AnalysisOutcome::NoQualifyingEvents => {
                let codes: Vec<&str> = config.qualifying_codes.iter().map(String::as_str).collect();
                println!("No events with status code in {codes:?} for the selected filters.");
                Ok(None)
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { analysis, limit } => {
            if let Some((_, result)) = analysis.analyze()? {
                print!("{}", report::render_summary(&result, limit));
            }
        }
        Commands::Detail { analysis } => {
            if let Some((_, result)) = analysis.analyze()? {
                print!("{}", report::render_detail(&result));
            }
        }
        Commands::Heatmap { analysis } => {
            if let Some((_, result)) = analysis.analyze()? {
                print!("{}", report::render_heatmap(&result));
            }
        }
        Commands::Matrix { analysis } => {
            if let Some((_, result)) = analysis.analyze()? {
                print!("{}", report::render_matrix(&result.matrix));
            }
        }
        Commands::Report { analysis, out } => {
            if let Some((config, result)) = analysis.analyze()? {
                let source = source_name(&analysis.csv);
                let report = report::build_report(&source, &config, &result);
                std::fs::write(&out, report)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Json { analysis, out } => {
            if let Some((config, result)) = analysis.analyze()? {
                let json = report::to_json(&config, &result)?;
                std::fs::write(&out, json)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Aggregates written to {}.", out.display());
            }
        }
    }

    Ok(())
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
