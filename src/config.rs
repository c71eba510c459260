use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_QUALIFYING_CODES: [&str; 2] = ["nocontacto", "inubicado"];

/// A daily excluded window, applied identically to every calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BreakWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BreakWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if end <= start {
            return Err(ConfigError::InvalidBreakWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses `HH:MM-HH:MM`.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || ConfigError::InvalidBreakSpec(spec.to_string());
        let (start_s, end_s) = spec.split_once('-').ok_or_else(invalid)?;
        let start = NaiveTime::parse_from_str(start_s.trim(), "%H:%M").map_err(|_| invalid())?;
        let end = NaiveTime::parse_from_str(end_s.trim(), "%H:%M").map_err(|_| invalid())?;
        Self::new(start, end)
    }
}

impl std::fmt::Display for BreakWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Everything the analysis needs, passed explicitly into each stage.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Normalized (trimmed, lowercase) status codes that open an idle interval.
    pub qualifying_codes: BTreeSet<String>,
    pub min_interval_minutes: f64,
    pub breaks: Vec<BreakWindow>,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Split intervals across the clock hours they cross instead of
    /// charging the whole interval to the hour of the closing event.
    pub exact_overlap: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// Empty means every agent.
    pub agents: BTreeSet<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            qualifying_codes: DEFAULT_QUALIFYING_CODES
                .iter()
                .map(|code| code.to_string())
                .collect(),
            min_interval_minutes: 5.0,
            breaks: vec![BreakWindow {
                start: NaiveTime::from_hms_opt(13, 0, 0).unwrap_or_default(),
                end: NaiveTime::from_hms_opt(14, 30, 0).unwrap_or_default(),
            }],
            start_hour: 6,
            end_hour: 21,
            exact_overlap: true,
            date_from: None,
            date_to: None,
            agents: BTreeSet::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.qualifying_codes.is_empty() {
            return Err(ConfigError::EmptyQualifyingCodes);
        }
        if !self.min_interval_minutes.is_finite() || self.min_interval_minutes < 0.0 {
            return Err(ConfigError::InvalidMinInterval(self.min_interval_minutes));
        }
        for window in &self.breaks {
            BreakWindow::new(window.start, window.end)?;
        }
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(ConfigError::InvalidHourRange {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        Ok(())
    }

    pub fn set_qualifying_codes<I, S>(&mut self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.qualifying_codes = codes
            .into_iter()
            .map(|code| normalize_code(code.as_ref()))
            .filter(|code| !code.is_empty())
            .collect();
    }

    /// Loads a JSON file and layers it over the defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let file: FileConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        let mut config = Self::default();
        config.apply(file)?;
        Ok(config)
    }

    fn apply(&mut self, file: FileConfig) -> Result<()> {
        if let Some(codes) = file.qualifying_codes {
            self.set_qualifying_codes(codes);
        }
        if let Some(min) = file.min_interval_minutes {
            self.min_interval_minutes = min;
        }
        if let Some(specs) = file.breaks {
            self.breaks = specs
                .iter()
                .map(|spec| BreakWindow::parse(spec))
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(hour) = file.start_hour {
            self.start_hour = hour;
        }
        if let Some(hour) = file.end_hour {
            self.end_hour = hour;
        }
        if let Some(exact) = file.exact_overlap {
            self.exact_overlap = exact;
        }
        if file.date_from.is_some() {
            self.date_from = file.date_from;
        }
        if file.date_to.is_some() {
            self.date_to = file.date_to;
        }
        if let Some(agents) = file.agents {
            self.agents = agents.into_iter().map(|a| a.trim().to_string()).collect();
        }
        Ok(())
    }
}

/// On-disk shape of `--config`; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    qualifying_codes: Option<Vec<String>>,
    min_interval_minutes: Option<f64>,
    /// `HH:MM-HH:MM` strings.
    breaks: Option<Vec<String>>,
    start_hour: Option<u32>,
    end_hour: Option<u32>,
    exact_overlap: Option<bool>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    agents: Option<Vec<String>>,
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_lowercase()
}
