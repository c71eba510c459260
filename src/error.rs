//! Configuration errors raised before any analysis runs.

use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("break window must end after it starts (got {start}-{end})")]
    InvalidBreakWindow { start: NaiveTime, end: NaiveTime },

    #[error("invalid break window '{0}', expected HH:MM-HH:MM")]
    InvalidBreakSpec(String),

    #[error("hour range must satisfy 0 <= start < end <= 24 (got {start}..{end})")]
    InvalidHourRange { start: u32, end: u32 },

    #[error("minimum interval must be a non-negative number of minutes (got {0})")]
    InvalidMinInterval(f64),

    #[error("at least one qualifying status code is required")]
    EmptyQualifyingCodes,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
