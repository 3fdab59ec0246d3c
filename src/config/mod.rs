//! Command-line parsing, the optional JSON config file, and validation.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub use defaults::{
    CONFIG_FILE_ENV, DEFAULT_DISPLAY_CHANNEL, DEFAULT_FILE_LENGTH_SECS, DEFAULT_MARKFREQ_HZ,
    DEFAULT_NFFT, DEFAULT_REFRESH_MS, DEFAULT_SAMPLE_RATE, DEFAULT_THRESHOLD_DB,
    DEFAULT_THRESHOLD_STEPS,
};
/// CLI options for the specterm TUI. Values in the JSON file named by
/// `SPECTERM_CONFIG` act as defaults; explicit flags win.
#[derive(Debug, Parser, Clone)]
#[command(about = "Live terminal spectrogram", author, version)]
pub struct AppConfig {
    /// Source directory containing .txt sample files
    #[arg(long, default_value = ".")]
    pub source: PathBuf,

    /// Sample rate of the recorded data (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Length of each data file (seconds)
    #[arg(long = "file-length", default_value_t = DEFAULT_FILE_LENGTH_SECS)]
    pub file_length_secs: f64,

    /// Channel shown at startup (column in the data files)
    #[arg(short = 'c', long = "display-channel", default_value_t = DEFAULT_DISPLAY_CHANNEL)]
    pub display_channel: usize,

    /// Threshold between quiet and loud colors (dB)
    #[arg(short = 't', long = "threshold-db", default_value_t = DEFAULT_THRESHOLD_DB)]
    pub threshold_db: i64,

    /// Width of each color band above and below the threshold (dB)
    #[arg(long = "threshold-steps", default_value_t = DEFAULT_THRESHOLD_STEPS)]
    pub threshold_steps: i64,

    /// Frequency highlighted with a marker column (Hz)
    #[arg(short = 'm', long = "markfreq-hz", default_value_t = DEFAULT_MARKFREQ_HZ)]
    pub markfreq_hz: i64,

    /// FFT window size in samples
    #[arg(long, default_value_t = DEFAULT_NFFT)]
    pub nfft: i64,

    /// Side the legend docks to
    #[arg(long = "legend-side", value_enum, default_value_t = LegendSide::Right)]
    pub legend_side: LegendSide,

    /// Layout mode at startup
    #[arg(long, value_enum, default_value_t = LayoutModeArg::BestFit)]
    pub layout: LayoutModeArg,

    /// Render period (milliseconds)
    #[arg(long = "refresh-ms", default_value_t = DEFAULT_REFRESH_MS)]
    pub refresh_ms: u64,

    /// Run input and rendering on one thread instead of a render thread
    #[arg(long = "sync", default_value_t = false)]
    pub sync: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SPECTERM_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SPECTERM_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Enable verbose render timing logs
    #[arg(long)]
    pub log_timings: bool,

    /// Print environment diagnostics and exit
    #[arg(long = "doctor", default_value_t = false)]
    pub doctor: bool,
}

impl AppConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    /// A file is eligible for display once its mtime is one file-period
    /// old; before that it may still be growing.
    pub fn settle_duration(&self) -> Duration {
        Duration::from_secs_f64(self.file_length_secs)
    }

    /// Files to jump per minute of data, for the skip keys.
    pub fn files_per_minute(&self) -> i64 {
        (60.0 / self.file_length_secs).round().max(1.0) as i64
    }
}

/// Which screen edge the legend docks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendSide {
    Left,
    Right,
}

/// Startup layout mode, mapped onto the engine's `LayoutMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutModeArg {
    BestFit,
    Stacked,
}

/// Optional JSON config file. Every field is optional; present fields
/// replace built-in defaults but never an explicit CLI flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub source: Option<PathBuf>,
    pub sample_rate: Option<u32>,
    pub file_length_secs: Option<f64>,
    pub display_channel: Option<usize>,
    pub threshold_db: Option<i64>,
    pub threshold_steps: Option<i64>,
    pub markfreq_hz: Option<i64>,
    pub nfft: Option<i64>,
    pub legend_side: Option<LegendSide>,
    pub layout: Option<LayoutModeArg>,
    pub refresh_ms: Option<u64>,
}
