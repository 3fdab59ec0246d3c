//! Default values and bounds shared by parsing, validation, and tests.

/// Environment variable naming an optional JSON config file applied as
/// defaults beneath CLI flags.
pub const CONFIG_FILE_ENV: &str = "SPECTERM_CONFIG";

pub const DEFAULT_SAMPLE_RATE: u32 = 19_200;
pub const DEFAULT_FILE_LENGTH_SECS: f64 = 1.0;
pub const DEFAULT_DISPLAY_CHANNEL: usize = 1;
pub const DEFAULT_THRESHOLD_DB: i64 = 90;
pub const DEFAULT_THRESHOLD_STEPS: i64 = 5;
pub const DEFAULT_MARKFREQ_HZ: i64 = 5_000;
pub const DEFAULT_NFFT: i64 = 240;
pub const DEFAULT_REFRESH_MS: u64 = 200;

pub const MIN_SAMPLE_RATE: u32 = 1_000;
pub const MAX_SAMPLE_RATE: u32 = 500_000;
pub const MAX_DISPLAY_CHANNEL: usize = 8;
pub const MIN_THRESHOLD_STEPS: i64 = 1;
pub const MAX_THRESHOLD_STEPS: i64 = 50;
pub const MAX_FILE_LENGTH_SECS: f64 = 3_600.0;
pub const MIN_REFRESH_MS: u64 = 50;
pub const MAX_REFRESH_MS: u64 = 5_000;
