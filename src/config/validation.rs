use super::defaults::{
    CONFIG_FILE_ENV, MAX_DISPLAY_CHANNEL, MAX_FILE_LENGTH_SECS, MAX_REFRESH_MS, MAX_SAMPLE_RATE,
    MAX_THRESHOLD_STEPS, MIN_REFRESH_MS, MIN_SAMPLE_RATE, MIN_THRESHOLD_STEPS,
};
use super::{AppConfig, ConfigFile};
use crate::specgram::{NFFT_MAX, NFFT_MIN};
use anyhow::{bail, Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use std::{env, fs, path::Path};

impl AppConfig {
    /// Parse CLI arguments, layer the optional JSON config file beneath
    /// them, and validate the result.
    pub fn parse_args() -> Result<Self> {
        let matches = Self::command().get_matches();
        let mut config =
            Self::from_arg_matches(&matches).context("failed to read CLI arguments")?;
        if let Some(path) = env::var_os(CONFIG_FILE_ENV) {
            let overlay = ConfigFile::load(Path::new(&path))?;
            config.apply_overlay(&overlay, &matches);
        }
        // --doctor reports validation problems in its output instead of
        // refusing to start.
        if !config.doctor {
            config.validate()?;
        }
        Ok(config)
    }

    /// Applies config-file values to every field the user left at its
    /// built-in default. Explicit flags always win.
    pub fn apply_overlay(&mut self, file: &ConfigFile, matches: &ArgMatches) {
        fn defaulted(matches: &ArgMatches, id: &str) -> bool {
            matches
                .value_source(id)
                .map_or(true, |source| source == ValueSource::DefaultValue)
        }
        macro_rules! overlay {
            ($field:ident) => {
                if let Some(value) = &file.$field {
                    if defaulted(matches, stringify!($field)) {
                        self.$field = value.clone();
                    }
                }
            };
        }
        overlay!(source);
        overlay!(sample_rate);
        overlay!(file_length_secs);
        overlay!(display_channel);
        overlay!(threshold_db);
        overlay!(threshold_steps);
        overlay!(markfreq_hz);
        overlay!(nfft);
        overlay!(legend_side);
        overlay!(layout);
        overlay!(refresh_ms);
    }

    /// Check value ranges and the source directory before the UI starts.
    pub fn validate(&mut self) -> Result<()> {
        if !self.source.is_dir() {
            bail!(
                "--source '{}' is not an existing directory",
                self.source.display()
            );
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            bail!(
                "--sample-rate must be between {MIN_SAMPLE_RATE} and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !(self.file_length_secs > 0.0 && self.file_length_secs <= MAX_FILE_LENGTH_SECS) {
            bail!(
                "--file-length must be between 0 (exclusive) and {MAX_FILE_LENGTH_SECS} seconds, got {}",
                self.file_length_secs
            );
        }
        if !(1..=MAX_DISPLAY_CHANNEL).contains(&self.display_channel) {
            bail!(
                "--display-channel must be between 1 and {MAX_DISPLAY_CHANNEL}, got {}",
                self.display_channel
            );
        }
        if !(NFFT_MIN..=NFFT_MAX).contains(&self.nfft) {
            bail!(
                "--nfft must be between {NFFT_MIN} and {NFFT_MAX}, got {}",
                self.nfft
            );
        }
        if !(MIN_THRESHOLD_STEPS..=MAX_THRESHOLD_STEPS).contains(&self.threshold_steps) {
            bail!(
                "--threshold-steps must be between {MIN_THRESHOLD_STEPS} and {MAX_THRESHOLD_STEPS}, got {}",
                self.threshold_steps
            );
        }
        let nyquist = i64::from(self.sample_rate) / 2;
        if !(0..=nyquist).contains(&self.markfreq_hz) {
            bail!(
                "--markfreq-hz must be between 0 and the Nyquist frequency ({nyquist} Hz), got {}",
                self.markfreq_hz
            );
        }
        if !(MIN_REFRESH_MS..=MAX_REFRESH_MS).contains(&self.refresh_ms) {
            bail!(
                "--refresh-ms must be between {MIN_REFRESH_MS} and {MAX_REFRESH_MS}, got {}",
                self.refresh_ms
            );
        }
        Ok(())
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parse config file '{}'", path.display()))
    }
}
