//! `--doctor` diagnostic report: resolved configuration plus terminal
//! environment, printed to stdout before the TUI ever starts.

use crate::{config::AppConfig, crash_log_path, log_file_path, nav};
use crossterm::terminal::size as terminal_size;
use std::{env, fmt::Display, time::Duration};

pub struct DoctorReport {
    lines: Vec<String>,
}

impl DoctorReport {
    pub fn new(title: &str) -> Self {
        Self {
            lines: vec![title.to_string()],
        }
    }

    pub fn section(&mut self, title: &str) {
        self.lines.push(String::new());
        self.lines.push(format!("{title}:"));
    }

    pub fn push_kv(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("  {key}: {value}"));
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

pub fn doctor_report(config: &AppConfig) -> DoctorReport {
    let mut report = DoctorReport::new("specterm doctor");
    report.push_kv("version", env!("CARGO_PKG_VERSION"));
    report.push_kv("os", format!("{}/{}", env::consts::OS, env::consts::ARCH));

    let mut validated = config.clone();
    let validation_result = validated.validate();

    report.section("Terminal");
    match terminal_size() {
        Ok((cols, rows)) => report.push_kv("size", format!("{cols}x{rows}")),
        Err(err) => report.push_kv("size", format!("error: {err}")),
    }
    if let Ok(term) = env::var("TERM") {
        report.push_kv("term", term);
    }
    if env::var("NO_COLOR").is_ok() {
        report.push_kv("no_color", "set");
    }
    report.push_kv("color_mode", detect_color_mode());
    report.push_kv("unicode", detect_unicode_support());

    report.section("Config");
    match validation_result {
        Ok(()) => report.push_kv("validation", "ok"),
        Err(err) => report.push_kv("validation", format!("error: {err}")),
    }
    report.push_kv("source", config.source.display());
    report.push_kv("sample_rate", config.sample_rate);
    report.push_kv("file_length_secs", config.file_length_secs);
    report.push_kv("display_channel", config.display_channel);
    report.push_kv("threshold_db", config.threshold_db);
    report.push_kv("threshold_steps", config.threshold_steps);
    report.push_kv("markfreq_hz", config.markfreq_hz);
    report.push_kv("nfft", config.nfft);
    report.push_kv("legend_side", format!("{:?}", config.legend_side));
    report.push_kv("layout", format!("{:?}", config.layout));
    report.push_kv("refresh_ms", config.refresh_ms);
    report.push_kv("run_mode", if config.sync { "sync" } else { "async" });
    let logs_enabled = (config.logs || config.log_timings) && !config.no_logs;
    report.push_kv("logs", if logs_enabled { "enabled" } else { "disabled" });
    report.push_kv("log_file", log_file_path().display());
    report.push_kv("crash_log", crash_log_path().display());

    report.section("Data");
    let settled = nav::eligible_files(&config.source, config.settle_duration());
    let all = nav::eligible_files(&config.source, Duration::ZERO);
    report.push_kv("data_files", all.len());
    report.push_kv("settled_files", settled.len());
    match (all.first(), all.last()) {
        (Some(first), Some(last)) => {
            report.push_kv("oldest", first.display());
            report.push_kv("newest", last.display());
        }
        _ => report.push_kv("files", "none found"),
    }

    report
}

fn detect_color_mode() -> String {
    if env::var("NO_COLOR").is_ok() {
        return "none (NO_COLOR)".to_string();
    }
    if let Ok(colorterm) = env::var("COLORTERM") {
        let value = colorterm.to_lowercase();
        if value == "truecolor" || value == "24bit" {
            return format!("truecolor (COLORTERM={colorterm})");
        }
    }
    if let Ok(term) = env::var("TERM") {
        let value = term.to_lowercase();
        if value.contains("256color") {
            return format!("256 (TERM={term})");
        }
        if value == "dumb" {
            return "none (TERM=dumb)".to_string();
        }
        return format!("ansi (TERM={term})");
    }
    "ansi (default)".to_string()
}

fn detect_unicode_support() -> String {
    for key in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(value) = env::var(key) {
            let upper = value.to_ascii_uppercase();
            if upper.contains("UTF-8") || upper.contains("UTF8") {
                return format!("likely ({key}={value})");
            }
            return format!("unknown ({key}={value})");
        }
    }
    "unknown (locale env not set)".to_string()
}
