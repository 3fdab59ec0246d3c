use super::{AppConfig, ConfigFile, LegendSide};
use clap::{CommandFactory, FromArgMatches, Parser};
use std::fs;
use std::path::PathBuf;

fn scratch_source(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "specterm_cfg_{tag}_{}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

fn base_config(tag: &str) -> (AppConfig, PathBuf) {
    let dir = scratch_source(tag);
    let cfg = AppConfig::parse_from([
        "specterm",
        "--source",
        dir.to_str().unwrap(),
    ]);
    (cfg, dir)
}

#[test]
fn defaults_validate_against_existing_source() {
    let (mut cfg, dir) = base_config("defaults");
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.sample_rate, 19_200);
    assert_eq!(cfg.nfft, 240);
    assert_eq!(cfg.threshold_db, 90);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rejects_missing_source_directory() {
    let mut cfg = AppConfig::parse_from(["specterm", "--source", "/does/not/exist"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_display_channel_out_of_bounds() {
    let (mut cfg, dir) = base_config("channel");
    cfg.display_channel = 0;
    assert!(cfg.validate().is_err());
    cfg.display_channel = 9;
    assert!(cfg.validate().is_err());
    cfg.display_channel = 8;
    assert!(cfg.validate().is_ok());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rejects_nfft_out_of_bounds() {
    let (mut cfg, dir) = base_config("nfft");
    cfg.nfft = 9;
    assert!(cfg.validate().is_err());
    cfg.nfft = 501;
    assert!(cfg.validate().is_err());
    cfg.nfft = 500;
    assert!(cfg.validate().is_ok());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rejects_markfreq_beyond_nyquist() {
    let (mut cfg, dir) = base_config("markfreq");
    cfg.markfreq_hz = i64::from(cfg.sample_rate) / 2 + 1;
    assert!(cfg.validate().is_err());
    cfg.markfreq_hz = i64::from(cfg.sample_rate) / 2;
    assert!(cfg.validate().is_ok());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn rejects_refresh_out_of_bounds() {
    let (mut cfg, dir) = base_config("refresh");
    cfg.refresh_ms = 10;
    assert!(cfg.validate().is_err());
    cfg.refresh_ms = 10_000;
    assert!(cfg.validate().is_err());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn files_per_minute_follows_file_length() {
    let (mut cfg, dir) = base_config("fpm");
    assert_eq!(cfg.files_per_minute(), 60);
    cfg.file_length_secs = 10.0;
    assert_eq!(cfg.files_per_minute(), 6);
    cfg.file_length_secs = 120.0;
    assert_eq!(cfg.files_per_minute(), 1);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn config_file_fills_defaulted_fields_only() {
    let matches = AppConfig::command().get_matches_from([
        "specterm",
        "--threshold-db",
        "75",
    ]);
    let mut cfg = AppConfig::from_arg_matches(&matches).unwrap();
    let overlay: ConfigFile = serde_json::from_str(
        r#"{"threshold_db": 60, "nfft": 120, "legend_side": "left"}"#,
    )
    .unwrap();
    cfg.apply_overlay(&overlay, &matches);

    // Explicit flag wins over the file.
    assert_eq!(cfg.threshold_db, 75);
    // Defaulted fields take the file's values.
    assert_eq!(cfg.nfft, 120);
    assert_eq!(cfg.legend_side, LegendSide::Left);
}

#[test]
fn config_file_rejects_unknown_fields() {
    let result: Result<ConfigFile, _> =
        serde_json::from_str(r#"{"threshold": 60}"#);
    assert!(result.is_err());
}

#[test]
fn config_file_load_reports_parse_errors() {
    let dir = scratch_source("badjson");
    let path = dir.join("config.json");
    fs::write(&path, "{not json").unwrap();
    assert!(ConfigFile::load(&path).is_err());
    assert!(ConfigFile::load(&dir.join("missing.json")).is_err());
    let _ = fs::remove_dir_all(&dir);
}
