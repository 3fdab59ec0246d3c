//! specterm: a live, navigable terminal spectrogram built on a
//! hand-rolled panel and layout engine.
//!
//! The engine pieces (panels, legends, keymap, cache, screen writer) are
//! independent of the spectrogram itself, which is just one consumer
//! wired up in the binary.

mod app;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod doctor;
pub mod geometry;
pub mod keymap;
pub mod legend;
pub mod nav;
pub mod panel;
pub mod screen;
pub mod specgram;
mod telemetry;
pub mod terminal_restore;

pub use app::logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use telemetry::init_tracing;
