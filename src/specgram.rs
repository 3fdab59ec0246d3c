//! Spectrogram renderer: parses comma-separated sample files, runs the
//! selected channel through a real FFT, and paints dB magnitudes as a
//! six-color ramp into the main panel's buffer.
//!
//! This is a consumer of the layout engine, not part of it. The renderer
//! reads its tunable parameters out of a shared [`ViewParams`] that key
//! handlers on the input side adjust through atomics.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};
use crossterm::style::{Attribute, Attributes, Color};
use realfft::RealFftPlanner;

use crate::nav::NavMode;
use crate::panel::{PanelBuffer, Pixel, PixelRow, RedrawContext};

pub const NFFT_MIN: i64 = 10;
pub const NFFT_MAX: i64 = 500;
pub const NFFT_STEP: i64 = 10;
pub const MARKFREQ_STEP: i64 = 200;

/// Ordered quiet-to-loud color ramp. The threshold sits between green
/// and yellow; `threshold_steps` widens each band.
const RAMP: [Color; 6] = [
    Color::Blue,
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Red,
];

/// Renderer parameters shared between the input side (which adjusts
/// them) and the render side (which reads them every cycle). All
/// adjustments clamp; none can fail.
pub struct ViewParams {
    threshold_db: AtomicI64,
    threshold_steps: AtomicI64,
    markfreq_hz: AtomicI64,
    nfft: AtomicI64,
    channel: AtomicUsize,
    channel_count: AtomicUsize,
    sample_rate: u32,
}

impl ViewParams {
    pub fn new(
        threshold_db: i64,
        threshold_steps: i64,
        markfreq_hz: i64,
        nfft: i64,
        channel: usize,
        sample_rate: u32,
    ) -> Self {
        Self {
            threshold_db: AtomicI64::new(threshold_db),
            threshold_steps: AtomicI64::new(threshold_steps),
            markfreq_hz: AtomicI64::new(markfreq_hz),
            nfft: AtomicI64::new(nfft.clamp(NFFT_MIN, NFFT_MAX)),
            channel: AtomicUsize::new(channel.max(1)),
            channel_count: AtomicUsize::new(channel.max(1)),
            sample_rate,
        }
    }

    pub fn threshold_db(&self) -> i64 {
        self.threshold_db.load(Ordering::Relaxed)
    }

    pub fn threshold_steps(&self) -> i64 {
        self.threshold_steps.load(Ordering::Relaxed)
    }

    pub fn markfreq_hz(&self) -> i64 {
        self.markfreq_hz.load(Ordering::Relaxed)
    }

    pub fn nfft(&self) -> usize {
        self.nfft.load(Ordering::Relaxed) as usize
    }

    pub fn channel(&self) -> usize {
        self.channel.load(Ordering::Relaxed)
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count.load(Ordering::Relaxed)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn adjust_threshold(&self, delta: i64) -> i64 {
        self.threshold_db.fetch_add(delta, Ordering::Relaxed) + delta
    }

    /// NFFT moves in steps of ten and clamps to `[10, 500]`.
    pub fn adjust_nfft(&self, delta: i64) -> i64 {
        let mut current = self.nfft.load(Ordering::Relaxed);
        loop {
            let next = (current + delta).clamp(NFFT_MIN, NFFT_MAX);
            match self.nfft.compare_exchange(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(seen) => current = seen,
            }
        }
    }

    /// Mark frequency clamps to `[0, nyquist]`.
    pub fn adjust_markfreq(&self, delta: i64) -> i64 {
        let nyquist = i64::from(self.sample_rate) / 2;
        let mut current = self.markfreq_hz.load(Ordering::Relaxed);
        loop {
            let next = (current + delta).clamp(0, nyquist);
            match self.markfreq_hz.compare_exchange(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(seen) => current = seen,
            }
        }
    }

    /// Advances to the next channel, wrapping at the channel count the
    /// renderer last discovered in the data.
    pub fn cycle_channel(&self) -> usize {
        let count = self.channel_count.load(Ordering::Relaxed).max(1);
        let mut current = self.channel.load(Ordering::Relaxed);
        loop {
            let next = current % count + 1;
            match self.channel.compare_exchange(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(seen) => current = seen,
            }
        }
    }

    fn record_channel_count(&self, count: usize) {
        self.channel_count.store(count.max(1), Ordering::Relaxed);
    }
}

/// Picks the ramp color for one dB bin. Matches on the truncated value
/// so readings a fraction above the threshold still count as above it.
pub fn color_for_db(db: f64, threshold: i64, steps: i64) -> Color {
    let db = db as i64;
    if db >= threshold {
        let over = db - threshold;
        if over <= steps {
            RAMP[3]
        } else if over < steps * 2 {
            RAMP[4]
        } else {
            RAMP[5]
        }
    } else {
        let under = threshold - db;
        if under <= steps {
            RAMP[2]
        } else if under < steps * 2 {
            RAMP[1]
        } else {
            RAMP[0]
        }
    }
}

/// One parsed data file: the selected channel's samples.
#[derive(Debug, Clone)]
struct ParsedFile {
    path: PathBuf,
    channel: usize,
    samples: Vec<f64>,
    channels: usize,
}

/// Comma-separated voltages, one row per sample, one column per channel.
fn parse_samples(path: &Path, channel: usize) -> Result<ParsedFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    let mut samples = Vec::new();
    let mut channels = 0usize;
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let columns: Vec<&str> = line.split(',').collect();
        channels = channels.max(columns.len());
        let column = columns.get(channel - 1).with_context(|| {
            format!("line {}: no column for channel {channel}", line_no + 1)
        })?;
        let value: f64 = column.trim().parse().with_context(|| {
            format!("line {}: bad sample {column:?}", line_no + 1)
        })?;
        samples.push(value);
    }
    if samples.is_empty() {
        bail!("no samples in {}", path.display());
    }
    Ok(ParsedFile {
        path: path.to_path_buf(),
        channel,
        samples,
        channels,
    })
}

/// The file's start time, taken from its Unix-timestamp stem.
pub fn file_timestamp(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.parse().ok()
}

pub struct Specgram {
    params: std::sync::Arc<ViewParams>,
    planner: RealFftPlanner<f64>,
    cached: Option<ParsedFile>,
    line_mod: usize,
    lines_of_data: usize,
}

impl Specgram {
    pub fn new(params: std::sync::Arc<ViewParams>) -> Self {
        Self {
            params,
            planner: RealFftPlanner::new(),
            cached: None,
            line_mod: 1,
            lines_of_data: 0,
        }
    }

    pub fn lines_of_data(&self) -> usize {
        self.lines_of_data
    }

    /// Redraw callback body for the main panel. Data problems degrade to
    /// a placeholder frame plus a notice the engine surfaces as a flash.
    pub fn render(&mut self, ctx: &RedrawContext<'_>, buffer: &mut PanelBuffer) {
        let Some(file) = ctx.file else {
            placeholder(buffer, "waiting for data files...");
            return;
        };
        if let Err(err) = self.render_file(file, ctx, buffer) {
            buffer.rows.clear();
            placeholder(buffer, "no renderable data");
            buffer.notice = Some(format!("{err:#}"));
        }
    }

    fn samples_for(&mut self, file: &Path, same_file: bool) -> Result<ParsedFile> {
        let channel = self.params.channel();
        if same_file {
            if let Some(cached) = &self.cached {
                if cached.path == file && cached.channel == channel {
                    return Ok(cached.clone());
                }
            }
        }
        let parsed = parse_samples(file, channel)?;
        self.params.record_channel_count(parsed.channels);
        self.cached = Some(parsed.clone());
        Ok(parsed)
    }

    /// dB magnitude rows, one per NFFT window. The final partial window
    /// is zero-padded.
    fn fft_rows(&mut self, samples: &[f64], nfft: usize) -> Result<Vec<Vec<f64>>> {
        let fft = self.planner.plan_fft_forward(nfft);
        let mut rows = Vec::new();
        for chunk in samples.chunks(nfft) {
            let mut input = fft.make_input_vec();
            input[..chunk.len()].copy_from_slice(chunk);
            let mut spectrum = fft.make_output_vec();
            fft.process(&mut input, &mut spectrum)
                .map_err(|err| anyhow::anyhow!("fft over {nfft} samples: {err}"))?;
            let row: Vec<f64> = spectrum[..nfft / 2]
                .iter()
                .map(|bin| 20.0 * (bin.norm().max(1e-12) / 1e-6).log10())
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }

    fn render_file(
        &mut self,
        file: &Path,
        ctx: &RedrawContext<'_>,
        buffer: &mut PanelBuffer,
    ) -> Result<()> {
        let parsed = self.samples_for(file, ctx.same_file)?;
        let nfft = self.params.nfft();
        let threshold = self.params.threshold_db();
        let steps = self.params.threshold_steps();
        let sample_rate = f64::from(self.params.sample_rate());
        let rows = self.fft_rows(&parsed.samples, nfft)?;
        self.lines_of_data = rows.len();

        // Frequency resolution and the bin the mark frequency snaps to.
        let df = sample_rate / nfft as f64;
        let bins = nfft / 2;
        let markind = ((self.params.markfreq_hz() as f64 / df).round() as usize)
            .min(bins.saturating_sub(1));
        let snapped = markind as f64 * df;

        let max_freq = (bins.saturating_sub(1)) as f64 * df;
        buffer.rows.push(vec![Pixel::plain(format!(
            "df={df:.3} maxfreq={max_freq:.1}"
        ))]);

        // Axis rows: the mark frequency label and a rule with the marker.
        let label = label_row(markind, snapped);
        let mut rule = String::with_capacity(bins);
        for bin in 0..bins {
            rule.push(if bin == markind { '|' } else { '-' });
        }
        buffer.rows.push(vec![
            Pixel::plain("time [s]"),
            Pixel::bold(label),
        ]);
        buffer
            .rows
            .push(vec![Pixel::plain(format!("       {rule}"))]);

        // Downsample rows so the frame fits in the panel.
        let axis_rows = 5usize;
        let max_lines = ctx.dims.rows as usize;
        let budget = max_lines.saturating_sub(axis_rows).max(1);
        self.line_mod = self.lines_of_data.div_ceil(budget).max(1);

        for (index, row) in rows.iter().enumerate() {
            if index % self.line_mod != 0 {
                continue;
            }
            let center_sample = index * nfft + nfft / 2;
            let millis = (center_sample as f64 / sample_rate * 1000.0) as u64;
            let mut cells: PixelRow = vec![Pixel::plain(format!(
                "{:>6.3}| ",
                millis as f64 / 1000.0
            ))];
            for (bin, db) in row.iter().enumerate() {
                let color = color_for_db(*db, threshold, steps);
                let glyph = if bin == markind { "|" } else { " " };
                cells.push(Pixel::on_color(glyph, color));
            }
            buffer.rows.push(cells);
        }

        buffer
            .rows
            .push(vec![Pixel::plain(format!("       {rule}"))]);
        buffer.rows.push(vec![
            Pixel::plain("        "),
            Pixel::bold(label_row(markind, snapped)),
        ]);
        Ok(())
    }
}

fn label_row(markind: usize, snapped: f64) -> String {
    let mut label = " ".repeat(markind);
    label.push_str(&format!("{snapped:.1}Hz"));
    label
}

fn placeholder(buffer: &mut PanelBuffer, message: &str) {
    buffer.rows.push(Vec::new());
    buffer.rows.push(vec![Pixel::bold(format!("  {message}"))]);
}

/// Six-color ramp swatch annotated with the current threshold window,
/// spliced into the legend as pre-rendered fragments.
pub fn intensity_bar(threshold: i64, steps: i64) -> Vec<PixelRow> {
    let swatch: PixelRow = RAMP
        .iter()
        .map(|&color| Pixel::on_color("    ", color))
        .collect();
    let low = threshold - steps * 2;
    let high = threshold + steps * 2;
    vec![
        swatch,
        vec![Pixel::plain("Quiet ------------- Loud")],
        vec![Pixel::plain(format!("{low}dB  -----^------- {high}dB"))],
        vec![Pixel::bold(format!("          {threshold}dB"))],
    ]
}

/// Navigation mode banner fragment for the legend.
pub fn mode_banner(mode: NavMode) -> PixelRow {
    match mode {
        NavMode::Beginning => vec![Pixel::new(
            " * Beginning * ",
            Color::Black,
            Color::Yellow,
            Attributes::from(Attribute::Bold),
        )],
        NavMode::Navigation => vec![Pixel::new(
            " Mode: Navigation ",
            Color::Black,
            Color::Cyan,
            Attributes::default(),
        )],
        NavMode::Streaming => vec![Pixel::new(
            " Mode: Streaming ",
            Color::Black,
            Color::Green,
            Attributes::default(),
        )],
    }
}
