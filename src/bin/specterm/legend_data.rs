//! Builds the spectrogram legend: a single docked panel whose producer
//! snapshots the shared view parameters and the navigation status every
//! render cycle.

use std::sync::{Arc, Mutex};

use specterm::cache::CachedElementStore;
use specterm::config::LegendSide;
use specterm::dashboard::NavStatus;
use specterm::geometry::{Arrangement, Corner, TermSize, WindowDimensions};
use specterm::legend::{LegendContent, LegendManager, LegendNode, LegendProducer};
use specterm::panel::{PanelOptions, PanelRegistry};
use specterm::specgram::{file_timestamp, intensity_bar, mode_banner, ViewParams};

const LEGEND_COLUMNS: u16 = 36;

pub fn build_legend(
    panels: &mut PanelRegistry,
    term: TermSize,
    side: LegendSide,
    params: Arc<ViewParams>,
    status: Arc<Mutex<NavStatus>>,
) -> LegendManager {
    let (corner, x) = match side {
        LegendSide::Left => (Corner::Left, 0),
        LegendSide::Right => (Corner::Right, term.cols.saturating_sub(LEGEND_COLUMNS)),
    };
    let id = panels.create(
        "legend",
        WindowDimensions::new(x, 0, term.rows, LEGEND_COLUMNS),
        PanelOptions {
            corner: Some(corner),
            ..Default::default()
        },
    );
    let producer = make_producer(params, status);
    let mut legend = LegendManager::new(panels, vec![id], Arrangement::SingleColumn, producer);
    legend.set_footer(Some(format!("specterm v{}", env!("CARGO_PKG_VERSION"))));
    legend
}

fn make_producer(params: Arc<ViewParams>, status: Arc<Mutex<NavStatus>>) -> LegendProducer {
    Box::new(move |cache: &mut CachedElementStore<_>| {
        let status = status
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        let threshold = params.threshold_db();
        let steps = params.threshold_steps();
        let nfft = params.nfft();
        let sample_rate = f64::from(params.sample_rate());
        let df = sample_rate / nfft as f64;
        let bins = nfft / 2;
        let markind = ((params.markfreq_hz() as f64 / df).round() as usize)
            .min(bins.saturating_sub(1));
        let snapped = markind as f64 * df;

        let banner = LegendNode::Fragment(mode_banner(status.mode));
        let position = LegendNode::pair(
            "file",
            format!("{} of {}", status.position, status.file_count),
        );

        let mut nav_children = vec![banner.clone(), position.clone()];
        if let Some(file) = &status.file {
            if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
                nav_children.push(LegendNode::pair("name", name));
            }
            if let Some(stamp) = file_timestamp(file) {
                nav_children.push(LegendNode::pair("start", format!("{stamp} (epoch s)")));
            }
            if status.same_file {
                nav_children.push(LegendNode::pair("data", "unchanged since last cycle"));
            }
        }

        let full = vec![
            LegendNode::section(
                "Info",
                vec![
                    LegendNode::pair("threshold", format!("{threshold} dB")),
                    LegendNode::pair("steps", format!("{steps} dB")),
                    LegendNode::pair("nfft", nfft),
                    LegendNode::pair("markfreq", format!("{snapped:.1} Hz")),
                    LegendNode::pair(
                        "channel",
                        format!("{} of {}", params.channel(), params.channel_count()),
                    ),
                    LegendNode::pair("sample rate", format!("{} Hz", params.sample_rate())),
                    LegendNode::pair("df", format!("{df:.3} Hz")),
                ],
            ),
            LegendNode::section("Navigation", nav_children),
            LegendNode::section(
                "Intensity",
                // Rebuilt only after the threshold handlers invalidate it.
                cache
                    .get_or_compute("intensity", || intensity_bar(threshold, steps))
                    .clone()
                    .into_iter()
                    .map(LegendNode::Fragment)
                    .collect(),
            ),
        ];
        let minimal = vec![
            banner,
            LegendNode::pair("threshold", format!("{threshold} dB")),
            position,
        ];
        LegendContent { full, minimal }
    })
}
