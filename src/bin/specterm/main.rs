//! specterm entry point: parses the config, wires the spectrogram
//! renderer and legend into the layout engine, and runs either the
//! two-thread (input + render) loop or the single-thread sync loop.

mod keys;
mod legend_data;

use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::bounded;
use crossterm::event::{self, Event, KeyEventKind};

use specterm::config::{AppConfig, LayoutModeArg};
use specterm::dashboard::{Dashboard, EngineEvent, LayoutMode, NavStatus};
use specterm::doctor::doctor_report;
use specterm::geometry::TermSize;
use specterm::keymap::{KeyPress, KeySym, Keymap, UiAction};
use specterm::nav::FileNavigator;
use specterm::screen::Screen;
use specterm::specgram::{Specgram, ViewParams};
use specterm::terminal_restore::TerminalRestoreGuard;
use specterm::{init_logging, init_tracing, log_debug};

/// How often the navigator rescans the source directory.
const DIR_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long the async input loop blocks waiting for a terminal event.
const INPUT_POLL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.doctor {
        println!("{}", doctor_report(&config).render());
        return Ok(());
    }
    init_logging(&config);
    init_tracing(&config);
    log_debug(&format!(
        "starting: source={} refresh={}ms sync={}",
        config.source.display(),
        config.refresh_ms,
        config.sync
    ));

    let params = Arc::new(ViewParams::new(
        config.threshold_db,
        config.threshold_steps,
        config.markfreq_hz,
        config.nfft,
        config.display_channel,
        config.sample_rate,
    ));
    let mut keymap = Keymap::new();
    keys::register_bindings(&mut keymap, &params, config.files_per_minute());

    let guard = TerminalRestoreGuard::new();
    let mut stdout = io::stdout();
    guard.enable_raw_mode()?;
    guard.enter_alt_screen(&mut stdout)?;
    guard.enable_mouse_capture(&mut stdout)?;
    guard.hide_cursor(&mut stdout)?;

    let navigator = FileNavigator::new(
        config.source.clone(),
        config.settle_duration(),
        DIR_POLL_INTERVAL,
    );
    let mut screen = Screen::new();
    screen.refresh_size();
    let mode = match config.layout {
        LayoutModeArg::BestFit => LayoutMode::BestFit,
        LayoutModeArg::Stacked => LayoutMode::Stacked,
    };
    let mut dashboard = Dashboard::new(screen, navigator, mode);

    let status = Arc::new(Mutex::new(NavStatus::default()));
    dashboard.set_status_sink(Arc::clone(&status));

    let mut specgram = Specgram::new(Arc::clone(&params));
    let main_panel = dashboard.main_panel();
    dashboard
        .panels()
        .get_mut(main_panel)
        .add_callback(Box::new(move |ctx, buffer| specgram.render(ctx, buffer)));

    let term = dashboard.term_size();
    let legend = legend_data::build_legend(
        dashboard.panels(),
        term,
        config.legend_side,
        Arc::clone(&params),
        Arc::clone(&status),
    );
    dashboard.add_legend(legend);
    dashboard.build_help_panel(keymap.help_rows());

    let result = if config.sync {
        run_sync(dashboard, keymap, config.refresh_interval())
    } else {
        run_async(dashboard, keymap, config.refresh_interval())
    };
    drop(guard);
    log_debug("exiting");
    Ok(result?)
}

/// Maps one terminal event onto engine events via the keymap. Key
/// repeats and releases are ignored; unbound keys dispatch to nothing.
fn translate(keymap: &mut Keymap, event: Event) -> Vec<EngineEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            let Some(sym) = KeySym::from_event(&key) else {
                return Vec::new();
            };
            keymap
                .dispatch(&KeyPress::new(sym))
                .into_iter()
                .map(EngineEvent::Action)
                .collect()
        }
        Event::Mouse(mouse) => keymap
            .dispatch(&KeyPress::mouse(mouse))
            .into_iter()
            .map(EngineEvent::Action)
            .collect(),
        Event::Resize(cols, rows) => vec![EngineEvent::Resize(TermSize::new(cols, rows))],
        _ => Vec::new(),
    }
}

/// Single-thread mode: render a frame, then handle input until the next
/// refresh deadline.
fn run_sync(mut dashboard: Dashboard, mut keymap: Keymap, refresh: Duration) -> io::Result<()> {
    loop {
        dashboard.render_cycle()?;
        let deadline = Instant::now() + refresh;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if !event::poll(deadline - now)? {
                break;
            }
            for engine_event in translate(&mut keymap, event::read()?) {
                match engine_event {
                    EngineEvent::Action(action) => {
                        if !dashboard.apply(action) {
                            dashboard.close();
                            return Ok(());
                        }
                    }
                    EngineEvent::Resize(size) => dashboard.handle_resize(size),
                }
            }
        }
    }
}

/// Two-thread mode: the dashboard moves onto a render thread fed by a
/// bounded channel, and this thread blocks on terminal input.
fn run_async(dashboard: Dashboard, mut keymap: Keymap, refresh: Duration) -> io::Result<()> {
    let (events_tx, events_rx) = bounded::<EngineEvent>(64);
    let render = thread::spawn(move || dashboard.run(events_rx, refresh));

    'input: while !render.is_finished() {
        if !event::poll(INPUT_POLL)? {
            continue;
        }
        for engine_event in translate(&mut keymap, event::read()?) {
            let quitting = matches!(engine_event, EngineEvent::Action(UiAction::Quit));
            if events_tx.send(engine_event).is_err() || quitting {
                break 'input;
            }
        }
    }
    drop(events_tx);
    render
        .join()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "render thread panicked"))?
}
