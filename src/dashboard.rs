//! The layout engine: owns the panel registry, the legends, the screen
//! writer, and the file navigator, and applies the actions key handlers
//! request.
//!
//! Everything here runs on one thread. In async mode that thread is a
//! dedicated render thread fed by a channel of [`EngineEvent`]s; in sync
//! mode the caller interleaves event handling and render cycles itself
//! via [`Dashboard::apply`] and [`Dashboard::render_cycle`].

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::geometry::{Corner, TermSize, WindowDimensions};
use crate::keymap::UiAction;
use crate::legend::LegendManager;
use crate::log_debug;
use crate::nav::{FileNavigator, NavMode};
use crate::panel::{PanelId, PanelOptions, PanelRegistry, Pixel, RedrawContext};
use crate::screen::Screen;

const FLASH_DURATION: Duration = Duration::from_secs(2);
pub const HELP_PANEL: &str = "help";

/// How the main window coexists with docked legends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Main window shrinks so docked legends get their own columns/rows.
    BestFit,
    /// Main window fills the terminal; legends stack on top of it.
    Stacked,
}

/// Snapshot of navigation state published once per render cycle, so
/// legend producers can report it without holding engine references.
#[derive(Debug, Clone)]
pub struct NavStatus {
    pub mode: NavMode,
    pub position: usize,
    pub file_count: usize,
    pub file: Option<PathBuf>,
    pub same_file: bool,
}

impl Default for NavStatus {
    fn default() -> Self {
        Self {
            mode: NavMode::Streaming,
            position: 1,
            file_count: 0,
            file: None,
            same_file: false,
        }
    }
}

/// Messages the render side consumes in async mode.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Action(UiAction),
    Resize(TermSize),
}

/// The main window rectangle left over after docked legends take their
/// footprints. Degenerate terminals clamp to zero-sized, never underflow.
pub fn best_fit_dims(term: TermSize, left: u16, right: u16, top: u16, bottom: u16) -> WindowDimensions {
    WindowDimensions {
        x: left.min(term.cols),
        y: top.min(term.rows),
        rows: term.rows.saturating_sub(top).saturating_sub(bottom),
        columns: term.cols.saturating_sub(left).saturating_sub(right),
    }
}

pub struct Dashboard {
    panels: PanelRegistry,
    legends: Vec<LegendManager>,
    screen: Screen,
    navigator: FileNavigator,
    main_panel: PanelId,
    help_panel: Option<PanelId>,
    mode: LayoutMode,
    saved_main_dims: Option<WindowDimensions>,
    flash: Option<(String, Instant)>,
    status_sink: Option<Arc<Mutex<NavStatus>>>,
}

impl Dashboard {
    /// The main panel is created here and fills whatever space best-fit
    /// leaves it; its redraw callbacks are attached by the caller.
    pub fn new(screen: Screen, navigator: FileNavigator, mode: LayoutMode) -> Self {
        let term = screen.size();
        let mut panels = PanelRegistry::new();
        let main_panel = panels.create(
            "main",
            WindowDimensions::full_screen(term),
            PanelOptions::default(),
        );
        let mut dashboard = Self {
            panels,
            legends: Vec::new(),
            screen,
            navigator,
            main_panel,
            help_panel: None,
            mode,
            saved_main_dims: None,
            flash: None,
            status_sink: None,
        };
        if mode == LayoutMode::Stacked {
            dashboard
                .panels
                .get_mut(main_panel)
                .set_fill_screen(true);
        }
        dashboard
    }

    pub fn panels(&mut self) -> &mut PanelRegistry {
        &mut self.panels
    }

    pub fn main_panel(&self) -> PanelId {
        self.main_panel
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn term_size(&self) -> TermSize {
        self.screen.size()
    }

    pub fn navigator(&self) -> &FileNavigator {
        &self.navigator
    }

    /// Navigation state is copied into `sink` every render cycle.
    pub fn set_status_sink(&mut self, sink: Arc<Mutex<NavStatus>>) {
        self.status_sink = Some(sink);
    }

    pub fn add_legend(&mut self, legend: LegendManager) {
        self.legends.push(legend);
        self.handle_refit();
    }

    /// Builds the hidden, centered help overlay from the keymap's help
    /// rows. Toggled with [`UiAction::ToggleHelp`].
    pub fn build_help_panel(&mut self, rows: &[(String, String)]) {
        let key_width = rows
            .iter()
            .map(|(keys, _)| keys.len())
            .max()
            .unwrap_or(0);
        let body_width = rows
            .iter()
            .map(|(_, desc)| key_width + desc.len() + 4)
            .chain(std::iter::once(key_width))
            .max()
            .unwrap_or(10) as u16;
        let dims = WindowDimensions::new(0, 0, rows.len() as u16 + 2, body_width + 4);
        let id = self.panels.create(
            HELP_PANEL,
            dims,
            PanelOptions {
                border: true,
                hidden: true,
                ..Default::default()
            },
        );
        let table: Vec<(String, String)> = rows.to_vec();
        self.panels.get_mut(id).add_callback(Box::new(move |_ctx, buffer| {
            for (keys, desc) in &table {
                buffer.rows.push(vec![
                    Pixel::bold(format!(" {keys:>key_width$}  ")),
                    Pixel::plain(desc.clone()),
                ]);
            }
        }));
        let term = self.screen.size();
        self.panels.get_mut(id).center(term);
        self.help_panel = Some(id);
    }

    fn legend_member_ids(&self) -> HashSet<PanelId> {
        self.legends
            .iter()
            .flat_map(|legend| legend.panel_ids().iter().copied())
            .collect()
    }

    /// Recomputes the main window rectangle from the visible docked
    /// legends' footprints. In stacked mode the main window always fills
    /// the terminal instead.
    pub fn handle_refit(&mut self) {
        let term = self.screen.size();
        let dims = if self.mode == LayoutMode::Stacked {
            WindowDimensions::full_screen(term)
        } else {
            let left = self.footprint(|l, p| l.total_width(p, Corner::Left));
            let right = self.footprint(|l, p| l.total_width(p, Corner::Right));
            let top = self.footprint(|l, p| l.total_height(p, Corner::Top));
            let bottom = self.footprint(|l, p| l.total_height(p, Corner::Bottom));
            best_fit_dims(term, left, right, top, bottom)
        };
        self.panels.get_mut(self.main_panel).resize(dims);
    }

    fn footprint(
        &self,
        side: impl Fn(&LegendManager, &PanelRegistry) -> u16,
    ) -> u16 {
        self.legends
            .iter()
            .map(|legend| side(legend, &self.panels))
            .sum()
    }

    /// Switches between best-fit and stacked layout. The main window's
    /// best-fit geometry is saved on the way out and restored on the way
    /// back, so two toggles land exactly where they started.
    pub fn toggle_layout(&mut self) {
        let term = self.screen.size();
        // Manually dragged legends would corrupt the fit calculation.
        for legend in &self.legends {
            legend.snap_back(&mut self.panels, term);
        }
        match self.mode {
            LayoutMode::BestFit => {
                self.mode = LayoutMode::Stacked;
                let main = self.panels.get_mut(self.main_panel);
                self.saved_main_dims = Some(main.dims());
                main.set_fill_screen(true);
                main.resize(WindowDimensions::full_screen(term));
            }
            LayoutMode::Stacked => {
                self.mode = LayoutMode::BestFit;
                let main = self.panels.get_mut(self.main_panel);
                main.set_fill_screen(false);
                if let Some(dims) = self.saved_main_dims.take() {
                    main.resize(dims);
                }
                self.handle_refit();
            }
        }
        self.invalidate_legend_caches();
    }

    /// Terminal size changed: redock every panel, snap dragged legends
    /// home, refit the main window, and drop every cached legend element.
    pub fn handle_resize(&mut self, size: TermSize) {
        self.screen.set_size(size);
        let order: Vec<PanelId> = self.panels.stacking().to_vec();
        for id in order {
            self.panels.get_mut(id).handle_resize(size);
        }
        for legend in &mut self.legends {
            legend.snap_back(&mut self.panels, size);
            legend.cache_mut().invalidate_all();
        }
        self.handle_refit();
        if let Some(id) = self.help_panel {
            self.panels.get_mut(id).center(size);
        }
        if let Err(err) = self.screen.clear() {
            log_debug(&format!("screen clear failed: {err}"));
        }
    }

    pub fn set_flash(&mut self, text: impl Into<String>) {
        self.flash = Some((text.into(), Instant::now() + FLASH_DURATION));
    }

    fn invalidate_legend_caches(&mut self) {
        for legend in &mut self.legends {
            legend.cache_mut().invalidate_all();
        }
    }

    /// Applies one engine action. Returns `false` on quit.
    pub fn apply(&mut self, action: UiAction) -> bool {
        let term = self.screen.size();
        match action {
            UiAction::Quit => return false,
            UiAction::ToggleLayout => self.toggle_layout(),
            UiAction::ToggleHelp => {
                if let Some(id) = self.help_panel {
                    self.panels.get_mut(id).toggle_visibility();
                    self.panels.get_mut(id).center(term);
                    self.panels.raise(id);
                }
            }
            UiAction::ToggleLegends => {
                for legend in &self.legends {
                    legend.toggle_all(&mut self.panels);
                }
                self.handle_refit();
            }
            UiAction::ToggleMinimalLegend => {
                for legend in &mut self.legends {
                    legend.toggle_minimal_mode();
                }
                self.invalidate_legend_caches();
            }
            UiAction::MoveLegendsLeft => {
                for legend in &self.legends {
                    legend.move_left(&mut self.panels, term);
                }
            }
            UiAction::MoveLegendsRight => {
                for legend in &self.legends {
                    legend.move_right(&mut self.panels, term);
                }
            }
            UiAction::SnapLegendsBack => {
                for legend in &self.legends {
                    legend.snap_back(&mut self.panels, term);
                }
                self.handle_refit();
            }
            UiAction::Nav(nav) => self.navigator.apply(nav),
            UiAction::Flash(text) => self.set_flash(text),
            UiAction::Invalidate(key) => {
                for legend in &mut self.legends {
                    legend.cache_mut().invalidate(&key);
                }
            }
            UiAction::InvalidateAll => self.invalidate_legend_caches(),
        }
        true
    }

    /// One full redraw: resolve the current file, repopulate every
    /// visible panel buffer, blit in stacking order, then the flash line.
    pub fn render_cycle(&mut self) -> io::Result<()> {
        let cycle_start = Instant::now();
        let (file, same_file) = self.navigator.next_file();
        if let Some(sink) = &self.status_sink {
            if let Ok(mut status) = sink.lock() {
                *status = NavStatus {
                    mode: self.navigator.mode(),
                    position: self.navigator.position(),
                    file_count: self.navigator.file_count(),
                    file: file.clone(),
                    same_file,
                };
            }
        }
        let term = self.screen.size();
        let legend_members = self.legend_member_ids();

        self.panels.clear_drawn_flags();
        let order: Vec<PanelId> = self.panels.stacking().to_vec();
        for id in order {
            if legend_members.contains(&id) {
                continue;
            }
            let dims = self.panels.get(id).dims();
            let ctx = RedrawContext {
                dims,
                term,
                file: file.as_deref(),
                same_file,
            };
            self.panels.get_mut(id).redraw(&ctx);
        }
        for legend in &mut self.legends {
            legend.redraw(&mut self.panels);
        }

        if let Some(notice) = self.panels.get_mut(self.main_panel).buffer_mut().notice.take() {
            self.set_flash(notice);
        }

        self.screen.blit(&self.panels)?;
        match &self.flash {
            Some((text, deadline)) if Instant::now() < *deadline => {
                let text = text.clone();
                self.screen.draw_flash(&text)?;
            }
            Some(_) => {
                self.flash = None;
                self.screen.clear_flash()?;
            }
            None => {}
        }
        tracing::trace!(
            target: "render",
            elapsed_us = cycle_start.elapsed().as_micros() as u64,
            same_file,
            "render cycle"
        );
        Ok(())
    }

    /// Render-thread loop for async mode: one render cycle per `refresh`
    /// period, draining engine events in between. Returns on quit or when
    /// the sending side hangs up.
    pub fn run(mut self, events: Receiver<EngineEvent>, refresh: Duration) -> io::Result<()> {
        loop {
            self.render_cycle()?;
            let deadline = Instant::now() + refresh;
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                match events.recv_timeout(deadline - now) {
                    Ok(EngineEvent::Action(action)) => {
                        if !self.apply(action) {
                            return Ok(());
                        }
                    }
                    Ok(EngineEvent::Resize(size)) => self.handle_resize(size),
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return Ok(()),
                }
            }
        }
    }

    /// Shuts the navigator's poller down; called on the way out of both
    /// run modes.
    pub fn close(&mut self) {
        self.navigator.close();
    }
}
