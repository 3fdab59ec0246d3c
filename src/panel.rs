//! Panel engine: rectangular terminal regions with their own cell buffers,
//! stacking order, docking policy, and redraw/state-change callbacks.
//!
//! Panels never hold references back to their owners. The layout engine
//! owns a [`PanelRegistry`] keyed by name and hands out copyable
//! [`PanelId`] handles; everything else routes through those.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crossterm::style::{Attribute, Attributes, Color};

use crate::geometry::{Corner, TermSize, WindowDimensions};

/// One colored cell run inside a panel row.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixel {
    pub text: String,
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attributes,
}

impl Pixel {
    pub fn new(text: impl Into<String>, fg: Color, bg: Color, attrs: Attributes) -> Self {
        Self {
            text: text.into(),
            fg,
            bg,
            attrs,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Color::Reset, Color::Reset, Attributes::default())
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(
            text,
            Color::Reset,
            Color::Reset,
            Attributes::from(Attribute::Bold),
        )
    }

    pub fn on_color(text: impl Into<String>, bg: Color) -> Self {
        Self::new(text, Color::Black, bg, Attributes::default())
    }
}

pub type PixelRow = Vec<Pixel>;

/// Row buffer a redraw callback repopulates, plus an optional notice the
/// layout engine surfaces as a flash message (degraded data, etc).
#[derive(Debug, Default)]
pub struct PanelBuffer {
    pub rows: Vec<PixelRow>,
    pub notice: Option<String>,
}

/// Read-only context handed to redraw callbacks.
pub struct RedrawContext<'a> {
    pub dims: WindowDimensions,
    pub term: TermSize,
    pub file: Option<&'a Path>,
    /// The current file did not change since the previous cycle.
    pub same_file: bool,
}

/// Event delivered to state-change subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Resize,
}

/// A move or resize that would leave the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryError {
    pub target: WindowDimensions,
    pub term: TermSize,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target {}x{}@({},{}) does not fit terminal {}x{}",
            self.target.columns,
            self.target.rows,
            self.target.x,
            self.target.y,
            self.term.cols,
            self.term.rows
        )
    }
}

type RedrawFn = Box<dyn FnMut(&RedrawContext<'_>, &mut PanelBuffer) + Send>;
type StateChangeFn = Box<dyn FnMut(StateChange) + Send>;

/// Construction-time panel policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelOptions {
    pub border: bool,
    pub corner: Option<Corner>,
    pub sticky_sides: bool,
    pub fill_screen: bool,
    pub hidden: bool,
}

pub struct Panel {
    name: String,
    dims: WindowDimensions,
    buffer: PanelBuffer,
    border_on: bool,
    corner: Option<Corner>,
    sticky_sides: bool,
    fill_screen: bool,
    hidden: bool,
    term_too_small: bool,
    drawn: bool,
    callbacks: Vec<RedrawFn>,
    on_state_change: Vec<StateChangeFn>,
}

impl Panel {
    pub fn new(name: impl Into<String>, dims: WindowDimensions, options: PanelOptions) -> Self {
        Self {
            name: name.into(),
            dims,
            buffer: PanelBuffer::default(),
            border_on: options.border,
            corner: options.corner,
            sticky_sides: options.sticky_sides,
            fill_screen: options.fill_screen,
            hidden: options.hidden,
            term_too_small: false,
            drawn: false,
            callbacks: Vec::new(),
            on_state_change: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> WindowDimensions {
        self.dims
    }

    pub fn buffer(&self) -> &PanelBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut PanelBuffer {
        &mut self.buffer
    }

    pub fn corner(&self) -> Option<Corner> {
        self.corner
    }

    pub fn set_corner(&mut self, corner: Option<Corner>) {
        self.corner = corner;
    }

    pub fn border_on(&self) -> bool {
        self.border_on
    }

    pub fn set_border(&mut self, on: bool) {
        self.border_on = on;
    }

    pub fn set_sticky_sides(&mut self, sticky: bool) {
        self.sticky_sides = sticky;
    }

    pub fn set_fill_screen(&mut self, fill: bool) {
        self.fill_screen = fill;
    }

    pub fn fill_screen(&self) -> bool {
        self.fill_screen
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_too_small(&self) -> bool {
        self.term_too_small
    }

    pub fn is_drawn(&self) -> bool {
        self.drawn
    }

    pub fn mark_drawn(&mut self, drawn: bool) {
        self.drawn = drawn;
    }

    pub fn hide(&mut self) {
        self.hidden = true;
    }

    pub fn show(&mut self) {
        self.hidden = false;
    }

    pub fn toggle_visibility(&mut self) {
        self.hidden = !self.hidden;
    }

    /// Rows of the buffer actually visible inside the panel: a border eats
    /// the first and last row.
    pub fn visible_rows(&self) -> usize {
        if self.border_on {
            (self.dims.rows as usize).saturating_sub(2)
        } else {
            self.dims.rows as usize
        }
    }

    pub fn add_callback(&mut self, callback: RedrawFn) {
        self.callbacks.push(callback);
    }

    pub fn add_state_change_callback(&mut self, callback: StateChangeFn) {
        self.on_state_change.push(callback);
    }

    /// Replaces the dimensions. Buffer contents are not preserved across a
    /// dimension change; the next redraw cycle regenerates them.
    pub fn resize(&mut self, dims: WindowDimensions) {
        if dims != self.dims {
            self.buffer.rows.clear();
            self.buffer.notice = None;
            self.drawn = false;
        }
        self.dims = dims;
    }

    /// Relocates the panel. Fails without side effects when any part of
    /// the target position would be off-screen.
    pub fn move_to(&mut self, x: u16, y: u16, term: TermSize) -> Result<(), GeometryError> {
        let target = self.dims.with_position(x, y);
        if !target.fits_in(term) {
            return Err(GeometryError { target, term });
        }
        self.dims = target;
        Ok(())
    }

    pub fn move_left(&mut self, term: TermSize) -> Result<(), GeometryError> {
        let x = self.dims.x.checked_sub(1).ok_or(GeometryError {
            target: self.dims,
            term,
        })?;
        self.move_to(x, self.dims.y, term)
    }

    pub fn move_right(&mut self, term: TermSize) -> Result<(), GeometryError> {
        self.move_to(self.dims.x + 1, self.dims.y, term)
    }

    /// Centers the panel in the terminal; panels larger than the terminal
    /// land at the origin on that axis. Returns whether anything moved.
    pub fn center(&mut self, term: TermSize) -> bool {
        let x = if self.dims.columns < term.cols {
            (term.cols - self.dims.columns) / 2
        } else {
            0
        };
        let y = if self.dims.rows < term.rows {
            (term.rows - self.dims.rows) / 2
        } else {
            0
        };
        if (x, y) == (self.dims.x, self.dims.y) {
            return false;
        }
        self.dims = self.dims.with_position(x, y);
        true
    }

    /// Re-runs the docking algorithm; only meaningful for docked panels.
    pub fn snap_back(&mut self, term: TermSize) {
        if self.corner.is_some() {
            self.handle_resize(term);
        }
    }

    /// Recomputes this panel's target dimensions for the current terminal
    /// size according to its fill/sticky/clamp policy, then notifies every
    /// state-change subscriber -- whether or not geometry changed -- so
    /// dependents can re-derive layout-dependent content.
    pub fn handle_resize(&mut self, term: TermSize) {
        if self.hidden && !self.term_too_small {
            self.notify_state_change(StateChange::Resize);
            return;
        }

        if self.fill_screen {
            self.resize(WindowDimensions::full_screen(term));
        } else if self.sticky_sides && self.corner.is_some() {
            if term.cols < self.dims.columns.saturating_add(1) {
                // Terminal narrower than this panel needs; hide until it
                // grows back past the required width.
                self.term_too_small = true;
                self.hide();
                self.notify_state_change(StateChange::Resize);
                return;
            }
            if self.term_too_small {
                self.term_too_small = false;
                self.show();
            }
            let corner = self.corner.unwrap_or(Corner::Left);
            // Re-anchoring never gives up: a shrink on the undocked axis
            // clamps the panel rather than leaving it off its edge.
            let rows = self.dims.rows.min(term.rows);
            let x = match corner.horizontal_side() {
                Some(Corner::Left) => 0,
                Some(Corner::Right) => term.cols - self.dims.columns,
                _ => self.dims.x.min(term.cols - self.dims.columns),
            };
            // Top/bottom docks pin vertically the same way left/right
            // docks pin horizontally; an undocked axis keeps its
            // position, clamped on-screen.
            let y = match corner.vertical_side() {
                Some(Corner::Top) => 0,
                Some(Corner::Bottom) => term.rows.saturating_sub(rows),
                _ => self.dims.y.min(term.rows.saturating_sub(rows)),
            };
            self.resize(WindowDimensions {
                x,
                y,
                rows,
                ..self.dims
            });
        } else if self.dims.rows > term.rows || self.dims.columns > term.cols {
            let clamped = WindowDimensions {
                rows: self.dims.rows.min(term.rows),
                columns: self.dims.columns.min(term.cols),
                ..self.dims
            };
            self.resize(clamped);
        }

        self.notify_state_change(StateChange::Resize);
    }

    fn notify_state_change(&mut self, event: StateChange) {
        for callback in &mut self.on_state_change {
            callback(event);
        }
    }

    /// Clears the row buffer and invokes every registered redraw callback
    /// to repopulate it. Blitting happens separately in the screen writer.
    pub fn redraw(&mut self, ctx: &RedrawContext<'_>) {
        if self.hidden {
            return;
        }
        self.buffer.rows.clear();
        self.buffer.notice = None;
        self.drawn = false;
        let mut buffer = std::mem::take(&mut self.buffer);
        for callback in &mut self.callbacks {
            callback(ctx, &mut buffer);
        }
        self.buffer = buffer;
        self.drawn = true;
    }

    /// A full-width horizontal rule row.
    pub fn hline(&self, ch: char) -> PixelRow {
        vec![Pixel::bold(
            ch.to_string().repeat(self.dims.columns as usize),
        )]
    }
}

/// Copyable handle into the registry; panels never hold back-pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelId(usize);

/// Named panel registry with an explicit stacking order (index 0 is the
/// bottom of the stack).
#[derive(Default)]
pub struct PanelRegistry {
    panels: Vec<Panel>,
    names: HashMap<String, PanelId>,
    stacking: Vec<PanelId>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a panel on demand. A name collision returns the existing
    /// panel's handle unchanged.
    pub fn create(
        &mut self,
        name: &str,
        dims: WindowDimensions,
        options: PanelOptions,
    ) -> PanelId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = PanelId(self.panels.len());
        self.panels.push(Panel::new(name, dims, options));
        self.names.insert(name.to_string(), id);
        self.stacking.push(id);
        id
    }

    pub fn get(&self, id: PanelId) -> &Panel {
        &self.panels[id.0]
    }

    pub fn get_mut(&mut self, id: PanelId) -> &mut Panel {
        &mut self.panels[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<PanelId> {
        self.names.get(name).copied()
    }

    /// Moves a panel to the top of the stack.
    pub fn raise(&mut self, id: PanelId) {
        self.stacking.retain(|&other| other != id);
        self.stacking.push(id);
    }

    /// Bottom-to-top stacking order.
    pub fn stacking(&self) -> &[PanelId] {
        &self.stacking
    }

    pub fn clear_drawn_flags(&mut self) {
        for panel in &mut self.panels {
            panel.mark_drawn(false);
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn term() -> TermSize {
        TermSize::new(200, 50)
    }

    fn panel(dims: WindowDimensions, options: PanelOptions) -> Panel {
        Panel::new("test", dims, options)
    }

    #[test]
    fn move_off_screen_fails_without_side_effects() {
        let mut p = panel(
            WindowDimensions::new(0, 0, 10, 20),
            PanelOptions::default(),
        );
        let before = p.dims();
        assert!(p.move_to(195, 0, term()).is_err());
        assert_eq!(p.dims(), before);
        assert!(p.move_to(180, 40, term()).is_ok());
        assert_eq!(p.dims().x, 180);
        assert_eq!(p.dims().y, 40);
    }

    #[test]
    fn move_left_at_origin_is_rejected() {
        let mut p = panel(
            WindowDimensions::new(0, 0, 10, 20),
            PanelOptions::default(),
        );
        assert!(p.move_left(term()).is_err());
        assert_eq!(p.dims().x, 0);
        assert!(p.move_right(term()).is_ok());
        assert!(p.move_left(term()).is_ok());
        assert_eq!(p.dims().x, 0);
    }

    #[test]
    fn left_docked_sticky_panel_pins_to_column_zero() {
        let mut p = panel(
            WindowDimensions::new(30, 5, 20, 40),
            PanelOptions {
                corner: Some(Corner::Left),
                sticky_sides: true,
                ..Default::default()
            },
        );
        p.handle_resize(term());
        assert_eq!(p.dims().x, 0);
        assert_eq!(p.dims().y, 5, "vertical position preserved");
    }

    #[test]
    fn right_docked_sticky_panel_pins_to_right_edge() {
        let mut p = panel(
            WindowDimensions::new(10, 3, 20, 50),
            PanelOptions {
                corner: Some(Corner::Right),
                sticky_sides: true,
                ..Default::default()
            },
        );
        for cols in [200u16, 120, 90] {
            let t = TermSize::new(cols, 50);
            p.handle_resize(t);
            assert_eq!(p.dims().x + p.dims().columns, cols);
        }
    }

    #[test]
    fn sticky_redock_survives_shrink_on_both_axes() {
        let mut p = panel(
            WindowDimensions::new(150, 0, 50, 50),
            PanelOptions {
                corner: Some(Corner::Right),
                sticky_sides: true,
                ..Default::default()
            },
        );
        p.handle_resize(TermSize::new(120, 40));
        assert!(!p.is_hidden());
        assert_eq!(p.dims().x + p.dims().columns, 120);
        assert_eq!(p.dims().rows, 40, "rows clamped to the terminal");
    }

    #[test]
    fn bottom_docked_panel_repins_after_vertical_shrink() {
        let mut p = panel(
            WindowDimensions::new(0, 40, 10, 60),
            PanelOptions {
                corner: Some(Corner::Bottom),
                sticky_sides: true,
                ..Default::default()
            },
        );
        p.handle_resize(TermSize::new(80, 30));
        assert_eq!(p.dims().y + p.dims().rows, 30);
        assert_eq!(p.dims().x, 0);
    }

    #[test]
    fn sticky_panel_hides_when_too_small_and_returns() {
        let mut p = panel(
            WindowDimensions::new(0, 0, 20, 50),
            PanelOptions {
                corner: Some(Corner::Right),
                sticky_sides: true,
                ..Default::default()
            },
        );
        p.handle_resize(TermSize::new(40, 50));
        assert!(p.is_hidden());
        assert!(p.is_too_small());

        p.handle_resize(TermSize::new(120, 50));
        assert!(!p.is_hidden());
        assert!(!p.is_too_small());
        assert_eq!(p.dims().x + p.dims().columns, 120);
    }

    #[test]
    fn fill_screen_panel_tracks_terminal() {
        let mut p = panel(
            WindowDimensions::new(5, 5, 10, 10),
            PanelOptions {
                fill_screen: true,
                ..Default::default()
            },
        );
        p.handle_resize(term());
        assert_eq!(p.dims(), WindowDimensions::full_screen(term()));
    }

    #[test]
    fn oversized_panel_clamps_per_axis() {
        let mut p = panel(
            WindowDimensions::new(0, 0, 60, 100),
            PanelOptions::default(),
        );
        p.handle_resize(term());
        assert_eq!(p.dims().rows, 50, "rows clamped to terminal");
        assert_eq!(p.dims().columns, 100, "columns untouched");
    }

    #[test]
    fn resize_notifies_subscribers_even_without_geometry_change() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut p = panel(
            WindowDimensions::new(0, 0, 10, 20),
            PanelOptions::default(),
        );
        p.add_state_change_callback(Box::new(move |event| {
            assert_eq!(event, StateChange::Resize);
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        p.handle_resize(term());
        p.handle_resize(term());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn hidden_panel_still_notifies_on_resize() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut p = panel(
            WindowDimensions::new(0, 0, 10, 20),
            PanelOptions::default(),
        );
        p.add_state_change_callback(Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        p.hide();
        p.handle_resize(term());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(p.dims().columns, 20, "hidden panel geometry untouched");
    }

    #[test]
    fn redraw_clears_and_repopulates_buffer() {
        let mut p = panel(
            WindowDimensions::new(0, 0, 10, 20),
            PanelOptions::default(),
        );
        p.add_callback(Box::new(|_ctx, buffer| {
            buffer.rows.push(vec![Pixel::plain("hello")]);
        }));
        let ctx = RedrawContext {
            dims: p.dims(),
            term: term(),
            file: None,
            same_file: false,
        };
        p.redraw(&ctx);
        p.redraw(&ctx);
        assert_eq!(p.buffer().rows.len(), 1);
        assert!(p.is_drawn());
    }

    #[test]
    fn resize_to_new_dims_drops_buffer_contents() {
        let mut p = panel(
            WindowDimensions::new(0, 0, 10, 20),
            PanelOptions::default(),
        );
        p.buffer_mut().rows.push(vec![Pixel::plain("stale")]);
        p.resize(WindowDimensions::new(0, 0, 12, 20));
        assert!(p.buffer().rows.is_empty());
    }

    #[test]
    fn border_reserves_two_rows() {
        let mut p = panel(
            WindowDimensions::new(0, 0, 10, 20),
            PanelOptions::default(),
        );
        assert_eq!(p.visible_rows(), 10);
        p.set_border(true);
        assert_eq!(p.visible_rows(), 8);
    }

    #[test]
    fn registry_reuses_panels_by_name() {
        let mut registry = PanelRegistry::new();
        let dims = WindowDimensions::new(0, 0, 5, 5);
        let a = registry.create("plot", dims, PanelOptions::default());
        let b = registry.create("plot", dims, PanelOptions::default());
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("plot"), Some(a));
    }

    #[test]
    fn raise_moves_panel_to_top_of_stack() {
        let mut registry = PanelRegistry::new();
        let dims = WindowDimensions::new(0, 0, 5, 5);
        let a = registry.create("a", dims, PanelOptions::default());
        let b = registry.create("b", dims, PanelOptions::default());
        registry.raise(a);
        assert_eq!(registry.stacking(), &[b, a]);
    }
}
