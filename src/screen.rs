//! Terminal blitting: turns panel buffers into queued escape output.
//!
//! The render side owns the only handle that writes to the terminal.
//! Rendering walks the registry in stacking order and draws each visible
//! panel's buffer into its rectangle, clipping rows and columns that fall
//! outside the panel. Writing past the bounds is a no-op, not an error.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::{
    Attribute, Attributes, Color, ContentStyle, PrintStyledContent, StyledContent,
};
use crossterm::terminal::{size as terminal_size, Clear, ClearType};
use crossterm::QueueableCommand;
use unicode_width::UnicodeWidthStr;

use crate::geometry::TermSize;
use crate::panel::{Panel, PanelRegistry, Pixel};

const BORDER_HORIZONTAL: char = '─';
const BORDER_VERTICAL: char = '│';
const BORDER_CORNERS: [char; 4] = ['┌', '┐', '└', '┘'];

/// The process-wide terminal write handle. Created once at startup and
/// moved into whichever thread renders.
pub struct Screen {
    stdout: io::Stdout,
    size: TermSize,
}

impl Screen {
    pub fn new() -> Self {
        let size = query_size();
        Self {
            stdout: io::stdout(),
            size,
        }
    }

    pub fn size(&self) -> TermSize {
        self.size
    }

    pub fn set_size(&mut self, size: TermSize) {
        self.size = size;
    }

    /// Re-queries the terminal extent, keeping the cached value on error.
    pub fn refresh_size(&mut self) -> TermSize {
        self.size = query_size();
        self.size
    }

    pub fn clear(&mut self) -> io::Result<()> {
        self.stdout.queue(Clear(ClearType::All))?;
        self.stdout.flush()
    }

    /// Draws every visible panel bottom-to-top and flushes once.
    pub fn blit(&mut self, panels: &PanelRegistry) -> io::Result<()> {
        for &id in panels.stacking() {
            let panel = panels.get(id);
            if panel.is_hidden() {
                continue;
            }
            draw_panel(&mut self.stdout, panel, self.size)?;
        }
        self.stdout.flush()
    }

    /// Single reverse-video message on the bottom terminal row.
    pub fn draw_flash(&mut self, text: &str) -> io::Result<()> {
        draw_flash(&mut self.stdout, text, self.size)?;
        self.stdout.flush()
    }

    pub fn clear_flash(&mut self) -> io::Result<()> {
        clear_flash(&mut self.stdout, self.size)?;
        self.stdout.flush()
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

fn query_size() -> TermSize {
    terminal_size()
        .map(|(cols, rows)| TermSize::new(cols, rows))
        .unwrap_or(TermSize::new(80, 24))
}

fn style_for(pixel: &Pixel) -> ContentStyle {
    let mut style = ContentStyle::new();
    if pixel.fg != Color::Reset {
        style.foreground_color = Some(pixel.fg);
    }
    if pixel.bg != Color::Reset {
        style.background_color = Some(pixel.bg);
    }
    style.attributes = pixel.attrs;
    style
}

/// Blits one panel. Rows beyond the panel's visible row count are
/// clipped; each row is padded to the content width so stale cells
/// underneath are overwritten.
pub fn draw_panel(out: &mut dyn Write, panel: &Panel, term: TermSize) -> io::Result<()> {
    let dims = panel.dims();
    if dims.rows == 0 || dims.columns == 0 {
        return Ok(());
    }
    let inset = u16::from(panel.border_on());
    let content_width = (dims.columns as usize).saturating_sub(2 * inset as usize);
    let origin_x = dims.x + inset;
    let origin_y = dims.y + inset;

    for row_index in 0..panel.visible_rows() {
        let y = origin_y + row_index as u16;
        if y >= term.rows {
            break;
        }
        out.queue(MoveTo(origin_x, y))?;
        let mut budget = content_width.min((term.cols.saturating_sub(origin_x)) as usize);
        if let Some(row) = panel.buffer().rows.get(row_index) {
            for pixel in row {
                if budget == 0 {
                    break;
                }
                let width = pixel.text.width();
                if width <= budget {
                    out.queue(PrintStyledContent(StyledContent::new(
                        style_for(pixel),
                        pixel.text.clone(),
                    )))?;
                    budget -= width;
                } else {
                    let clipped = clip_to_width(&pixel.text, budget);
                    out.queue(PrintStyledContent(StyledContent::new(
                        style_for(pixel),
                        clipped,
                    )))?;
                    budget = 0;
                }
            }
        }
        if budget > 0 {
            out.queue(PrintStyledContent(StyledContent::new(
                ContentStyle::new(),
                " ".repeat(budget),
            )))?;
        }
    }

    if panel.border_on() {
        draw_border(out, panel, term)?;
    }
    Ok(())
}

fn clip_to_width(text: &str, budget: usize) -> String {
    let mut clipped = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        clipped.push(ch);
        used += w;
    }
    clipped
}

fn draw_border(out: &mut dyn Write, panel: &Panel, term: TermSize) -> io::Result<()> {
    let dims = panel.dims();
    if dims.rows < 2 || dims.columns < 2 {
        return Ok(());
    }
    let style = ContentStyle::new();
    let inner = (dims.columns - 2) as usize;
    let top = format!(
        "{}{}{}",
        BORDER_CORNERS[0],
        BORDER_HORIZONTAL.to_string().repeat(inner),
        BORDER_CORNERS[1]
    );
    let bottom = format!(
        "{}{}{}",
        BORDER_CORNERS[2],
        BORDER_HORIZONTAL.to_string().repeat(inner),
        BORDER_CORNERS[3]
    );
    if dims.y < term.rows {
        out.queue(MoveTo(dims.x, dims.y))?;
        out.queue(PrintStyledContent(StyledContent::new(style, top)))?;
    }
    let bottom_y = dims.bottom() - 1;
    if bottom_y < term.rows {
        out.queue(MoveTo(dims.x, bottom_y))?;
        out.queue(PrintStyledContent(StyledContent::new(style, bottom)))?;
    }
    for y in (dims.y + 1)..bottom_y {
        if y >= term.rows {
            break;
        }
        out.queue(MoveTo(dims.x, y))?;
        out.queue(PrintStyledContent(StyledContent::new(
            style,
            BORDER_VERTICAL.to_string(),
        )))?;
        let right_x = dims.right() - 1;
        if right_x < term.cols {
            out.queue(MoveTo(right_x, y))?;
            out.queue(PrintStyledContent(StyledContent::new(
                style,
                BORDER_VERTICAL.to_string(),
            )))?;
        }
    }
    Ok(())
}

pub fn draw_flash(out: &mut dyn Write, text: &str, term: TermSize) -> io::Result<()> {
    if term.rows == 0 || term.cols == 0 {
        return Ok(());
    }
    out.queue(MoveTo(0, term.rows - 1))?;
    out.queue(Clear(ClearType::CurrentLine))?;
    let mut style = ContentStyle::new();
    style.attributes = Attributes::from(Attribute::Bold) | Attribute::Reverse;
    let clipped = clip_to_width(text, term.cols as usize);
    out.queue(PrintStyledContent(StyledContent::new(style, clipped)))?;
    Ok(())
}

pub fn clear_flash(out: &mut dyn Write, term: TermSize) -> io::Result<()> {
    if term.rows == 0 {
        return Ok(());
    }
    out.queue(MoveTo(0, term.rows - 1))?;
    out.queue(Clear(ClearType::CurrentLine))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WindowDimensions;
    use crate::panel::{PanelOptions, Pixel};

    fn term() -> TermSize {
        TermSize::new(80, 24)
    }

    #[test]
    fn draw_panel_positions_rows_at_panel_origin() {
        let mut panel = Panel::new(
            "plot",
            WindowDimensions::new(5, 2, 3, 20),
            PanelOptions::default(),
        );
        panel.buffer_mut().rows.push(vec![Pixel::plain("hello")]);
        let mut buf = Vec::new();
        draw_panel(&mut buf, &panel, term()).unwrap();
        let output = String::from_utf8_lossy(&buf);
        // MoveTo is zero-based; the escape sequence is one-based.
        assert!(output.contains("\u{1b}[3;6H"));
        assert!(output.contains("hello"));
    }

    #[test]
    fn rows_beyond_visible_count_are_clipped() {
        let mut panel = Panel::new(
            "plot",
            WindowDimensions::new(0, 0, 2, 20),
            PanelOptions::default(),
        );
        for i in 0..5 {
            panel
                .buffer_mut()
                .rows
                .push(vec![Pixel::plain(format!("row{i}"))]);
        }
        let mut buf = Vec::new();
        draw_panel(&mut buf, &panel, term()).unwrap();
        let output = String::from_utf8_lossy(&buf);
        assert!(output.contains("row0"));
        assert!(output.contains("row1"));
        assert!(!output.contains("row2"));
    }

    #[test]
    fn long_rows_are_clipped_to_panel_width() {
        let mut panel = Panel::new(
            "plot",
            WindowDimensions::new(0, 0, 1, 6),
            PanelOptions::default(),
        );
        panel
            .buffer_mut()
            .rows
            .push(vec![Pixel::plain("abcdefghij")]);
        let mut buf = Vec::new();
        draw_panel(&mut buf, &panel, term()).unwrap();
        let output = String::from_utf8_lossy(&buf);
        assert!(output.contains("abcdef"));
        assert!(!output.contains("abcdefg"));
    }

    #[test]
    fn bordered_panel_draws_box_and_insets_content() {
        let mut panel = Panel::new(
            "legend",
            WindowDimensions::new(0, 0, 4, 10),
            PanelOptions {
                border: true,
                ..Default::default()
            },
        );
        panel.buffer_mut().rows.push(vec![Pixel::plain("x")]);
        let mut buf = Vec::new();
        draw_panel(&mut buf, &panel, term()).unwrap();
        let output = String::from_utf8_lossy(&buf);
        assert!(output.contains('┌'));
        assert!(output.contains('┘'));
        // Content starts one cell in from the border.
        assert!(output.contains("\u{1b}[2;2H"));
    }

    #[test]
    fn zero_sized_panel_writes_nothing() {
        let panel = Panel::new(
            "empty",
            WindowDimensions::new(0, 0, 0, 0),
            PanelOptions::default(),
        );
        let mut buf = Vec::new();
        draw_panel(&mut buf, &panel, term()).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn flash_renders_on_bottom_row_and_clears() {
        let mut buf = Vec::new();
        draw_flash(&mut buf, "saved", term()).unwrap();
        let output = String::from_utf8_lossy(&buf);
        assert!(output.contains("\u{1b}[24;1H"));
        assert!(output.contains("saved"));

        buf.clear();
        draw_flash(&mut buf, "x", TermSize::new(0, 0)).unwrap();
        assert!(buf.is_empty());

        buf.clear();
        clear_flash(&mut buf, term()).unwrap();
        assert!(String::from_utf8_lossy(&buf).contains("\u{1b}[24;1H"));
    }
}
