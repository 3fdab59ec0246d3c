//! Cell-coordinate value types shared by the panel and layout code.
//!
//! Dimensions are immutable values: a resize or move replaces the whole
//! `WindowDimensions`, it never mutates one in place.

/// A rectangular terminal region in cell coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDimensions {
    pub x: u16,
    pub y: u16,
    pub rows: u16,
    pub columns: u16,
}

impl WindowDimensions {
    pub fn new(x: u16, y: u16, rows: u16, columns: u16) -> Self {
        Self {
            x,
            y,
            rows,
            columns,
        }
    }

    /// Dimensions covering the whole terminal.
    pub fn full_screen(term: TermSize) -> Self {
        Self {
            x: 0,
            y: 0,
            rows: term.rows,
            columns: term.cols,
        }
    }

    /// One-past-the-right column.
    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.columns)
    }

    /// One-past-the-bottom row.
    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.rows)
    }

    /// Whether the rectangle lies entirely inside the terminal.
    pub fn fits_in(&self, term: TermSize) -> bool {
        self.right() <= term.cols && self.bottom() <= term.rows
    }

    pub fn with_position(&self, x: u16, y: u16) -> Self {
        Self { x, y, ..*self }
    }
}

/// Terminal extent in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub rows: u16,
    pub cols: u16,
}

impl TermSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { rows, cols }
    }
}

/// Screen edge or corner a panel anchors itself to during resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

impl Corner {
    /// The horizontal edge this corner pins to, if any.
    pub fn horizontal_side(self) -> Option<Corner> {
        match self {
            Corner::Left | Corner::TopLeft | Corner::BottomLeft => Some(Corner::Left),
            Corner::Right | Corner::TopRight | Corner::BottomRight => Some(Corner::Right),
            _ => None,
        }
    }

    /// The vertical edge this corner pins to, if any.
    pub fn vertical_side(self) -> Option<Corner> {
        match self {
            Corner::Top | Corner::TopLeft | Corner::TopRight => Some(Corner::Top),
            Corner::Bottom | Corner::BottomLeft | Corner::BottomRight => Some(Corner::Bottom),
            _ => None,
        }
    }
}

/// How a legend's member panels are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrangement {
    SingleColumn,
    SingleRow,
    /// Two panels stacked vertically; routes UPPER/LOWER sections.
    SplitVertical,
    /// Two panels side by side; routes LEFT/RIGHT sections.
    SplitHorizontal,
}

impl Arrangement {
    /// Number of member panels this arrangement expects.
    pub fn panel_count(self) -> usize {
        match self {
            Arrangement::SingleColumn | Arrangement::SingleRow => 1,
            Arrangement::SplitVertical | Arrangement::SplitHorizontal => 2,
        }
    }
}
