//! Legends: labeled, doc-like content regions composed from one or more
//! panels and fed by a caller-supplied data producer.
//!
//! The producer returns a tree of [`LegendNode`]s instead of the string
//! maps the terminal legend format usually implies: sections nest, and a
//! pre-rendered [`LegendNode::Fragment`] is spliced into the panel buffer
//! verbatim, which is how composite widgets (intensity bar, mode banner,
//! channel marker) live inside an otherwise textual legend.

use crate::cache::CachedElementStore;
use crate::geometry::{Arrangement, Corner, TermSize};
use crate::log_debug;
use crate::panel::{Panel, PanelId, PanelRegistry, Pixel, PixelRow};

/// One node of the legend content tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LegendNode {
    Section {
        name: String,
        children: Vec<LegendNode>,
    },
    Pair {
        key: String,
        value: String,
    },
    /// Pre-rendered colored cells, spliced in verbatim.
    Fragment(PixelRow),
}

impl LegendNode {
    pub fn section(name: impl Into<String>, children: Vec<LegendNode>) -> Self {
        LegendNode::Section {
            name: name.into(),
            children,
        }
    }

    pub fn pair(key: impl Into<String>, value: impl ToString) -> Self {
        LegendNode::Pair {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

/// Full and minimal renditions of the same logical content tree.
#[derive(Debug, Clone, Default)]
pub struct LegendContent {
    pub full: Vec<LegendNode>,
    pub minimal: Vec<LegendNode>,
}

/// Content producer. The legend's own element cache is passed in so the
/// producer can memoize expensive fragments; entries stay cached until a
/// handler invalidates them.
pub type LegendProducer =
    Box<dyn FnMut(&mut CachedElementStore<Vec<PixelRow>>) -> LegendContent + Send>;

/// Composes member panels into one logical legend with a docking side,
/// minimal mode, and an optional reverse-video footer.
pub struct LegendManager {
    panel_ids: Vec<PanelId>,
    arrangement: Arrangement,
    producer: LegendProducer,
    side: Option<Corner>,
    minimal_mode: bool,
    footer: Option<String>,
    cache: CachedElementStore<Vec<PixelRow>>,
}

impl LegendManager {
    /// The docking side is taken from the first member panel's corner, the
    /// way the panels were created. Member panels get borders and sticky
    /// sides switched on.
    pub fn new(
        panels: &mut PanelRegistry,
        panel_ids: Vec<PanelId>,
        arrangement: Arrangement,
        producer: LegendProducer,
    ) -> Self {
        debug_assert_eq!(panel_ids.len(), arrangement.panel_count());
        let side = panel_ids
            .first()
            .and_then(|&id| panels.get(id).corner());
        for &id in &panel_ids {
            let panel = panels.get_mut(id);
            panel.set_border(true);
            panel.set_sticky_sides(true);
        }
        Self {
            panel_ids,
            arrangement,
            producer,
            side,
            minimal_mode: false,
            footer: None,
            cache: CachedElementStore::new(),
        }
    }

    pub fn panel_ids(&self) -> &[PanelId] {
        &self.panel_ids
    }

    pub fn side(&self) -> Option<Corner> {
        self.side
    }

    pub fn set_footer(&mut self, footer: Option<String>) {
        self.footer = footer;
    }

    pub fn toggle_minimal_mode(&mut self) {
        self.minimal_mode = !self.minimal_mode;
    }

    pub fn minimal_mode(&self) -> bool {
        self.minimal_mode
    }

    pub fn cache_mut(&mut self) -> &mut CachedElementStore<Vec<PixelRow>> {
        &mut self.cache
    }

    /// Hidden iff every member panel is hidden.
    pub fn is_hidden(&self, panels: &PanelRegistry) -> bool {
        self.panel_ids.iter().all(|&id| panels.get(id).is_hidden())
    }

    pub fn hide_all(&self, panels: &mut PanelRegistry) {
        for &id in &self.panel_ids {
            panels.get_mut(id).hide();
        }
    }

    pub fn show_all(&self, panels: &mut PanelRegistry) {
        for &id in &self.panel_ids {
            panels.get_mut(id).show();
        }
    }

    pub fn toggle_all(&self, panels: &mut PanelRegistry) {
        for &id in &self.panel_ids {
            panels.get_mut(id).toggle_visibility();
        }
    }

    pub fn set_borders(&self, panels: &mut PanelRegistry, on: bool) {
        for &id in &self.panel_ids {
            panels.get_mut(id).set_border(on);
        }
    }

    /// This legend's width footprint, counted only when it is docked to
    /// the queried side and visible.
    pub fn total_width(&self, panels: &PanelRegistry, side: Corner) -> u16 {
        if self.is_hidden(panels) {
            return 0;
        }
        if self.side.and_then(Corner::horizontal_side) == side.horizontal_side()
            && side.horizontal_side().is_some()
        {
            return panels.get(self.panel_ids[0]).dims().columns;
        }
        0
    }

    /// This legend's height footprint, counted only when it is docked to
    /// the queried side and visible.
    pub fn total_height(&self, panels: &PanelRegistry, side: Corner) -> u16 {
        if self.is_hidden(panels) {
            return 0;
        }
        if self.side.and_then(Corner::vertical_side) == side.vertical_side()
            && side.vertical_side().is_some()
        {
            return panels.get(self.panel_ids[0]).dims().rows;
        }
        0
    }

    /// Shifts every member panel one column left; a panel already at the
    /// edge rejects its own move and the rest still shift.
    pub fn move_left(&self, panels: &mut PanelRegistry, term: TermSize) {
        for &id in &self.panel_ids {
            if let Err(err) = panels.get_mut(id).move_left(term) {
                log_debug(&format!("legend move_left rejected: {err}"));
            }
        }
    }

    pub fn move_right(&self, panels: &mut PanelRegistry, term: TermSize) {
        for &id in &self.panel_ids {
            if let Err(err) = panels.get_mut(id).move_right(term) {
                log_debug(&format!("legend move_right rejected: {err}"));
            }
        }
    }

    /// Re-runs the docking algorithm so a manually dragged legend returns
    /// to its anchored position. Geometry errors are swallowed; the next
    /// resize event self-corrects.
    pub fn snap_back(&self, panels: &mut PanelRegistry, term: TermSize) {
        for &id in &self.panel_ids {
            panels.get_mut(id).snap_back(term);
        }
    }

    /// Pulls fresh content from the producer and redraws every member
    /// panel that was not already drawn this cycle. No-op while the whole
    /// legend is hidden.
    pub fn redraw(&mut self, panels: &mut PanelRegistry) {
        if self.is_hidden(panels) {
            return;
        }
        let content = (self.producer)(&mut self.cache);
        let nodes = if self.minimal_mode {
            content.minimal
        } else {
            content.full
        };
        let routed = route_nodes(self.arrangement, nodes);

        for (index, (&id, nodes)) in self.panel_ids.iter().zip(routed).enumerate() {
            let panel = panels.get_mut(id);
            if panel.is_drawn() || panel.is_hidden() {
                continue;
            }
            render_pane(panel, &nodes, &mut self.cache);
            if index == 0 {
                if let Some(footer) = &self.footer {
                    let columns = panel.dims().columns as usize;
                    let blank = panel.hline(' ');
                    let row = vec![Pixel::new(
                        center(footer, columns),
                        crossterm::style::Color::Reset,
                        crossterm::style::Color::Reset,
                        crossterm::style::Attributes::from(crossterm::style::Attribute::Bold)
                            | crossterm::style::Attribute::Reverse,
                    )];
                    panel.buffer_mut().rows.push(blank);
                    panel.buffer_mut().rows.push(row);
                }
            }
            panel.mark_drawn(true);
        }
    }
}

/// Splits the top-level sections across member panels: vertical splits
/// route UPPER/LOWER, horizontal splits route LEFT/RIGHT, everything else
/// lands in the single panel.
fn route_nodes(arrangement: Arrangement, nodes: Vec<LegendNode>) -> Vec<Vec<LegendNode>> {
    let routes: &[&str] = match arrangement {
        Arrangement::SplitVertical => &["UPPER", "LOWER"],
        Arrangement::SplitHorizontal => &["LEFT", "RIGHT"],
        Arrangement::SingleColumn | Arrangement::SingleRow => return vec![nodes],
    };
    let mut panes: Vec<Vec<LegendNode>> = vec![Vec::new(), Vec::new()];
    for node in nodes {
        match &node {
            LegendNode::Section { name, children } => {
                if let Some(pos) = routes.iter().position(|route| route == name) {
                    panes[pos].extend(children.clone());
                    continue;
                }
                panes[0].push(node);
            }
            _ => panes[0].push(node),
        }
    }
    panes
}

fn render_pane(
    panel: &mut Panel,
    nodes: &[LegendNode],
    cache: &mut CachedElementStore<Vec<PixelRow>>,
) {
    panel.buffer_mut().rows.clear();
    panel.buffer_mut().rows.push(vec![Pixel::plain("")]);
    let columns = panel.dims().columns as usize;
    let dash = cache
        .get_or_compute(&format!("hline:-:{columns}"), || vec![panel.hline('-')])[0]
        .clone();
    let blank = cache
        .get_or_compute(&format!("hline: :{columns}"), || vec![panel.hline(' ')])[0]
        .clone();
    for node in nodes {
        render_node(panel, node, &dash, &blank, columns, 0);
    }
}

fn render_node(
    panel: &mut Panel,
    node: &LegendNode,
    dash: &PixelRow,
    blank: &PixelRow,
    columns: usize,
    depth: usize,
) {
    match node {
        LegendNode::Fragment(row) => {
            panel.buffer_mut().rows.push(row.clone());
        }
        LegendNode::Pair { key, value } => {
            panel.buffer_mut().rows.push(vec![
                Pixel::bold(format!("  {key}: ")),
                Pixel::plain(value.clone()),
            ]);
        }
        LegendNode::Section { name, children } => {
            if depth == 0 {
                let title = center(&format!(" {name}"), columns.saturating_sub(1));
                panel.buffer_mut().rows.push(vec![Pixel::bold(title)]);
                panel.buffer_mut().rows.push(dash.clone());
            } else {
                panel
                    .buffer_mut()
                    .rows
                    .push(vec![Pixel::bold(format!("  {name}"))]);
            }
            for child in children {
                render_node(panel, child, dash, blank, columns, depth + 1);
            }
            if depth == 0 {
                panel.buffer_mut().rows.push(blank.clone());
            }
        }
    }
}

fn center(text: &str, width: usize) -> String {
    use unicode_width::UnicodeWidthStr;
    let text_width = text.width();
    if text_width >= width {
        return text.to_string();
    }
    let left = (width - text_width) / 2;
    let right = width - text_width - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WindowDimensions;
    use crate::panel::PanelOptions;
    use crossterm::style::Color;

    fn registry_with_panel(corner: Option<Corner>) -> (PanelRegistry, PanelId) {
        let mut panels = PanelRegistry::new();
        let id = panels.create(
            "legend",
            WindowDimensions::new(150, 0, 50, 50),
            PanelOptions {
                corner,
                ..Default::default()
            },
        );
        (panels, id)
    }

    fn fixed_content() -> LegendProducer {
        Box::new(|_| LegendContent {
            full: vec![LegendNode::section(
                "info",
                vec![LegendNode::pair("threshold", 90)],
            )],
            minimal: vec![LegendNode::pair("t", 90)],
        })
    }

    #[test]
    fn footprint_counts_only_docked_visible_side() {
        let (mut panels, id) = registry_with_panel(Some(Corner::Right));
        let legend = LegendManager::new(
            &mut panels,
            vec![id],
            Arrangement::SingleColumn,
            fixed_content(),
        );
        assert_eq!(legend.total_width(&panels, Corner::Right), 50);
        assert_eq!(legend.total_width(&panels, Corner::Left), 0);
        assert_eq!(legend.total_height(&panels, Corner::Top), 0);

        legend.hide_all(&mut panels);
        assert_eq!(legend.total_width(&panels, Corner::Right), 0);
    }

    #[test]
    fn hidden_iff_all_member_panels_hidden() {
        let mut panels = PanelRegistry::new();
        let a = panels.create(
            "upper",
            WindowDimensions::new(0, 0, 10, 30),
            PanelOptions::default(),
        );
        let b = panels.create(
            "lower",
            WindowDimensions::new(0, 10, 10, 30),
            PanelOptions::default(),
        );
        let legend = LegendManager::new(
            &mut panels,
            vec![a, b],
            Arrangement::SplitVertical,
            fixed_content(),
        );
        assert!(!legend.is_hidden(&panels));
        panels.get_mut(a).hide();
        assert!(!legend.is_hidden(&panels));
        panels.get_mut(b).hide();
        assert!(legend.is_hidden(&panels));
    }

    #[test]
    fn redraw_routes_split_sections_to_member_panels() {
        let mut panels = PanelRegistry::new();
        let a = panels.create(
            "upper",
            WindowDimensions::new(0, 0, 10, 30),
            PanelOptions::default(),
        );
        let b = panels.create(
            "lower",
            WindowDimensions::new(0, 10, 10, 30),
            PanelOptions::default(),
        );
        let producer: LegendProducer = Box::new(|_| LegendContent {
            full: vec![
                LegendNode::section("UPPER", vec![LegendNode::pair("top", 1)]),
                LegendNode::section("LOWER", vec![LegendNode::pair("bottom", 2)]),
            ],
            minimal: Vec::new(),
        });
        let mut legend =
            LegendManager::new(&mut panels, vec![a, b], Arrangement::SplitVertical, producer);
        legend.redraw(&mut panels);

        let upper_text: String = panels
            .get(a)
            .buffer()
            .rows
            .iter()
            .flatten()
            .map(|p| p.text.clone())
            .collect();
        let lower_text: String = panels
            .get(b)
            .buffer()
            .rows
            .iter()
            .flatten()
            .map(|p| p.text.clone())
            .collect();
        assert!(upper_text.contains("top"));
        assert!(!upper_text.contains("bottom"));
        assert!(lower_text.contains("bottom"));
    }

    #[test]
    fn fragments_are_spliced_verbatim() {
        let (mut panels, id) = registry_with_panel(None);
        let fragment = vec![Pixel::on_color("####", Color::Red)];
        let expected = fragment.clone();
        let producer: LegendProducer = Box::new(move |_| LegendContent {
            full: vec![LegendNode::section(
                "bar",
                vec![LegendNode::Fragment(fragment.clone())],
            )],
            minimal: Vec::new(),
        });
        let mut legend =
            LegendManager::new(&mut panels, vec![id], Arrangement::SingleColumn, producer);
        legend.redraw(&mut panels);
        assert!(panels
            .get(id)
            .buffer()
            .rows
            .iter()
            .any(|row| *row == expected));
    }

    #[test]
    fn redraw_skips_panels_already_drawn_this_cycle() {
        let (mut panels, id) = registry_with_panel(None);
        let mut legend = LegendManager::new(
            &mut panels,
            vec![id],
            Arrangement::SingleColumn,
            fixed_content(),
        );
        legend.redraw(&mut panels);
        let rows_after_first = panels.get(id).buffer().rows.len();
        panels
            .get_mut(id)
            .buffer_mut()
            .rows
            .push(vec![Pixel::plain("extra")]);
        // Still marked drawn: a second redraw in the same cycle is a no-op.
        legend.redraw(&mut panels);
        assert_eq!(panels.get(id).buffer().rows.len(), rows_after_first + 1);

        panels.clear_drawn_flags();
        legend.redraw(&mut panels);
        assert_eq!(panels.get(id).buffer().rows.len(), rows_after_first);
    }

    #[test]
    fn minimal_mode_switches_content_tree() {
        let (mut panels, id) = registry_with_panel(None);
        let mut legend = LegendManager::new(
            &mut panels,
            vec![id],
            Arrangement::SingleColumn,
            fixed_content(),
        );
        legend.toggle_minimal_mode();
        legend.redraw(&mut panels);
        let text: String = panels
            .get(id)
            .buffer()
            .rows
            .iter()
            .flatten()
            .map(|p| p.text.clone())
            .collect();
        assert!(text.contains("t: "));
        assert!(!text.contains("threshold"));
    }

    #[test]
    fn footer_renders_on_first_panel() {
        let (mut panels, id) = registry_with_panel(None);
        let mut legend = LegendManager::new(
            &mut panels,
            vec![id],
            Arrangement::SingleColumn,
            fixed_content(),
        );
        legend.set_footer(Some("specterm".to_string()));
        legend.redraw(&mut panels);
        let last = panels.get(id).buffer().rows.last().cloned().unwrap();
        assert!(last[0].text.contains("specterm"));
        assert!(last[0]
            .attrs
            .has(crossterm::style::Attribute::Reverse));
    }

    #[test]
    fn move_rejected_at_screen_edge() {
        let mut panels = PanelRegistry::new();
        let id = panels.create(
            "legend",
            WindowDimensions::new(0, 0, 10, 30),
            PanelOptions::default(),
        );
        let legend = LegendManager::new(
            &mut panels,
            vec![id],
            Arrangement::SingleColumn,
            fixed_content(),
        );
        let term = TermSize::new(80, 24);
        legend.move_left(&mut panels, term);
        assert_eq!(panels.get(id).dims().x, 0);
        legend.move_right(&mut panels, term);
        assert_eq!(panels.get(id).dims().x, 1);
    }

    #[test]
    fn snap_back_restores_docked_position() {
        let (mut panels, id) = registry_with_panel(Some(Corner::Right));
        let legend = LegendManager::new(
            &mut panels,
            vec![id],
            Arrangement::SingleColumn,
            fixed_content(),
        );
        let term = TermSize::new(200, 50);
        legend.move_left(&mut panels, term);
        legend.move_left(&mut panels, term);
        assert_eq!(panels.get(id).dims().x, 148);
        legend.snap_back(&mut panels, term);
        assert_eq!(panels.get(id).dims().x + panels.get(id).dims().columns, 200);
    }
}
