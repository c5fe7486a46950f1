use crate::data::{normalize_name, ProvinceTable};
use crate::styling::{self, NO_DATA_LABEL};
use crate::surface::{MapSurface, RegionId};
use crate::types::{BoundaryFeature, Bounds, ProvinceRecord};
use geo::BoundingRect;
use maud::{html, Markup};
use serde::Serialize;

/// Gap between the pointer and the near edge of the info panel, in pixels.
pub const PANEL_OFFSET: f64 = 15.0;

/// Provinces on the eastern edge of the default view. Their panel opens to
/// the left of the pointer so it stays inside the viewport.
pub const FLIPPED_PROVINCES: [&str; 11] = [
    "PAPUA",
    "PAPUA BARAT",
    "PAPUA BARAT DAYA",
    "PAPUA TENGAH",
    "PAPUA PEGUNUNGAN",
    "PAPUA SELATAN",
    "IRIAN JAYA BARAT",
    "IRIAN JAYA TENGAH",
    "IRIAN JAYA TIMUR",
    "MALUKU",
    "MALUKU UTARA",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelSide {
    /// Panel's left edge sits `PANEL_OFFSET` right of the pointer.
    Right,
    /// Panel's right edge sits `PANEL_OFFSET` left of the pointer.
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PanelPosition {
    pub x: f64,
    pub y: f64,
    pub side: PanelSide,
}

pub fn panel_position(raw_name: Option<&str>, pointer: ScreenPoint) -> PanelPosition {
    let flipped = raw_name
        .map(normalize_name)
        .is_some_and(|name| FLIPPED_PROVINCES.contains(&name.as_str()));

    if flipped {
        PanelPosition {
            x: pointer.x - PANEL_OFFSET,
            y: pointer.y + PANEL_OFFSET,
            side: PanelSide::Left,
        }
    } else {
        PanelPosition {
            x: pointer.x + PANEL_OFFSET,
            y: pointer.y + PANEL_OFFSET,
            side: PanelSide::Right,
        }
    }
}

/// Roughly `Number.prototype.toLocaleString("en")`: grouped thousands, at
/// most three fraction digits, trailing zeros dropped.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let frac = frac_part.trim_end_matches('0');
    let sign = if value < 0.0 && (int_part != "0" || !frac.is_empty()) { "-" } else { "" };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

fn figure(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", format_amount(v), unit),
        None => "-".to_string(),
    }
}

/// Info panel body for a region. A join miss shows the raw boundary name.
pub fn panel_html(raw_name: Option<&str>, record: Option<&ProvinceRecord>) -> Markup {
    match record {
        Some(record) => {
            let category = record.category();
            html! {
                div class="info-panel" {
                    strong { (record.name) }
                    br;
                    "Kategori: " (category.label().unwrap_or("-"))
                    br;
                    @if let Some(cluster) = record.cluster {
                        "Klaster: " (cluster)
                        br;
                    }
                    "Belanja Modal: " (figure(record.capital_spending, " Milyar"))
                    br;
                    "Belanja Subsidi: " (figure(record.subsidy_spending, " Milyar"))
                    br;
                    "Belanja Bantuan Sosial: " (figure(record.social_assistance_spending, " Milyar"))
                    br;
                    "Persentase Kemiskinan: " (figure(record.poverty_rate, "%"))
                    br;
                    "IPM: " (figure(record.hdi, ""))
                }
            }
        }
        None => html! {
            div class="info-panel info-panel-empty" {
                strong { (raw_name.unwrap_or_default()) }
                br;
                (NO_DATA_LABEL)
            }
        },
    }
}

/// The one tooltip element shared by every region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoPanel {
    pub html: String,
    pub position: PanelPosition,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegionState {
    Idle,
    Hovered,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionEvent {
    PointerEnter(ScreenPoint),
    PointerMove(ScreenPoint),
    PointerLeave,
    Click,
}

#[derive(Debug)]
struct RegionEntry {
    name: Option<String>,
    bounds: Option<Bounds>,
    state: RegionState,
}

/// Hover/click state for every rendered region plus the shared info panel.
#[derive(Debug, Default)]
pub struct InteractionController {
    regions: Vec<RegionEntry>,
    panel: Option<InfoPanel>,
    panels_created: usize,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, feature: &BoundaryFeature) -> RegionId {
        let id = RegionId(self.regions.len());
        self.regions.push(RegionEntry {
            name: feature.name.clone(),
            bounds: feature.geometry.bounding_rect().map(Bounds::from),
            state: RegionState::Idle,
        });
        id
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn state(&self, region: RegionId) -> Option<RegionState> {
        self.regions.get(region.0).map(|entry| entry.state)
    }

    pub fn hovered(&self) -> Option<RegionId> {
        self.regions
            .iter()
            .position(|entry| entry.state == RegionState::Hovered)
            .map(RegionId)
    }

    pub fn panel(&self) -> Option<&InfoPanel> {
        self.panel.as_ref()
    }

    pub fn panels_created(&self) -> usize {
        self.panels_created
    }

    pub fn handle<S: MapSurface>(
        &mut self,
        surface: &mut S,
        table: &ProvinceTable,
        region: RegionId,
        event: RegionEvent,
    ) {
        if region.0 >= self.regions.len() {
            tracing::debug!(region = region.0, ?event, "event for unknown region ignored");
            return;
        }

        match event {
            RegionEvent::PointerEnter(pointer) => self.enter(surface, table, region, pointer),
            RegionEvent::PointerMove(pointer) => self.move_panel(surface, region, pointer),
            RegionEvent::PointerLeave => self.leave(surface, table, region),
            RegionEvent::Click => self.click(surface, region),
        }
    }

    fn enter<S: MapSurface>(
        &mut self,
        surface: &mut S,
        table: &ProvinceTable,
        region: RegionId,
        pointer: ScreenPoint,
    ) {
        // A missed leave on another region must not leave two highlighted.
        if let Some(previous) = self.hovered().filter(|&previous| previous != region) {
            self.leave(surface, table, previous);
        }

        let entry = &mut self.regions[region.0];
        let record = entry.name.as_deref().and_then(|name| table.find(name));
        let style = styling::highlight_style(&styling::base_style(record));
        surface.set_region_style(region, &style);
        entry.state = RegionState::Hovered;

        let html = panel_html(entry.name.as_deref(), record).into_string();
        let position = panel_position(entry.name.as_deref(), pointer);
        if self.panel.is_none() {
            self.panels_created += 1;
        }
        let panel = self.panel.get_or_insert_with(|| InfoPanel {
            html: String::new(),
            position,
            visible: false,
        });
        panel.html = html;
        panel.position = position;
        panel.visible = true;
        surface.show_info_panel(panel);
    }

    fn move_panel<S: MapSurface>(&mut self, surface: &mut S, region: RegionId, pointer: ScreenPoint) {
        let entry = &self.regions[region.0];
        if entry.state != RegionState::Hovered {
            return;
        }
        if let Some(panel) = self.panel.as_mut() {
            panel.position = panel_position(entry.name.as_deref(), pointer);
            surface.show_info_panel(panel);
        }
    }

    fn leave<S: MapSurface>(&mut self, surface: &mut S, table: &ProvinceTable, region: RegionId) {
        let entry = &mut self.regions[region.0];
        if entry.state != RegionState::Hovered {
            return;
        }

        let record = entry.name.as_deref().and_then(|name| table.find(name));
        surface.set_region_style(region, &styling::base_style(record));
        entry.state = RegionState::Idle;

        if let Some(panel) = self.panel.as_mut() {
            panel.visible = false;
        }
        surface.hide_info_panel();
    }

    fn click<S: MapSurface>(&mut self, surface: &mut S, region: RegionId) {
        match self.regions[region.0].bounds {
            Some(bounds) => surface.fit_bounds(bounds),
            None => tracing::debug!(region = region.0, "clicked region has no bounds"),
        }
    }
}
