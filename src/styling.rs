use crate::types::{Category, ProvinceRecord, LABEL_HIGH, LABEL_LOW, LABEL_MEDIUM};
use maud::{html, Markup};
use serde::Serialize;

/// A display color: the CSS value handed to the map surface plus the RGB
/// used when rasterizing tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Swatch {
    pub css: &'static str,
    #[serde(skip)]
    pub rgb: (u8, u8, u8),
}

pub const HIGH_COLOR: Swatch = Swatch { css: "green", rgb: (0, 128, 0) };
pub const MEDIUM_COLOR: Swatch = Swatch { css: "yellow", rgb: (255, 255, 0) };
pub const LOW_COLOR: Swatch = Swatch { css: "red", rgb: (255, 0, 0) };
pub const DEFAULT_COLOR: Swatch = Swatch { css: "#ccc", rgb: (204, 204, 204) };

pub const BORDER_COLOR: &str = "grey";
pub const HIGHLIGHT_BORDER_COLOR: &str = "#666";
pub const NO_DATA_LABEL: &str = "Data tidak tersedia";
pub const LEGEND_TITLE: &str = "Klaster Capaian";

pub fn fill_color(category: Option<&Category>) -> Swatch {
    match category {
        Some(Category::High) => HIGH_COLOR,
        Some(Category::Medium) => MEDIUM_COLOR,
        Some(Category::Low) => LOW_COLOR,
        Some(Category::Unknown(_)) | None => DEFAULT_COLOR,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStyle {
    pub fill_color: &'static str,
    pub fill_opacity: f32,
    pub color: &'static str,
    pub weight: f32,
    pub opacity: f32,
}

pub fn base_style(record: Option<&ProvinceRecord>) -> RegionStyle {
    let category = record.map(ProvinceRecord::category);
    RegionStyle {
        fill_color: fill_color(category.as_ref()).css,
        fill_opacity: 0.8,
        color: BORDER_COLOR,
        weight: 1.0,
        opacity: 1.0,
    }
}

pub fn highlight_style(base: &RegionStyle) -> RegionStyle {
    RegionStyle {
        color: HIGHLIGHT_BORDER_COLOR,
        weight: 3.0,
        fill_opacity: 0.9,
        ..base.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: &'static str,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn to_html(&self) -> Markup {
        html! {
            div class="legend" {
                h4 { (self.title) }
                @for entry in &self.entries {
                    div class="legend-entry" {
                        i style={"background:" (entry.color)} {}
                        " " (entry.label)
                    }
                }
            }
        }
    }
}

pub fn legend() -> Legend {
    let entry = |label, swatch: Swatch| LegendEntry { label, color: swatch.css };
    Legend {
        title: LEGEND_TITLE,
        entries: vec![
            entry(LABEL_HIGH, HIGH_COLOR),
            entry(LABEL_MEDIUM, MEDIUM_COLOR),
            entry(LABEL_LOW, LOW_COLOR),
            entry(NO_DATA_LABEL, DEFAULT_COLOR),
        ],
    }
}
