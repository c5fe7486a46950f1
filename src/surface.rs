use crate::interaction::InfoPanel;
use crate::styling::{Legend, RegionStyle};
use crate::types::{Bounds, LatLng};
use geo::MultiPolygon;
use serde::Serialize;

/// Index of a region in the order it was added to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RegionId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
}

/// Whatever actually draws the map: a browser widget, a native map view, or
/// the recorder below.
pub trait MapSurface {
    fn set_view(&mut self, center: LatLng, zoom: u8);
    fn set_max_bounds(&mut self, bounds: Bounds);
    fn set_zoom_limits(&mut self, min_zoom: u8, max_zoom: u8);
    fn add_tile_layer(&mut self, layer: &TileLayer);
    fn add_region(&mut self, region: RegionId, geometry: &MultiPolygon<f64>, style: &RegionStyle);
    /// After this call the host delivers pointer events for `region` to the view.
    fn attach_pointer_handlers(&mut self, region: RegionId);
    fn set_region_style(&mut self, region: RegionId, style: &RegionStyle);
    fn fit_bounds(&mut self, bounds: Bounds);
    fn show_info_panel(&mut self, panel: &InfoPanel);
    fn hide_info_panel(&mut self);
    fn add_legend(&mut self, legend: &Legend);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceCommand {
    SetView { center: LatLng, zoom: u8 },
    SetMaxBounds { bounds: Bounds },
    SetZoomLimits { min_zoom: u8, max_zoom: u8 },
    AddTileLayer { layer: TileLayer },
    AddRegion { region: RegionId, polygons: usize, style: RegionStyle },
    AttachPointerHandlers { region: RegionId },
    SetRegionStyle { region: RegionId, style: RegionStyle },
    FitBounds { bounds: Bounds },
    ShowInfoPanel { panel: InfoPanel },
    HideInfoPanel,
    AddLegend { legend: Legend },
}

/// Records every call in order. Backs the `/api/scene` endpoint, where a
/// thin browser shim replays the commands.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<SurfaceCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<SurfaceCommand> {
        self.commands
    }
}

impl MapSurface for RecordingSurface {
    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.commands.push(SurfaceCommand::SetView { center, zoom });
    }

    fn set_max_bounds(&mut self, bounds: Bounds) {
        self.commands.push(SurfaceCommand::SetMaxBounds { bounds });
    }

    fn set_zoom_limits(&mut self, min_zoom: u8, max_zoom: u8) {
        self.commands.push(SurfaceCommand::SetZoomLimits { min_zoom, max_zoom });
    }

    fn add_tile_layer(&mut self, layer: &TileLayer) {
        self.commands.push(SurfaceCommand::AddTileLayer { layer: layer.clone() });
    }

    fn add_region(&mut self, region: RegionId, geometry: &MultiPolygon<f64>, style: &RegionStyle) {
        self.commands.push(SurfaceCommand::AddRegion {
            region,
            polygons: geometry.0.len(),
            style: style.clone(),
        });
    }

    fn attach_pointer_handlers(&mut self, region: RegionId) {
        self.commands.push(SurfaceCommand::AttachPointerHandlers { region });
    }

    fn set_region_style(&mut self, region: RegionId, style: &RegionStyle) {
        self.commands.push(SurfaceCommand::SetRegionStyle {
            region,
            style: style.clone(),
        });
    }

    fn fit_bounds(&mut self, bounds: Bounds) {
        self.commands.push(SurfaceCommand::FitBounds { bounds });
    }

    fn show_info_panel(&mut self, panel: &InfoPanel) {
        self.commands.push(SurfaceCommand::ShowInfoPanel { panel: panel.clone() });
    }

    fn hide_info_panel(&mut self) {
        self.commands.push(SurfaceCommand::HideInfoPanel);
    }

    fn add_legend(&mut self, legend: &Legend) {
        self.commands.push(SurfaceCommand::AddLegend { legend: legend.clone() });
    }
}
