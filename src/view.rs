use crate::config::MapConfig;
use crate::data::ProvinceTable;
use crate::interaction::{InteractionController, RegionEvent};
use crate::styling;
use crate::surface::{MapSurface, RegionId, TileLayer};
use crate::types::BoundaryFeature;
use anyhow::Result;

/// The province choropleth: one region per boundary feature, colored by
/// category, with hover panels and click-to-zoom.
pub struct ChoroplethView {
    table: ProvinceTable,
    features: Vec<BoundaryFeature>,
    controller: InteractionController,
}

impl ChoroplethView {
    pub fn new(table: ProvinceTable) -> Self {
        Self {
            table,
            features: Vec::new(),
            controller: InteractionController::new(),
        }
    }

    /// Base map: view, limits, tile background and legend.
    pub fn mount<S: MapSurface>(&mut self, surface: &mut S, map: &MapConfig) {
        surface.set_view(map.center, map.zoom);
        surface.set_max_bounds(map.max_bounds);
        surface.set_zoom_limits(map.min_zoom, map.max_zoom);
        surface.add_tile_layer(&TileLayer {
            url: map.tile_url.clone(),
            attribution: map.tile_attribution.clone(),
        });
        surface.add_legend(&styling::legend());
    }

    /// Adds the boundary regions once the boundary load settles. A failed
    /// load leaves the map without regions.
    pub fn show_boundaries<S: MapSurface>(
        &mut self,
        surface: &mut S,
        boundaries: Result<Vec<BoundaryFeature>>,
    ) -> Vec<RegionId> {
        let features = match boundaries {
            Ok(features) => features,
            Err(e) => {
                let error = format!("{e:#}");
                tracing::warn!(%error, "boundary data unavailable; map has no regions");
                return Vec::new();
            }
        };

        let mut ids = Vec::with_capacity(features.len());
        for feature in &features {
            let id = self.controller.register(feature);
            let style = styling::base_style(self.table.find_feature(feature));
            surface.add_region(id, &feature.geometry, &style);
            surface.attach_pointer_handlers(id);
            ids.push(id);
        }
        tracing::debug!(regions = ids.len(), "boundary regions added");
        self.features.extend(features);
        ids
    }

    pub fn handle<S: MapSurface>(&mut self, surface: &mut S, region: RegionId, event: RegionEvent) {
        self.controller.handle(surface, &self.table, region, event);
    }

    /// Features added so far, indexed by `RegionId`.
    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{RegionState, ScreenPoint};
    use crate::surface::{RecordingSurface, SurfaceCommand};
    use crate::types::ProvinceRecord;
    use anyhow::anyhow;
    use geo::{polygon, MultiPolygon};

    fn table() -> ProvinceTable {
        ProvinceTable::new(vec![ProvinceRecord {
            name: "BALI".to_string(),
            category_label: Some("Capaian Menengah".to_string()),
            cluster: None,
            capital_spending: Some(1500.0),
            subsidy_spending: None,
            social_assistance_spending: None,
            poverty_rate: Some(4.25),
            hdi: Some(77.1),
        }])
    }

    fn bali() -> BoundaryFeature {
        BoundaryFeature {
            name: Some("Bali".to_string()),
            geometry: MultiPolygon::new(vec![polygon![
                (x: 114.4, y: -8.9),
                (x: 115.7, y: -8.9),
                (x: 115.7, y: -8.0),
                (x: 114.4, y: -8.9),
            ]]),
        }
    }

    #[test]
    fn mount_sets_up_the_base_map() {
        let mut view = ChoroplethView::new(table());
        let mut surface = RecordingSurface::new();
        view.mount(&mut surface, &MapConfig::default());

        let commands = surface.commands();
        assert_eq!(commands.len(), 5);
        assert!(matches!(commands[0], SurfaceCommand::SetView { zoom: 5, .. }));
        assert!(matches!(&commands[3], SurfaceCommand::AddTileLayer { layer } if layer.url.contains("openstreetmap")));
        assert!(matches!(&commands[4], SurfaceCommand::AddLegend { legend } if legend.entries.len() == 4));
    }

    #[test]
    fn failed_boundary_load_renders_no_regions() {
        let mut view = ChoroplethView::new(table());
        let mut surface = RecordingSurface::new();

        let ids = view.show_boundaries(&mut surface, Err(anyhow!("connection refused")));
        assert!(ids.is_empty());
        assert!(surface.commands().is_empty());
        assert_eq!(view.controller().region_count(), 0);
    }

    #[test]
    fn regions_are_styled_and_wired() {
        let mut view = ChoroplethView::new(table());
        let mut surface = RecordingSurface::new();
        let unnamed = BoundaryFeature { name: None, ..bali() };

        let ids = view.show_boundaries(&mut surface, Ok(vec![bali(), unnamed]));
        assert_eq!(ids, vec![RegionId(0), RegionId(1)]);

        let fills: Vec<_> = surface
            .commands()
            .iter()
            .filter_map(|cmd| match cmd {
                SurfaceCommand::AddRegion { style, .. } => Some(style.fill_color),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec!["yellow", "#ccc"]);
        assert_eq!(view.features().len(), 2);

        let attached = surface
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, SurfaceCommand::AttachPointerHandlers { .. }))
            .count();
        assert_eq!(attached, 2);
    }

    #[test]
    fn events_flow_through_to_the_controller() {
        let mut view = ChoroplethView::new(table());
        let mut surface = RecordingSurface::new();
        let ids = view.show_boundaries(&mut surface, Ok(vec![bali()]));

        view.handle(&mut surface, ids[0], RegionEvent::PointerEnter(ScreenPoint::new(1.0, 1.0)));
        assert_eq!(view.controller().state(ids[0]), Some(RegionState::Hovered));
        assert!(view.controller().panel().unwrap().html.contains("1,500 Milyar"));

        view.handle(&mut surface, ids[0], RegionEvent::Click);
        view.handle(&mut surface, ids[0], RegionEvent::PointerLeave);
        assert_eq!(view.controller().state(ids[0]), Some(RegionState::Idle));

        let fits = surface
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, SurfaceCommand::FitBounds { .. }))
            .count();
        assert_eq!(fits, 1);
    }
}
