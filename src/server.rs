use crate::config::{AppConfig, BOUNDARY_URL_PATH};
use crate::data::ProvinceTable;
use crate::index::FeatureIndex;
use crate::interaction::{panel_html, panel_position, PanelSide, ScreenPoint};
use crate::styling::{self, Legend, RegionStyle};
use crate::surface::{RecordingSurface, SurfaceCommand};
use crate::types::{BoundaryFeature, Bounds, ProvinceRecord};
use crate::view::ChoroplethView;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use geo::bounding_rect::BoundingRect;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

pub struct AppState {
    pub config: AppConfig,
    pub table: ProvinceTable,
    pub features: Vec<BoundaryFeature>,
    pub index: FeatureIndex,
    /// Commands from mounting the view once at startup.
    pub scene: Vec<SurfaceCommand>,
}

impl AppState {
    /// A failed boundary load leaves the state with no regions; the server
    /// still starts.
    pub fn build(
        config: AppConfig,
        table: ProvinceTable,
        boundaries: Result<Vec<BoundaryFeature>>,
    ) -> Self {
        let mut view = ChoroplethView::new(table.clone());
        let mut surface = RecordingSurface::new();
        view.mount(&mut surface, &config.map);
        view.show_boundaries(&mut surface, boundaries);

        let features = view.features().to_vec();
        tracing::info!(regions = features.len(), "building spatial index");
        let index = FeatureIndex::build(&features);

        Self {
            config,
            table,
            features,
            index,
            scene: surface.into_commands(),
        }
    }
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub region: usize,
    pub name: Option<String>,
    pub matched: bool,
    pub html: String,
    pub bounds: Option<Bounds>,
    pub style: RegionStyle,
    pub highlight: RegionStyle,
    /// Which side of the pointer the panel opens on.
    pub side: PanelSide,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let tile_service = ServeDir::new(&state.config.output.tile_dir);
    let static_service = ServeDir::new(&state.config.server.static_dir);
    let boundary_file = ServeFile::new(&state.config.input.boundaries);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/query", get(query_handler))
        .route("/api/provinces", get(provinces_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/scene", get(scene_handler))
        .route_service(BOUNDARY_URL_PATH, boundary_file)
        .nest_service("/tiles", tile_service)
        .fallback_service(static_service)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: AppState) -> Result<()> {
    let port = state.config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let app = build_router(Arc::new(state));

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let Some(region) = state.index.locate(&state.features, params.lon, params.lat) else {
        return Json(None);
    };

    let feature = &state.features[region];
    let record = state.table.find_feature(feature);
    let style = styling::base_style(record);
    Json(Some(QueryResponse {
        region,
        name: feature.name.clone(),
        matched: record.is_some(),
        html: panel_html(feature.name.as_deref(), record).into_string(),
        bounds: feature.geometry.bounding_rect().map(Bounds::from),
        highlight: styling::highlight_style(&style),
        style,
        side: panel_side(feature),
    }))
}

fn panel_side(feature: &BoundaryFeature) -> PanelSide {
    panel_position(feature.name.as_deref(), ScreenPoint::new(0.0, 0.0)).side
}

async fn provinces_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    let features = state
        .features
        .iter()
        .enumerate()
        .map(|(region, feature)| {
            let record = state.table.find_feature(feature);
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&feature.geometry))),
                id: Some(geojson::feature::Id::Number(region.into())),
                properties: Some(feature_properties(feature, record)),
                foreign_members: None,
            }
        })
        .collect();

    Json(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn feature_properties(feature: &BoundaryFeature, record: Option<&ProvinceRecord>) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), serde_json::json!(feature.name));
    properties.insert("matched".to_string(), serde_json::json!(record.is_some()));
    let style: RegionStyle = styling::base_style(record);
    properties.insert(
        "highlight".to_string(),
        property_value("highlight", &styling::highlight_style(&style)),
    );
    properties.insert("style".to_string(), property_value("style", &style));
    properties.insert("panelSide".to_string(), property_value("panelSide", &panel_side(feature)));
    if let Some(record) = record {
        properties.insert("category".to_string(), serde_json::json!(record.category().label()));
        properties.insert("statistics".to_string(), property_value("statistics", record));
    }
    properties
}

/// A property that fails to serialize is logged and sent as `null`.
fn property_value<T: Serialize + ?Sized>(field: &str, value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(field, error = %e, "failed to serialize province property");
        serde_json::Value::Null
    })
}

async fn legend_handler() -> Json<Legend> {
    Json(styling::legend())
}

async fn scene_handler(State(state): State<Arc<AppState>>) -> Json<Vec<SurfaceCommand>> {
    Json(state.scene.clone())
}
