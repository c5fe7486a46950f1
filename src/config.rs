use crate::types::{Bounds, LatLng};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const MAP_CENTER: LatLng = LatLng::new(-2.5, 118.0);
pub const MAP_ZOOM: u8 = 5;
pub const MIN_ZOOM: u8 = 4;
pub const MAX_ZOOM: u8 = 10;
// Sabang to Merauke, with a little slack for the outer islands.
pub const MAX_BOUNDS: Bounds = Bounds::new(LatLng::new(-11.5, 94.0), LatLng::new(6.5, 142.0));
pub const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";
pub const BOUNDARY_URL_PATH: &str = "/indonesia-prov.geojson";
pub const SERVER_PORT: u16 = 3000;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// GeoJSON (`.geojson`/`.json`) or shapefile (`.shp`) with one polygon per province.
    pub boundaries: PathBuf,
    /// Province statistics as CSV or a JSON array.
    pub statistics: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub center: LatLng,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub max_bounds: Bounds,
    pub tile_url: String,
    pub tile_attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: MAP_CENTER,
            zoom: MAP_ZOOM,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            max_bounds: MAX_BOUNDS,
            tile_url: TILE_URL.to_string(),
            tile_attribution: TILE_ATTRIBUTION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub tile_dir: PathBuf,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tile_dir: PathBuf::from("output/tiles"),
            min_zoom: MIN_ZOOM,
            max_zoom: 7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: SERVER_PORT,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let map = &self.map;
        if map.min_zoom > map.max_zoom {
            return Err(anyhow!(
                "map.min_zoom ({}) is greater than map.max_zoom ({})",
                map.min_zoom,
                map.max_zoom
            ));
        }
        if !(map.min_zoom..=map.max_zoom).contains(&map.zoom) {
            return Err(anyhow!(
                "map.zoom ({}) is outside {}..={}",
                map.zoom,
                map.min_zoom,
                map.max_zoom
            ));
        }
        if self.output.min_zoom > self.output.max_zoom {
            return Err(anyhow!(
                "output.min_zoom ({}) is greater than output.max_zoom ({})",
                self.output.min_zoom,
                self.output.max_zoom
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_compile_time_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            boundaries = "data/indonesia-prov.geojson"
            statistics = "data/provinsi.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.map.center, MAP_CENTER);
        assert_eq!(config.map.zoom, 5);
        assert_eq!(config.map.max_bounds, MAX_BOUNDS);
        assert_eq!(config.map.tile_url, TILE_URL);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.output.tile_dir, PathBuf::from("output/tiles"));
    }

    #[test]
    fn partial_map_section_keeps_remaining_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            boundaries = "b.geojson"
            statistics = "s.json"

            [map]
            zoom = 6
            center = { lat = -6.2, lng = 106.8 }
            "#,
        )
        .unwrap();

        assert_eq!(config.map.zoom, 6);
        assert_eq!(config.map.center, LatLng::new(-6.2, 106.8));
        assert_eq!(config.map.max_zoom, MAX_ZOOM);
    }

    #[test]
    fn zoom_outside_limits_is_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [input]
            boundaries = "b.geojson"
            statistics = "s.json"

            [map]
            zoom = 12
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("map.zoom"));
    }

    #[test]
    fn missing_input_section_fails_to_parse() {
        assert!(AppConfig::from_toml("[server]\nport = 8080\n").is_err());
    }
}
