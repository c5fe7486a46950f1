use crate::config::AppConfig;
use crate::data::ProvinceTable;
use crate::index::FeatureIndex;
use crate::styling;
use crate::types::{BoundaryFeature, Bounds, ProvinceRecord};
use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fs;

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;

/// Renders the choropleth fill as XYZ PNG tiles under
/// `{tile_dir}/{z}/{x}/{y}.png`, covering the map's max bounds. Tiles with
/// no province pixels are not written. Returns the number of tiles saved.
pub fn generate_tiles(
    config: &AppConfig,
    features: &[BoundaryFeature],
    table: &ProvinceTable,
) -> Result<usize> {
    tracing::info!(
        min_zoom = config.output.min_zoom,
        max_zoom = config.output.max_zoom,
        "generating choropleth tiles"
    );

    let fills: Vec<Rgba<u8>> = features
        .iter()
        .map(|feature| fill_rgba(table.find_feature(feature)))
        .collect();
    let index = FeatureIndex::build(features);

    let counts: Vec<usize> = (config.output.min_zoom..=config.output.max_zoom)
        .into_par_iter()
        .map(|z| render_zoom_level(config, z, features, &fills, &index))
        .collect::<Result<_>>()?;

    let total = counts.iter().sum();
    tracing::info!(tiles = total, "tile generation complete");
    Ok(total)
}

fn fill_rgba(record: Option<&ProvinceRecord>) -> Rgba<u8> {
    let category = record.map(ProvinceRecord::category);
    let (r, g, b) = styling::fill_color(category.as_ref()).rgb;
    let alpha = (styling::base_style(record).fill_opacity * 255.0).round() as u8;
    Rgba([r, g, b, alpha])
}

fn render_zoom_level(
    config: &AppConfig,
    zoom: u8,
    features: &[BoundaryFeature],
    fills: &[Rgba<u8>],
    index: &FeatureIndex,
) -> Result<usize> {
    let (x_range, y_range) = tile_range(&config.map.max_bounds, zoom);

    let mut saved = 0;
    for tx in x_range {
        for ty in y_range.clone() {
            let Some(img) = render_tile(zoom, tx, ty, features, fills, index) else {
                continue;
            };

            let x_dir = config
                .output
                .tile_dir
                .join(zoom.to_string())
                .join(tx.to_string());
            fs::create_dir_all(&x_dir)
                .with_context(|| format!("Failed to create tile directory: {:?}", x_dir))?;
            let path = x_dir.join(format!("{}.png", ty));
            img.save(&path)
                .with_context(|| format!("Failed to save tile {:?}", path))?;
            saved += 1;
        }
    }

    tracing::debug!(zoom, tiles = saved, "zoom level rendered");
    Ok(saved)
}

fn render_tile(
    zoom: u8,
    tx: u32,
    ty: u32,
    features: &[BoundaryFeature],
    fills: &[Rgba<u8>],
    index: &FeatureIndex,
) -> Option<RgbaImage> {
    let (north, west) = tile_pixel_to_lat_lon(tx, ty, 0.0, 0.0, zoom);
    let (south, east) = tile_pixel_to_lat_lon(tx, ty, TILE_SIZE as f64, TILE_SIZE as f64, zoom);
    if !index.intersects([west, south], [east, north]) {
        return None;
    }

    let mut img: RgbaImage = ImageBuffer::new(TILE_SIZE, TILE_SIZE);
    let mut painted = false;
    for py in 0..TILE_SIZE {
        for px in 0..TILE_SIZE {
            let (lat, lon) = tile_pixel_to_lat_lon(tx, ty, px as f64 + 0.5, py as f64 + 0.5, zoom);
            if let Some(hit) = index.locate(features, lon, lat) {
                img.put_pixel(px, py, fills[hit]);
                painted = true;
            }
        }
    }

    painted.then_some(img)
}

/// Tile column and row ranges covering `bounds` at `zoom`.
fn tile_range(bounds: &Bounds, zoom: u8) -> (std::ops::RangeInclusive<u32>, std::ops::RangeInclusive<u32>) {
    let (x_min, y_min) = lat_lon_to_tile(bounds.north_east.lat, bounds.south_west.lng, zoom);
    let (x_max, y_max) = lat_lon_to_tile(bounds.south_west.lat, bounds.north_east.lng, zoom);
    (x_min..=x_max, y_min..=y_max)
}

// Coordinate conversions
fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> (u32, u32) {
    let n = 2.0_f64.powi(zoom as i32);
    let x_t = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y_t = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;

    let max = n as u32 - 1;
    ((x_t.max(0.0) as u32).min(max), (y_t.max(0.0) as u32).min(max))
}

fn tile_pixel_to_lat_lon(tx: u32, ty: u32, px: f64, py: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let x = tx as f64 + px / TILE_SIZE as f64;
    let y = ty as f64 + py / TILE_SIZE as f64;
    let lon = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    (lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LatLng;
    use geo::{polygon, MultiPolygon};

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-6, "expected {expected}, got {actual} (diff: {diff})");
    }

    #[test]
    fn tile_corner_round_trips_through_mercator() {
        let (lat, lon) = tile_pixel_to_lat_lon(0, 0, 0.0, 0.0, 0);
        assert_close(lon, -180.0);
        assert_close(lat, 85.0511287798);

        let (tx, ty) = lat_lon_to_tile(-2.5, 118.0, 5);
        let (north, west) = tile_pixel_to_lat_lon(tx, ty, 0.0, 0.0, 5);
        let (south, east) = tile_pixel_to_lat_lon(tx, ty, 256.0, 256.0, 5);
        assert!(west <= 118.0 && 118.0 <= east);
        assert!(south <= -2.5 && -2.5 <= north);
    }

    #[test]
    fn tile_range_covers_indonesia() {
        let bounds = Bounds::new(LatLng::new(-11.5, 94.0), LatLng::new(6.5, 142.0));
        let (xs, ys) = tile_range(&bounds, 4);
        assert_eq!((*xs.start(), *xs.end()), (12, 14));
        assert_eq!((*ys.start(), *ys.end()), (7, 8));
    }

    #[test]
    fn tiles_are_written_only_where_provinces_are() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::AppConfig::from_toml(
            r#"
            [input]
            boundaries = "unused.geojson"
            statistics = "unused.csv"
            "#,
        )
        .unwrap();
        config.output.tile_dir = dir.path().to_path_buf();
        config.output.min_zoom = 3;
        config.output.max_zoom = 3;

        let features = vec![BoundaryFeature {
            name: Some("Bali".to_string()),
            geometry: MultiPolygon::new(vec![polygon![
                (x: 114.0, y: -9.0),
                (x: 116.0, y: -9.0),
                (x: 116.0, y: -8.0),
                (x: 114.0, y: -8.0),
                (x: 114.0, y: -9.0),
            ]]),
        }];
        let table = ProvinceTable::new(vec![ProvinceRecord {
            name: "BALI".to_string(),
            category_label: Some("Capaian Tinggi".to_string()),
            cluster: None,
            capital_spending: None,
            subsidy_spending: None,
            social_assistance_spending: None,
            poverty_rate: None,
            hdi: None,
        }]);

        let saved = generate_tiles(&config, &features, &table).unwrap();
        assert_eq!(saved, 1);

        let (tx, ty) = lat_lon_to_tile(-8.5, 115.0, 3);
        let path = dir.path().join("3").join(tx.to_string()).join(format!("{ty}.png"));
        let img = image::open(&path).unwrap().to_rgba8();
        assert!(img.pixels().any(|p| *p == Rgba([0, 128, 0, 204])));
    }
}
