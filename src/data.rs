use crate::types::{BoundaryFeature, ProvinceRecord};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use serde_json::Value as JsonValue;
use shapefile::Reader;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Property names carrying the province name, in lookup order.
pub const NAME_PROPERTIES: [&str; 2] = ["Propinsi", "provinsi"];

/// Join key: trimmed and upper-cased. Inner whitespace is kept as is.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

/// The statistics dataset, kept in load order.
#[derive(Debug, Clone, Default)]
pub struct ProvinceTable {
    records: Vec<ProvinceRecord>,
}

impl ProvinceTable {
    pub fn new(records: Vec<ProvinceRecord>) -> Self {
        let table = Self { records };
        for name in table.duplicate_names() {
            tracing::warn!(province = %name, "duplicate province name in statistics; first row wins");
        }
        table
    }

    pub fn records(&self) -> &[ProvinceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Linear scan for the first record whose normalized name equals the
    /// normalized `name`.
    pub fn find(&self, name: &str) -> Option<&ProvinceRecord> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        self.records.iter().find(|r| normalize_name(&r.name) == key)
    }

    /// Same as [`find`](Self::find) but for a feature whose name may be absent.
    pub fn find_feature(&self, feature: &BoundaryFeature) -> Option<&ProvinceRecord> {
        feature.name.as_deref().and_then(|name| self.find(name))
    }

    pub fn duplicate_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();
        for record in &self.records {
            let key = normalize_name(&record.name);
            if !seen.insert(key.clone()) && reported.insert(key) {
                duplicates.push(record.name.clone());
            }
        }
        duplicates
    }
}

pub fn load_statistics(path: &Path) -> Result<ProvinceTable> {
    let extension = file_extension(path)?;
    let records = match extension.as_str() {
        "csv" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open statistics CSV: {:?}", path))?;
            parse_statistics_csv(file)?
        }
        "json" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open statistics JSON: {:?}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse statistics JSON: {:?}", path))?
        }
        _ => return Err(anyhow!("Unsupported statistics format: {}", extension)),
    };

    tracing::info!(count = records.len(), "loaded province statistics");
    Ok(ProvinceTable::new(records))
}

fn parse_statistics_csv<R: Read>(reader: R) -> Result<Vec<ProvinceRecord>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for (row, result) in rdr.deserialize::<ProvinceRecord>().enumerate() {
        let record = result.with_context(|| format!("Invalid statistics row {}", row + 1))?;
        if record.name.trim().is_empty() {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

pub fn load_boundaries(path: &Path) -> Result<Vec<BoundaryFeature>> {
    let extension = file_extension(path)?;
    let features = match extension.as_str() {
        "shp" => load_shapefile(path)?,
        "json" | "geojson" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
            let geojson = GeoJson::from_reader(BufReader::new(file))
                .context("Failed to parse GeoJSON")?;
            boundaries_from_geojson(geojson)?
        }
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    tracing::info!(count = features.len(), "loaded province boundaries");
    Ok(features)
}

fn file_extension(path: &Path) -> Result<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input file has no extension: {:?}", path))
}

pub fn boundaries_from_geojson(geojson: GeoJson) -> Result<Vec<BoundaryFeature>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let name = feature.properties.as_ref().and_then(name_from_properties);

        let geometry = match feature.geometry {
            Some(geom) => {
                let geometry: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        tracing::debug!(?name, "skipping non-polygon feature");
                        continue;
                    }
                }
            }
            None => {
                tracing::debug!(?name, "skipping feature without geometry");
                continue;
            }
        };

        features.push(BoundaryFeature { name, geometry });
    }

    Ok(features)
}

/// `Propinsi` wins when it is a non-empty string; otherwise `provinsi`.
pub fn name_from_properties(properties: &serde_json::Map<String, JsonValue>) -> Option<String> {
    NAME_PROPERTIES.iter().find_map(|key| match properties.get(*key) {
        Some(JsonValue::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}

fn load_shapefile(path: &Path) -> Result<Vec<BoundaryFeature>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let name = NAME_PROPERTIES.iter().find_map(|key| match record.get(key) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) if !s.trim().is_empty() => {
                Some(s.clone())
            }
            _ => None,
        });

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue,
        };

        features.push(BoundaryFeature { name, geometry });
    }

    Ok(features)
}

/// Outcome of matching every boundary feature against the statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JoinReport {
    pub matched: Vec<String>,
    /// Raw boundary names with no record; unnamed features appear as `""`.
    pub missing_statistics: Vec<String>,
    /// Records no boundary feature resolved to.
    pub missing_boundaries: Vec<String>,
    pub duplicate_records: Vec<String>,
}

pub fn join(features: &[BoundaryFeature], table: &ProvinceTable) -> JoinReport {
    let mut report = JoinReport {
        duplicate_records: table.duplicate_names(),
        ..Default::default()
    };
    let mut used = HashSet::new();

    for feature in features {
        let raw = feature.name.clone().unwrap_or_default();
        match table.find_feature(feature) {
            Some(record) => {
                used.insert(normalize_name(&record.name));
                report.matched.push(raw);
            }
            None => report.missing_statistics.push(raw),
        }
    }

    let mut listed = HashSet::new();
    for record in table.records() {
        let key = normalize_name(&record.name);
        if !used.contains(&key) && listed.insert(key) {
            report.missing_boundaries.push(record.name.clone());
        }
    }

    report
}
