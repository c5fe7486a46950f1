use geo::{MultiPolygon, Rect};
use serde::{Deserialize, Serialize};

pub const LABEL_HIGH: &str = "Capaian Tinggi";
pub const LABEL_MEDIUM: &str = "Capaian Menengah";
pub const LABEL_LOW: &str = "Capaian Rendah";

/// One row of the province statistics dataset.
///
/// Column names follow the published dataset (`provinsi`, `klaster`, ...).
/// Every figure is optional: the CSV export leaves cells blank where the
/// ministry has not published a value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProvinceRecord {
    #[serde(rename = "provinsi")]
    pub name: String,
    #[serde(rename = "kategori", default, deserialize_with = "blank_as_none")]
    pub category_label: Option<String>,
    #[serde(rename = "klaster", default)]
    pub cluster: Option<u8>,
    #[serde(rename = "belanja_modal", default)]
    pub capital_spending: Option<f64>,
    #[serde(rename = "belanja_subsidi", default)]
    pub subsidy_spending: Option<f64>,
    #[serde(rename = "belanja_bantuan_sosial", default)]
    pub social_assistance_spending: Option<f64>,
    #[serde(rename = "persentase_kemiskinan", default)]
    pub poverty_rate: Option<f64>,
    #[serde(rename = "ipm", default)]
    pub hdi: Option<f64>,
}

impl ProvinceRecord {
    /// Category label wins over the numeric cluster when both are present.
    pub fn category(&self) -> Category {
        match (&self.category_label, self.cluster) {
            (Some(label), _) => Category::from_label(label),
            (None, Some(cluster)) => Category::from_cluster(cluster),
            (None, None) => Category::Unknown(None),
        }
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Achievement category driving the fill color and the legend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    High,
    Medium,
    Low,
    /// Any label outside the closed set, or no label at all.
    Unknown(Option<String>),
}

impl Category {
    pub fn from_label(label: &str) -> Self {
        match label {
            LABEL_HIGH => Category::High,
            LABEL_MEDIUM => Category::Medium,
            LABEL_LOW => Category::Low,
            other => Category::Unknown(Some(other.to_string())),
        }
    }

    pub fn from_cluster(cluster: u8) -> Self {
        match cluster {
            3 => Category::High,
            2 => Category::Medium,
            1 => Category::Low,
            _ => Category::Unknown(None),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Category::High => Some(LABEL_HIGH),
            Category::Medium => Some(LABEL_MEDIUM),
            Category::Low => Some(LABEL_LOW),
            Category::Unknown(label) => label.as_deref(),
        }
    }
}

/// A province outline from the boundary file.
#[derive(Debug, Clone)]
pub struct BoundaryFeature {
    /// Raw `Propinsi`/`provinsi` property. `None` when the feature carries neither.
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub const fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Bounds::new(
            LatLng::new(rect.min().y, rect.min().x),
            LatLng::new(rect.max().y, rect.max().x),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: Option<&str>, cluster: Option<u8>) -> ProvinceRecord {
        ProvinceRecord {
            name: "ACEH".to_string(),
            category_label: label.map(str::to_string),
            cluster,
            capital_spending: None,
            subsidy_spending: None,
            social_assistance_spending: None,
            poverty_rate: None,
            hdi: None,
        }
    }

    #[test]
    fn label_takes_precedence_over_cluster() {
        assert_eq!(record(Some("Capaian Rendah"), Some(3)).category(), Category::Low);
    }

    #[test]
    fn cluster_fills_in_when_label_missing() {
        assert_eq!(record(None, Some(3)).category(), Category::High);
        assert_eq!(record(None, Some(2)).category(), Category::Medium);
        assert_eq!(record(None, Some(1)).category(), Category::Low);
        assert_eq!(record(None, Some(0)).category(), Category::Unknown(None));
        assert_eq!(record(None, None).category(), Category::Unknown(None));
    }

    #[test]
    fn labels_outside_the_closed_set_are_unknown() {
        assert_eq!(
            Category::from_label("capaian tinggi"),
            Category::Unknown(Some("capaian tinggi".to_string()))
        );
        assert_eq!(Category::from_label("Capaian Tinggi"), Category::High);
    }

    #[test]
    fn blank_category_cell_deserializes_as_none() {
        let json = r#"{"provinsi": "BALI", "kategori": "  ", "ipm": 76.4}"#;
        let parsed: ProvinceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.category_label, None);
        assert_eq!(parsed.hdi, Some(76.4));
    }

    #[test]
    fn bounds_from_rect_swaps_to_lat_lng_order() {
        let rect = Rect::new(
            geo::Coord { x: 95.0, y: -11.0 },
            geo::Coord { x: 141.0, y: 6.0 },
        );
        let bounds = Bounds::from(rect);
        assert_eq!(bounds.south_west, LatLng::new(-11.0, 95.0));
        assert_eq!(bounds.north_east, LatLng::new(6.0, 141.0));
    }
}
