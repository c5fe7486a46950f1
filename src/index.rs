use crate::types::BoundaryFeature;
use geo::algorithm::contains::Contains;
use geo::bounding_rect::BoundingRect;
use geo::{Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

// Wrapper for RTree indexing
pub struct FeatureEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn rect_to_aabb(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

/// Point-in-province lookup over boundary features.
pub struct FeatureIndex {
    tree: RTree<FeatureEnvelope>,
}

impl FeatureIndex {
    /// Features without a bounding rect (empty geometry) are left out.
    pub fn build(features: &[BoundaryFeature]) -> Self {
        let items = features
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                feature.geometry.bounding_rect().map(|rect| FeatureEnvelope {
                    index,
                    aabb: rect_to_aabb(rect),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Index of the first feature whose polygons contain `(lon, lat)`.
    pub fn locate(&self, features: &[BoundaryFeature], lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&index| {
                features
                    .get(index)
                    .is_some_and(|feature| feature.geometry.contains(&point))
            })
            .min()
    }

    /// Whether any feature's bounding box touches the given lon/lat rectangle.
    pub fn intersects(&self, min: [f64; 2], max: [f64; 2]) -> bool {
        let envelope = AABB::from_corners(min, max);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .next()
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(name: &str, x: f64, y: f64, size: f64) -> BoundaryFeature {
        BoundaryFeature {
            name: Some(name.to_string()),
            geometry: MultiPolygon::new(vec![polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
                (x: x, y: y),
            ]]),
        }
    }

    #[test]
    fn locate_finds_containing_feature() {
        let features = vec![square("A", 0.0, 0.0, 1.0), square("B", 2.0, 0.0, 1.0)];
        let index = FeatureIndex::build(&features);

        assert_eq!(index.locate(&features, 0.5, 0.5), Some(0));
        assert_eq!(index.locate(&features, 2.5, 0.5), Some(1));
        assert_eq!(index.locate(&features, 1.5, 0.5), None);
    }

    #[test]
    fn bounding_box_hit_outside_polygon_is_a_miss() {
        let triangle = BoundaryFeature {
            name: None,
            geometry: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 0.0, y: 4.0),
                (x: 0.0, y: 0.0),
            ]]),
        };
        let features = vec![triangle];
        let index = FeatureIndex::build(&features);
        assert_eq!(index.locate(&features, 3.5, 3.5), None);
        assert_eq!(index.locate(&features, 0.5, 0.5), Some(0));
    }

    #[test]
    fn overlapping_features_resolve_to_the_earliest() {
        let features = vec![square("A", 0.0, 0.0, 2.0), square("B", 1.0, 1.0, 2.0)];
        let index = FeatureIndex::build(&features);
        assert_eq!(index.locate(&features, 1.5, 1.5), Some(0));
    }

    #[test]
    fn empty_geometry_is_not_indexed() {
        let features = vec![BoundaryFeature {
            name: None,
            geometry: MultiPolygon::new(vec![]),
        }];
        let index = FeatureIndex::build(&features);
        assert!(!index.intersects([-180.0, -90.0], [180.0, 90.0]));
    }
}
