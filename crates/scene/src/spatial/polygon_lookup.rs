use foundation::bounds::Aabb2;
use foundation::math::CoordinateOrder;

use crate::feature::{Feature, Position};
use crate::spatial::bvh::{Bvh, Item};

/// Point-in-polygon search over the polygon parts of a feature list.
///
/// Rings are stored as `[lng, lat]`. Every part of a `MultiPolygon` is indexed
/// separately but reports the owning feature's index.
///
/// Ordering contract:
/// - `search` returns the lowest feature index whose polygon contains the point.
#[derive(Debug, Clone, Default)]
pub struct PolygonLookup {
    polygons: Vec<IndexedPolygon>,
    bvh: Bvh,
}

#[derive(Debug, Clone)]
struct IndexedPolygon {
    feature: usize,
    rings: Vec<Vec<[f64; 2]>>,
}

impl PolygonLookup {
    pub fn build(features: &[Feature], order: CoordinateOrder) -> Self {
        let mut polygons = Vec::new();
        let mut items = Vec::new();
        for (feature, f) in features.iter().enumerate() {
            for part in f.geometry.polygon_parts() {
                let rings: Vec<Vec<[f64; 2]>> = part
                    .iter()
                    .filter(|ring| !ring.is_empty())
                    .map(|ring| ring.iter().map(|p| lng_lat(order, *p)).collect())
                    .collect();
                let Some(outer) = rings.first() else {
                    continue;
                };
                let bounds = Aabb2::from_points(outer.iter().copied());
                items.push(Item {
                    id: polygons.len(),
                    bounds,
                });
                polygons.push(IndexedPolygon { feature, rings });
            }
        }
        Self {
            polygons,
            bvh: Bvh::build(items),
        }
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn search(&self, lng: f64, lat: f64) -> Option<usize> {
        self.search_all(lng, lat).into_iter().next()
    }

    /// Every feature index containing the point, ascending and deduplicated.
    pub fn search_all(&self, lng: f64, lat: f64) -> Vec<usize> {
        let p = [lng, lat];
        let mut out: Vec<usize> = self
            .bvh
            .query_point(p)
            .into_iter()
            .filter_map(|id| self.polygons.get(id))
            .filter(|poly| point_in_polygon(p, &poly.rings))
            .map(|poly| poly.feature)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

fn lng_lat(order: CoordinateOrder, p: Position) -> [f64; 2] {
    let ll = order.lat_lng(p);
    [ll.lng, ll.lat]
}

/// Even-odd ray cast against one ring. The ring may or may not repeat its
/// first vertex at the end.
pub fn point_in_ring(p: [f64; 2], ring: &[[f64; 2]]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let pi = ring[i];
        let pj = ring[j];
        if ((pi[1] > p[1]) != (pj[1] > p[1]))
            && (p[0] < (pj[0] - pi[0]) * (p[1] - pi[1]) / (pj[1] - pi[1]) + pi[0])
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Inside the outer ring and outside every hole.
pub fn point_in_polygon(p: [f64; 2], rings: &[Vec<[f64; 2]>]) -> bool {
    let Some((outer, holes)) = rings.split_first() else {
        return false;
    };
    point_in_ring(p, outer) && !holes.iter().any(|h| point_in_ring(p, h))
}
