//! Attribute packing: resolved colors and sizes joined with flattened
//! positions into fixed-stride vertex records.

use foundation::math::{LatLng, Vec2};
use gpu::{ColorVertex, PointVertex};
use scene::FeatureKey;
use scene::spatial::GridKey;

use crate::flatten::FlatPart;

/// One packed point, kept for picking and the `each_vertex` hook.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEntry {
    /// Index of the owning feature at pack time.
    pub feature: usize,
    pub key: FeatureKey,
    pub lat_lng: LatLng,
    /// Zoom-0 pixel position.
    pub pixel: Vec2,
    pub offset: [f32; 2],
    pub color: [f32; 4],
    pub size: f32,
    pub grid_key: GridKey,
}

impl PointEntry {
    pub fn vertex(&self) -> PointVertex {
        PointVertex {
            position: self.offset,
            color: self.color,
            size: self.size,
        }
    }
}

/// Turns a polyline into independent segments: `[v0, v1, v2]` becomes
/// `[v0, v1, v1, v2]`. Fewer than two vertices make no segment.
pub fn segment_stream<T: Copy>(vertices: &[T]) -> Vec<T> {
    if vertices.len() < 2 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(vertices.len() * 2 - 2);
    for pair in vertices.windows(2) {
        out.push(pair[0]);
        out.push(pair[1]);
    }
    out
}

/// The packed segment stream of one line part.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeatureVertices {
    pub feature: usize,
    pub key: FeatureKey,
    /// Part index within a `MultiLineString`.
    pub part: usize,
    pub color: [f32; 4],
    pub weight: f32,
    pub lat_lngs: Vec<LatLng>,
    pub pixels: Vec<Vec2>,
    /// Ready for a `LINES` draw.
    pub vertices: Vec<ColorVertex>,
}

impl LineFeatureVertices {
    pub fn new(
        feature: usize,
        key: FeatureKey,
        part: usize,
        flat: FlatPart,
        color: [f32; 4],
        weight: f32,
    ) -> Self {
        let packed: Vec<ColorVertex> = flat
            .offsets
            .iter()
            .map(|&offset| ColorVertex::new(offset, color))
            .collect();
        Self {
            feature,
            key,
            part,
            color,
            weight,
            lat_lngs: flat.lat_lngs,
            pixels: flat.pixels,
            vertices: segment_stream(&packed),
        }
    }

    /// Vertices this part contributes to the layer buffer.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// One triangle corner of a shape, as seen by the `each_vertex` hook.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapeVertex {
    pub feature: usize,
    pub key: FeatureKey,
    pub lat_lng: LatLng,
    pub pixel: Vec2,
    pub color: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::{LineFeatureVertices, segment_stream};
    use crate::flatten::FlatPart;
    use foundation::math::{LatLng, Vec2};
    use scene::FeatureKey;

    #[test]
    fn interior_vertices_are_duplicated() {
        assert_eq!(segment_stream(&[0, 1, 2, 3]), vec![0, 1, 1, 2, 2, 3]);
        for n in 0..8usize {
            let ring: Vec<usize> = (0..n).collect();
            let expected = if n < 2 { 0 } else { 2 * n - 2 };
            assert_eq!(segment_stream(&ring).len(), expected, "n = {n}");
        }
    }

    #[test]
    fn line_parts_pack_their_color_into_every_vertex() {
        let flat = FlatPart {
            lat_lngs: vec![LatLng::new(0.0, 0.0); 3],
            pixels: vec![Vec2::ZERO; 3],
            offsets: vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]],
        };
        let part = LineFeatureVertices::new(4, FeatureKey(9), 0, flat, [1.0, 0.0, 0.0, 0.5], 2.0);
        assert_eq!(part.vertex_count(), 4);
        assert_eq!(part.lat_lngs.len(), 3);
        let xs: Vec<f32> = part.vertices.iter().map(|v| v.position[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 1.0, 2.0]);
        assert!(part.vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0, 0.5]));
    }
}
