//! Geometry flattening: raw positions to projected, origin-relative pixels.

use foundation::math::{CoordinateOrder, LatLng, OriginRelative, Vec2};
use scene::Position;
use tracing::warn;

use crate::error::GeometryError;
use crate::map::HostMap;

/// Zoom-0 projection of the map center; the zero point when the map has no
/// view yet or the projection is not finite.
pub fn reference_origin(map: &dyn HostMap) -> Vec2 {
    let Some(center) = map.center() else {
        warn!(map = %map.id(), "map has no center yet, using zero origin");
        return Vec2::ZERO;
    };
    let origin = map.project(center, 0.0);
    if origin.is_finite() {
        origin
    } else {
        warn!(map = %map.id(), ?center, "center did not project, using zero origin");
        Vec2::ZERO
    }
}

/// One flattened part. The three vectors run in parallel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatPart {
    pub lat_lngs: Vec<LatLng>,
    /// Zoom-0 pixel positions.
    pub pixels: Vec<Vec2>,
    /// `pixels` relative to the origin, as uploaded.
    pub offsets: Vec<[f32; 2]>,
}

impl FlatPart {
    pub fn len(&self) -> usize {
        self.lat_lngs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat_lngs.is_empty()
    }
}

/// Projects raw positions for one render pass.
pub struct Flattener<'a> {
    map: &'a dyn HostMap,
    order: CoordinateOrder,
    origin: OriginRelative,
}

impl<'a> Flattener<'a> {
    pub fn new(map: &'a dyn HostMap, order: CoordinateOrder, origin: Vec2) -> Self {
        Self {
            map,
            order,
            origin: OriginRelative::new(origin),
        }
    }

    pub fn origin(&self) -> Vec2 {
        self.origin.origin
    }

    pub fn order(&self) -> CoordinateOrder {
        self.order
    }

    /// Reads `position` in the configured order; rejects non-finite input.
    pub fn lat_lng(&self, feature: usize, position: Position) -> Result<LatLng, GeometryError> {
        let lat_lng = self.order.lat_lng(position);
        if lat_lng.is_finite() {
            Ok(lat_lng)
        } else {
            Err(GeometryError::InvalidPosition { feature, position })
        }
    }

    pub fn pixel(&self, at: LatLng) -> Vec2 {
        self.map.project(at, 0.0)
    }

    pub fn offset(&self, pixel: Vec2) -> [f32; 2] {
        self.origin.to_f32(pixel)
    }

    /// Flattens one part. Each position is read and projected exactly once.
    pub fn flatten(&self, feature: usize, positions: &[Position]) -> Result<FlatPart, GeometryError> {
        let mut part = FlatPart {
            lat_lngs: Vec::with_capacity(positions.len()),
            pixels: Vec::with_capacity(positions.len()),
            offsets: Vec::with_capacity(positions.len()),
        };
        for &position in positions {
            let lat_lng = self.lat_lng(feature, position)?;
            let pixel = self.pixel(lat_lng);
            part.lat_lngs.push(lat_lng);
            part.pixels.push(pixel);
            part.offsets.push(self.offset(pixel));
        }
        Ok(part)
    }
}
