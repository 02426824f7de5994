//! Spherical mercator projection.
//!
//! Overlay geometry must keep its shape when it extends past the poles, so
//! `Crs::project` does not clamp latitude. `project_clamped` matches the
//! usual web map behavior and is only used where a finite result is required.

use super::{LatLng, Vec2};

pub const EARTH_RADIUS_M: f64 = 6_378_137.0;
pub const TILE_SIZE_PX: f64 = 256.0;
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_8;

/// Projection constants of a coordinate reference system.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Crs {
    /// Sphere radius in meters.
    pub radius: f64,
    /// Pixel size of the world at zoom 0.
    pub tile_size: f64,
}

impl Default for Crs {
    fn default() -> Self {
        Self::EPSG3857
    }
}

impl Crs {
    pub const EPSG3857: Crs = Crs {
        radius: EARTH_RADIUS_M,
        tile_size: TILE_SIZE_PX,
    };

    pub fn is_spherical_mercator(&self) -> bool {
        self.radius == EARTH_RADIUS_M && self.tile_size == TILE_SIZE_PX
    }

    /// World size in pixels at `zoom`.
    pub fn scale(&self, zoom: f64) -> f64 {
        self.tile_size * zoom_scale(zoom)
    }

    /// Projects to mercator meters without clamping latitude.
    pub fn project_meters(&self, ll: LatLng) -> Vec2 {
        let d = std::f64::consts::PI / 180.0;
        let sin = (ll.lat * d).sin();
        Vec2::new(
            self.radius * ll.lng * d,
            self.radius * ((1.0 + sin) / (1.0 - sin)).ln() / 2.0,
        )
    }

    /// Projects to pixels at `zoom` without clamping latitude.
    pub fn project(&self, ll: LatLng, zoom: f64) -> Vec2 {
        let m = self.project_meters(ll);
        let s = self.scale(zoom);
        let k = self.transform_scale();
        Vec2::new(s * (k * m.x + 0.5), s * (-k * m.y + 0.5))
    }

    pub fn project_clamped(&self, ll: LatLng, zoom: f64) -> Vec2 {
        let lat = ll.lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        self.project(LatLng::new(lat, ll.lng), zoom)
    }

    pub fn unproject(&self, p: Vec2, zoom: f64) -> LatLng {
        let s = self.scale(zoom);
        let k = self.transform_scale();
        let mx = (p.x / s - 0.5) / k;
        let my = (p.y / s - 0.5) / -k;
        let d = 180.0 / std::f64::consts::PI;
        LatLng::new(
            (2.0 * (my / self.radius).exp().atan() - std::f64::consts::FRAC_PI_2) * d,
            mx * d / self.radius,
        )
    }

    fn transform_scale(&self) -> f64 {
        0.5 / (std::f64::consts::PI * self.radius)
    }
}

/// `2^zoom`; converts zoom-0 pixel distances to pixels at `zoom`.
#[inline]
pub fn zoom_scale(zoom: f64) -> f64 {
    2f64.powf(zoom)
}

/// Zoom-0 pixel position of a coordinate on a 256 px world.
pub fn lat_lon_to_pixel(lat: f64, lon: f64) -> Vec2 {
    let pi_4 = std::f64::consts::PI * 4.0;
    let sin = (lat * std::f64::consts::PI / 180.0).sin();
    let y = 0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / pi_4;
    let x = (lon + 180.0) / 360.0;
    Vec2::new(x * TILE_SIZE_PX, y * TILE_SIZE_PX)
}

#[cfg(test)]
mod tests {
    use super::{Crs, MAX_MERCATOR_LATITUDE, lat_lon_to_pixel, zoom_scale};
    use crate::math::{LatLng, Vec2};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn origin_projects_to_world_center() {
        let p = Crs::EPSG3857.project(LatLng::new(0.0, 0.0), 0.0);
        assert!(close(p.x, 128.0) && close(p.y, 128.0));
        let p1 = Crs::EPSG3857.project(LatLng::new(0.0, 0.0), 1.0);
        assert!(close(p1.x, 256.0) && close(p1.y, 256.0));
    }

    #[test]
    fn antimeridian_maps_to_world_edges() {
        let west = Crs::EPSG3857.project(LatLng::new(0.0, -180.0), 0.0);
        let east = Crs::EPSG3857.project(LatLng::new(0.0, 180.0), 0.0);
        assert!(close(west.x, 0.0));
        assert!(close(east.x, 256.0));
    }

    #[test]
    fn does_not_clamp_past_mercator_limit() {
        let crs = Crs::EPSG3857;
        let unclamped = crs.project(LatLng::new(89.0, 0.0), 0.0);
        let clamped = crs.project_clamped(LatLng::new(89.0, 0.0), 0.0);
        let limit = crs.project(LatLng::new(MAX_MERCATOR_LATITUDE, 0.0), 0.0);
        assert!(unclamped.y < 0.0);
        assert!(close(clamped.y, limit.y));
        assert!(limit.y.abs() < 1e-6);
    }

    #[test]
    fn unproject_inverts_project() {
        let crs = Crs::EPSG3857;
        let ll = LatLng::new(51.5, -0.12);
        let back = crs.unproject(crs.project(ll, 7.0), 7.0);
        assert!((back.lat - ll.lat).abs() < 1e-9);
        assert!((back.lng - ll.lng).abs() < 1e-9);
    }

    #[test]
    fn helper_matches_zoom_zero_projection() {
        let ll = LatLng::new(40.7, -74.0);
        let a = lat_lon_to_pixel(ll.lat, ll.lng);
        let b = Crs::EPSG3857.project(ll, 0.0);
        assert!((a - b).length() < 1e-9);
        assert_eq!(lat_lon_to_pixel(0.0, 0.0), Vec2::new(128.0, 128.0));
    }

    #[test]
    fn zoom_scale_is_power_of_two() {
        assert_eq!(zoom_scale(0.0), 1.0);
        assert_eq!(zoom_scale(3.0), 8.0);
        assert_eq!(Crs::EPSG3857.scale(2.0), 1024.0);
        assert!(Crs::default().is_spherical_mercator());
    }
}
