use std::collections::BTreeMap;

use foundation::bounds::Aabb2;
use foundation::math::{Crs, LatLng, Vec2};

/// Identity of a host map, used to scope layers and per-map setup.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(pub u64);

impl std::fmt::Display for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

/// Host events a layer or the dispatcher can listen to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapEventKind {
    MoveEnd,
    Resize,
    ZoomAnim,
    Click,
    ContextMenu,
    MouseMove,
}

/// A pointer event as the host reports it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerEvent {
    pub lat_lng: LatLng,
    /// Pixel position relative to the map's layer origin.
    pub layer_point: Vec2,
}

impl PointerEvent {
    /// Event at `lat_lng`, with the layer point resolved through `map`.
    pub fn at(map: &dyn HostMap, lat_lng: LatLng) -> Self {
        Self {
            lat_lng,
            layer_point: map.lat_lng_to_layer_point(lat_lng),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Bounds of an `[lng, lat]` box; `None` when the box is empty.
    pub fn from_lng_lat(bounds: &Aabb2) -> Option<Self> {
        if bounds.is_empty() {
            return None;
        }
        Some(Self::new(
            LatLng::new(bounds.min[1], bounds.min[0]),
            LatLng::new(bounds.max[1], bounds.max[0]),
        ))
    }

    pub fn north(&self) -> f64 {
        self.north_east.lat
    }

    pub fn south(&self) -> f64 {
        self.south_west.lat
    }

    pub fn east(&self) -> f64 {
        self.north_east.lng
    }

    pub fn west(&self) -> f64 {
        self.south_west.lng
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.north(), self.west())
    }

    /// Inclusive on every edge.
    pub fn contains(&self, at: LatLng) -> bool {
        at.lat >= self.south()
            && at.lat <= self.north()
            && at.lng >= self.west()
            && at.lng <= self.east()
    }
}

/// The narrow slice of a slippy map the layers consume.
///
/// `project` must not clamp latitude: vertex positions are computed with it
/// and have to stay consistent with the paint transform at any latitude.
pub trait HostMap {
    fn id(&self) -> MapId;

    fn crs(&self) -> Crs {
        Crs::EPSG3857
    }

    fn zoom(&self) -> f64;
    /// `None` until the host has a view.
    fn center(&self) -> Option<LatLng>;
    /// Container size in pixels.
    fn size(&self) -> Vec2;
    fn bounds(&self) -> LatLngBounds;

    fn project(&self, at: LatLng, zoom: f64) -> Vec2 {
        self.crs().project(at, zoom)
    }

    fn lat_lng_to_layer_point(&self, at: LatLng) -> Vec2;

    /// Layer point `at` would have once the view settles at `zoom` around
    /// `center`. Used to place the surface during zoom animations.
    fn lat_lng_to_new_layer_point(&self, at: LatLng, zoom: f64, center: LatLng) -> Vec2 {
        let crs = self.crs();
        let origin = crs.project_clamped(center, zoom) - self.size() / 2.0;
        crs.project_clamped(at, zoom) - origin
    }

    fn has_pane(&self, name: &str) -> bool;
    fn create_pane(&mut self, name: &str);
    fn subscribe(&mut self, kind: MapEventKind);
    fn unsubscribe(&mut self, kind: MapEventKind);
}

const DEFAULT_PANES: [&str; 7] = [
    "mapPane",
    "tilePane",
    "overlayPane",
    "shadowPane",
    "markerPane",
    "tooltipPane",
    "popupPane",
];

/// Headless `HostMap` on spherical mercator, for tests and the CLI.
///
/// Mirrors the host's layer-point convention: the pixel origin is the
/// rounded top-left of the view at the current zoom.
#[derive(Debug, Clone)]
pub struct MercatorMap {
    id: MapId,
    crs: Crs,
    center: Option<LatLng>,
    zoom: f64,
    size: Vec2,
    panes: Vec<String>,
    subscriptions: BTreeMap<MapEventKind, usize>,
}

impl MercatorMap {
    /// A map without a view yet.
    pub fn new(id: u64, size: Vec2) -> Self {
        Self {
            id: MapId(id),
            crs: Crs::EPSG3857,
            center: None,
            zoom: 0.0,
            size,
            panes: DEFAULT_PANES.iter().map(|p| p.to_string()).collect(),
            subscriptions: BTreeMap::new(),
        }
    }

    pub fn with_view(mut self, center: LatLng, zoom: f64) -> Self {
        self.set_view(center, zoom);
        self
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.center = Some(center);
        self.zoom = zoom;
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Active listeners of `kind`.
    pub fn subscriptions(&self, kind: MapEventKind) -> usize {
        self.subscriptions.get(&kind).copied().unwrap_or(0)
    }

    pub fn pixel_origin(&self) -> Vec2 {
        let center = self.center.unwrap_or_default();
        let p = self.crs.project_clamped(center, self.zoom) - self.size / 2.0;
        Vec2::new(p.x.round(), p.y.round())
    }

    pub fn layer_point_to_lat_lng(&self, point: Vec2) -> LatLng {
        self.crs.unproject(point + self.pixel_origin(), self.zoom)
    }
}

impl HostMap for MercatorMap {
    fn id(&self) -> MapId {
        self.id
    }

    fn crs(&self) -> Crs {
        self.crs
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn center(&self) -> Option<LatLng> {
        self.center
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn bounds(&self) -> LatLngBounds {
        let origin = self.pixel_origin();
        let south_west = self
            .crs
            .unproject(origin + Vec2::new(0.0, self.size.y), self.zoom);
        let north_east = self
            .crs
            .unproject(origin + Vec2::new(self.size.x, 0.0), self.zoom);
        LatLngBounds::new(south_west, north_east)
    }

    fn lat_lng_to_layer_point(&self, at: LatLng) -> Vec2 {
        let p = self.crs.project_clamped(at, self.zoom);
        Vec2::new(p.x.round(), p.y.round()) - self.pixel_origin()
    }

    fn has_pane(&self, name: &str) -> bool {
        self.panes.iter().any(|p| p == name)
    }

    fn create_pane(&mut self, name: &str) {
        if !self.has_pane(name) {
            self.panes.push(name.to_string());
        }
    }

    fn subscribe(&mut self, kind: MapEventKind) {
        *self.subscriptions.entry(kind).or_default() += 1;
    }

    fn unsubscribe(&mut self, kind: MapEventKind) {
        if let Some(count) = self.subscriptions.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HostMap, LatLngBounds, MapEventKind, MercatorMap, PointerEvent};
    use foundation::bounds::Aabb2;
    use foundation::math::{Crs, LatLng, Vec2};

    fn map() -> MercatorMap {
        MercatorMap::new(1, Vec2::new(512.0, 256.0)).with_view(LatLng::new(0.0, 0.0), 2.0)
    }

    #[test]
    fn center_lands_in_the_middle_of_the_view() {
        let m = map();
        let p = m.lat_lng_to_layer_point(LatLng::new(0.0, 0.0));
        assert_eq!(p, Vec2::new(256.0, 128.0));
        let back = m.layer_point_to_lat_lng(p);
        assert!(back.lat.abs() < 1e-9 && back.lng.abs() < 1e-9);
    }

    #[test]
    fn bounds_span_the_container() {
        let m = map();
        let b = m.bounds();
        // 512 px at zoom 2 is half the 1024 px world.
        assert!((b.west() + 90.0).abs() < 1e-9);
        assert!((b.east() - 90.0).abs() < 1e-9);
        assert!(b.north() > 0.0 && b.south() < 0.0);
        assert!(b.contains(LatLng::new(0.0, 0.0)));
        assert!(!b.contains(LatLng::new(0.0, 120.0)));
    }

    #[test]
    fn subscriptions_are_counted_per_kind() {
        let mut m = map();
        m.subscribe(MapEventKind::MoveEnd);
        m.subscribe(MapEventKind::MoveEnd);
        m.unsubscribe(MapEventKind::MoveEnd);
        m.unsubscribe(MapEventKind::Click);
        assert_eq!(m.subscriptions(MapEventKind::MoveEnd), 1);
        assert_eq!(m.subscriptions(MapEventKind::Click), 0);
    }

    #[test]
    fn panes_can_be_created_once() {
        let mut m = map();
        assert!(m.has_pane("overlayPane"));
        assert!(!m.has_pane("glify"));
        m.create_pane("glify");
        m.create_pane("glify");
        assert!(m.has_pane("glify"));
    }

    #[test]
    fn lng_lat_boxes_convert_to_bounds() {
        let b = Aabb2::from_points([[-1.0, 2.0], [3.0, -4.0]]);
        let bounds = LatLngBounds::from_lng_lat(&b).unwrap();
        assert_eq!(bounds.north_west(), LatLng::new(2.0, -1.0));
        assert!(LatLngBounds::from_lng_lat(&Aabb2::empty()).is_none());
    }

    #[test]
    fn custom_crs_changes_the_world_size() {
        let m = map().with_crs(Crs {
            tile_size: 512.0,
            ..Crs::EPSG3857
        });
        assert!(!m.crs().is_spherical_mercator());
        assert!((m.project(LatLng::new(0.0, 180.0), 0.0).x - 512.0).abs() < 1e-9);
    }

    #[test]
    fn pointer_events_resolve_layer_points() {
        let m = map();
        let e = PointerEvent::at(&m, LatLng::new(0.0, 0.0));
        assert_eq!(e.layer_point, Vec2::new(256.0, 128.0));
    }
}
