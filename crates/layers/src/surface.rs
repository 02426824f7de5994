use foundation::math::{LatLng, Vec2, zoom_scale};
use runtime::{RedrawCallback, RedrawScheduler};
use tracing::debug;

use crate::map::{HostMap, LatLngBounds, MapEventKind, MapId};
use crate::settings::SurfaceOptions;

/// Host events the drawing surface listens to while attached.
pub const SURFACE_EVENTS: [MapEventKind; 3] = [
    MapEventKind::MoveEnd,
    MapEventKind::Resize,
    MapEventKind::ZoomAnim,
];

/// Viewport events forwarded to an attached surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SurfaceEvent {
    MoveEnd,
    Resize { size: Vec2 },
    ZoomAnim { zoom: f64, center: LatLng },
}

impl SurfaceEvent {
    pub fn kind(&self) -> MapEventKind {
        match self {
            SurfaceEvent::MoveEnd => MapEventKind::MoveEnd,
            SurfaceEvent::Resize { .. } => MapEventKind::Resize,
            SurfaceEvent::ZoomAnim { .. } => MapEventKind::ZoomAnim,
        }
    }
}

/// What a layer needs to paint one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawEvent {
    pub bounds: LatLngBounds,
    /// Zoom-0 pixel position of the view's north-west corner.
    pub offset: Vec2,
    /// `2^zoom`.
    pub scale: f64,
    /// Canvas size in pixels.
    pub size: Vec2,
    /// Pixels per projected meter across the view.
    pub zoom_scale: f64,
    pub zoom: f64,
}

/// CSS-style placement of the canvas while a zoom animation runs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceTransform {
    pub offset: Vec2,
    pub scale: f64,
}

const MERCATOR_HALF_WORLD_M: f64 = 20_037_508.34;

/// The canvas a layer paints into.
///
/// Knows nothing about the owning layer beyond what goes through
/// `DrawEvent`; the owner asks for frames and paints them itself.
#[derive(Debug)]
pub struct DrawingSurface {
    options: SurfaceOptions,
    size: Vec2,
    /// Layer point of the canvas' top-left corner.
    position: Vec2,
    map: Option<MapId>,
    transform: Option<SurfaceTransform>,
    scheduler: RedrawScheduler,
}

impl DrawingSurface {
    pub fn new(options: SurfaceOptions) -> Self {
        Self {
            options,
            size: Vec2::ZERO,
            position: Vec2::ZERO,
            map: None,
            transform: None,
            scheduler: RedrawScheduler::new(),
        }
    }

    pub fn options(&self) -> &SurfaceOptions {
        &self.options
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn map(&self) -> Option<MapId> {
        self.map
    }

    pub fn is_attached(&self) -> bool {
        self.map.is_some()
    }

    pub fn transform(&self) -> Option<SurfaceTransform> {
        self.transform
    }

    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Frames painted since creation.
    pub fn frames(&self) -> u64 {
        self.scheduler.frames()
    }

    pub fn add_to(&mut self, map: &mut dyn HostMap) {
        if !map.has_pane(&self.options.pane) {
            debug!(pane = %self.options.pane, "creating pane");
            map.create_pane(&self.options.pane);
        }
        for kind in SURFACE_EVENTS {
            map.subscribe(kind);
        }
        self.map = Some(map.id());
        self.size = map.size();
        self.reset(&*map);
    }

    /// Unsubscribes and drops any pending frame; returns the callbacks dropped.
    pub fn remove(&mut self, map: &mut dyn HostMap) -> usize {
        for kind in SURFACE_EVENTS {
            map.unsubscribe(kind);
        }
        self.map = None;
        self.transform = None;
        self.scheduler.cancel()
    }

    /// Asks for a paint on the next frame. Requests made before that frame
    /// runs share it; every callback runs once after it is painted.
    pub fn redraw(&mut self, callback: Option<RedrawCallback>) -> bool {
        self.scheduler.request(callback)
    }

    pub fn handle(&mut self, map: &dyn HostMap, event: SurfaceEvent) -> Option<SurfaceTransform> {
        match event {
            SurfaceEvent::MoveEnd => {
                self.reset(map);
                None
            }
            SurfaceEvent::Resize { size } => {
                self.size = size;
                self.redraw(None);
                None
            }
            SurfaceEvent::ZoomAnim { zoom, center } => Some(self.animate_zoom(map, zoom, center)),
        }
    }

    /// Re-anchors the canvas at the view's top-left and schedules a redraw.
    pub fn reset(&mut self, map: &dyn HostMap) {
        self.position = map.lat_lng_to_layer_point(map.bounds().north_west());
        self.transform = None;
        self.redraw(None);
    }

    pub fn animate_zoom(&mut self, map: &dyn HostMap, zoom: f64, center: LatLng) -> SurfaceTransform {
        let transform = SurfaceTransform {
            offset: map.lat_lng_to_new_layer_point(map.bounds().north_west(), zoom, center),
            scale: zoom_scale(zoom - map.zoom()),
        };
        self.transform = Some(transform);
        transform
    }

    pub fn draw_event(&self, map: &dyn HostMap) -> DrawEvent {
        let bounds = map.bounds();
        let span = bounds.east() - bounds.west();
        let zoom = map.zoom();
        DrawEvent {
            bounds,
            offset: map.project(bounds.north_west(), 0.0),
            scale: zoom_scale(zoom),
            size: self.size,
            zoom_scale: map.size().x * 180.0 / (MERCATOR_HALF_WORLD_M * span),
            zoom,
        }
    }

    /// Claims the pending frame: its draw event and the callbacks to run
    /// once it has been painted.
    pub fn take_frame(&mut self, map: &dyn HostMap) -> Option<(DrawEvent, Vec<RedrawCallback>)> {
        let callbacks = self.scheduler.take_frame()?;
        Some((self.draw_event(map), callbacks))
    }
}

#[cfg(test)]
mod tests {
    use super::{DrawingSurface, SURFACE_EVENTS, SurfaceEvent};
    use crate::map::{HostMap, MercatorMap};
    use crate::settings::SurfaceOptions;
    use foundation::math::{LatLng, Vec2};

    fn map() -> MercatorMap {
        MercatorMap::new(1, Vec2::new(512.0, 256.0)).with_view(LatLng::new(0.0, 0.0), 1.0)
    }

    #[test]
    fn attach_subscribes_and_schedules_a_frame() {
        let mut m = map();
        let mut s = DrawingSurface::new(SurfaceOptions::default());
        s.add_to(&mut m);
        assert!(s.is_attached());
        assert!(s.is_pending());
        assert_eq!(s.size(), Vec2::new(512.0, 256.0));
        assert_eq!(s.position(), Vec2::ZERO);
        for kind in SURFACE_EVENTS {
            assert_eq!(m.subscriptions(kind), 1);
        }
        s.remove(&mut m);
        assert!(!s.is_pending());
        for kind in SURFACE_EVENTS {
            assert_eq!(m.subscriptions(kind), 0);
        }
    }

    #[test]
    fn missing_panes_are_created() {
        let mut m = map();
        let mut s = DrawingSurface::new(SurfaceOptions {
            pane: "glify".into(),
            ..SurfaceOptions::default()
        });
        s.add_to(&mut m);
        assert!(m.has_pane("glify"));
    }

    #[test]
    fn redraw_requests_coalesce_into_one_frame() {
        let m = map();
        let mut s = DrawingSurface::new(SurfaceOptions::default());
        assert!(s.redraw(None));
        assert!(!s.redraw(Some(Box::new(|_| {}))));
        let (_, callbacks) = s.take_frame(&m).unwrap();
        assert_eq!(callbacks.len(), 1);
        assert!(s.take_frame(&m).is_none());
    }

    #[test]
    fn draw_event_offset_is_the_zoom_zero_north_west() {
        let mut m = map();
        let mut s = DrawingSurface::new(SurfaceOptions::default());
        s.add_to(&mut m);
        let e = s.draw_event(&m);
        assert_eq!(e.scale, 2.0);
        assert_eq!(e.size, Vec2::new(512.0, 256.0));
        // The view covers the whole 512 px world at zoom 1.
        assert!(e.offset.x.abs() < 1e-9);
        assert!((e.offset.y - 64.0).abs() < 1e-9);
    }

    #[test]
    fn resize_and_zoom_animation() {
        let mut m = map();
        let mut s = DrawingSurface::new(SurfaceOptions::default());
        s.add_to(&mut m);
        s.take_frame(&m);
        s.handle(&m, SurfaceEvent::Resize { size: Vec2::new(100.0, 50.0) });
        assert_eq!(s.size(), Vec2::new(100.0, 50.0));
        assert!(s.is_pending());

        m.set_size(Vec2::new(512.0, 256.0));
        let t = s
            .handle(&m, SurfaceEvent::ZoomAnim { zoom: 2.0, center: LatLng::new(0.0, 0.0) })
            .unwrap();
        assert_eq!(t.scale, 2.0);
        assert_eq!(s.transform(), Some(t));
        s.handle(&m, SurfaceEvent::MoveEnd);
        assert_eq!(s.transform(), None);
    }
}
