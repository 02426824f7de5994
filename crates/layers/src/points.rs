use foundation::math::LatLng;
use gpu::{DrawMode, GpuContext, PointVertex, VertexBuffer};
use scene::picking::pixel_in_circle;
use scene::spatial::{GridKey, PointGrid};
use scene::{Geometry, Position};
use tracing::warn;

use crate::driver::LayerCore;
use crate::error::LayerError;
use crate::flatten::Flattener;
use crate::layer::{Layer, LayerId, LayerKind};
use crate::map::{HostMap, PointerEvent};
use crate::pack::PointEntry;
use crate::settings::{PointHook, PointsSettings};
use crate::surface::DrawEvent;
use crate::symbology::Attribute;

/// A layer of GL points, one `[x, y, r, g, b, a, size]` record per point.
pub struct Points {
    core: LayerCore,
    size: Attribute<f32>,
    each_vertex: Option<PointHook>,
    buffer: VertexBuffer,
    vertices: Vec<PointVertex>,
    lookup: PointGrid<PointEntry>,
}

impl Points {
    /// Validates `settings`, allocates GPU resources, renders once and
    /// attaches to `map`.
    pub fn new(
        id: LayerId,
        settings: PointsSettings,
        map: &mut dyn HostMap,
        ctx: Box<dyn GpuContext>,
    ) -> Result<Self, LayerError> {
        let (config, data) = settings.validate()?;
        let mut core = LayerCore::new(id, LayerKind::Points, config.layer, data, &*map, ctx)?;
        let buffer = core.create_buffer()?;
        let mut points = Self {
            core,
            size: config.size,
            each_vertex: config.each_vertex,
            buffer,
            vertices: Vec::new(),
            lookup: PointGrid::new(),
        };
        points.render(&*map)?;
        points.core.attach(map);
        Ok(points)
    }

    /// Every packed point, in data order.
    pub fn entries(&self) -> &[PointEntry] {
        self.lookup.entries()
    }

    pub fn vertices(&self) -> &[PointVertex] {
        &self.vertices
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    /// The packed point nearest to `at` on screen. Only the 7x7 grid cells
    /// around `at` are searched unless all of them are empty. Ties go to
    /// the earlier point.
    pub fn lookup(&self, map: &dyn HostMap, at: LatLng) -> Option<&PointEntry> {
        let target = map.lat_lng_to_layer_point(at);
        self.lookup
            .nearest(at, |e| map.lat_lng_to_layer_point(e.lat_lng).distance(target))
            .map(|(_, entry)| entry)
    }

    /// Pick radius around `entry` in pixels. Hover uses its own, usually
    /// looser, tolerance.
    pub fn hit_radius(&self, entry: &PointEntry, hover: bool) -> f64 {
        let size = f64::from(entry.size);
        let config = self.core.config();
        if hover {
            size * config.sensitivity_hover * 30.0
        } else {
            size * config.sensitivity
        }
    }

    pub fn hits(&self, map: &dyn HostMap, entry: &PointEntry, event: &PointerEvent, hover: bool) -> bool {
        pixel_in_circle(
            map.lat_lng_to_layer_point(entry.lat_lng),
            event.layer_point,
            self.hit_radius(entry, hover),
        )
    }

    /// Nearest point to the event if it is within the hit radius.
    pub fn pick(&self, map: &dyn HostMap, event: &PointerEvent, hover: bool) -> Option<&PointEntry> {
        if !self.core.accepts(map) {
            return None;
        }
        let entry = self.lookup(map, event.lat_lng)?;
        self.hits(map, entry, event, hover).then_some(entry)
    }
}

impl Layer for Points {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn render(&mut self, map: &dyn HostMap) -> Result<(), LayerError> {
        let origin = self.core.begin_render(map)?;
        let flat = Flattener::new(map, self.core.config.order, origin);
        let mut lookup = PointGrid::new();
        let mut vertices = Vec::with_capacity(self.core.data.len());

        for (index, feature) in self.core.data.iter().enumerate() {
            let positions: &[Position] = match &feature.geometry {
                Geometry::Point(p) => std::slice::from_ref(p),
                Geometry::MultiPoint(ps) => ps,
                other => {
                    warn!(
                        layer = %self.core.id(),
                        feature = index,
                        geometry = other.type_name(),
                        "skipping non-point geometry"
                    );
                    continue;
                }
            };
            let color = self.core.config.color_of(index, feature);
            let size = self.size.resolve(index, feature);
            for &position in positions {
                let lat_lng = flat.lat_lng(index, position)?;
                let pixel = flat.pixel(lat_lng);
                let entry = PointEntry {
                    feature: index,
                    key: feature.key(),
                    lat_lng,
                    pixel,
                    offset: flat.offset(pixel),
                    color,
                    size,
                    grid_key: GridKey::of(lat_lng),
                };
                if let Some(hook) = &self.each_vertex {
                    hook(&entry);
                }
                vertices.push(entry.vertex());
                lookup.insert(lat_lng, entry);
            }
        }

        self.core.upload(&mut self.buffer, &vertices)?;
        self.core.finish_render(origin, vertices.len());
        self.vertices = vertices;
        self.lookup = lookup;
        Ok(())
    }

    fn draw_on_canvas(&mut self, event: &DrawEvent) -> bool {
        if !self.core.begin_paint(event) {
            return false;
        }
        if let Err(e) = self.core.bind(&self.buffer) {
            warn!(layer = %self.core.id(), error = %e, "cannot bind point buffer");
            return false;
        }
        self.core.draw(DrawMode::Points, 0, self.buffer.len());
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::Points;
    use crate::error::{GeometryError, LayerError};
    use crate::layer::{Layer, LayerId};
    use crate::map::{HostMap, MercatorMap, PointerEvent};
    use crate::settings::PointsSettings;
    use crate::symbology::Color;
    use crate::{LayerState, driver::Interaction};
    use foundation::math::{CoordinateOrder, LatLng, Vec2};
    use gpu::{DrawMode, FailPoint, GpuError, RecordingContext, SharedRenderLog};
    use pretty_assertions::assert_eq;
    use runtime::{Frame, RENDER_PASSES};
    use scene::{DataSource, Feature, Geometry};
    use serde_json::{Value, json};

    fn map() -> MercatorMap {
        MercatorMap::new(1, Vec2::new(512.0, 256.0)).with_view(LatLng::new(0.0, 0.0), 2.0)
    }

    fn settings(positions: Vec<[f64; 2]>) -> PointsSettings {
        PointsSettings::new()
            .data(DataSource::Positions(positions))
            .coordinate_order(CoordinateOrder::LngFirst)
            .size(5.0)
            .sensitivity(1.0)
    }

    fn build(settings: PointsSettings, map: &mut MercatorMap) -> (Points, SharedRenderLog) {
        let (ctx, log) = RecordingContext::new();
        let points = Points::new(LayerId(1), settings, map, Box::new(ctx)).unwrap_or_else(|e| panic!("{e}"));
        (points, log)
    }

    #[test]
    fn packs_seven_floats_per_point() {
        let mut m = map();
        let (points, log) = build(settings(vec![[90.0, 0.0]]).color(Color::rgb(1.0, 0.0, 0.0)), &mut m);
        let log = log.borrow();
        let floats = log.buffer_floats(points.buffer().id()).unwrap();
        assert_eq!(floats, &[64.0, 0.0, 1.0, 0.0, 0.0, 0.8, 5.0][..]);
        assert_eq!(points.core().state(), LayerState::Clean);
        assert!(points.core().is_active());
    }

    #[test]
    fn click_picks_only_within_size_times_sensitivity() {
        let mut m = map();
        let (points, _) = build(settings(vec![[0.0, 0.0], [10.0, 10.0]]), &mut m);

        let near = PointerEvent::at(&m, LatLng::new(0.0001, 0.0001));
        let hit = points.pick(&m, &near, false).unwrap();
        assert_eq!(hit.feature, 0);

        let between = PointerEvent::at(&m, LatLng::new(5.0, 5.0));
        assert!(points.pick(&m, &between, false).is_none());
    }

    #[test]
    fn equal_distances_resolve_to_the_first_point() {
        let mut m = map();
        let (points, _) = build(settings(vec![[1.0, 1.0], [1.0, 1.0]]), &mut m);
        let e = PointerEvent::at(&m, LatLng::new(1.0, 1.0));
        assert_eq!(points.pick(&m, &e, false).unwrap().feature, 0);
    }

    #[test]
    fn lookup_falls_back_to_every_point_outside_the_grid_neighborhood() {
        let mut m = map();
        let (points, _) = build(settings(vec![[40.0, 40.0]]), &mut m);
        let entry = points.lookup(&m, LatLng::new(0.0, 0.0)).unwrap();
        assert_eq!(entry.feature, 0);
        assert_eq!(entry.grid_key.to_string(), "40.00x40.00");
    }

    #[test]
    fn hover_uses_its_own_radius() {
        let mut m = map();
        let (points, _) = build(settings(vec![[0.0, 0.0]]).sensitivity_hover(1.0), &mut m);
        let entry = &points.entries()[0];
        assert_eq!(points.hit_radius(entry, false), 5.0);
        assert_eq!(points.hit_radius(entry, true), 150.0);
        let e = PointerEvent::at(&m, LatLng::new(0.0, 10.0));
        assert!(points.pick(&m, &e, false).is_none());
        assert!(points.pick(&m, &e, true).is_some());
    }

    #[test]
    fn computed_attributes_resolve_per_feature() {
        let mut m = map();
        let s = settings(vec![[0.0, 0.0], [1.0, 1.0]])
            .size_fn(|i, _| 2.0 + i as f32)
            .color_fn(|i, _| Color::rgba(0.0, 0.0, 1.0, 0.1 * (i + 1) as f32));
        let (points, _) = build(s, &mut m);
        let sizes: Vec<f32> = points.vertices().iter().map(|v| v.size).collect();
        assert_eq!(sizes, vec![2.0, 3.0]);
        assert_eq!(points.vertices()[1].color, [0.0, 0.0, 1.0, 0.2]);
    }

    #[test]
    fn each_vertex_sees_every_point() {
        let mut m = map();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let s = settings(vec![[0.0, 0.0], [1.0, 2.0]]).each_vertex(move |e| sink.borrow_mut().push(e.lat_lng));
        build(s, &mut m);
        assert_eq!(*seen.borrow(), vec![LatLng::new(0.0, 0.0), LatLng::new(2.0, 1.0)]);
    }

    #[test]
    fn lat_first_data_is_read_as_lat_lng() {
        let mut m = map();
        let s = settings(vec![[10.0, 20.0]]).coordinate_order(CoordinateOrder::LatFirst);
        let (points, _) = build(s, &mut m);
        assert_eq!(points.entries()[0].lat_lng, LatLng::new(10.0, 20.0));
    }

    #[test]
    fn paint_frames_do_not_touch_buffers() {
        let mut m = map();
        let (mut points, log) = build(settings(vec![[0.0, 0.0], [10.0, 10.0]]), &mut m);
        let uploads = log.borrow().upload_count();
        let before = log.borrow().buffer_floats(points.buffer().id()).map(|f| f.to_vec());

        assert!(points.frame(&m, Frame::at_rate(0, 1.0 / 60.0)));
        let first = log.borrow().last_matrix();
        points.core_mut().surface.redraw(None);
        assert!(points.frame(&m, Frame::at_rate(1, 1.0 / 60.0)));
        let second = log.borrow().last_matrix();

        assert_eq!(log.borrow().upload_count(), uploads);
        assert_eq!(log.borrow().buffer_floats(points.buffer().id()).map(|f| f.to_vec()), before);
        assert_eq!(first, second);
        assert_eq!(log.borrow().draw_calls().last(), Some(&(DrawMode::Points, 0, 2)));
    }

    #[test]
    fn paint_transform_maps_the_center_to_clip_origin() {
        let mut m = map();
        let (mut points, log) = build(settings(vec![[0.0, 0.0]]), &mut m);
        points.frame(&m, Frame::at_rate(0, 1.0 / 60.0));
        let matrix = log.borrow().last_matrix().unwrap();
        assert!((matrix[0] - 1.0 / 64.0).abs() < 1e-7);
        assert!((matrix[5] + 1.0 / 32.0).abs() < 1e-7);
        assert!(matrix[12].abs() < 1e-5 && matrix[13].abs() < 1e-5);
    }

    #[test]
    fn frames_only_paint_when_requested() {
        let mut m = map();
        let (mut points, _) = build(settings(vec![[0.0, 0.0]]), &mut m);
        assert!(points.frame(&m, Frame::at_rate(0, 1.0 / 60.0)));
        assert!(!points.frame(&m, Frame::at_rate(1, 1.0 / 60.0)));
    }

    #[test]
    fn insert_then_remove_restores_data_in_two_passes() {
        let mut m = map();
        let (mut points, _) = build(settings(vec![[0.0, 0.0], [1.0, 1.0]]), &mut m);
        let original: Vec<Geometry> = points.core().data().iter().map(|f| f.geometry.clone()).collect();
        let passes = points.core().metrics().counter(RENDER_PASSES);

        points
            .insert(&m, vec![Feature::new(Geometry::Point([5.0, 5.0]))], 1)
            .unwrap();
        assert_eq!(points.core().data().len(), 3);
        points.remove_features(&m, &[1]).unwrap();

        let restored: Vec<Geometry> = points.core().data().iter().map(|f| f.geometry.clone()).collect();
        assert_eq!(restored, original);
        assert_eq!(points.core().metrics().counter(RENDER_PASSES) - passes, 2);
        assert_eq!(points.vertices().len(), 2);
    }

    #[test]
    fn a_rejected_insert_leaves_the_layer_as_it_was() {
        let mut m = map();
        let s = settings(vec![[0.0, 0.0], [10.0, 10.0]]).on_click(|_, f| match f.geometry {
            Geometry::Point(p) => Some(json!(p)),
            _ => None,
        });
        let (mut points, _) = build(s, &mut m);
        let passes = points.core().metrics().counter(RENDER_PASSES);

        let err = points
            .insert(&m, vec![Feature::new(Geometry::Point([f64::NAN, 50.0]))], 0)
            .unwrap_err();
        assert!(matches!(err, LayerError::Geometry(GeometryError::InvalidPosition { feature: 0, .. })));
        assert_eq!(points.core().data().len(), 2);
        assert_eq!(points.core().state(), LayerState::Clean);
        assert_eq!(points.core().metrics().counter(RENDER_PASSES), passes);

        let e = PointerEvent::at(&m, LatLng::new(0.0, 0.0));
        let hit = points.pick(&m, &e, false).unwrap().feature;
        assert_eq!(points.core().fire(Interaction::Click, &e, hit), Some(json!([0.0, 0.0])));

        points.core_mut().surface.redraw(None);
        assert!(points.frame(&m, Frame::at_rate(1, 1.0 / 60.0)));
    }

    #[test]
    fn update_past_the_end_is_rejected() {
        let mut m = map();
        let (mut points, _) = build(settings(vec![[0.0, 0.0]]), &mut m);
        let err = points
            .update(&m, vec![Feature::new(Geometry::Point([1.0, 1.0]))], 5)
            .unwrap_err();
        assert!(matches!(err, LayerError::Data(_)));
        points
            .update(&m, vec![Feature::new(Geometry::Point([1.0, 1.0]))], 0)
            .unwrap();
        assert_eq!(points.entries()[0].lat_lng, LatLng::new(1.0, 1.0));
    }

    #[test]
    fn callbacks_receive_the_picked_feature() {
        let mut m = map();
        let s = settings(vec![[0.0, 0.0]]).on_click(|_, f| Some(json!(f.geometry.type_name())));
        let (points, _) = build(s, &mut m);
        let e = PointerEvent::at(&m, LatLng::new(0.0, 0.0));
        let hit = points.pick(&m, &e, false).unwrap().feature;
        assert_eq!(
            points.core().fire(Interaction::Click, &e, hit),
            Some(Value::String("Point".into()))
        );
        assert_eq!(points.core().fire(Interaction::Hover, &e, hit), None);
    }

    #[test]
    fn removal_detaches_and_stops_frames() {
        let mut m = map();
        let (mut points, _) = build(settings(vec![[0.0, 0.0]]), &mut m);
        assert!(points.core().surface().is_pending());
        points.remove(&mut m).unwrap();
        assert_eq!(points.core().state(), LayerState::Removed);
        assert!(!points.core().is_active());
        assert!(!points.frame(&m, Frame::at_rate(0, 1.0 / 60.0)));
        assert!(matches!(points.render(&m), Err(LayerError::Removed(LayerId(1)))));
        assert!(points.remove(&mut m).is_err());
    }

    #[test]
    fn other_maps_are_rejected() {
        let mut m = map();
        let (mut points, _) = build(settings(vec![[0.0, 0.0]]), &mut m);
        let other = MercatorMap::new(2, Vec2::new(10.0, 10.0));
        assert!(matches!(points.render(&other), Err(LayerError::MapMismatch { .. })));
        let e = PointerEvent::at(&other, LatLng::new(0.0, 0.0));
        assert!(points.pick(&other, &e, false).is_none());
        assert_eq!(m.id(), points.core().map_id());
    }

    #[test]
    fn gpu_failures_surface_at_construction() {
        let mut m = map();
        let (ctx, _) = RecordingContext::failing(FailPoint::Buffer);
        let err = Points::new(LayerId(1), settings(vec![[0.0, 0.0]]), &mut m, Box::new(ctx))
            .err()
            .unwrap();
        assert_eq!(err, LayerError::Gpu(GpuError::CreateBuffer));
        assert_eq!(err.to_string(), "Not able to create buffer");
    }

    #[test]
    fn invalid_positions_abort_construction() {
        let mut m = map();
        let (ctx, _) = RecordingContext::new();
        let err = Points::new(LayerId(1), settings(vec![[f64::NAN, 0.0]]), &mut m, Box::new(ctx))
            .err()
            .unwrap();
        assert!(matches!(err, LayerError::Geometry(GeometryError::InvalidPosition { feature: 0, .. })));
    }
}
