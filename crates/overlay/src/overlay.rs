use std::collections::{BTreeMap, BTreeSet};

use foundation::math::CoordinateOrder;
use foundation::time::Time;
use gpu::GpuContext;
use layers::{
    HostMap, Interaction, Layer, LayerError, LayerId, LayerState, Lines, LinesSettings, MapEventKind, MapId,
    PointerEvent, Points, PointsSettings, Shapes, ShapesSettings, SurfaceEvent, SurfaceTransform,
};
use runtime::{DebounceEdge, Debouncer, Frame};
use scene::Feature;
use serde_json::Value;
use tracing::{debug, info};

use crate::dispatch;
use crate::error::OverlayError;
use crate::registry::{InstanceId, Member, Registry};

/// Owns every layer instance and the per-map interaction wiring.
///
/// The host forwards its pointer, viewport and animation-frame events here;
/// nothing is global.
pub struct Overlay {
    order: CoordinateOrder,
    registry: Registry,
    next_layer: u64,
    click_maps: BTreeSet<MapId>,
    context_menu_maps: BTreeSet<MapId>,
    hover_maps: BTreeMap<MapId, Debouncer<PointerEvent>>,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay {
    /// Coordinates default to `[lng, lat]`, the GeoJSON order.
    pub fn new() -> Self {
        Self {
            order: CoordinateOrder::LngFirst,
            registry: Registry::new(),
            next_layer: 1,
            click_maps: BTreeSet::new(),
            context_menu_maps: BTreeSet::new(),
            hover_maps: BTreeMap::new(),
        }
    }

    pub fn longitude_first(&mut self) -> &mut Self {
        self.order = CoordinateOrder::LngFirst;
        self
    }

    pub fn latitude_first(&mut self) -> &mut Self {
        self.order = CoordinateOrder::LatFirst;
        self
    }

    /// Accepts `"lngFirst"` or `"latFirst"`.
    pub fn set_coordinate_order(&mut self, order: &str) -> Result<&mut Self, OverlayError> {
        self.order = order.parse()?;
        Ok(self)
    }

    /// Order applied to layers created from now on.
    pub fn coordinate_order(&self) -> CoordinateOrder {
        self.order
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn get<L: Member>(&self, id: InstanceId) -> Option<&L> {
        self.registry.get(id)
    }

    pub fn get_mut<L: Member>(&mut self, id: InstanceId) -> Option<&mut L> {
        self.registry.get_mut(id)
    }

    pub fn layer(&self, id: InstanceId) -> Result<&dyn Layer, OverlayError> {
        self.registry.layer(id).ok_or(OverlayError::UnknownInstance(id))
    }

    pub fn layer_mut(&mut self, id: InstanceId) -> Result<&mut dyn Layer, OverlayError> {
        self.registry.layer_mut(id).ok_or(OverlayError::UnknownInstance(id))
    }

    pub fn points(
        &mut self,
        mut settings: PointsSettings,
        map: &mut dyn HostMap,
        ctx: Box<dyn GpuContext>,
    ) -> Result<InstanceId, LayerError> {
        settings.common.coordinate_order = settings.common.coordinate_order.or(Some(self.order));
        let layer = Points::new(self.next_id(), settings, map, ctx)?;
        Ok(self.register(layer, map))
    }

    pub fn lines(
        &mut self,
        mut settings: LinesSettings,
        map: &mut dyn HostMap,
        ctx: Box<dyn GpuContext>,
    ) -> Result<InstanceId, LayerError> {
        settings.common.coordinate_order = settings.common.coordinate_order.or(Some(self.order));
        let layer = Lines::new(self.next_id(), settings, map, ctx)?;
        Ok(self.register(layer, map))
    }

    pub fn shapes(
        &mut self,
        mut settings: ShapesSettings,
        map: &mut dyn HostMap,
        ctx: Box<dyn GpuContext>,
    ) -> Result<InstanceId, LayerError> {
        settings.common.coordinate_order = settings.common.coordinate_order.or(Some(self.order));
        let layer = Shapes::new(self.next_id(), settings, map, ctx)?;
        Ok(self.register(layer, map))
    }

    fn next_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        id
    }

    fn register<L: Member>(&mut self, layer: L, map: &mut dyn HostMap) -> InstanceId {
        let config = layer.core().config();
        let callbacks = &config.callbacks;
        let (click, context_menu, hover) = (
            callbacks.click.is_some(),
            callbacks.context_menu.is_some(),
            callbacks.wants_hover(),
        );
        let (wait_ms, edge) = (config.hover_wait_ms, config.hover_edge);

        if click {
            self.setup_click(map);
        }
        if context_menu {
            self.setup_context_menu(map);
        }
        if hover {
            self.setup_hover(map, wait_ms, edge);
        }
        let id = self.registry.insert(layer);
        info!(instance = %id, map = %map.id(), "layer added");
        id
    }

    /// Routes clicks on `map` through the overlay. Only the first call per
    /// map subscribes; returns whether this one did.
    pub fn setup_click(&mut self, map: &mut dyn HostMap) -> bool {
        let added = self.click_maps.insert(map.id());
        if added {
            map.subscribe(MapEventKind::Click);
            debug!(map = %map.id(), "click dispatch installed");
        }
        added
    }

    pub fn setup_context_menu(&mut self, map: &mut dyn HostMap) -> bool {
        let added = self.context_menu_maps.insert(map.id());
        if added {
            map.subscribe(MapEventKind::ContextMenu);
            debug!(map = %map.id(), "context menu dispatch installed");
        }
        added
    }

    /// Installs debounced hover dispatch for `map`. The first layer to ask
    /// decides the wait and edge.
    pub fn setup_hover(&mut self, map: &mut dyn HostMap, wait_ms: f64, edge: DebounceEdge) -> bool {
        if self.hover_maps.contains_key(&map.id()) {
            return false;
        }
        self.hover_maps.insert(map.id(), Debouncer::from_millis(wait_ms, edge));
        map.subscribe(MapEventKind::MouseMove);
        debug!(map = %map.id(), wait_ms, ?edge, "hover dispatch installed");
        true
    }

    pub fn click(&self, map: &dyn HostMap, event: &PointerEvent) -> Option<Value> {
        if !self.click_maps.contains(&map.id()) {
            return None;
        }
        dispatch::pointer(&self.registry, map, event, Interaction::Click)
    }

    pub fn context_menu(&self, map: &dyn HostMap, event: &PointerEvent) -> Option<Value> {
        if !self.context_menu_maps.contains(&map.id()) {
            return None;
        }
        dispatch::pointer(&self.registry, map, event, Interaction::ContextMenu)
    }

    /// Feeds a pointer move observed at `now`. Hover callbacks run when
    /// the debouncer lets an event through, here or in `poll_hover`.
    pub fn mouse_move(&mut self, map: &dyn HostMap, event: PointerEvent, now: Time) -> Vec<Value> {
        let Some(debouncer) = self.hover_maps.get_mut(&map.id()) else {
            return Vec::new();
        };
        match debouncer.call(event, now) {
            Some(event) => self.hover(map, &event),
            None => Vec::new(),
        }
    }

    /// Runs a trailing hover whose quiet period has passed by `now`.
    pub fn poll_hover(&mut self, map: &dyn HostMap, now: Time) -> Vec<Value> {
        let Some(debouncer) = self.hover_maps.get_mut(&map.id()) else {
            return Vec::new();
        };
        match debouncer.poll(now) {
            Some(event) => self.hover(map, &event),
            None => Vec::new(),
        }
    }

    /// Hover dispatch without debouncing.
    pub fn hover(&mut self, map: &dyn HostMap, event: &PointerEvent) -> Vec<Value> {
        dispatch::hover(&mut self.registry, map, event)
    }

    /// Removes features at `indices` from an instance, or the whole
    /// instance when `indices` is `None`.
    pub fn remove(
        &mut self,
        id: InstanceId,
        map: &mut dyn HostMap,
        indices: Option<&[usize]>,
    ) -> Result<Vec<Feature>, OverlayError> {
        let layer = self.layer_mut(id)?;
        match indices {
            Some(indices) => Ok(layer.remove_features(&*map, indices)?),
            None => {
                layer.remove(map)?;
                self.registry.take(id);
                info!(instance = %id, map = %map.id(), "layer removed");
                Ok(Vec::new())
            }
        }
    }

    /// Paints the pending frame of every instance on `map`. Returns how
    /// many painted.
    pub fn tick(&mut self, map: &dyn HostMap, frame: Frame) -> usize {
        let mut painted = 0;
        for (_, layer) in self.registry.layers_on(map) {
            if layer.core().state() != LayerState::Removed && layer.frame(map, frame) {
                painted += 1;
            }
        }
        painted
    }

    /// Forwards a viewport event to every instance on `map`. Zoom animations
    /// report each surface's transform.
    pub fn surface_event(&mut self, map: &dyn HostMap, event: SurfaceEvent) -> Vec<(InstanceId, SurfaceTransform)> {
        self.registry
            .layers_on(map)
            .into_iter()
            .filter_map(|(id, layer)| layer.handle_surface_event(map, event).map(|t| (id, t)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::Overlay;
    use crate::error::OverlayError;
    use foundation::math::{CoordinateOrder, LatLng, Vec2};
    use foundation::time::Time;
    use gpu::RecordingContext;
    use layers::{
        HostMap, LinesSettings, MapEventKind, MercatorMap, PointerEvent, Points, PointsSettings, Shapes,
        ShapesSettings,
    };
    use pretty_assertions::assert_eq;
    use runtime::{Frame, RENDER_PASSES};
    use scene::{DataSource, Feature, Geometry};
    use serde_json::{Value, json};

    fn map() -> MercatorMap {
        MercatorMap::new(1, Vec2::new(512.0, 256.0)).with_view(LatLng::new(0.0, 0.0), 2.0)
    }

    fn ctx() -> Box<RecordingContext> {
        Box::new(RecordingContext::new().0)
    }

    fn points(positions: Vec<[f64; 2]>) -> PointsSettings {
        PointsSettings::new()
            .data(DataSource::Positions(positions))
            .size(5.0)
            .sensitivity(1.0)
    }

    fn square(min: [f64; 2], max: [f64; 2]) -> Feature {
        Feature::new(Geometry::Polygon(vec![vec![
            [min[0], min[1]],
            [max[0], min[1]],
            [max[0], max[1]],
            [min[0], max[1]],
            [min[0], min[1]],
        ]]))
    }

    fn lng(feature: &Feature) -> f64 {
        match &feature.geometry {
            Geometry::Point(p) => p[0],
            _ => f64::NAN,
        }
    }

    fn frame(index: u64) -> Frame {
        Frame::at_rate(index, 1.0 / 60.0)
    }

    #[test]
    fn coordinate_order_defaults_to_longitude_first() {
        let mut overlay = Overlay::new();
        assert_eq!(overlay.coordinate_order(), CoordinateOrder::LngFirst);
        overlay.latitude_first();
        assert_eq!(overlay.coordinate_order(), CoordinateOrder::LatFirst);
        overlay.set_coordinate_order("lngFirst").unwrap();
        assert_eq!(overlay.coordinate_order(), CoordinateOrder::LngFirst);
        assert!(matches!(
            overlay.set_coordinate_order("northFirst"),
            Err(OverlayError::CoordinateOrder(_))
        ));
        assert_eq!(overlay.coordinate_order(), CoordinateOrder::LngFirst);
    }

    #[test]
    fn global_order_applies_to_every_kind_created_after_it() {
        let mut m = map();
        let mut overlay = Overlay::new();
        overlay.latitude_first();

        let p = overlay.points(points(vec![[10.0, 20.0]]), &mut m, ctx()).unwrap();
        let entry = &overlay.get::<Points>(p).unwrap().entries()[0];
        assert_eq!(entry.lat_lng, LatLng::new(10.0, 20.0));

        let l = overlay
            .lines(
                LinesSettings::new().data(DataSource::Feature(Feature::new(Geometry::LineString(vec![
                    [1.0, 2.0],
                    [3.0, 4.0],
                ])))),
                &mut m,
                ctx(),
            )
            .unwrap();
        let part = &overlay.get::<layers::Lines>(l).unwrap().parts()[0];
        assert_eq!(part.lat_lngs, vec![LatLng::new(1.0, 2.0), LatLng::new(3.0, 4.0)]);

        let rect = Feature::new(Geometry::Polygon(vec![vec![
            [0.0, 10.0],
            [0.0, 12.0],
            [1.0, 12.0],
            [1.0, 10.0],
            [0.0, 10.0],
        ]]));
        let s = overlay
            .shapes(ShapesSettings::new().data(DataSource::Feature(rect)), &mut m, ctx())
            .unwrap();
        let e = PointerEvent::at(&m, LatLng::new(0.5, 11.0));
        assert_eq!(overlay.get::<Shapes>(s).unwrap().pick(&m, &e), Some(0));
    }

    #[test]
    fn an_explicit_layer_order_wins_over_the_global_one() {
        let mut m = map();
        let mut overlay = Overlay::new();
        overlay.latitude_first();
        let p = overlay
            .points(
                points(vec![[10.0, 20.0]]).coordinate_order(CoordinateOrder::LngFirst),
                &mut m,
                ctx(),
            )
            .unwrap();
        assert_eq!(
            overlay.get::<Points>(p).unwrap().entries()[0].lat_lng,
            LatLng::new(20.0, 10.0)
        );
    }

    #[test]
    fn click_dispatch_is_installed_once_per_map() {
        let mut m = map();
        let mut overlay = Overlay::new();
        for _ in 0..3 {
            overlay
                .points(points(vec![[0.0, 0.0]]).on_click(|_, _| None), &mut m, ctx())
                .unwrap();
        }
        assert_eq!(m.subscriptions(MapEventKind::Click), 1);
        assert_eq!(m.subscriptions(MapEventKind::ContextMenu), 0);
        assert_eq!(m.subscriptions(MapEventKind::MouseMove), 0);
        assert!(!overlay.setup_click(&mut m));
        assert_eq!(overlay.registry().len(), 3);
    }

    #[test]
    fn maps_without_click_dispatch_ignore_clicks() {
        let mut m = map();
        let mut overlay = Overlay::new();
        overlay.points(points(vec![[0.0, 0.0]]), &mut m, ctx()).unwrap();
        let e = PointerEvent::at(&m, LatLng::new(0.0, 0.0));
        assert_eq!(overlay.click(&m, &e), None);

        overlay.setup_click(&mut m);
        assert_eq!(overlay.click(&m, &e), Some(Value::Bool(true)));

        let other = MercatorMap::new(2, Vec2::new(512.0, 256.0)).with_view(LatLng::new(0.0, 0.0), 2.0);
        let e = PointerEvent::at(&other, LatLng::new(0.0, 0.0));
        assert_eq!(overlay.click(&other, &e), None);
    }

    #[test]
    fn the_closest_point_across_instances_wins() {
        let mut m = map();
        let mut overlay = Overlay::new();
        overlay
            .points(points(vec![[0.0, 0.0]]).on_click(|_, _| Some(json!("a"))), &mut m, ctx())
            .unwrap();
        overlay
            .points(points(vec![[1.0, 0.0]]).on_click(|_, _| Some(json!("b"))), &mut m, ctx())
            .unwrap();

        let near_b = PointerEvent::at(&m, LatLng::new(0.0, 0.8));
        assert_eq!(overlay.click(&m, &near_b), Some(json!("b")));
        let near_a = PointerEvent::at(&m, LatLng::new(0.0, 0.2));
        assert_eq!(overlay.click(&m, &near_a), Some(json!("a")));
        let far = PointerEvent::at(&m, LatLng::new(30.0, 30.0));
        assert_eq!(overlay.click(&m, &far), None);
    }

    #[test]
    fn unhandled_line_clicks_fall_through_to_shapes() {
        let mut m = map();
        let mut overlay = Overlay::new();
        let line = Feature::new(Geometry::LineString(vec![[0.0, 0.5], [1.0, 0.5]]));
        overlay
            .lines(
                LinesSettings::new()
                    .data(DataSource::Feature(line))
                    .on_click(|_, _| None),
                &mut m,
                ctx(),
            )
            .unwrap();
        overlay
            .shapes(
                ShapesSettings::new()
                    .data(DataSource::Feature(square([0.0, 0.0], [1.0, 1.0])))
                    .on_click(|_, _| Some(json!("shape"))),
                &mut m,
                ctx(),
            )
            .unwrap();

        let on_line = PointerEvent::at(&m, LatLng::new(0.5, 0.5));
        assert_eq!(overlay.click(&m, &on_line), Some(json!("shape")));
    }

    #[test]
    fn handled_line_clicks_stop_dispatch() {
        let mut m = map();
        let mut overlay = Overlay::new();
        let line = Feature::new(Geometry::LineString(vec![[0.0, 0.5], [1.0, 0.5]]));
        overlay
            .lines(
                LinesSettings::new()
                    .data(DataSource::Feature(line))
                    .on_context_menu(|_, _| Some(json!("line"))),
                &mut m,
                ctx(),
            )
            .unwrap();
        overlay
            .shapes(
                ShapesSettings::new()
                    .data(DataSource::Feature(square([0.0, 0.0], [1.0, 1.0])))
                    .on_context_menu(|_, _| Some(json!("shape"))),
                &mut m,
                ctx(),
            )
            .unwrap();

        let on_line = PointerEvent::at(&m, LatLng::new(0.5, 0.5));
        assert_eq!(overlay.context_menu(&m, &on_line), Some(json!("line")));
        assert_eq!(overlay.click(&m, &on_line), None);
    }

    #[test]
    fn hover_off_fires_before_the_next_hover() {
        let mut m = map();
        let mut overlay = Overlay::new();
        let log: Rc<RefCell<Vec<String>>> = Rc::default();
        let (on, off) = (log.clone(), log.clone());
        overlay
            .points(
                points(vec![[0.0, 0.0], [10.0, 10.0]])
                    .on_hover(move |_, f| {
                        on.borrow_mut().push(format!("hover {}", lng(f)));
                        None
                    })
                    .on_hover_off(move |_, f| {
                        off.borrow_mut().push(format!("off {}", lng(f)));
                        None
                    }),
                &mut m,
                ctx(),
            )
            .unwrap();
        assert_eq!(m.subscriptions(MapEventKind::MouseMove), 1);

        overlay.hover(&m, &PointerEvent::at(&m, LatLng::new(0.0, 0.0)));
        overlay.hover(&m, &PointerEvent::at(&m, LatLng::new(0.0, 0.0)));
        overlay.hover(&m, &PointerEvent::at(&m, LatLng::new(10.0, 10.0)));
        overlay.hover(&m, &PointerEvent::at(&m, LatLng::new(-40.0, -40.0)));
        assert_eq!(*log.borrow(), vec!["hover 0", "off 0", "hover 10", "off 10"]);
    }

    #[test]
    fn mouse_moves_are_debounced() {
        let mut m = map();
        let mut overlay = Overlay::new();
        overlay
            .points(
                points(vec![[0.0, 0.0]]).on_hover(|_, _| Some(json!("over"))),
                &mut m,
                ctx(),
            )
            .unwrap();
        let e = PointerEvent::at(&m, LatLng::new(0.0, 0.0));

        assert!(overlay.mouse_move(&m, e, Time(0.0)).is_empty());
        assert!(overlay.poll_hover(&m, Time(0.1)).is_empty());
        assert_eq!(overlay.poll_hover(&m, Time(0.3)), vec![json!("over")]);
        assert!(overlay.poll_hover(&m, Time(0.6)).is_empty());
    }

    #[test]
    fn insert_then_remove_restores_data() {
        let mut m = map();
        let mut overlay = Overlay::new();
        let id = overlay.points(points(vec![[0.0, 0.0], [1.0, 1.0]]), &mut m, ctx()).unwrap();
        let passes = overlay.layer(id).unwrap().core().metrics().counter(RENDER_PASSES);

        overlay
            .layer_mut(id)
            .unwrap()
            .insert(&m, vec![Feature::new(Geometry::Point([5.0, 5.0]))], 1)
            .unwrap();
        let removed = overlay.remove(id, &mut m, Some(&[1])).unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].geometry, Geometry::Point([5.0, 5.0]));
        let layer = overlay.layer(id).unwrap();
        assert_eq!(layer.core().data().len(), 2);
        assert_eq!(layer.core().metrics().counter(RENDER_PASSES) - passes, 2);
    }

    #[test]
    fn removing_an_instance_drops_it_from_dispatch() {
        let mut m = map();
        let mut overlay = Overlay::new();
        let id = overlay
            .points(points(vec![[0.0, 0.0]]).on_click(|_, _| Some(json!("hit"))), &mut m, ctx())
            .unwrap();
        let e = PointerEvent::at(&m, LatLng::new(0.0, 0.0));
        assert_eq!(overlay.click(&m, &e), Some(json!("hit")));

        overlay.remove(id, &mut m, None).unwrap();
        assert!(overlay.registry().is_empty());
        assert_eq!(overlay.click(&m, &e), None);
        assert!(matches!(
            overlay.remove(id, &mut m, None),
            Err(OverlayError::UnknownInstance(missing)) if missing == id
        ));
    }

    #[test]
    fn ticks_paint_pending_instances_once() {
        let mut m = map();
        let mut overlay = Overlay::new();
        overlay.points(points(vec![[0.0, 0.0]]), &mut m, ctx()).unwrap();
        overlay
            .shapes(
                ShapesSettings::new().data(DataSource::Feature(square([0.0, 0.0], [1.0, 1.0]))),
                &mut m,
                ctx(),
            )
            .unwrap();
        assert_eq!(overlay.tick(&m, frame(0)), 2);
        assert_eq!(overlay.tick(&m, frame(1)), 0);
        assert_eq!(overlay.registry().ids().len(), 2);
    }
}
