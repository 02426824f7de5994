//! Render driver: the per-layer state machine plus the GPU and surface
//! plumbing every layer kind shares.

use foundation::math::{MapMatrix, Vec2};
use gpu::{DrawMode, GpuContext, Program, VertexBuffer};
use runtime::{DRAW_CALLS, Frame, Metrics, PAINT_FRAMES, RENDER_PASSES, RedrawCallback, UPLOADED_FLOATS, VERTEX_COUNT};
use scene::selection::SelectionSet;
use scene::{DataSource, Feature, FeatureSet};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::LayerError;
use crate::flatten::reference_origin;
use crate::layer::{LayerId, LayerKind};
use crate::map::{HostMap, MapId, PointerEvent};
use crate::settings::{LayerConfig, PointerCallback};
use crate::surface::{DrawEvent, DrawingSurface, SurfaceEvent, SurfaceTransform};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerState {
    Uninitialized,
    /// GPU program linked and buffers allocated.
    Ready,
    /// Data changed since the last full render.
    Dirty,
    /// Buffers match the data; frames only update the transform.
    Clean,
    Removed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transition {
    Initialized,
    Mutated,
    Rendered,
    Painted,
    Removed,
}

impl LayerState {
    /// The state after `t`, or `None` when `t` is not allowed from here.
    pub fn next(self, t: Transition) -> Option<LayerState> {
        use LayerState::*;
        match (self, t) {
            (Removed, _) => None,
            (_, Transition::Removed) => Some(Removed),
            (Uninitialized, Transition::Initialized) => Some(Ready),
            (Ready | Dirty | Clean, Transition::Mutated) => Some(Dirty),
            (Dirty, Transition::Rendered) => Some(Clean),
            (Clean, Transition::Painted) => Some(Clean),
            _ => None,
        }
    }
}

/// Which pointer callback to run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interaction {
    Click,
    ContextMenu,
    Hover,
    HoverOff,
}

/// State and resources shared by `Points`, `Lines` and `Shapes`.
pub struct LayerCore {
    id: LayerId,
    kind: LayerKind,
    map: MapId,
    state: LayerState,
    active: bool,
    pub(crate) config: LayerConfig,
    pub(crate) data: FeatureSet,
    pub(crate) ctx: Box<dyn GpuContext>,
    pub(crate) program: Program,
    pub(crate) surface: DrawingSurface,
    pub(crate) matrix: MapMatrix,
    pub(crate) origin: Vec2,
    hovering: SelectionSet,
    metrics: Metrics,
}

impl LayerCore {
    /// Links the program. The layer is `Ready` but not yet attached.
    pub(crate) fn new(
        id: LayerId,
        kind: LayerKind,
        config: LayerConfig,
        data: DataSource,
        map: &dyn HostMap,
        mut ctx: Box<dyn GpuContext>,
    ) -> Result<Self, LayerError> {
        if !map.crs().is_spherical_mercator() {
            warn!(layer = %id, "layer designed for spherical mercator, alternate crs detected");
        }
        let program = Program::link(
            ctx.as_mut(),
            &config.shaders.vertex,
            &config.shaders.fragment,
            config.shaders.layout.clone(),
        )?;
        let surface = DrawingSurface::new(config.surface.clone());
        let mut core = Self {
            id,
            kind,
            map: map.id(),
            state: LayerState::Uninitialized,
            active: false,
            config,
            data: FeatureSet::from_source(data),
            ctx,
            program,
            surface,
            matrix: MapMatrix::new(),
            origin: Vec2::ZERO,
            hovering: SelectionSet::new(),
            metrics: Metrics::new(),
        };
        core.advance(Transition::Initialized);
        Ok(core)
    }

    pub(crate) fn create_buffer(&mut self) -> Result<VertexBuffer, LayerError> {
        Ok(VertexBuffer::create(self.ctx.as_mut())?)
    }

    /// Puts the surface on the map and starts taking part in picking.
    pub(crate) fn attach(&mut self, map: &mut dyn HostMap) {
        self.surface.add_to(map);
        self.active = true;
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn map_id(&self) -> MapId {
        self.map
    }

    pub fn state(&self) -> LayerState {
        self.state
    }

    /// Live and attached. Inactive layers never match a pick.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn data(&self) -> &FeatureSet {
        &self.data
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn matrix(&self) -> &MapMatrix {
        &self.matrix
    }

    pub fn hovering(&self) -> &SelectionSet {
        &self.hovering
    }

    fn advance(&mut self, t: Transition) -> bool {
        match self.state.next(t) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    pub(crate) fn ensure_live(&self) -> Result<(), LayerError> {
        if self.state == LayerState::Removed {
            Err(LayerError::Removed(self.id))
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_map(&self, map: &dyn HostMap) -> Result<(), LayerError> {
        if map.id() == self.map {
            Ok(())
        } else {
            Err(LayerError::MapMismatch {
                expected: self.map,
                found: map.id(),
            })
        }
    }

    /// Whether pointer events from `map` may match this layer.
    pub fn accepts(&self, map: &dyn HostMap) -> bool {
        self.active && self.map == map.id()
    }

    pub(crate) fn check_live(&self, map: &dyn HostMap) -> Result<(), LayerError> {
        self.ensure_live()?;
        self.check_map(map)
    }

    /// Puts back the features a failed mutation replaced. Buffers and pick
    /// indices are only replaced by a render pass that succeeds, so they
    /// still describe `data`.
    pub(crate) fn rollback(&mut self, data: FeatureSet) {
        debug!(layer = %self.id, features = data.len(), "mutation rolled back");
        self.data = data;
    }

    /// Picks the reference origin for a render pass. Nothing on the layer
    /// changes until `finish_render`.
    pub(crate) fn begin_render(&self, map: &dyn HostMap) -> Result<Vec2, LayerError> {
        self.check_live(map)?;
        Ok(reference_origin(map))
    }

    /// Uploads `vertices` into `buffer` and points the layout at it.
    pub(crate) fn upload<V: bytemuck::Pod>(
        &mut self,
        buffer: &mut VertexBuffer,
        vertices: &[V],
    ) -> Result<(), LayerError> {
        buffer.upload(self.ctx.as_mut(), vertices);
        self.program.attach_layout(self.ctx.as_mut())?;
        let floats = std::mem::size_of_val(vertices) / std::mem::size_of::<f32>();
        self.metrics.inc_counter(UPLOADED_FLOATS, floats as u64);
        Ok(())
    }

    /// Completes a full pass packed against `origin` and schedules a paint.
    pub(crate) fn finish_render(&mut self, origin: Vec2, vertices: usize) {
        self.advance(Transition::Mutated);
        self.advance(Transition::Rendered);
        self.origin = origin;
        self.metrics.inc_counter(RENDER_PASSES, 1);
        self.metrics.set_gauge(VERTEX_COUNT, vertices as i64);
        self.surface.redraw(None);
        debug!(
            layer = %self.id,
            kind = self.kind.name(),
            features = self.data.len(),
            vertices,
            "render pass"
        );
    }

    /// Clears the canvas and sets the base transform for `event`. Returns
    /// `false` when the layer is not in a state that can paint.
    pub(crate) fn begin_paint(&mut self, event: &DrawEvent) -> bool {
        if !self.active || !self.advance(Transition::Painted) {
            trace!(layer = %self.id, state = ?self.state, "paint skipped");
            return false;
        }
        let size = self.surface.size();
        self.ctx.use_program(self.program.id());
        self.ctx.clear();
        self.ctx.viewport(size.x as u32, size.y as u32);
        self.matrix.set_size(size.x, size.y).scale_to(event.scale);
        self.translate(event, Vec2::ZERO);
        self.metrics.inc_counter(PAINT_FRAMES, 1);
        trace!(layer = %self.id, zoom = event.zoom, "paint");
        true
    }

    /// Moves the origin to the view and nudges it by `nudge` screen pixels.
    pub(crate) fn translate(&mut self, event: &DrawEvent, nudge: Vec2) {
        self.matrix.translate_to(
            self.origin.x - event.offset.x + nudge.x / event.scale,
            self.origin.y - event.offset.y + nudge.y / event.scale,
        );
        self.program.set_matrix(self.ctx.as_mut(), &self.matrix);
    }

    pub(crate) fn bind(&mut self, buffer: &VertexBuffer) -> Result<(), LayerError> {
        buffer.bind(self.ctx.as_mut());
        self.program.attach_layout(self.ctx.as_mut())?;
        Ok(())
    }

    pub(crate) fn draw(&mut self, mode: DrawMode, first: usize, count: usize) {
        self.ctx.draw_arrays(mode, first, count);
        self.metrics.inc_counter(DRAW_CALLS, 1);
    }

    /// Runs the callbacks queued for a painted frame.
    pub(crate) fn finish_frame(&mut self, callbacks: Vec<RedrawCallback>, frame: Frame) {
        for callback in callbacks {
            callback(frame);
        }
    }

    pub(crate) fn handle_surface_event(
        &mut self,
        map: &dyn HostMap,
        event: SurfaceEvent,
    ) -> Option<SurfaceTransform> {
        if self.state == LayerState::Removed || map.id() != self.map {
            return None;
        }
        self.surface.handle(map, event)
    }

    /// Detaches from the map: no more frames, picks or events.
    pub(crate) fn detach(&mut self, map: &mut dyn HostMap) -> Result<(), LayerError> {
        self.ensure_live()?;
        self.check_map(&*map)?;
        let dropped = self.surface.remove(map);
        self.active = false;
        self.hovering.clear();
        self.advance(Transition::Removed);
        debug!(layer = %self.id, dropped_callbacks = dropped, "layer removed");
        Ok(())
    }

    fn callback(&self, interaction: Interaction) -> Option<&PointerCallback> {
        let callbacks = &self.config.callbacks;
        match interaction {
            Interaction::Click => callbacks.click.as_ref(),
            Interaction::ContextMenu => callbacks.context_menu.as_ref(),
            Interaction::Hover => callbacks.hover.as_ref(),
            Interaction::HoverOff => callbacks.hover_off.as_ref(),
        }
    }

    /// Runs the `interaction` callback for the feature at `index`. `None`
    /// when there is no such callback, no such feature, or the callback
    /// did not handle the event.
    pub fn fire(&self, interaction: Interaction, event: &PointerEvent, index: usize) -> Option<Value> {
        let feature: &Feature = self.data.get(index)?;
        self.callback(interaction)?(event, feature)
    }

    /// Replaces the hovered set with the features at `hits`, firing
    /// `hover_off` for features left and then `hover` for features entered.
    /// Returns the non-`None` hover results.
    pub fn update_hover(&mut self, event: &PointerEvent, hits: &[usize]) -> Vec<Value> {
        let entered: Vec<(usize, scene::FeatureKey)> = hits
            .iter()
            .filter_map(|&i| self.data.get(i).map(|f| (i, f.key())))
            .collect();
        let now: SelectionSet = entered.iter().map(|(_, key)| *key).collect();
        let left = self.hovering.diff(&now);

        for key in left.iter() {
            if let (Some(f), Some(cb)) = (self.data.by_key(key), self.callback(Interaction::HoverOff)) {
                cb(event, f);
            }
        }
        let mut results = Vec::new();
        for (index, key) in entered {
            if self.hovering.contains(key) {
                continue;
            }
            if let Some(result) = self.fire(Interaction::Hover, event, index) {
                results.push(result);
            }
        }
        self.hovering = now;
        results
    }
}
