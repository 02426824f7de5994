use foundation::bounds::Aabb2;
use foundation::math::{LatLng, Vec2};
use gpu::{ColorVertex, DrawMode, GpuContext, VertexBuffer};
use scene::picking::point_segment_distance;
use tracing::{trace, warn};

use crate::driver::LayerCore;
use crate::error::LayerError;
use crate::flatten::Flattener;
use crate::layer::{Layer, LayerId, LayerKind};
use crate::map::{HostMap, PointerEvent};
use crate::pack::LineFeatureVertices;
use crate::settings::{ConfigError, ConfigViolation, LineHook, LinesSettings};
use crate::surface::DrawEvent;
use crate::symbology::Attribute;

/// Above this zoom lines are drawn once, without the brush passes.
pub const BRUSH_MAX_ZOOM: f64 = 18.0;
/// Screen-pixel spacing of brush passes.
pub const BRUSH_STEP: f64 = 0.5;
/// Widest stroke, in screen pixels. Bounds a stroke to 129 × 129 passes.
pub const MAX_LINE_WEIGHT: f32 = 32.0;

/// Screen-pixel nudges for one brush stroke of `weight`: a square of
/// offsets from `-weight` to `weight` in `BRUSH_STEP` steps, row by row.
/// Weights above `MAX_LINE_WEIGHT` are drawn at that weight.
pub fn brush_offsets(weight: f32) -> Vec<Vec2> {
    let w = f64::from(weight.min(MAX_LINE_WEIGHT)).max(0.0);
    let steps = (2.0 * w / BRUSH_STEP).floor() as usize + 1;
    let along = |i: usize| -w + i as f64 * BRUSH_STEP;
    let mut out = Vec::with_capacity(steps.saturating_mul(steps));
    for y in 0..steps {
        for x in 0..steps {
            out.push(Vec2::new(along(x), along(y)));
        }
    }
    out
}

/// Hit geometry of one line feature: every part's `[lng, lat]` positions
/// chained together.
#[derive(Debug, Clone, PartialEq)]
struct LinePath {
    feature: usize,
    weight: f32,
    points: Vec<[f64; 2]>,
}

impl LinePath {
    fn distance(&self, at: [f64; 2]) -> Option<f64> {
        self.points
            .windows(2)
            .map(|s| point_segment_distance(at, s[0], s[1]))
            .min_by(f64::total_cmp)
    }
}

/// A layer of GL lines. Each part is packed as independent segments and
/// thickened on screen by repeated, slightly shifted draws.
pub struct Lines {
    core: LayerCore,
    weight: Attribute<f32>,
    each_vertex: Option<LineHook>,
    buffer: VertexBuffer,
    parts: Vec<LineFeatureVertices>,
    paths: Vec<LinePath>,
    bounds: Option<Aabb2>,
    /// `2^zoom` of the last paint; infinite until the first one.
    scale: f64,
}

impl Lines {
    pub fn new(
        id: LayerId,
        settings: LinesSettings,
        map: &mut dyn HostMap,
        ctx: Box<dyn GpuContext>,
    ) -> Result<Self, LayerError> {
        let (config, data) = settings.validate()?;
        let mut core = LayerCore::new(id, LayerKind::Lines, config.layer, data, &*map, ctx)?;
        let buffer = core.create_buffer()?;
        let mut lines = Self {
            core,
            weight: config.weight,
            each_vertex: config.each_vertex,
            buffer,
            parts: Vec::new(),
            paths: Vec::new(),
            bounds: None,
            scale: f64::INFINITY,
        };
        lines.render(&*map)?;
        lines.core.attach(map);
        Ok(lines)
    }

    /// Packed parts in data order; their vertices are laid out back to back
    /// in the buffer.
    pub fn parts(&self) -> &[LineFeatureVertices] {
        &self.parts
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(LineFeatureVertices::vertex_count).sum()
    }

    /// `[lng, lat]` extent of the data, if there are any positions.
    pub fn bounds(&self) -> Option<Aabb2> {
        self.bounds
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Hit tolerance in degrees for a line of `weight`.
    pub fn threshold(&self, weight: f32, hover: bool) -> f64 {
        let config = self.core.config();
        let sensitivity = if hover {
            config.sensitivity_hover
        } else {
            config.sensitivity
        };
        sensitivity + f64::from(weight) / self.scale
    }

    /// Distance in degrees from `at` to the nearest segment of the feature
    /// at `index`. Consecutive parts of a multi-line are joined, so the gap
    /// between them counts as a segment.
    pub fn distance(&self, index: usize, at: LatLng) -> Option<f64> {
        self.paths
            .iter()
            .find(|p| p.feature == index)?
            .distance([at.lng, at.lat])
    }

    fn within<'a>(&'a self, at: LatLng, hover: bool) -> impl Iterator<Item = usize> + 'a {
        let p = [at.lng, at.lat];
        self.paths.iter().filter_map(move |path| {
            let d = path.distance(p)?;
            (d <= self.threshold(path.weight, hover)).then_some(path.feature)
        })
    }

    /// First feature, in data order, within click tolerance of the event.
    pub fn pick(&self, map: &dyn HostMap, event: &PointerEvent) -> Option<usize> {
        if !self.core.accepts(map) {
            return None;
        }
        self.within(event.lat_lng, false).next()
    }

    /// Every feature within hover tolerance of the event.
    pub fn pick_all(&self, map: &dyn HostMap, event: &PointerEvent) -> Vec<usize> {
        if !self.core.accepts(map) {
            return Vec::new();
        }
        let Some(bounds) = self.hover_bounds() else {
            return Vec::new();
        };
        let at = event.lat_lng;
        if !bounds.contains([at.lng, at.lat]) {
            trace!(layer = %self.core.id(), "hover outside line bounds");
            return Vec::new();
        }
        self.within(at, true).collect()
    }

    /// Data bounds grown by the widest hover tolerance.
    fn hover_bounds(&self) -> Option<Aabb2> {
        let b = self.bounds?;
        let widest = self.paths.iter().map(|p| p.weight).fold(0.0_f32, f32::max);
        let pad = self.threshold(widest, true);
        Some(Aabb2::new(
            [b.min[0] - pad, b.min[1] - pad],
            [b.max[0] + pad, b.max[1] + pad],
        ))
    }
}

impl Layer for Lines {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn render(&mut self, map: &dyn HostMap) -> Result<(), LayerError> {
        let origin = self.core.begin_render(map)?;
        let flat = Flattener::new(map, self.core.config.order, origin);
        let mut parts = Vec::new();
        let mut paths = Vec::new();

        for (index, feature) in self.core.data.iter().enumerate() {
            let line_parts = feature.geometry.line_parts();
            if line_parts.is_empty() {
                warn!(
                    layer = %self.core.id(),
                    feature = index,
                    geometry = feature.geometry.type_name(),
                    "skipping non-line geometry"
                );
                continue;
            }
            let color = self.core.config.color_of(index, feature);
            let weight = self.weight.resolve(index, feature);
            if !(0.0..=MAX_LINE_WEIGHT).contains(&weight) {
                return Err(ConfigError::new(vec![ConfigViolation::new(
                    "weight",
                    format!("of feature {index} is {weight}, expected 0..={MAX_LINE_WEIGHT}"),
                )])
                .into());
            }
            let mut path = LinePath {
                feature: index,
                weight,
                points: Vec::new(),
            };
            for (part_index, positions) in line_parts.into_iter().enumerate() {
                let part = flat.flatten(index, positions)?;
                path.points.extend(part.lat_lngs.iter().map(|ll| [ll.lng, ll.lat]));
                let packed = LineFeatureVertices::new(index, feature.key(), part_index, part, color, weight);
                if let Some(hook) = &self.each_vertex {
                    hook(&packed);
                }
                parts.push(packed);
            }
            paths.push(path);
        }

        let vertices: Vec<ColorVertex> = parts
            .iter()
            .flat_map(|p: &LineFeatureVertices| p.vertices.iter().copied())
            .collect();
        self.core.upload(&mut self.buffer, &vertices)?;
        self.core.finish_render(origin, vertices.len());
        self.bounds = self.core.data.lng_lat_bounds(self.core.config.order);
        self.parts = parts;
        self.paths = paths;
        Ok(())
    }

    fn draw_on_canvas(&mut self, event: &DrawEvent) -> bool {
        if !self.core.begin_paint(event) {
            return false;
        }
        if let Err(e) = self.core.bind(&self.buffer) {
            warn!(layer = %self.core.id(), error = %e, "cannot bind line buffer");
            return false;
        }
        self.scale = event.scale;

        if event.zoom > BRUSH_MAX_ZOOM {
            self.core.draw(DrawMode::Lines, 0, self.buffer.len());
            return true;
        }
        match &self.weight {
            Attribute::Constant(weight) => {
                for nudge in brush_offsets(*weight) {
                    self.core.translate(event, nudge);
                    self.core.draw(DrawMode::Lines, 0, self.buffer.len());
                }
            }
            Attribute::Computed(_) => {
                let mut first = 0;
                for part in &self.parts {
                    let count = part.vertex_count();
                    for nudge in brush_offsets(part.weight) {
                        self.core.translate(event, nudge);
                        self.core.draw(DrawMode::Lines, first, count);
                    }
                    first += count;
                }
            }
        }
        true
    }
}
