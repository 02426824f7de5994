use gpu::{ColorVertex, DrawMode, GpuContext, VertexBuffer};
use scene::spatial::PolygonLookup;
use tracing::{debug, warn};

use crate::driver::LayerCore;
use crate::error::{GeometryError, LayerError};
use crate::flatten::Flattener;
use crate::layer::{Layer, LayerId, LayerKind};
use crate::map::{HostMap, PointerEvent};
use crate::pack::ShapeVertex;
use crate::settings::{ShapeHook, ShapesSettings};
use crate::surface::DrawEvent;
use crate::triangulate::triangulate;

/// A layer of filled polygons, triangulated once per render pass and
/// optionally outlined.
pub struct Shapes {
    core: LayerCore,
    border: bool,
    border_opacity: f32,
    each_vertex: Option<ShapeHook>,
    buffer: VertexBuffer,
    border_buffer: VertexBuffer,
    triangles: usize,
    lookup: PolygonLookup,
}

impl Shapes {
    pub fn new(
        id: LayerId,
        settings: ShapesSettings,
        map: &mut dyn HostMap,
        ctx: Box<dyn GpuContext>,
    ) -> Result<Self, LayerError> {
        let (config, data) = settings.validate()?;
        let mut core = LayerCore::new(id, LayerKind::Shapes, config.layer, data, &*map, ctx)?;
        let buffer = core.create_buffer()?;
        let border_buffer = core.create_buffer()?;
        let mut shapes = Self {
            core,
            border: config.border,
            border_opacity: config.border_opacity,
            each_vertex: config.each_vertex,
            buffer,
            border_buffer,
            triangles: 0,
            lookup: PolygonLookup::default(),
        };
        shapes.render(&*map)?;
        shapes.core.attach(map);
        Ok(shapes)
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    /// Edge vertices, two per border segment. Empty unless borders are on.
    pub fn border_buffer(&self) -> &VertexBuffer {
        &self.border_buffer
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles
    }

    /// The first feature whose polygon contains the event position. Holes
    /// do not count as inside.
    pub fn pick(&self, map: &dyn HostMap, event: &PointerEvent) -> Option<usize> {
        if !self.core.accepts(map) {
            return None;
        }
        self.lookup.search(event.lat_lng.lng, event.lat_lng.lat)
    }
}

impl Layer for Shapes {
    fn core(&self) -> &LayerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LayerCore {
        &mut self.core
    }

    fn render(&mut self, map: &dyn HostMap) -> Result<(), LayerError> {
        let origin = self.core.begin_render(map)?;
        let flat = Flattener::new(map, self.core.config.order, origin);
        let mut vertices: Vec<ColorVertex> = Vec::new();
        let mut edges: Vec<ColorVertex> = Vec::new();
        let mut triangles = 0;

        for (index, feature) in self.core.data.iter().enumerate() {
            let polygon_parts = feature.geometry.polygon_parts();
            if polygon_parts.is_empty() {
                warn!(
                    layer = %self.core.id(),
                    feature = index,
                    geometry = feature.geometry.type_name(),
                    "skipping non-polygon geometry"
                );
                continue;
            }
            let color = self.core.config.color_of(index, feature);
            let border_color = [color[0], color[1], color[2], self.border_opacity];

            for rings in polygon_parts {
                for &position in rings.iter().flatten() {
                    flat.lat_lng(index, position)?;
                }
                let triangulation = triangulate(rings).map_err(|e| GeometryError::UnhandledPolygon {
                    feature: index,
                    reason: e.to_string(),
                })?;
                let Some(t) = triangulation else {
                    debug!(layer = %self.core.id(), feature = index, "skipping degenerate polygon part");
                    continue;
                };

                let mut corners = Vec::with_capacity(t.vertices.len());
                for &position in &t.vertices {
                    let lat_lng = flat.lat_lng(index, position)?;
                    let pixel = flat.pixel(lat_lng);
                    corners.push((lat_lng, pixel, flat.offset(pixel)));
                }

                for &(lat_lng, pixel, offset) in t.triangles.iter().filter_map(|&i| corners.get(i)) {
                    if let Some(hook) = &self.each_vertex {
                        hook(&ShapeVertex {
                            feature: index,
                            key: feature.key(),
                            lat_lng,
                            pixel,
                            color,
                        });
                    }
                    vertices.push(ColorVertex::new(offset, color));
                }
                triangles += t.triangle_count();

                if self.border {
                    for edge in &t.edges {
                        for &(_, _, offset) in edge.iter().filter_map(|&i| corners.get(i)) {
                            edges.push(ColorVertex::new(offset, border_color));
                        }
                    }
                }
            }
        }

        if self.border {
            self.core.upload(&mut self.border_buffer, &edges)?;
        }
        self.core.upload(&mut self.buffer, &vertices)?;
        self.core.finish_render(origin, vertices.len() + edges.len());
        self.triangles = triangles;
        self.lookup = PolygonLookup::build(self.core.data.as_slice(), self.core.config.order);
        Ok(())
    }

    fn draw_on_canvas(&mut self, event: &DrawEvent) -> bool {
        if !self.core.begin_paint(event) {
            return false;
        }
        if let Err(e) = self.core.bind(&self.buffer) {
            warn!(layer = %self.core.id(), error = %e, "cannot bind shape buffer");
            return false;
        }
        self.core.draw(DrawMode::Triangles, 0, self.buffer.len());

        if self.border && !self.border_buffer.is_empty() {
            if let Err(e) = self.core.bind(&self.border_buffer) {
                warn!(layer = %self.core.id(), error = %e, "cannot bind border buffer");
                return false;
            }
            self.core.draw(DrawMode::Lines, 0, self.border_buffer.len());
        }
        true
    }
}
