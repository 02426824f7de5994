use bytemuck::{Pod, Zeroable};

use crate::context::{BufferId, GpuContext};
use crate::error::GpuError;

/// Packed point vertex: `[x, y, r, g, b, a, size]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub size: f32,
}

/// Packed line or polygon vertex: `[x, y, r, g, b, a]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl ColorVertex {
    pub fn new(position: [f32; 2], color: [f32; 4]) -> Self {
        Self { position, color }
    }
}

/// A GPU buffer holding one interleaved vertex stream.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    id: BufferId,
    vertices: usize,
}

impl VertexBuffer {
    pub fn create(ctx: &mut dyn GpuContext) -> Result<Self, GpuError> {
        let id = ctx.create_buffer().ok_or(GpuError::CreateBuffer)?;
        Ok(Self { id, vertices: 0 })
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Vertices in the last upload.
    pub fn len(&self) -> usize {
        self.vertices
    }

    pub fn is_empty(&self) -> bool {
        self.vertices == 0
    }

    pub fn bind(&self, ctx: &mut dyn GpuContext) {
        ctx.bind_buffer(self.id);
    }

    /// Binds and replaces the buffer contents.
    pub fn upload<V: Pod>(&mut self, ctx: &mut dyn GpuContext, vertices: &[V]) {
        ctx.bind_buffer(self.id);
        ctx.buffer_data(bytemuck::cast_slice(vertices));
        self.vertices = vertices.len();
    }
}
