use foundation::math::MapMatrix;
use tracing::debug;

use crate::context::{AttribPointer, GpuContext, ProgramId, ShaderKind, UniformLocation};
use crate::error::GpuError;

const FLOAT_BYTES: u32 = 4;

/// One float attribute of an interleaved vertex. `start` and `size` count floats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVariable {
    pub name: String,
    pub start: u32,
    pub size: u32,
    pub normalize: bool,
}

impl ShaderVariable {
    pub fn float(name: impl Into<String>, start: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            start,
            size,
            normalize: false,
        }
    }
}

/// Attribute layout of one vertex kind.
///
/// The stride must match both the packed vertex records and the shader's
/// attributes, so it is derived from the variables rather than set by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    variables: Vec<ShaderVariable>,
}

impl VertexLayout {
    pub fn new(variables: Vec<ShaderVariable>) -> Self {
        Self { variables }
    }

    /// `[x, y, r, g, b, a, size]`
    pub fn points() -> Self {
        Self::new(vec![
            ShaderVariable::float("vertex", 0, 2),
            ShaderVariable::float("color", 2, 4),
            ShaderVariable::float("pointSize", 6, 1),
        ])
    }

    /// `[x, y, r, g, b, a]`
    pub fn colored() -> Self {
        Self::new(vec![
            ShaderVariable::float("vertex", 0, 2),
            ShaderVariable::float("color", 2, 4),
        ])
    }

    pub fn variables(&self) -> &[ShaderVariable] {
        &self.variables
    }

    pub fn floats_per_vertex(&self) -> u32 {
        self.variables
            .iter()
            .map(|v| v.start + v.size)
            .max()
            .unwrap_or(0)
    }

    pub fn bytes_per_vertex(&self) -> u32 {
        self.floats_per_vertex() * FLOAT_BYTES
    }
}

/// A linked shader program plus the attribute layout it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    id: ProgramId,
    matrix: UniformLocation,
    layout: VertexLayout,
}

impl Program {
    pub const MATRIX_UNIFORM: &'static str = "matrix";

    /// Compiles both stages, links, enables blending and resolves the
    /// `matrix` uniform. Any null handle or link failure is returned as-is.
    pub fn link(
        ctx: &mut dyn GpuContext,
        vertex_source: &str,
        fragment_source: &str,
        layout: VertexLayout,
    ) -> Result<Self, GpuError> {
        let vertex = ctx
            .create_shader(ShaderKind::Vertex, vertex_source)
            .ok_or(GpuError::CreateShader(ShaderKind::Vertex))?;
        let fragment = ctx
            .create_shader(ShaderKind::Fragment, fragment_source)
            .ok_or(GpuError::CreateShader(ShaderKind::Fragment))?;
        let id = ctx.create_program().ok_or(GpuError::CreateProgram)?;
        ctx.attach_shader(id, vertex);
        ctx.attach_shader(id, fragment);
        ctx.link_program(id).map_err(GpuError::Link)?;
        ctx.use_program(id);
        ctx.enable_blend();

        let matrix = ctx
            .uniform_location(id, Self::MATRIX_UNIFORM)
            .ok_or_else(|| GpuError::MissingUniform(Self::MATRIX_UNIFORM.to_string()))?;
        debug!(
            program = id.0,
            floats_per_vertex = layout.floats_per_vertex(),
            "linked program"
        );
        Ok(Self { id, matrix, layout })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Points every layout variable at the currently bound buffer.
    pub fn attach_layout(&self, ctx: &mut dyn GpuContext) -> Result<(), GpuError> {
        let stride = self.layout.bytes_per_vertex();
        for var in self.layout.variables() {
            let location = ctx
                .attrib_location(self.id, &var.name)
                .ok_or_else(|| GpuError::MissingAttribute(var.name.clone()))?;
            ctx.vertex_attrib_pointer(
                location,
                AttribPointer {
                    size: var.size,
                    stride,
                    offset: var.start * FLOAT_BYTES,
                    normalize: var.normalize,
                },
            );
            ctx.enable_vertex_attrib(location);
        }
        Ok(())
    }

    pub fn set_matrix(&self, ctx: &mut dyn GpuContext, matrix: &MapMatrix) {
        ctx.uniform_matrix4(self.matrix, &matrix.array);
    }
}
