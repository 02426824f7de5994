/// Narrow GL-style surface the layers draw through.
///
/// Creation calls return `None` for a null handle; `Program` and
/// `VertexBuffer` turn that into a `GpuError` naming the resource. Buffer and
/// attribute calls act on the most recently bound buffer, as in WebGL.
pub trait GpuContext {
    fn create_shader(&mut self, kind: ShaderKind, source: &str) -> Option<ShaderId>;
    fn create_program(&mut self) -> Option<ProgramId>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    /// Links `program`; the error carries the driver's info log.
    fn link_program(&mut self, program: ProgramId) -> Result<(), String>;
    fn use_program(&mut self, program: ProgramId);

    fn create_buffer(&mut self) -> Option<BufferId>;
    fn bind_buffer(&mut self, buffer: BufferId);
    /// Replaces the contents of the bound buffer.
    fn buffer_data(&mut self, bytes: &[u8]);

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttribPointer);
    fn enable_vertex_attrib(&mut self, location: u32);
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn uniform_matrix4(&mut self, location: UniformLocation, matrix: &[f32; 16]);

    /// Straight alpha blending (`SRC_ALPHA, ONE_MINUS_SRC_ALPHA`).
    fn enable_blend(&mut self);
    fn viewport(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrawMode {
    Points,
    Lines,
    Triangles,
}

/// Float attribute layout inside an interleaved vertex, all values in bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttribPointer {
    pub size: u32,
    pub stride: u32,
    pub offset: u32,
    pub normalize: bool,
}
