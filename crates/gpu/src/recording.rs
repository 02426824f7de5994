use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context::{
    AttribPointer, BufferId, DrawMode, GpuContext, ProgramId, ShaderId, ShaderKind,
    UniformLocation,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    CreateShader { kind: ShaderKind, shader: ShaderId },
    CreateProgram(ProgramId),
    LinkProgram(ProgramId),
    UseProgram(ProgramId),
    CreateBuffer(BufferId),
    BindBuffer(BufferId),
    BufferData { buffer: Option<BufferId>, bytes: usize },
    AttribPointer { location: u32, layout: AttribPointer },
    EnableAttrib(u32),
    UniformMatrix4 { location: UniformLocation, matrix: [f32; 16] },
    EnableBlend,
    Viewport { width: u32, height: u32 },
    Clear,
    DrawArrays { mode: DrawMode, first: usize, count: usize },
}

/// Everything a `RecordingContext` was asked to do.
#[derive(Debug, Default)]
pub struct RenderLog {
    commands: Vec<RenderCommand>,
    buffers: BTreeMap<u32, Vec<f32>>,
    uploads: usize,
}

pub type SharedRenderLog = Rc<RefCell<RenderLog>>;

impl RenderLog {
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Forgets recorded commands but keeps buffer contents.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Latest contents uploaded to `buffer`, as floats.
    pub fn buffer_floats(&self, buffer: BufferId) -> Option<&[f32]> {
        self.buffers.get(&buffer.0).map(|v| v.as_slice())
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn draw_calls(&self) -> Vec<(DrawMode, usize, usize)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawArrays { mode, first, count } => Some((*mode, *first, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn last_matrix(&self) -> Option<[f32; 16]> {
        self.commands.iter().rev().find_map(|c| match c {
            RenderCommand::UniformMatrix4 { matrix, .. } => Some(*matrix),
            _ => None,
        })
    }

    pub fn matrices(&self) -> Vec<[f32; 16]> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::UniformMatrix4 { matrix, .. } => Some(*matrix),
                _ => None,
            })
            .collect()
    }
}

/// Which creation call a failing `RecordingContext` returns a null handle for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FailPoint {
    VertexShader,
    FragmentShader,
    Program,
    Link,
    Buffer,
}

/// Headless `GpuContext` that records calls into a shared `RenderLog`.
///
/// Knows the attributes `vertex`, `color`, `pointSize` and the `matrix`
/// uniform, matching the bundled shaders.
#[derive(Debug)]
pub struct RecordingContext {
    log: SharedRenderLog,
    fail: Option<FailPoint>,
    next_id: u32,
    bound: Option<BufferId>,
}

const KNOWN_ATTRIBUTES: [&str; 3] = ["vertex", "color", "pointSize"];

impl RecordingContext {
    pub fn new() -> (Self, SharedRenderLog) {
        Self::build(None)
    }

    pub fn failing(point: FailPoint) -> (Self, SharedRenderLog) {
        Self::build(Some(point))
    }

    fn build(fail: Option<FailPoint>) -> (Self, SharedRenderLog) {
        let log: SharedRenderLog = Rc::new(RefCell::new(RenderLog::default()));
        let ctx = Self {
            log: log.clone(),
            fail,
            next_id: 1,
            bound: None,
        };
        (ctx, log)
    }

    pub fn log(&self) -> SharedRenderLog {
        self.log.clone()
    }

    fn record(&self, command: RenderCommand) {
        self.log.borrow_mut().commands.push(command);
    }

    fn allocate(&mut self, fail_here: bool) -> Option<u32> {
        if fail_here {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        Some(id)
    }
}

impl GpuContext for RecordingContext {
    fn create_shader(&mut self, kind: ShaderKind, _source: &str) -> Option<ShaderId> {
        let fail = match kind {
            ShaderKind::Vertex => self.fail == Some(FailPoint::VertexShader),
            ShaderKind::Fragment => self.fail == Some(FailPoint::FragmentShader),
        };
        let shader = ShaderId(self.allocate(fail)?);
        self.record(RenderCommand::CreateShader { kind, shader });
        Some(shader)
    }

    fn create_program(&mut self) -> Option<ProgramId> {
        let program = ProgramId(self.allocate(self.fail == Some(FailPoint::Program))?);
        self.record(RenderCommand::CreateProgram(program));
        Some(program)
    }

    fn attach_shader(&mut self, _program: ProgramId, _shader: ShaderId) {}

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        if self.fail == Some(FailPoint::Link) {
            return Err("recording context refused to link".to_string());
        }
        self.record(RenderCommand::LinkProgram(program));
        Ok(())
    }

    fn use_program(&mut self, program: ProgramId) {
        self.record(RenderCommand::UseProgram(program));
    }

    fn create_buffer(&mut self) -> Option<BufferId> {
        let buffer = BufferId(self.allocate(self.fail == Some(FailPoint::Buffer))?);
        self.record(RenderCommand::CreateBuffer(buffer));
        Some(buffer)
    }

    fn bind_buffer(&mut self, buffer: BufferId) {
        self.bound = Some(buffer);
        self.record(RenderCommand::BindBuffer(buffer));
    }

    fn buffer_data(&mut self, bytes: &[u8]) {
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let mut log = self.log.borrow_mut();
        if let Some(buffer) = self.bound {
            log.buffers.insert(buffer.0, floats);
        }
        log.uploads += 1;
        log.commands.push(RenderCommand::BufferData {
            buffer: self.bound,
            bytes: bytes.len(),
        });
    }

    fn attrib_location(&self, _program: ProgramId, name: &str) -> Option<u32> {
        KNOWN_ATTRIBUTES
            .iter()
            .position(|a| *a == name)
            .map(|i| i as u32)
    }

    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttribPointer) {
        self.record(RenderCommand::AttribPointer { location, layout });
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        self.record(RenderCommand::EnableAttrib(location));
    }

    fn uniform_location(&self, _program: ProgramId, name: &str) -> Option<UniformLocation> {
        (name == "matrix").then_some(UniformLocation(0))
    }

    fn uniform_matrix4(&mut self, location: UniformLocation, matrix: &[f32; 16]) {
        self.record(RenderCommand::UniformMatrix4 {
            location,
            matrix: *matrix,
        });
    }

    fn enable_blend(&mut self) {
        self.record(RenderCommand::EnableBlend);
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.record(RenderCommand::Viewport { width, height });
    }

    fn clear(&mut self) {
        self.record(RenderCommand::Clear);
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize) {
        self.record(RenderCommand::DrawArrays { mode, first, count });
    }
}
