use crate::context::ShaderKind;

/// GPU resource failures. All are fatal for the layer being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    CreateShader(ShaderKind),
    CreateProgram,
    CreateBuffer,
    Link(String),
    MissingAttribute(String),
    MissingUniform(String),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::CreateShader(kind) => write!(f, "Not able to create {} shader", kind.name()),
            GpuError::CreateProgram => write!(f, "Not able to create program"),
            GpuError::CreateBuffer => write!(f, "Not able to create buffer"),
            GpuError::Link(log) => write!(f, "Not able to link program: {log}"),
            GpuError::MissingAttribute(name) => write!(f, "shader variable {name} not found"),
            GpuError::MissingUniform(name) => write!(f, "shader uniform {name} not found"),
        }
    }
}

impl std::error::Error for GpuError {}

#[cfg(test)]
mod tests {
    use super::GpuError;
    use crate::context::ShaderKind;

    #[test]
    fn messages_name_the_failed_resource() {
        assert_eq!(
            GpuError::CreateShader(ShaderKind::Vertex).to_string(),
            "Not able to create vertex shader"
        );
        assert_eq!(
            GpuError::CreateShader(ShaderKind::Fragment).to_string(),
            "Not able to create fragment shader"
        );
        assert_eq!(GpuError::CreateBuffer.to_string(), "Not able to create buffer");
        assert_eq!(GpuError::CreateProgram.to_string(), "Not able to create program");
    }
}
