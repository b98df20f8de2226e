use std::path::PathBuf;

/// Everything that can stop the renderer from starting or from drawing a frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load mesh {path}: {reason}")]
    MeshLoad { path: PathBuf, reason: String },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("shader {path} failed to compile:\n{log}")]
    ShaderCompile { path: PathBuf, log: String },

    #[error("shader program '{program}' failed to link: {log}")]
    ShaderLink { program: String, log: String },

    #[error("shader program '{0}' used before a successful link")]
    ShaderNotLinked(String),

    #[error("render target '{label}' is incomplete: {reason}")]
    IncompleteTarget { label: String, reason: String },

    #[error("failed to load texture {path}: {reason}")]
    Texture { path: PathBuf, reason: String },

    #[error("pass order violated: {0}")]
    PassOrder(String),

    #[error("gpu validation error: {0}")]
    Gpu(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Runs `f` inside a validation error scope and turns a captured validation error
/// into [`RenderError::Gpu`].
pub fn validation_scope<T>(device: &wgpu::Device, what: &str, f: impl FnOnce() -> T) -> Result<T, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => {
            log::error!("{what}: {err}");
            Err(RenderError::Gpu(format!("{what}: {err}")))
        }
        None => Ok(value),
    }
}
