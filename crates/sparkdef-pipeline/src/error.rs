use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures of the external toolchain itself, as opposed to diagnostics
/// about the submitted source.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to run {bin}: {reason}")]
    Launch { bin: String, reason: String },

    #[error("packing failed: {0}")]
    Pack(String),

    #[error("invalid classpath entry: {0}")]
    InvalidClasspath(String),

    #[error("pack requested before a successful compile")]
    NotCompiled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
