pub mod compiler;
pub mod compiling;
pub mod config;
pub mod dep;
pub mod error;
pub mod resolver;

pub use compiling::CompilingInterpreter;
pub use config::SparkdefConfig;
pub use dep::DepInterpreter;
pub use error::{CompileError, PipelineError};
