//! Host-side interpreter model for sparkdef.
//!
//! An [`InterpreterGroup`] is the set of cooperating interpreters a single
//! notebook session keeps alive. Members may be wrapped in decorator layers
//! such as [`LazyOpenInterpreter`]; [`Interpreter::layer`] exposes that chain
//! as a tagged variant so callers can walk it without downcasting.

pub mod error;
pub mod group;
pub mod interpreter;
pub mod registry;
pub mod wrapper;

pub use error::InterpreterError;
pub use group::InterpreterGroup;
pub use interpreter::{
    BoxFuture, FormType, Interpreter, InterpreterContext, InterpreterResult, Layer, ResultCode,
};
pub use registry::{InterpreterInfo, InterpreterRegistry};
pub use wrapper::{LazyOpenInterpreter, WrappedInterpreter};
