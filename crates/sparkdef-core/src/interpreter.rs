use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::InterpreterError;
use crate::wrapper::LazyOpenInterpreter;

/// Boxed, sendable future returned by the object-safe [`Interpreter`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome status of a single interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    Success,
    Incomplete,
    Error,
}

/// Status plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterResult {
    pub code: ResultCode,
    pub message: String,
}

impl InterpreterResult {
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Error, message)
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Success
    }
}

/// How the front end should render input forms for an interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormType {
    Native,
    Simple,
    None,
}

/// Per-request execution context.
///
/// Interpreters that only delegate must pass it along untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterContext {
    pub note_id: String,
    pub paragraph_id: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl InterpreterContext {
    pub fn new(note_id: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            paragraph_id: format!("paragraph_{}", uuid::Uuid::new_v4().simple()),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One step of a decorator chain, as seen from the outside.
pub enum Layer<'a> {
    /// The implementation itself; nothing further to unwrap.
    Concrete,
    /// A decorator that defers `open()` of its inner interpreter.
    Lazy(&'a LazyOpenInterpreter),
    /// Any other forwarding decorator.
    Wrapped(&'a Arc<dyn Interpreter>),
}

/// A component that turns source text into an [`InterpreterResult`].
///
/// Implementations must be shareable across request threads; every method
/// takes `&self`.
pub trait Interpreter: Send + Sync {
    /// Declared implementation identity. Decorators report the identity of
    /// the interpreter they wrap.
    fn class_name(&self) -> &str;

    fn layer(&self) -> Layer<'_> {
        Layer::Concrete
    }

    fn open(&self) -> BoxFuture<'_, Result<(), InterpreterError>> {
        Box::pin(async { Ok(()) })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn interpret<'a>(
        &'a self,
        code: &'a str,
        context: &'a InterpreterContext,
    ) -> BoxFuture<'a, InterpreterResult>;

    fn cancel(&self, _context: &InterpreterContext) {}

    fn form_type(&self) -> FormType {
        FormType::Native
    }

    /// Progress of the running request, 0..=100.
    fn progress(&self, _context: &InterpreterContext) -> u8 {
        0
    }

    fn completion<'a>(&'a self, _buf: &'a str, _cursor: usize) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async { Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_constructors_set_code() {
        assert!(InterpreterResult::success("ok").is_success());
        let err = InterpreterResult::error("boom");
        assert_eq!(err.code, ResultCode::Error);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn result_serializes_snake_case_code() {
        let json = serde_json::to_value(InterpreterResult::error("x")).unwrap();
        assert_eq!(json["code"], "error");
        assert_eq!(json["message"], "x");
    }

    #[test]
    fn contexts_get_unique_paragraph_ids() {
        let a = InterpreterContext::new("note");
        let b = InterpreterContext::new("note");
        assert_ne!(a.paragraph_id, b.paragraph_id);
        assert!(a.paragraph_id.starts_with("paragraph_"));
    }

    #[test]
    fn context_properties_builder() {
        let ctx = InterpreterContext::new("n").with_property("user", "alice");
        assert_eq!(
            ctx.properties.get("user").map(String::as_str),
            Some("alice")
        );
    }
}
