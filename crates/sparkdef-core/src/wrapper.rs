use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::InterpreterError;
use crate::interpreter::{
    BoxFuture, FormType, Interpreter, InterpreterContext, InterpreterResult, Layer,
};

/// Decorator that defers `open()` of the inner interpreter until first use.
///
/// Opening is idempotent and runs at most once even when several callers
/// trigger it concurrently; late callers wait for the first one to finish.
/// A failed open is not remembered, so the next caller tries again.
pub struct LazyOpenInterpreter {
    inner: Arc<dyn Interpreter>,
    opened: OnceCell<()>,
}

impl LazyOpenInterpreter {
    pub fn new(inner: Arc<dyn Interpreter>) -> Self {
        Self {
            inner,
            opened: OnceCell::new(),
        }
    }

    pub fn inner(&self) -> &Arc<dyn Interpreter> {
        &self.inner
    }

    pub fn is_open(&self) -> bool {
        self.opened.initialized()
    }
}

impl Interpreter for LazyOpenInterpreter {
    fn class_name(&self) -> &str {
        self.inner.class_name()
    }

    fn layer(&self) -> Layer<'_> {
        Layer::Lazy(self)
    }

    fn open(&self) -> BoxFuture<'_, Result<(), InterpreterError>> {
        Box::pin(async move {
            self.opened
                .get_or_try_init(|| async {
                    tracing::debug!(class_name = self.inner.class_name(), "Opening interpreter");
                    self.inner.open().await
                })
                .await?;
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.is_open() {
                self.inner.close().await;
            }
        })
    }

    fn interpret<'a>(
        &'a self,
        code: &'a str,
        context: &'a InterpreterContext,
    ) -> BoxFuture<'a, InterpreterResult> {
        Box::pin(async move {
            if let Err(e) = self.open().await {
                return InterpreterResult::error(e.to_string());
            }
            self.inner.interpret(code, context).await
        })
    }

    fn cancel(&self, context: &InterpreterContext) {
        if self.is_open() {
            self.inner.cancel(context);
        }
    }

    fn form_type(&self) -> FormType {
        self.inner.form_type()
    }

    fn progress(&self, context: &InterpreterContext) -> u8 {
        if self.is_open() {
            self.inner.progress(context)
        } else {
            0
        }
    }

    fn completion<'a>(&'a self, buf: &'a str, cursor: usize) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move {
            if let Err(e) = self.open().await {
                tracing::warn!(error = %e, "Completion skipped, interpreter failed to open");
                return Vec::new();
            }
            self.inner.completion(buf, cursor).await
        })
    }
}

/// Plain forwarding decorator.
///
/// Hosts use it to attach behaviour (tracing spans, isolation) around an
/// interpreter without changing its identity.
pub struct WrappedInterpreter {
    inner: Arc<dyn Interpreter>,
}

impl WrappedInterpreter {
    pub fn new(inner: Arc<dyn Interpreter>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn Interpreter> {
        &self.inner
    }
}

impl Interpreter for WrappedInterpreter {
    fn class_name(&self) -> &str {
        self.inner.class_name()
    }

    fn layer(&self) -> Layer<'_> {
        Layer::Wrapped(&self.inner)
    }

    fn open(&self) -> BoxFuture<'_, Result<(), InterpreterError>> {
        self.inner.open()
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.inner.close()
    }

    fn interpret<'a>(
        &'a self,
        code: &'a str,
        context: &'a InterpreterContext,
    ) -> BoxFuture<'a, InterpreterResult> {
        self.inner.interpret(code, context)
    }

    fn cancel(&self, context: &InterpreterContext) {
        self.inner.cancel(context);
    }

    fn form_type(&self) -> FormType {
        self.inner.form_type()
    }

    fn progress(&self, context: &InterpreterContext) -> u8 {
        self.inner.progress(context)
    }

    fn completion<'a>(&'a self, buf: &'a str, cursor: usize) -> BoxFuture<'a, Vec<String>> {
        self.inner.completion(buf, cursor)
    }
}
