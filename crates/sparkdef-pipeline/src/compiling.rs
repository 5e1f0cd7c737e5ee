use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use sparkdef_core::{
    BoxFuture, FormType, Interpreter, InterpreterContext, InterpreterError, InterpreterGroup,
    InterpreterInfo, InterpreterResult,
};
use tokio::sync::OnceCell;

use crate::compiler::{Classpath, CompilerFactory, JavacFactory};
use crate::config::{ScratchConfig, SparkdefConfig};
use crate::resolver::resolve_dependency_loader;

pub const INTERPRETER_NAME: &str = "define";
pub const INTERPRETER_GROUP: &str = "spark";

const SCRATCH_FAILURE: &str = "Cannot create temporary dir for compiled files";
const COMPILATION_FAILURE: &str = "Compilation failure";

/// Compiles user code into a jar and hands it to the session's dependency loader.
///
/// Each request gets its own scratch directory, so concurrent requests never
/// share compiler output. The directory is kept after the request because
/// the loader keeps referring to the jar inside it.
///
/// Since the jar goes through the dependency loader, this interpreter has to
/// run before the runtime that consumes the loader's classpath is started.
pub struct CompilingInterpreter {
    group: Weak<InterpreterGroup>,
    compilers: Arc<dyn CompilerFactory>,
    classpath: Vec<PathBuf>,
    scratch: ScratchConfig,
    loader: OnceCell<Arc<dyn Interpreter>>,
}

impl CompilingInterpreter {
    pub const CLASS_NAME: &'static str = "sparkdef_pipeline::compiling::CompilingInterpreter";

    pub fn new(group: &Arc<InterpreterGroup>, compilers: Arc<dyn CompilerFactory>) -> Self {
        Self {
            group: Arc::downgrade(group),
            compilers,
            classpath: Vec::new(),
            scratch: ScratchConfig::default(),
            loader: OnceCell::new(),
        }
    }

    /// Build from config, compiling with javac.
    pub fn from_config(group: &Arc<InterpreterGroup>, config: &SparkdefConfig) -> Self {
        Self::new(group, Arc::new(JavacFactory::new(config.compiler.clone())))
            .with_classpath(config.compiler.classpath.clone())
            .with_scratch(config.scratch.clone())
    }

    /// Entries placed ahead of `CLASSPATH` when compiling.
    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.classpath = classpath;
        self
    }

    pub fn with_scratch(mut self, scratch: ScratchConfig) -> Self {
        self.scratch = scratch;
        self
    }

    /// Registration record: `%spark.define`, no configurable properties.
    pub fn info() -> InterpreterInfo {
        InterpreterInfo {
            name: INTERPRETER_NAME.into(),
            group: INTERPRETER_GROUP.into(),
            class_name: Self::CLASS_NAME.into(),
            properties: BTreeMap::new(),
        }
    }

    fn allocate_scratch(&self) -> std::io::Result<PathBuf> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.scratch.prefix);
        let dir = match &self.scratch.root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir.keep())
    }

    async fn dependency_loader(&self) -> Result<Option<Arc<dyn Interpreter>>, InterpreterError> {
        if let Some(loader) = self.loader.get() {
            return Ok(Some(Arc::clone(loader)));
        }
        let group = self
            .group
            .upgrade()
            .ok_or(InterpreterError::GroupUnavailable)?;
        let Some(loader) = resolve_dependency_loader(&group).await? else {
            return Ok(None);
        };
        let loader = self.loader.get_or_init(|| async move { loader }).await;
        Ok(Some(Arc::clone(loader)))
    }

    async fn run(&self, code: &str, context: &InterpreterContext) -> InterpreterResult {
        let scratch = match self.allocate_scratch() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!(error = %e, "Scratch area allocation failed");
                return InterpreterResult::error(SCRATCH_FAILURE);
            }
        };
        tracing::debug!(
            scratch = %scratch.display(),
            paragraph = %context.paragraph_id,
            "Compiling"
        );

        let classpath = Classpath::current(&self.classpath);
        let mut compiler = self.compilers.create(&scratch, &classpath);

        match compiler.compile(code).await {
            Ok(true) => {}
            Ok(false) => {
                let messages = compiler.take_messages();
                tracing::info!(diagnostics = messages.len(), "Compilation rejected");
                return InterpreterResult::error(failure_report(&messages));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Compiler could not run");
                return InterpreterResult::error(format!("Cannot run compiler: {e}"));
            }
        }

        let jar = match compiler.pack_jar().await {
            Ok(jar) => jar,
            Err(e) => {
                tracing::warn!(error = %e, "Packing failed");
                return InterpreterResult::error(format!("Cannot pack compiled classes: {e}"));
            }
        };

        let Some(command) = load_command(&jar) else {
            return InterpreterResult::error(format!(
                "Cannot pass {} to the dependency loader: path must be UTF-8 on a single line",
                jar.display()
            ));
        };

        let loader = match self.dependency_loader().await {
            Ok(Some(loader)) => loader,
            Ok(None) => {
                return InterpreterResult::error(
                    "Dependency loader unavailable: no dependency loader in the interpreter group",
                );
            }
            Err(e) => {
                return InterpreterResult::error(format!("Dependency loader unavailable: {e}"));
            }
        };

        tracing::info!(jar = %jar.display(), "Forwarding jar to dependency loader");
        loader.interpret(&command, context).await
    }
}

impl Interpreter for CompilingInterpreter {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    /// Resolves the dependency loader eagerly when it is already in the group.
    /// A loader added later is picked up on first use.
    fn open(&self) -> BoxFuture<'_, Result<(), InterpreterError>> {
        Box::pin(async move {
            if self.dependency_loader().await?.is_none() {
                tracing::warn!("No dependency loader in group yet");
            }
            Ok(())
        })
    }

    fn interpret<'a>(
        &'a self,
        code: &'a str,
        context: &'a InterpreterContext,
    ) -> BoxFuture<'a, InterpreterResult> {
        Box::pin(self.run(code, context))
    }

    // A running javac cannot be interrupted.
    fn cancel(&self, _context: &InterpreterContext) {}

    fn form_type(&self) -> FormType {
        FormType::Native
    }

    fn progress(&self, _context: &InterpreterContext) -> u8 {
        0
    }

    fn completion<'a>(&'a self, buf: &'a str, cursor: usize) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move {
            match self.dependency_loader().await {
                Ok(Some(loader)) => loader.completion(buf, cursor).await,
                Ok(None) => Vec::new(),
                Err(e) => {
                    tracing::warn!(error = %e, "Completion skipped");
                    Vec::new()
                }
            }
        })
    }
}

/// The command the dependency loader understands for adding a jar.
///
/// `None` when the path is not UTF-8 or spans several lines: the loader reads
/// one command per line and must get back exactly the path that was packed.
pub fn load_command(jar: &Path) -> Option<String> {
    let path = jar.to_str()?;
    if path.contains(['\n', '\r']) {
        return None;
    }
    Some(format!("z.load(\"{path}\")"))
}

fn failure_report(messages: &[String]) -> String {
    let mut report = String::from(COMPILATION_FAILURE);
    for message in messages {
        report.push('\n');
        report.push_str(message);
    }
    report
}
