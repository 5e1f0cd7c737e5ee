use std::ffi::OsString;
use std::path::{Path, PathBuf};

use regex::Regex;
use sparkdef_core::BoxFuture;

use crate::config::CompilerConfig;
use crate::error::CompileError;

const DEFAULT_SOURCE_FILE: &str = "Source.java";

/// A single-use compiler bound to one scratch area.
///
/// `compile` reports `Ok(false)` when the source is rejected; the reasons are
/// then available from `take_messages`. `Err` is reserved for failures of the
/// toolchain itself.
pub trait StringCompiler: Send {
    fn compile<'a>(&'a mut self, code: &'a str) -> BoxFuture<'a, Result<bool, CompileError>>;

    /// Return and forget all pending diagnostics. A second call returns nothing
    /// until the next compile produces more.
    fn take_messages(&mut self) -> Vec<String>;

    /// Pack the compiled output into a library archive under the scratch area
    /// and return its absolute path.
    fn pack_jar(&mut self) -> BoxFuture<'_, Result<PathBuf, CompileError>>;
}

/// Creates a fresh [`StringCompiler`] per request.
pub trait CompilerFactory: Send + Sync {
    fn create(&self, output_dir: &Path, classpath: &Classpath) -> Box<dyn StringCompiler>;
}

/// Ordered list of classpath entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath(Vec<PathBuf>);

impl Classpath {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self(entries)
    }

    /// The current runtime's classpath: `extra` followed by `CLASSPATH`.
    pub fn current(extra: &[PathBuf]) -> Self {
        let mut entries = extra.to_vec();
        if let Some(env) = std::env::var_os("CLASSPATH") {
            entries.extend(std::env::split_paths(&env).filter(|p| !p.as_os_str().is_empty()));
        }
        Self(entries)
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Platform-joined form suitable for `-cp`, or `None` when empty.
    pub fn to_arg(&self) -> Result<Option<OsString>, CompileError> {
        if self.0.is_empty() {
            return Ok(None);
        }
        std::env::join_paths(&self.0)
            .map(Some)
            .map_err(|e| CompileError::InvalidClasspath(e.to_string()))
    }
}

/// Compiles Java source with `javac` and packs the classes with `jar`.
///
/// Layout under the scratch area:
/// ```text
/// {output_dir}/
///   src/{Type}.java   - submitted source
///   classes/          - javac output
///   {jar_name}        - packed archive
/// ```
pub struct JavacCompiler {
    javac_bin: String,
    jar_bin: String,
    jar_name: String,
    options: Vec<String>,
    output_dir: PathBuf,
    classpath: Classpath,
    messages: Vec<String>,
    compiled: bool,
}

impl JavacCompiler {
    pub fn new(output_dir: &Path, classpath: Classpath) -> Self {
        Self::from_config(&CompilerConfig::default(), output_dir, classpath)
    }

    pub fn from_config(config: &CompilerConfig, output_dir: &Path, classpath: Classpath) -> Self {
        Self {
            javac_bin: config.javac_bin.clone(),
            jar_bin: config.jar_bin.clone(),
            jar_name: config.jar_name.clone(),
            options: config.options.clone(),
            output_dir: output_dir.to_path_buf(),
            classpath,
            messages: Vec::new(),
            compiled: false,
        }
    }

    /// Override the path to the javac binary.
    /// Useful when the JDK's `bin` directory is not on PATH.
    pub fn with_bin(mut self, path: impl Into<String>) -> Self {
        self.javac_bin = path.into();
        self
    }

    fn classes_dir(&self) -> PathBuf {
        self.output_dir.join("classes")
    }

    /// Write the source into `src/` and make sure `classes/` exists.
    pub fn write_source(&self, code: &str) -> Result<PathBuf, CompileError> {
        let src_dir = self.output_dir.join("src");
        std::fs::create_dir_all(&src_dir)?;
        std::fs::create_dir_all(self.classes_dir())?;

        let source_path = src_dir.join(source_file_name(code));
        std::fs::write(&source_path, code)?;
        Ok(source_path)
    }

    async fn run_javac(&mut self, code: &str) -> Result<bool, CompileError> {
        let source_path = self.write_source(code)?;

        let mut command = tokio::process::Command::new(&self.javac_bin);
        command
            .arg("-d")
            .arg(self.classes_dir())
            .args(&self.options);
        if let Some(cp) = self.classpath.to_arg()? {
            command.arg("-cp").arg(cp);
        }
        command.arg(&source_path).current_dir(&self.output_dir);

        let output = command.output().await.map_err(|e| CompileError::Launch {
            bin: self.javac_bin.clone(),
            reason: format!("{e}. Is a JDK installed?"),
        })?;

        self.messages
            .extend(diagnostic_lines(&output.stdout, &output.stderr));
        self.compiled = output.status.success();

        tracing::debug!(
            source = %source_path.display(),
            success = self.compiled,
            diagnostics = self.messages.len(),
            "javac finished"
        );
        Ok(self.compiled)
    }

    async fn run_jar(&mut self) -> Result<PathBuf, CompileError> {
        if !self.compiled {
            return Err(CompileError::NotCompiled);
        }
        let jar_path = std::path::absolute(self.output_dir.join(&self.jar_name))?;

        let output = tokio::process::Command::new(&self.jar_bin)
            .arg("cf")
            .arg(&jar_path)
            .arg("-C")
            .arg(self.classes_dir())
            .arg(".")
            .current_dir(&self.output_dir)
            .output()
            .await
            .map_err(|e| CompileError::Launch {
                bin: self.jar_bin.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CompileError::Pack(format!(
                "{} exited with {}: {stderr}",
                self.jar_bin, output.status
            )));
        }
        if !jar_path.exists() {
            return Err(CompileError::Pack(format!(
                "No archive found at {}",
                jar_path.display()
            )));
        }

        Ok(jar_path)
    }
}

impl StringCompiler for JavacCompiler {
    fn compile<'a>(&'a mut self, code: &'a str) -> BoxFuture<'a, Result<bool, CompileError>> {
        Box::pin(self.run_javac(code))
    }

    fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    fn pack_jar(&mut self) -> BoxFuture<'_, Result<PathBuf, CompileError>> {
        Box::pin(self.run_jar())
    }
}

/// Builds [`JavacCompiler`]s from the `[compiler]` config section.
#[derive(Debug, Clone, Default)]
pub struct JavacFactory {
    config: CompilerConfig,
}

impl JavacFactory {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }
}

impl CompilerFactory for JavacFactory {
    fn create(&self, output_dir: &Path, classpath: &Classpath) -> Box<dyn StringCompiler> {
        Box::new(JavacCompiler::from_config(
            &self.config,
            output_dir,
            classpath.clone(),
        ))
    }
}

/// javac requires a public top-level type to live in a file of the same name.
fn source_file_name(code: &str) -> String {
    let pattern = r"(?m)^\s*public\s+(?:(?:abstract|final|sealed|non-sealed|strictfp)\s+)*(?:class|interface|enum|record|@interface)\s+([A-Za-z_$][A-Za-z0-9_$]*)";
    if let Ok(re) = Regex::new(pattern)
        && let Some(caps) = re.captures(code)
    {
        return format!("{}.java", &caps[1]);
    }
    DEFAULT_SOURCE_FILE.to_string()
}

fn diagnostic_lines(stdout: &[u8], stderr: &[u8]) -> Vec<String> {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect()
}
