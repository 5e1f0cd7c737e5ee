use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sparkdef_core::{
    BoxFuture, FormType, Interpreter, InterpreterContext, InterpreterError, InterpreterResult,
};
use tokio::sync::RwLock;

const COMMANDS: &[&str] = &["z.load(\"", "z.reset()"];
const SEALED: &str = "z.load() must be used before the runtime is initialized";

/// An archive added to the session classpath.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedArtifact {
    pub path: PathBuf,
    /// SHA-256 hex of the archive bytes
    pub sha256: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DepCommand {
    Load(PathBuf),
    Reset,
}

/// The session's dependency loader.
///
/// Accepts a small scripting language, one command per line:
///
/// ```text
/// z.load("/abs/path/to/lib.jar")
/// z.reset()
/// ```
///
/// Loading must happen before the consuming runtime starts; once [`seal`]
/// has been called every further load is rejected.
///
/// [`seal`]: DepInterpreter::seal
#[derive(Default)]
pub struct DepInterpreter {
    artifacts: RwLock<Vec<LoadedArtifact>>,
    sealed: AtomicBool,
}

impl DepInterpreter {
    pub const CLASS_NAME: &'static str = "sparkdef_pipeline::dep::DepInterpreter";

    pub fn new() -> Self {
        Self::default()
    }

    /// Reject loads from now on. Called once the runtime has picked up the classpath.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    pub async fn loaded_artifacts(&self) -> Vec<LoadedArtifact> {
        self.artifacts.read().await.clone()
    }

    pub async fn classpath(&self) -> Vec<PathBuf> {
        self.artifacts
            .read()
            .await
            .iter()
            .map(|a| a.path.clone())
            .collect()
    }

    async fn load(&self, path: &Path) -> Result<String, String> {
        if self.is_sealed() {
            return Err(SEALED.to_string());
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        let mut artifacts = self.artifacts.write().await;
        if let Some(existing) = artifacts.iter().find(|a| a.sha256 == sha256) {
            tracing::debug!(
                path = %path.display(),
                existing = %existing.path.display(),
                "Artifact already loaded"
            );
            return Ok(format!("Already loaded {}", existing.path.display()));
        }

        artifacts.push(LoadedArtifact {
            path: path.to_path_buf(),
            sha256,
            loaded_at: Utc::now(),
        });
        tracing::info!(path = %path.display(), total = artifacts.len(), "Artifact loaded");
        Ok(format!("Loaded {}", path.display()))
    }

    async fn reset(&self) -> String {
        let mut artifacts = self.artifacts.write().await;
        let count = artifacts.len();
        artifacts.clear();
        tracing::info!(count, "Dependency loader reset");
        format!("Removed {count} artifact(s)")
    }

    async fn run(&self, code: &str) -> InterpreterResult {
        let commands = match parse_commands(code) {
            Ok(commands) => commands,
            Err(e) => return InterpreterResult::error(e),
        };

        let mut output = Vec::with_capacity(commands.len());
        for command in commands {
            let line = match command {
                DepCommand::Load(path) => match self.load(&path).await {
                    Ok(line) => line,
                    Err(e) => return InterpreterResult::error(e),
                },
                DepCommand::Reset => self.reset().await,
            };
            output.push(line);
        }
        InterpreterResult::success(output.join("\n"))
    }
}

impl Interpreter for DepInterpreter {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    fn open(&self) -> BoxFuture<'_, Result<(), InterpreterError>> {
        Box::pin(async {
            tracing::info!("Dependency loader opened");
            Ok(())
        })
    }

    fn interpret<'a>(
        &'a self,
        code: &'a str,
        _context: &'a InterpreterContext,
    ) -> BoxFuture<'a, InterpreterResult> {
        Box::pin(self.run(code))
    }

    fn form_type(&self) -> FormType {
        FormType::Native
    }

    fn completion<'a>(&'a self, buf: &'a str, cursor: usize) -> BoxFuture<'a, Vec<String>> {
        Box::pin(async move { complete(buf, cursor) })
    }
}

fn parse_commands(code: &str) -> Result<Vec<DepCommand>, String> {
    // The path runs to the last quote on the line, so quotes inside it survive.
    let load = Regex::new(r#"^z\.load\(\s*"(.+)"\s*\)\s*;?$"#).map_err(|e| e.to_string())?;
    let reset = Regex::new(r"^z\.reset\(\s*\)\s*;?$").map_err(|e| e.to_string())?;

    let mut commands = Vec::new();
    for (index, raw) in code.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if let Some(caps) = load.captures(line) {
            commands.push(DepCommand::Load(PathBuf::from(&caps[1])));
        } else if reset.is_match(line) {
            commands.push(DepCommand::Reset);
        } else {
            return Err(format!("Unknown command at line {}: {line}", index + 1));
        }
    }
    Ok(commands)
}

fn complete(buf: &str, cursor: usize) -> Vec<String> {
    let head = buf.get(..cursor).unwrap_or(buf);
    let token = head.rsplit(char::is_whitespace).next().unwrap_or("");
    COMMANDS
        .iter()
        .filter(|c| c.starts_with(token))
        .map(|c| c.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(path: &Path) -> String {
        format!("z.load(\"{}\")", path.display())
    }

    fn write_jar(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn parses_load_and_reset() {
        let commands = parse_commands(
            "// comment\nz.load(\"/tmp/a.jar\")\n\n  z.reset();\nz.load( \"/tmp/b.jar\" )",
        )
        .unwrap();
        assert_eq!(
            commands,
            vec![
                DepCommand::Load(PathBuf::from("/tmp/a.jar")),
                DepCommand::Reset,
                DepCommand::Load(PathBuf::from("/tmp/b.jar")),
            ]
        );
    }

    #[test]
    fn load_path_may_contain_quotes() {
        let commands = parse_commands("z.load(\"/tmp/ja\"rs1/compiled.jar\")").unwrap();
        assert_eq!(
            commands,
            vec![DepCommand::Load(PathBuf::from("/tmp/ja\"rs1/compiled.jar"))]
        );
    }

    #[test]
    fn rejects_unknown_commands_with_line_number() {
        let err = parse_commands("z.reset()\nz.fetch(\"x\")").unwrap_err();
        assert_eq!(err, "Unknown command at line 2: z.fetch(\"x\")");
    }

    #[tokio::test]
    async fn loads_existing_artifact() {
        let tmp = TempDir::new().unwrap();
        let jar = write_jar(&tmp, "a.jar", b"PK\x03\x04 fake");
        let dep = DepInterpreter::new();
        let ctx = InterpreterContext::new("note");

        let result = dep.interpret(&load(&jar), &ctx).await;

        assert!(result.is_success(), "{}", result.message);
        assert_eq!(result.message, format!("Loaded {}", jar.display()));
        let artifacts = dep.loaded_artifacts().await;
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].sha256.len(), 64);
        assert_eq!(dep.classpath().await, vec![jar]);
    }

    #[tokio::test]
    async fn same_content_loads_once() {
        let tmp = TempDir::new().unwrap();
        let a = write_jar(&tmp, "a.jar", b"same");
        let b = write_jar(&tmp, "b.jar", b"same");
        let dep = DepInterpreter::new();
        let ctx = InterpreterContext::new("note");

        dep.interpret(&load(&a), &ctx).await;
        let second = dep.interpret(&load(&b), &ctx).await;

        assert!(second.is_success());
        assert!(second.message.starts_with("Already loaded"));
        assert_eq!(dep.loaded_artifacts().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_artifact_is_an_error() {
        let dep = DepInterpreter::new();
        let ctx = InterpreterContext::new("n");
        let command = load(Path::new("/nonexistent/lib.jar"));

        let result = dep.interpret(&command, &ctx).await;
        assert!(!result.is_success());
        assert!(result.message.starts_with("Cannot read /nonexistent/lib.jar"));
    }

    #[tokio::test]
    async fn sealed_loader_rejects_loads() {
        let tmp = TempDir::new().unwrap();
        let jar = write_jar(&tmp, "a.jar", b"x");
        let dep = DepInterpreter::new();
        let ctx = InterpreterContext::new("n");
        dep.seal();

        let result = dep.interpret(&load(&jar), &ctx).await;
        assert!(!result.is_success());
        assert!(result.message.contains("before the runtime is initialized"));
        assert!(dep.loaded_artifacts().await.is_empty());
    }

    #[tokio::test]
    async fn reset_forgets_artifacts() {
        let tmp = TempDir::new().unwrap();
        let jar = write_jar(&tmp, "a.jar", b"x");
        let dep = DepInterpreter::new();
        let ctx = InterpreterContext::new("n");

        dep.interpret(&load(&jar), &ctx).await;
        let result = dep.interpret("z.reset()", &ctx).await;

        assert_eq!(result.message, "Removed 1 artifact(s)");
        assert!(dep.loaded_artifacts().await.is_empty());
    }

    #[tokio::test]
    async fn completes_command_names() {
        let dep = DepInterpreter::new();
        assert_eq!(dep.completion("z.l", 3).await, vec!["z.load(\""]);
        assert_eq!(dep.completion("z.", 2).await.len(), 2);
        assert!(dep.completion("spark", 5).await.is_empty());
    }
}
