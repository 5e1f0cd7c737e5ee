use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::PipelineError;

#[derive(Debug, Default, Deserialize)]
pub struct SparkdefConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub scratch: ScratchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_javac_bin")]
    pub javac_bin: String,
    #[serde(default = "default_jar_bin")]
    pub jar_bin: String,
    /// File name of the packed archive inside the scratch area.
    #[serde(default = "default_jar_name")]
    pub jar_name: String,
    /// Entries placed ahead of `CLASSPATH` when compiling.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// Extra flags passed to javac verbatim.
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_javac_bin() -> String {
    "javac".into()
}
fn default_jar_bin() -> String {
    "jar".into()
}
fn default_jar_name() -> String {
    "compiled.jar".into()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            javac_bin: default_javac_bin(),
            jar_bin: default_jar_bin(),
            jar_name: default_jar_name(),
            classpath: Vec::new(),
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScratchConfig {
    /// Parent directory for scratch areas; the system temp dir when unset.
    pub root: Option<PathBuf>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    "jars".into()
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            root: None,
            prefix: default_prefix(),
        }
    }
}

impl SparkdefConfig {
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(PipelineError::IoError)?;
        toml::from_str(&content).map_err(|e| {
            PipelineError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Default config location: ~/.sparkdef/config.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sparkdef")
            .join("config.toml")
    }

    /// Load an explicit file, or the default file when it exists, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    tracing::debug!(path = %path.display(), "No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: SparkdefConfig = toml::from_str("").unwrap();
        assert_eq!(config.compiler.javac_bin, "javac");
        assert_eq!(config.compiler.jar_bin, "jar");
        assert_eq!(config.compiler.jar_name, "compiled.jar");
        assert!(config.compiler.classpath.is_empty());
        assert_eq!(config.scratch.prefix, "jars");
        assert!(config.scratch.root.is_none());
    }

    #[test]
    fn parses_full_config() {
        let toml_str = r#"
[compiler]
javac_bin = "/opt/jdk/bin/javac"
jar_bin = "/opt/jdk/bin/jar"
jar_name = "user.jar"
classpath = ["/opt/spark/jars/spark-core.jar"]
options = ["-source", "17"]

[scratch]
root = "/var/tmp/sparkdef"
prefix = "define"
"#;
        let config: SparkdefConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.compiler.javac_bin, "/opt/jdk/bin/javac");
        assert_eq!(config.compiler.jar_name, "user.jar");
        assert_eq!(
            config.compiler.classpath,
            vec![PathBuf::from("/opt/spark/jars/spark-core.jar")]
        );
        assert_eq!(config.compiler.options, vec!["-source", "17"]);
        assert_eq!(
            config.scratch.root,
            Some(PathBuf::from("/var/tmp/sparkdef"))
        );
        assert_eq!(config.scratch.prefix, "define");
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[compiler\n").unwrap();

        let err = SparkdefConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }
}
