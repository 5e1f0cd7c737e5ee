use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sparkdef_core::{Interpreter, InterpreterContext, InterpreterResult};
use sparkdef_pipeline::SparkdefConfig;
use tracing_subscriber::{EnvFilter, fmt};

mod session;

#[derive(Parser)]
#[command(
    name = "sparkdef",
    about = "sparkdef: compile notebook code into a jar and load it as a dependency"
)]
struct Cli {
    /// Config file (defaults to ~/.sparkdef/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Note id used for the session group
    #[arg(long, global = true, default_value = "cli")]
    note: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file (or `-` for stdin) and load the jar
    Run { file: PathBuf },
    /// Ask the dependency loader for completions
    Complete {
        buf: String,
        #[arg(long)]
        cursor: Option<usize>,
    },
    /// List registered interpreters
    List,
}

#[derive(Serialize)]
struct RunReport<'a> {
    result: &'a InterpreterResult,
    loaded: Vec<PathBuf>,
}

fn read_source(file: &PathBuf) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("reading source from stdin")?;
        Ok(code)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so results on stdout stay machine-readable
    fmt()
        .with_env_filter(EnvFilter::from_env("SPARKDEF_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SparkdefConfig::load(cli.config.as_deref())?;
    let session = session::start(&cli.note, &config).await?;

    let code = match cli.command {
        Command::Run { file } => {
            let source = read_source(&file)?;
            let context = InterpreterContext::new(&cli.note);
            tracing::info!(
                file = %file.display(),
                paragraph = %context.paragraph_id,
                "Running source"
            );

            let result = session.define.interpret(&source, &context).await;
            let loaded = session.dep.classpath().await;

            if cli.json {
                let report = RunReport {
                    result: &result,
                    loaded,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if result.is_success() {
                println!("{}", result.message);
            } else {
                eprintln!("{}", result.message);
            }

            if result.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Complete { buf, cursor } => {
            let cursor = cursor.unwrap_or(buf.len());
            let candidates = session.define.completion(&buf, cursor).await;
            if cli.json {
                println!("{}", serde_json::to_string(&candidates)?);
            } else {
                for candidate in candidates {
                    println!("{candidate}");
                }
            }
            ExitCode::SUCCESS
        }
        Command::List => {
            let infos: Vec<_> = session.registry.list().collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else {
                for info in infos {
                    println!("%{}.{}\t{}", info.group, info.name, info.class_name);
                }
            }
            ExitCode::SUCCESS
        }
    };

    session.group.close_all().await;
    Ok(code)
}
