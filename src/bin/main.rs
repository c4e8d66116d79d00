//! snowmock CLI - Run dbt models against mocked inputs
//!
//! Usage:
//!   snowmock render <mock.json>
//!   snowmock resolve --model <owner> <name>
//!   snowmock rewrite --model <model> [--compile [--run-type <type>]] <mock.json>...
//!   snowmock run --model <model> [--run-type <type>] <mock.json>...
//!
//! Examples:
//!   snowmock render mocks/email_events.json
//!   snowmock resolve --model email_summary email_events
//!   snowmock rewrite --model email_summary --compile mocks/email_events.json
//!   snowmock run --model email_summary --run-type incremental mocks/email_events.json

use clap::{Parser, Subcommand, ValueEnum};
use snowmock::config::Settings;
use snowmock::dbt::{DbtRunner, RunType};
use snowmock::manifest::{resolve_fully_qualified_name, Manifest};
use snowmock::mock::MockTable;
use snowmock::session::{plan_substitutions, rewrite, TestSession};
use snowmock::sql::{build_literal_table, LiteralEncoder};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snowmock")]
#[command(about = "snowmock - Unit test dbt models on Snowflake with mocked dependencies")]
#[command(version)]
struct Cli {
    /// Config file (defaults to SNOWMOCK_CONFIG, ./snowmock.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the literal table for a mock file
    Render {
        /// Path to the mock file
        file: PathBuf,
    },

    /// Print the fully-qualified table a name resolves to
    Resolve {
        /// Model whose dependencies are searched
        #[arg(short, long)]
        model: String,

        /// Dependency name
        name: String,
    },

    /// Print a model's SQL with its dependencies replaced by mocks
    Rewrite {
        /// Model to rewrite
        #[arg(short, long)]
        model: String,

        /// Run type to compile (default: full-refresh). Only valid with --compile;
        /// without it the manifest already in target/ is used as is
        #[arg(short, long, requires = "compile")]
        run_type: Option<RunTypeArg>,

        /// Run `dbt compile --select <model>` first
        #[arg(long)]
        compile: bool,

        /// Mock files
        mocks: Vec<PathBuf>,
    },

    /// Run a model against the warehouse with mocked dependencies
    Run {
        /// Model to run
        #[arg(short, long)]
        model: String,

        #[arg(short, long, default_value = "full-refresh")]
        run_type: RunTypeArg,

        /// Mock files
        mocks: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunTypeArg {
    FullRefresh,
    Incremental,
}

impl From<RunTypeArg> for RunType {
    fn from(arg: RunTypeArg) -> Self {
        match arg {
            RunTypeArg::FullRefresh => RunType::FullRefresh,
            RunTypeArg::Incremental => RunType::Incremental,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("snowmock=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { file } => cmd_render(&file),
        Commands::Resolve { model, name } => cmd_resolve(cli.config.as_deref(), &model, &name),
        Commands::Rewrite {
            model,
            run_type,
            compile,
            mocks,
        } => {
            let run_type = run_type.unwrap_or(RunTypeArg::FullRefresh).into();
            cmd_rewrite(cli.config.as_deref(), &model, run_type, compile, &mocks).await
        }
        Commands::Run {
            model,
            run_type,
            mocks,
        } => cmd_run(cli.config.as_deref(), &model, run_type.into(), &mocks).await,
    }
}

fn cmd_render(file: &Path) -> ExitCode {
    let mock = match read_mock(file) {
        Ok(mock) => mock,
        Err(code) => return code,
    };

    let rows = mock.rows().unwrap_or_default();
    match build_literal_table(rows, &LiteralEncoder::snowflake()) {
        Ok(sql) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error rendering '{}': {}", file.display(), e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_resolve(config: Option<&Path>, model: &str, name: &str) -> ExitCode {
    let settings = match load_settings(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let manifest = match load_manifest(&settings) {
        Ok(m) => m,
        Err(code) => return code,
    };

    match resolve_fully_qualified_name(name, &manifest, &settings.dbt.project_name, model) {
        Ok(entry) => {
            println!("{}", entry.identifier);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_rewrite(
    config: Option<&Path>,
    model: &str,
    run_type: RunType,
    compile: bool,
    files: &[PathBuf],
) -> ExitCode {
    let settings = match load_settings(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let mocks = match read_mocks(files) {
        Ok(m) => m,
        Err(code) => return code,
    };

    if compile {
        let runner = DbtRunner::new(settings.dbt.clone());
        if let Err(e) = runner.compile(Some(model), run_type).await {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }
    let manifest = match load_manifest(&settings) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let project = &settings.dbt.project_name;
    let Some(compiled) = manifest.model(project, model).and_then(|node| node.compiled()) else {
        eprintln!(
            "Error: model '{}' has no compiled SQL. Run `snowmock rewrite --compile` or `dbt compile` first",
            model
        );
        return ExitCode::FAILURE;
    };

    let result = plan_substitutions(&mocks, &manifest, project, model).and_then(|substitutions| {
        Ok(rewrite(compiled, &substitutions, &LiteralEncoder::snowflake())?)
    });
    match result {
        Ok(sql) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_run(config: Option<&Path>, model: &str, run_type: RunType, files: &[PathBuf]) -> ExitCode {
    let settings = match load_settings(config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let mocks = match read_mocks(files) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let session = match TestSession::start(settings).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error starting session: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = session.run_model(model, run_type, &mocks).await;
    let closed = session.close().await;

    match result {
        Ok(table) => {
            println!("{}", table);
            println!("({} rows)", table.len());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if let Err(e) = closed {
        eprintln!("Error closing session: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn load_settings(config: Option<&Path>) -> Result<Settings, ExitCode> {
    let loaded = match config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    loaded.and_then(|s| s.validate().map(|_| s)).map_err(|e| {
        eprintln!("Error loading config: {}", e);
        ExitCode::FAILURE
    })
}

fn load_manifest(settings: &Settings) -> Result<Manifest, ExitCode> {
    let path = DbtRunner::new(settings.dbt.clone()).manifest_path();
    Manifest::load(&path).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    })
}

fn read_mock(file: &Path) -> Result<MockTable, ExitCode> {
    let source = fs::read_to_string(file).map_err(|e| {
        eprintln!("Error reading file '{}': {}", file.display(), e);
        ExitCode::FAILURE
    })?;
    MockTable::from_json(&source).map_err(|e| {
        eprintln!("Error parsing mock '{}': {}", file.display(), e);
        ExitCode::FAILURE
    })
}

fn read_mocks(files: &[PathBuf]) -> Result<Vec<MockTable>, ExitCode> {
    files.iter().map(|f| read_mock(f)).collect()
}
