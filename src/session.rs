//! Test sessions: compile once, then run models against mocked inputs.
//!
//! ```text
//! TestSession::start ──► worker warehouse + dbt compile (full refresh, incremental)
//!        │
//!        ▼
//! run_model(model, run type, mocks)
//!    resolve each mock ──► literal table ──► rewrite compiled SQL ──► execute
//!        │
//!        ▼
//! ResultTable
//! ```
//!
//! # Example
//!
//! ```ignore
//! use snowmock::prelude::*;
//!
//! let session = TestSession::start(Settings::load()?).await?;
//! let events = MockTable::from_rows("email_events", vec![
//!     Row::new().with("event_type", "sent").with("correlation_id", 1),
//! ]);
//! let table = session.run_model("email_summary", RunType::FullRefresh, &[events]).await?;
//! session.close().await?;
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::config::{CompileMode, Settings, SettingsError};
use crate::dbt::{CompiledSqlCache, DbtError, DbtRunner, RunType};
use crate::manifest::{resolve_fully_qualified_name, DependencyEntry, Manifest, ResolveError};
use crate::mock::MockTable;
use crate::sql::encoder::{EncodeError, LiteralEncoder};
use crate::sql::literal_table::{build_literal_table, Row};
use crate::sql::rewrite::replace_table_references;
use crate::warehouse::{ResultTable, Warehouse, WorkerWarehouse};
use crate::worker::protocol::ConnectionParams;
use crate::worker::WorkerError;

static DUPLICATE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)duplicate\s+alias").unwrap());

const DUPLICATE_ALIAS_HINT: &str = "Give each table in the query an alias if it references a ref";

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while running a model with mocks.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Dbt(#[from] DbtError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("Mock for '{model}' wraps a result table. Build it from rows to use it as a mock")]
    TypeMismatch { model: String },

    #[error("{message}{}", hint_suffix(.hint))]
    WarehouseExecution {
        message: String,
        hint: Option<String>,
        sql: String,
    },
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref().map(|h| format!("\nHint: {}", h)).unwrap_or_default()
}

impl SessionError {
    /// Wrap a failed query, attaching a hint for errors with a known fix.
    pub fn warehouse_execution(message: impl Into<String>, sql: impl Into<String>) -> Self {
        let message = message.into();
        let hint = DUPLICATE_ALIAS
            .is_match(&message)
            .then(|| DUPLICATE_ALIAS_HINT.to_string());
        Self::WarehouseExecution {
            message,
            hint,
            sql: sql.into(),
        }
    }
}

/// A mock's rows together with the table they replace.
#[derive(Debug, Clone)]
pub struct MockSubstitution<'a> {
    pub dependency: DependencyEntry,
    pub rows: &'a [Row],
}

/// Resolve each mock against the dependencies of `owner`.
pub fn plan_substitutions<'a>(
    mocks: &'a [MockTable],
    manifest: &Manifest,
    project: &str,
    owner: &str,
) -> SessionResult<Vec<MockSubstitution<'a>>> {
    mocks
        .iter()
        .map(|mock| {
            let rows = mock.rows().ok_or_else(|| SessionError::TypeMismatch {
                model: mock.model_name.clone(),
            })?;
            let dependency = resolve_fully_qualified_name(&mock.model_name, manifest, project, owner)?;
            Ok(MockSubstitution { dependency, rows })
        })
        .collect()
}

/// Replace every reference to each substituted table with its literal rows.
pub fn rewrite(
    sql: &str,
    substitutions: &[MockSubstitution<'_>],
    encoder: &LiteralEncoder,
) -> Result<String, EncodeError> {
    let literals = substitutions
        .iter()
        .map(|substitution| build_literal_table(substitution.rows, encoder))
        .collect::<Result<Vec<_>, _>>()?;
    let targets: Vec<_> = substitutions
        .iter()
        .zip(&literals)
        .map(|(substitution, literal)| (&substitution.dependency.identifier, literal.as_str()))
        .collect();

    let replaced = replace_table_references(sql, &targets);
    for ((identifier, _), count) in targets.iter().zip(&replaced.counts) {
        if *count == 0 {
            warn!(table = %identifier, "mocked table is not referenced by the compiled SQL");
        }
    }
    Ok(replaced.sql)
}

/// Rewrite `compiled_sql` with the substitutions and run it.
pub async fn rewrite_and_execute<W>(
    compiled_sql: &str,
    substitutions: &[MockSubstitution<'_>],
    warehouse: &W,
    encoder: &LiteralEncoder,
) -> SessionResult<ResultTable>
where
    W: Warehouse + ?Sized,
{
    let sql = rewrite(compiled_sql, substitutions, encoder)?;
    info!("executing rewritten SQL:\n{}", sql);

    match warehouse.execute(&sql).await {
        Ok(table) => {
            debug!("result ({} rows):\n{}", table.len(), table);
            Ok(table)
        }
        Err(e) => {
            error!(error = %e, "query failed:\n{}", sql);
            Err(SessionError::warehouse_execution(e.to_string(), sql))
        }
    }
}

/// A warehouse connection plus the compiled project.
///
/// Created once per test run and closed at the end. The worker behind a
/// [`WorkerWarehouse`] is killed if the session is dropped unclosed.
pub struct TestSession<W: Warehouse = WorkerWarehouse> {
    warehouse: W,
    settings: Settings,
    runner: DbtRunner,
    manifest: Manifest,
    cache: CompiledSqlCache,
    encoder: LiteralEncoder,
}

impl TestSession<WorkerWarehouse> {
    /// Spawn the worker, open the connection and compile the project.
    pub async fn start(settings: Settings) -> SessionResult<Self> {
        settings.validate()?;
        settings.validate_warehouse()?;

        let worker_path = settings.worker_path().ok_or_else(|| {
            SettingsError::InvalidConfig("worker.path is not set".to_string())
        })?;
        let connection = ConnectionParams {
            driver: settings.warehouse.driver.clone(),
            connection_string: settings.warehouse.resolved_connection_string()?,
        };
        let timeout = settings.worker.timeout_seconds.map(Duration::from_secs);

        let warehouse =
            WorkerWarehouse::connect(worker_path, &settings.worker.args, timeout, connection).await?;
        Self::start_with(warehouse, settings).await
    }
}

impl<W: Warehouse> TestSession<W> {
    /// Compile the project and build a session around `warehouse`.
    ///
    /// In session compile mode the project is compiled with
    /// `--full-refresh` and then without it, caching the SQL of both run
    /// types. The warehouse is closed if the settings are invalid or
    /// compiling fails.
    pub async fn start_with(warehouse: W, settings: Settings) -> SessionResult<Self> {
        match prepare_project(&settings).await {
            Ok((manifest, cache)) => Ok(Self::from_parts(warehouse, manifest, cache, settings)),
            Err(e) => {
                if let Err(close) = warehouse.close().await {
                    warn!(error = %close, "failed to close warehouse");
                }
                Err(e)
            }
        }
    }

    /// Assemble a session from already-loaded parts.
    pub fn from_parts(
        warehouse: W,
        manifest: Manifest,
        cache: CompiledSqlCache,
        settings: Settings,
    ) -> Self {
        let runner = DbtRunner::new(settings.dbt.clone());
        Self {
            warehouse,
            settings,
            runner,
            manifest,
            cache,
            encoder: LiteralEncoder::snowflake(),
        }
    }

    /// Replace the literal encoder.
    pub fn with_encoder(mut self, encoder: LiteralEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// The literal encoder, for registering extra type rules.
    pub fn encoder_mut(&mut self) -> &mut LiteralEncoder {
        &mut self.encoder
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn cache(&self) -> &CompiledSqlCache {
        &self.cache
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Run `model` with its dependencies replaced by `mocks`.
    pub async fn run_model(
        &self,
        model: &str,
        run_type: RunType,
        mocks: &[MockTable],
    ) -> SessionResult<ResultTable> {
        let (sql, substitutions) = self.prepare(model, run_type, mocks).await?;
        rewrite_and_execute(&sql, &substitutions, &self.warehouse, &self.encoder).await
    }

    /// The SQL [`run_model`](Self::run_model) would execute.
    pub async fn rewrite_model(
        &self,
        model: &str,
        run_type: RunType,
        mocks: &[MockTable],
    ) -> SessionResult<String> {
        let (sql, substitutions) = self.prepare(model, run_type, mocks).await?;
        Ok(rewrite(&sql, &substitutions, &self.encoder)?)
    }

    /// Close the warehouse connection.
    pub async fn close(self) -> SessionResult<()> {
        self.warehouse.close().await?;
        info!("test session closed");
        Ok(())
    }

    async fn prepare<'m>(
        &self,
        model: &str,
        run_type: RunType,
        mocks: &'m [MockTable],
    ) -> SessionResult<(String, Vec<MockSubstitution<'m>>)> {
        let project = &self.settings.dbt.project_name;
        let fresh;

        let (sql, manifest) = match self.settings.dbt.compile_mode {
            CompileMode::Session => {
                let sql = self.cache.get(model, run_type).ok_or_else(|| {
                    DbtError::MissingCompiledSql {
                        model: model.to_string(),
                        command: self.runner.command_line(None, run_type),
                    }
                })?;
                (sql.to_string(), &self.manifest)
            }
            CompileMode::PerModel => {
                fresh = self.runner.compile_manifest(Some(model), run_type).await?;
                let sql = fresh
                    .model(project, model)
                    .and_then(|node| node.compiled())
                    .ok_or_else(|| DbtError::MissingCompiledSql {
                        model: model.to_string(),
                        command: self.runner.command_line(Some(model), run_type),
                    })?;
                (sql.to_string(), &fresh)
            }
        };

        let substitutions = plan_substitutions(mocks, manifest, project, model)?;
        Ok((sql, substitutions))
    }
}

async fn prepare_project(settings: &Settings) -> SessionResult<(Manifest, CompiledSqlCache)> {
    settings.validate()?;
    match settings.dbt.compile_mode {
        CompileMode::Session => Ok(compile_project(&DbtRunner::new(settings.dbt.clone())).await?),
        CompileMode::PerModel => Ok((Manifest::default(), CompiledSqlCache::new())),
    }
}

async fn compile_project(runner: &DbtRunner) -> Result<(Manifest, CompiledSqlCache), DbtError> {
    let mut cache = CompiledSqlCache::new();
    let mut manifest = Manifest::default();
    for run_type in RunType::ALL {
        manifest = runner.compile_manifest(None, run_type).await?;
        let stored = cache.populate(&manifest, run_type);
        info!(%run_type, models = stored, "cached compiled SQL");
    }
    Ok((manifest, cache))
}
