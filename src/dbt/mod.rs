//! dbt invocation and the compiled SQL cache.
//!
//! ```text
//! dbt compile --profiles-dir <dir> --target <target> [--select <model>] [--full-refresh]
//!        │
//!        ▼
//! target/manifest.json ──► Manifest ──► CompiledSqlCache[(model, run type)]
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::DbtSettings;
use crate::manifest::Manifest;

/// Errors from running dbt or reading its output.
#[derive(Debug, thiserror::Error)]
pub enum DbtError {
    #[error("Failed to run `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Something went wrong when trying to compile dbt (`{command}`):\n{output}")]
    CompileFailure { command: String, output: String },

    #[error("Failed to read manifest {}: {source}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse manifest {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model '{model}' has no compiled SQL. Please run: {command}")]
    MissingCompiledSql { model: String, command: String },
}

/// Which compiled variant of a model to test.
///
/// Incremental models compile differently under `--full-refresh`
/// (`is_incremental()` is false), so both variants are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    FullRefresh,
    Incremental,
}

impl RunType {
    pub const ALL: [RunType; 2] = [RunType::FullRefresh, RunType::Incremental];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::FullRefresh => "full_refresh",
            RunType::Incremental => "incremental",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs `dbt compile` for a project.
#[derive(Debug, Clone)]
pub struct DbtRunner {
    settings: DbtSettings,
}

impl DbtRunner {
    pub fn new(settings: DbtSettings) -> Self {
        Self { settings }
    }

    /// Arguments passed after the executable.
    pub fn compile_args(&self, select: Option<&str>, run_type: RunType) -> Vec<String> {
        let mut args = vec![
            "compile".to_string(),
            "--profiles-dir".to_string(),
            self.settings.profiles_dir.clone(),
            "--target".to_string(),
            self.settings.target.clone(),
        ];
        if let Some(model) = select {
            args.push("--select".to_string());
            args.push(model.to_string());
        }
        if run_type == RunType::FullRefresh {
            args.push("--full-refresh".to_string());
        }
        args.extend(self.settings.extra_args.iter().cloned());
        args
    }

    /// The full command line, for logs and error messages.
    pub fn command_line(&self, select: Option<&str>, run_type: RunType) -> String {
        let mut parts = vec![self.settings.executable.clone()];
        parts.extend(self.compile_args(select, run_type));
        parts.join(" ")
    }

    /// Path of the manifest dbt writes.
    pub fn manifest_path(&self) -> PathBuf {
        PathBuf::from(&self.settings.project_dir).join(&self.settings.manifest_path)
    }

    /// Run `dbt compile`.
    ///
    /// Any output on stderr, or a non-zero exit status, is a compile failure.
    pub async fn compile(&self, select: Option<&str>, run_type: RunType) -> Result<(), DbtError> {
        let command = self.command_line(select, run_type);
        info!(%command, "compiling dbt project");

        let output = Command::new(&self.settings.executable)
            .args(self.compile_args(select, run_type))
            .current_dir(&self.settings.project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| DbtError::SpawnFailed {
                command: command.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(%stdout, "dbt compile output");

        if !stderr.trim().is_empty() {
            return Err(DbtError::CompileFailure {
                command,
                output: stderr.trim().to_string(),
            });
        }
        if !output.status.success() {
            // dbt reports compilation errors on stdout.
            return Err(DbtError::CompileFailure {
                command,
                output: format!("{}\n{}", output.status, stdout.trim()),
            });
        }

        Ok(())
    }

    /// Compile, then load the manifest it produced.
    pub async fn compile_manifest(
        &self,
        select: Option<&str>,
        run_type: RunType,
    ) -> Result<Manifest, DbtError> {
        self.compile(select, run_type).await?;
        Manifest::load(self.manifest_path())
    }
}

/// Compiled SQL per (model name, run type).
#[derive(Debug, Clone, Default)]
pub struct CompiledSqlCache {
    entries: HashMap<(String, RunType), String>,
}

impl CompiledSqlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the compiled SQL of every node in `manifest` that has some.
    ///
    /// Entries are keyed by node name. Nodes are visited in unique id
    /// order and the first node with a given name wins, so versioned
    /// models (`model.p.x.v1`, `model.p.x.v2`) resolve the same way on
    /// every run. Returns the number of entries stored.
    pub fn populate(&mut self, manifest: &Manifest, run_type: RunType) -> usize {
        let mut nodes: Vec<_> = manifest.nodes.iter().collect();
        nodes.sort_by(|a, b| a.0.cmp(b.0));

        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut stored = 0;
        for (unique_id, node) in nodes {
            let Some(sql) = node.compiled() else {
                continue;
            };
            if let Some(kept) = seen.get(node.name.as_str()) {
                warn!(
                    model = %node.name,
                    kept = %kept,
                    skipped = %unique_id,
                    "several nodes share a model name, caching the first"
                );
                continue;
            }
            seen.insert(node.name.as_str(), unique_id.as_str());
            self.insert(&node.name, run_type, sql);
            stored += 1;
        }
        stored
    }

    pub fn insert(&mut self, model: impl Into<String>, run_type: RunType, sql: impl Into<String>) {
        self.entries.insert((model.into(), run_type), sql.into());
    }

    pub fn get(&self, model: &str, run_type: RunType) -> Option<&str> {
        self.entries
            .get(&(model.to_string(), run_type))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
