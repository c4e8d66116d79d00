//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use snowmock::config::{CompileMode, DbtSettings, Settings};
use snowmock::manifest::Manifest;
use snowmock::warehouse::{ResultTable, Warehouse};
use snowmock::worker::{WorkerError, WorkerResult};

pub const PROJECT: &str = "mailing";

/// A small `mailing` project.
///
/// `fct_email_events` reads `stg_email_events` and, when incremental, its
/// own table. `fct_email_reminders` reads two models whose ids share a
/// prefix, plus a source.
pub const MANIFEST: &str = r#"{
    "metadata": {"dbt_version": "1.7.4", "project_name": "mailing"},
    "nodes": {
        "model.mailing.stg_email_events": {
            "name": "stg_email_events",
            "resource_type": "model",
            "database": "ANALYTICS",
            "schema": "STAGING",
            "alias": null,
            "depends_on": {"macros": [], "nodes": ["source.mailing.sendgrid.events"]},
            "compiled_code": "select * from RAW.SENDGRID.EVENTS_V1"
        },
        "model.mailing.stg_email_events_archive": {
            "name": "stg_email_events_archive",
            "resource_type": "model",
            "database": "ANALYTICS",
            "schema": "STAGING",
            "alias": "email_events_archive",
            "depends_on": {"macros": [], "nodes": []},
            "compiled_code": "select 1 as email_id"
        },
        "model.mailing.fct_email_events": {
            "name": "fct_email_events",
            "resource_type": "model",
            "database": "ANALYTICS",
            "schema": "MARTS",
            "alias": null,
            "depends_on": {"macros": ["macro.dbt.is_incremental"], "nodes": ["model.mailing.stg_email_events"]},
            "compiled_code": "with events as (\n    select distinct email_status, email_id, event_content\n    from ANALYTICS.STAGING.STG_EMAIL_EVENTS\n)\nselect\n    case email_status when 'sent' then 'send' else email_status end as event_type,\n    email_id,\n    event_content\nfrom events"
        },
        "model.mailing.fct_email_reminders": {
            "name": "fct_email_reminders",
            "resource_type": "model",
            "database": "ANALYTICS",
            "schema": "MARTS",
            "depends_on": {"nodes": [
                "model.mailing.stg_email_events",
                "model.mailing.stg_email_events_archive",
                "source.mailing.sendgrid.events",
                "source.mailing.sendgrid.bounces"
            ]},
            "compiled_code": "select e.email_id from analytics.staging.stg_email_events e join \"ANALYTICS\".\"STAGING\".\"EMAIL_EVENTS_ARCHIVE\" a on a.email_id = e.email_id join raw.sendgrid.events_v1 s on s.email_id = e.email_id"
        },
        "seed.mailing.email_providers": {
            "name": "email_providers",
            "resource_type": "seed",
            "database": "ANALYTICS",
            "schema": "SEEDS",
            "depends_on": {"nodes": []}
        }
    },
    "sources": {
        "source.mailing.sendgrid.events": {
            "name": "events",
            "identifier": "EVENTS_V1",
            "database": "RAW",
            "schema": "SENDGRID"
        }
    }
}"#;

/// Compiled SQL of `fct_email_events` when built incrementally.
pub const FCT_EMAIL_EVENTS_INCREMENTAL: &str = "with events as (\n    select distinct email_status, email_id, event_content\n    from ANALYTICS.STAGING.STG_EMAIL_EVENTS\n    where email_id not in (select email_id from analytics.marts.fct_email_events)\n)\nselect\n    case email_status when 'sent' then 'send' else email_status end as event_type,\n    email_id,\n    event_content\nfrom events";

pub fn manifest() -> Manifest {
    Manifest::from_json(MANIFEST).unwrap()
}

/// [`MANIFEST`] as dbt writes it for an incremental build.
pub fn incremental_manifest_json() -> String {
    let mut json: serde_json::Value = serde_json::from_str(MANIFEST).unwrap();
    json["nodes"]["model.mailing.fct_email_events"]["compiled_code"] =
        serde_json::Value::from(FCT_EMAIL_EVENTS_INCREMENTAL);
    json.to_string()
}

pub fn settings(project_dir: &Path, executable: &str, compile_mode: CompileMode) -> Settings {
    Settings {
        dbt: DbtSettings {
            executable: executable.to_string(),
            project_name: PROJECT.to_string(),
            project_dir: project_dir.display().to_string(),
            compile_mode,
            ..DbtSettings::default()
        },
        ..Settings::default()
    }
}

/// Stands in for `dbt compile`: copies a canned manifest into `target/`
/// and logs its arguments to `invocations.log`.
const FAKE_DBT: &str = r#"#!/bin/sh
mkdir -p target
case "$*" in
  *--full-refresh*) cp full_refresh.json target/manifest.json ;;
  *) cp incremental.json target/manifest.json ;;
esac
echo "$*" >> invocations.log
"#;

/// A temp project directory holding a fake `dbt` executable.
#[cfg(unix)]
pub fn fake_dbt_project() -> (tempfile::TempDir, String) {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("full_refresh.json"), MANIFEST).unwrap();
    fs::write(dir.path().join("incremental.json"), incremental_manifest_json()).unwrap();

    let script = dir.path().join("fake-dbt");
    fs::write(&script, FAKE_DBT).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let executable = script.display().to_string();
    (dir, executable)
}

/// Argument lines the fake `dbt` was called with.
pub fn dbt_invocations(project_dir: &Path) -> Vec<String> {
    fs::read_to_string(project_dir.join("invocations.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// A warehouse that records every statement and answers with a fixed table.
pub struct RecordingWarehouse {
    response: Result<ResultTable, String>,
    executed: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

impl RecordingWarehouse {
    pub fn returning(table: ResultTable) -> Self {
        Self {
            response: Ok(table),
            executed: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    /// Fail every query with a `QUERY_FAILED` worker error.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            executed: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn last_sql(&self) -> String {
        self.executed().pop().expect("no SQL was executed")
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Warehouse for RecordingWarehouse {
    async fn execute(&self, sql: &str) -> WorkerResult<ResultTable> {
        self.executed.lock().unwrap().push(sql.to_string());
        match &self.response {
            Ok(table) => Ok(table.clone()),
            Err(message) => Err(WorkerError::classify("QUERY_FAILED", message)),
        }
    }

    async fn close(&self) -> WorkerResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
pub fn occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Check `sql` parses as Snowflake SQL.
pub fn assert_parses(sql: &str) {
    use sqlparser::dialect::SnowflakeDialect;
    use sqlparser::parser::Parser;

    if let Err(e) = Parser::parse_sql(&SnowflakeDialect {}, sql) {
        panic!("invalid Snowflake SQL: {e}\n{sql}");
    }
}
