//! # snowmock
//!
//! Unit tests for dbt models on Snowflake, with upstream tables replaced
//! by literal rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          MockTable (model name + rows of Values)         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::encoder, sql::literal_table]
//! ┌─────────────────────────────────────────────────────────┐
//! │        (SELECT ... AS f UNION ALL SELECT ... AS f)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [manifest::resolve]
//! ┌─────────────────────────────────────────────────────────┐
//! │     MockSubstitution (literal table + database.schema.t) │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::rewrite, dbt compiled SQL]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Rewritten model SQL                      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [warehouse, worker]
//! ┌─────────────────────────────────────────────────────────┐
//! │                      ResultTable                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dbt;
pub mod manifest;
pub mod mock;
pub mod session;
pub mod sql;
pub mod warehouse;
pub mod worker;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::dbt::RunType;
    pub use crate::manifest::{resolve_fully_qualified_name, Manifest, TableIdentifier};
    pub use crate::mock::MockTable;
    pub use crate::session::{rewrite_and_execute, SessionError, SessionResult, TestSession};
    pub use crate::sql::{build_literal_table, encode, LiteralEncoder, Row, Value};
    pub use crate::warehouse::{ResultTable, Warehouse};
}

pub use session::TestSession;
pub use sql::{Row, Value};
