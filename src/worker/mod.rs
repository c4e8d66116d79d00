//! Worker communication module.
//!
//! Snowflake has no first-class Rust driver, so queries go through an
//! external worker process that owns the warehouse connection.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    snowmock (Rust + Tokio)                      │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                    WorkerClient (Async)                   │  │
//! │  │  - Spawns the worker as child process                     │  │
//! │  │  - NDJSON protocol over stdin/stdout                      │  │
//! │  │  - Request IDs for request/response correlation           │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │               stdin (NDJSON) │ stdout (NDJSON)                  │
//! └──────────────────────────────┼──────────────────────────────────┘
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │          Worker (one Snowflake connection per session)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use snowmock::worker::{WorkerClient, protocol::ConnectionParams};
//!
//! let client = WorkerClient::spawn("./snowflake-worker", &[], None).await?;
//! let connection = ConnectionParams {
//!     driver: "snowflake".to_string(),
//!     connection_string: std::env::var("SNOWFLAKE_CONNECTION_STRING")?,
//! };
//! client.open_connection(&connection).await?;
//! let response = client.execute_query(&connection, "select 1 as one").await?;
//! ```

mod client;
mod error;
pub mod protocol;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
