//! Protocol types for worker communication.
//!
//! One JSON object per line in each direction. Requests carry an `id`
//! that the matching response echoes back.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Envelope
// ============================================================================

/// Request envelope sent to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    /// Method name (e.g., "query.execute").
    pub method: String,
    /// Method-specific parameters.
    pub params: serde_json::Value,
}

/// Response envelope received from the worker.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to.
    pub id: String,
    /// Whether the request succeeded.
    pub success: bool,
    /// Result data (present if success = true).
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error information (present if success = false).
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Error information in a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

// ============================================================================
// Parameters
// ============================================================================

/// Warehouse connection parameters, included in every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Driver name (e.g., "snowflake").
    pub driver: String,
    /// Driver-specific connection string.
    pub connection_string: String,
}

/// Parameters for `connection.open` and `connection.close`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionRequestParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
}

/// Parameters for `query.execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteQueryParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// SQL query to execute.
    pub sql: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Column information in query results.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResultColumn {
    /// Column name or alias.
    pub name: String,
    /// Warehouse type name.
    #[serde(default)]
    pub data_type: String,
}

/// Response from `query.execute`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteQueryResponse {
    pub columns: Vec<QueryResultColumn>,
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub row_count: Option<i64>,
}

/// Response from `connection.open` / `connection.close`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Method Names
// ============================================================================

/// Worker method names.
pub mod methods {
    pub const OPEN_CONNECTION: &str = "connection.open";
    pub const CLOSE_CONNECTION: &str = "connection.close";
    pub const EXECUTE_QUERY: &str = "query.execute";
}
