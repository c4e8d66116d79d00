//! Mock tables.
//!
//! A [`MockTable`] is the stand-in for one upstream model: the name the
//! model is known by plus the rows it should contain during a test.
//!
//! Mock files used by the CLI have the shape
//!
//! ```json
//! {"model": "email_events", "rows": [{"event_type": "sent", "id": 1}]}
//! ```
//!
//! Field order inside each row object is kept.

use serde::Deserialize;

use crate::sql::literal_table::Row;
use crate::warehouse::ResultTable;

/// What a mock holds.
#[derive(Debug, Clone, PartialEq)]
pub enum MockKind {
    /// Literal rows. Only these can replace a dependency.
    Rows(Vec<Row>),
    /// The output of an earlier model run.
    Result(ResultTable),
}

/// Rows standing in for a model.
#[derive(Debug, Clone, PartialEq)]
pub struct MockTable {
    pub model_name: String,
    pub kind: MockKind,
}

#[derive(Deserialize)]
struct MockFile {
    model: String,
    #[serde(default)]
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl MockTable {
    pub fn from_rows(model_name: impl Into<String>, rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            model_name: model_name.into(),
            kind: MockKind::Rows(rows.into_iter().collect()),
        }
    }

    /// Wrap a result table under a model name.
    ///
    /// Such a mock is rejected when passed as a substitution.
    pub fn from_result(model_name: impl Into<String>, table: ResultTable) -> Self {
        Self {
            model_name: model_name.into(),
            kind: MockKind::Result(table),
        }
    }

    /// Parse a mock file.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: MockFile = serde_json::from_str(json)?;
        Ok(Self::from_rows(file.model, file.rows.into_iter().map(Row::from)))
    }

    /// The rows, or `None` for a wrapped result table.
    pub fn rows(&self) -> Option<&[Row]> {
        match &self.kind {
            MockKind::Rows(rows) => Some(rows),
            MockKind::Result(_) => None,
        }
    }
}
