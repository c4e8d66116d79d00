//! Tabular query results.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value as JsonValue;

use crate::worker::protocol::ExecuteQueryResponse;

static NULL: JsonValue = JsonValue::Null;

/// Rows returned by the warehouse.
///
/// Column names are lowercased on construction, since Snowflake reports
/// unquoted identifiers in upper case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<JsonValue>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self {
            columns: columns.into_iter().map(|c| c.to_lowercase()).collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<JsonValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.columns.iter().position(|c| *c == name)
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&JsonValue>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).unwrap_or(&NULL))
                .collect(),
        )
    }

    /// One column rendered as text.
    pub fn column_text(&self, name: &str) -> Option<Vec<String>> {
        Some(self.column(name)?.into_iter().map(cell_text).collect())
    }

    /// The distinct values of one column, rendered as text.
    pub fn distinct_text(&self, name: &str) -> Option<BTreeSet<String>> {
        Some(self.column_text(name)?.into_iter().collect())
    }

    /// Whether any cell of the column contains `needle` once rendered as text.
    ///
    /// Variant columns arrive as JSON, so this finds strings nested
    /// anywhere inside them.
    pub fn column_contains(&self, name: &str, needle: &str) -> bool {
        self.column_text(name)
            .is_some_and(|cells| cells.iter().any(|cell| cell.contains(needle)))
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&JsonValue> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx)
    }
}

impl From<ExecuteQueryResponse> for ResultTable {
    fn from(response: ExecuteQueryResponse) -> Self {
        ResultTable::new(
            response.columns.into_iter().map(|c| c.name).collect(),
            response.rows,
        )
    }
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:^w$}", c, w = *w))
            .collect();
        writeln!(f, "{}", header.join(" | "))?;

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write!(f, "{}", rule.join("-+-"))?;

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<w$}", c, w = *w))
                .collect();
            write!(f, "\n{}", line.join(" | "))?;
        }
        Ok(())
    }
}
