//! Row-set literal builder.
//!
//! Turns an ordered sequence of [`Row`]s into a parenthesized derived table
//! that can stand in anywhere a table reference is valid:
//!
//! ```text
//! (SELECT 'sent'::text AS email_status, 1::number AS id
//! UNION ALL
//! SELECT 'answered'::text AS email_status, 2::number AS id)
//! ```

use super::encoder::{EncodeError, LiteralEncoder};
use super::value::Value;

/// An ordered mapping from field name to value.
///
/// Field order is the column order of the generated `SELECT`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field. A repeated name replaces the earlier value in place.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.push(k, v);
        }
        row
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Row {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}

/// Render one row as `SELECT <v> AS <field>, ...`.
fn select_clause(row: &Row, encoder: &LiteralEncoder) -> Result<String, EncodeError> {
    let columns = row
        .fields()
        .map(|(name, value)| Ok(format!("{} AS {}", encoder.encode(value)?, name)))
        .collect::<Result<Vec<_>, EncodeError>>()?;
    Ok(format!("SELECT {}", columns.join(", ")))
}

/// Build the `UNION ALL` literal table for a sequence of rows.
///
/// An empty sequence yields `()`, which is not valid SQL; guarding
/// against empty mocks is left to the caller.
pub fn build_literal_table(rows: &[Row], encoder: &LiteralEncoder) -> Result<String, EncodeError> {
    let clauses = rows
        .iter()
        .map(|row| select_clause(row, encoder))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("({})", clauses.join("\nUNION ALL\n")))
}
