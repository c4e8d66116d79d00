//! dbt manifest model.
//!
//! Only the parts of `target/manifest.json` the mock engine needs are
//! modelled; every other field is ignored on deserialization.
//!
//! ```text
//! {
//!   "nodes":   { "model.<project>.<name>": { name, database, schema, alias,
//!                                            depends_on: { nodes: [...] },
//!                                            compiled_code | compiled_sql } },
//!   "sources": { "source.<project>.<source>.<name>": { name, identifier,
//!                                                      database, schema } }
//! }
//! ```

mod resolve;

pub use resolve::{resolve_fully_qualified_name, DependencyEntry, ResolveError};

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::dbt::DbtError;

/// A fully-qualified warehouse table name, stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    pub database: String,
    pub schema: String,
    pub name: String,
}

impl TableIdentifier {
    pub fn new(database: impl AsRef<str>, schema: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            database: database.as_ref().to_lowercase(),
            schema: schema.as_ref().to_lowercase(),
            name: name.as_ref().to_lowercase(),
        }
    }

    /// `"database"."schema"."name"`.
    pub fn quoted(&self) -> String {
        format!("\"{}\".\"{}\".\"{}\"", self.database, self.schema, self.name)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.name)
    }
}

/// The `depends_on` block of a node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependsOn {
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// A model (or seed, snapshot, test) node.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestNode {
    pub name: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub depends_on: DependsOn,
    /// dbt >= 1.3.
    #[serde(default)]
    pub compiled_code: Option<String>,
    /// dbt < 1.3.
    #[serde(default)]
    pub compiled_sql: Option<String>,
}

impl ManifestNode {
    /// Compiled SQL, whichever field this dbt version writes.
    pub fn compiled(&self) -> Option<&str> {
        self.compiled_code
            .as_deref()
            .or(self.compiled_sql.as_deref())
    }

    pub fn identifier(&self) -> TableIdentifier {
        TableIdentifier::new(
            self.database.as_deref().unwrap_or_default(),
            self.schema.as_deref().unwrap_or_default(),
            self.alias.as_deref().unwrap_or(&self.name),
        )
    }
}

/// A source definition.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceNode {
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

impl SourceNode {
    pub fn identifier(&self) -> TableIdentifier {
        TableIdentifier::new(
            self.database.as_deref().unwrap_or_default(),
            self.schema.as_deref().unwrap_or_default(),
            self.identifier.as_deref().unwrap_or(&self.name),
        )
    }
}

/// The parsed manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub nodes: HashMap<String, ManifestNode>,
    #[serde(default)]
    pub sources: HashMap<String, SourceNode>,
}

impl Manifest {
    /// Load a manifest from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DbtError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DbtError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| DbtError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Unique id of a model: `model.<project>.<name>`.
    pub fn model_id(project: &str, model: &str) -> String {
        format!("model.{}.{}", project, model)
    }

    /// Look up a model node by project and short name.
    pub fn model(&self, project: &str, model: &str) -> Option<&ManifestNode> {
        self.nodes.get(&Self::model_id(project, model))
    }
}
