//! Dependency resolution: short model name → fully-qualified table.

use super::{Manifest, TableIdentifier};

/// Errors raised while resolving a mock's target table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Model '{0}' not found in manifest")]
    ModelNotFound(String),

    #[error("No dependency of model '{owner}' matches '{model}'")]
    DependencyNotFound { model: String, owner: String },

    #[error("'{model}' matches several dependencies of model '{owner}': {}. Use the full unique id as the mock name", .candidates.join(", "))]
    AmbiguousDependency {
        model: String,
        owner: String,
        candidates: Vec<String>,
    },

    #[error("Could not find dependency '{0}' in manifest")]
    NodeMissing(String),
}

/// A resolved dependency of the model under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    /// Manifest unique id, e.g. `model.shop.stg_orders`.
    pub unique_id: String,
    /// The name the lookup was made with.
    pub short_name: String,
    pub identifier: TableIdentifier,
}

/// Resolve `short_name` to a table the model `owner` reads from.
///
/// The owner's own name resolves to the owner's table. Any other name is
/// matched by substring against the owner's `depends_on.nodes`; exactly one
/// id must match, unless `short_name` is itself one of the ids. Ids starting
/// with `source` are looked up in `manifest.sources`, others in
/// `manifest.nodes`.
pub fn resolve_fully_qualified_name(
    short_name: &str,
    manifest: &Manifest,
    project: &str,
    owner: &str,
) -> Result<DependencyEntry, ResolveError> {
    let owner_id = Manifest::model_id(project, owner);
    let owner_node = manifest
        .nodes
        .get(&owner_id)
        .ok_or_else(|| ResolveError::ModelNotFound(owner_id.clone()))?;

    if short_name == owner {
        return Ok(DependencyEntry {
            unique_id: owner_id,
            short_name: short_name.to_string(),
            identifier: owner_node.identifier(),
        });
    }

    let candidates: Vec<&String> = owner_node
        .depends_on
        .nodes
        .iter()
        .filter(|id| id.contains(short_name))
        .collect();

    // A full unique id picks itself even when it is a prefix of another id.
    let exact = candidates.iter().find(|id| id.as_str() == short_name);

    let unique_id = match (exact, candidates.as_slice()) {
        (Some(id), _) => (*id).clone(),
        (None, []) => {
            return Err(ResolveError::DependencyNotFound {
                model: short_name.to_string(),
                owner: owner.to_string(),
            })
        }
        (None, [only]) => (*only).clone(),
        (None, many) => {
            return Err(ResolveError::AmbiguousDependency {
                model: short_name.to_string(),
                owner: owner.to_string(),
                candidates: many.iter().map(|id| (*id).clone()).collect(),
            })
        }
    };

    let identifier = if unique_id.starts_with("source") {
        manifest.sources.get(&unique_id).map(|s| s.identifier())
    } else {
        manifest.nodes.get(&unique_id).map(|n| n.identifier())
    }
    .ok_or_else(|| ResolveError::NodeMissing(unique_id.clone()))?;

    Ok(DependencyEntry {
        unique_id,
        short_name: short_name.to_string(),
        identifier,
    })
}
