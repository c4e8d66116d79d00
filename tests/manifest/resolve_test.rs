//! Resolving mock names to the tables a model reads.
#[path = "../support/mod.rs"]
mod support;

use snowmock::manifest::{resolve_fully_qualified_name, ResolveError};
use support::{manifest, PROJECT};

#[test]
fn test_resolves_model_dependency() {
    let entry = resolve_fully_qualified_name("stg_email_events", &manifest(), PROJECT, "fct_email_events")
        .unwrap();

    assert_eq!(entry.unique_id, "model.mailing.stg_email_events");
    assert_eq!(entry.short_name, "stg_email_events");
    assert_eq!(entry.identifier.to_string(), "analytics.staging.stg_email_events");
}

#[test]
fn test_owner_resolves_to_itself() {
    let entry = resolve_fully_qualified_name("fct_email_events", &manifest(), PROJECT, "fct_email_events")
        .unwrap();

    assert_eq!(entry.unique_id, "model.mailing.fct_email_events");
    assert_eq!(entry.identifier.to_string(), "analytics.marts.fct_email_events");
}

#[test]
fn test_alias_is_the_relation_name() {
    let entry = resolve_fully_qualified_name(
        "stg_email_events_archive",
        &manifest(),
        PROJECT,
        "fct_email_reminders",
    )
    .unwrap();
    assert_eq!(entry.identifier.to_string(), "analytics.staging.email_events_archive");
}

#[test]
fn test_source_uses_identifier() {
    let entry =
        resolve_fully_qualified_name("sendgrid.events", &manifest(), PROJECT, "fct_email_reminders")
            .unwrap();
    assert_eq!(entry.unique_id, "source.mailing.sendgrid.events");
    assert_eq!(entry.identifier.to_string(), "raw.sendgrid.events_v1");
}

#[test]
fn test_unknown_owner() {
    let err = resolve_fully_qualified_name("stg_email_events", &manifest(), PROJECT, "nope")
        .unwrap_err();
    assert_eq!(err, ResolveError::ModelNotFound("model.mailing.nope".to_string()));
}

#[test]
fn test_dependency_not_found() {
    let err = resolve_fully_qualified_name("stg_orders", &manifest(), PROJECT, "fct_email_events")
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::DependencyNotFound {
            model: "stg_orders".to_string(),
            owner: "fct_email_events".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "No dependency of model 'fct_email_events' matches 'stg_orders'"
    );
}

#[test]
fn test_existing_model_that_is_not_a_dependency() {
    // email_providers exists in the manifest but fct_email_events does not read it.
    let err = resolve_fully_qualified_name("email_providers", &manifest(), PROJECT, "fct_email_events")
        .unwrap_err();
    assert!(matches!(err, ResolveError::DependencyNotFound { .. }));
}

#[test]
fn test_substring_matching_several_ids_is_ambiguous() {
    let err = resolve_fully_qualified_name("stg_email_events", &manifest(), PROJECT, "fct_email_reminders")
        .unwrap_err();

    match err {
        ResolveError::AmbiguousDependency { model, owner, candidates } => {
            assert_eq!(model, "stg_email_events");
            assert_eq!(owner, "fct_email_reminders");
            assert_eq!(
                candidates,
                vec![
                    "model.mailing.stg_email_events".to_string(),
                    "model.mailing.stg_email_events_archive".to_string(),
                ]
            );
        }
        other => panic!("expected an ambiguity error, got {other:?}"),
    }
}

#[test]
fn test_full_unique_id_disambiguates() {
    let entry = resolve_fully_qualified_name(
        "model.mailing.stg_email_events",
        &manifest(),
        PROJECT,
        "fct_email_reminders",
    )
    .unwrap();
    assert_eq!(entry.identifier.to_string(), "analytics.staging.stg_email_events");
}

#[test]
fn test_listed_dependency_missing_from_manifest() {
    let err = resolve_fully_qualified_name("bounces", &manifest(), PROJECT, "fct_email_reminders")
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::NodeMissing("source.mailing.sendgrid.bounces".to_string())
    );
}
