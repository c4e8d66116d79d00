//! Configuration module for snowmock.
//!
//! Handles the dbt project, warehouse connection and worker settings.

mod settings;

pub use settings::{
    expand_env_vars, CompileMode, DbtSettings, Settings, SettingsError, WarehouseSettings,
    WorkerSettings,
};
