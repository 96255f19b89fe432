//! Configuration loading, validation, and env substitution.
//!
//! Config files: `tunedrop.toml`, `tunedrop.yaml`, or `tunedrop.json`
//! Searched in `./` then `~/.config/tunedrop/`, unless a path is given.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, load_config},
    schema::{DeliveryConfig, ToolsConfig, TunedropConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
