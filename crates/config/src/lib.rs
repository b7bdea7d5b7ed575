//! Configuration loading, env substitution and validation.
//!
//! Config files: `pixelpost.toml`, `pixelpost.yaml`, `pixelpost.yml` or
//! `pixelpost.json`, searched in `./` then `~/.config/pixelpost/`.
//!
//! `${ENV_VAR}` placeholders are substituted before parsing, so bot tokens
//! can stay out of the file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{OutputConfig, PixelpostConfig},
    validate::{Diagnostic, Severity, validate},
};
