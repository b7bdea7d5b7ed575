use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::PixelpostConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "pixelpost.toml",
    "pixelpost.yaml",
    "pixelpost.yml",
    "pixelpost.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<PixelpostConfig> {
    let raw = read_substituted(path)?;
    parse_config(&raw, path)
}

/// Load the config file as a generic JSON tree, after env substitution.
pub fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    let raw = read_substituted(path)?;
    parse_config_value(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./pixelpost.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/pixelpost/pixelpost.{toml,yaml,yml,json}` (user-global)
///
/// Returns `PixelpostConfig::default()` if no config file is found or the
/// file fails to load.
pub fn discover_and_load() -> PixelpostConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    PixelpostConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .or_else(|| {
            let dir = config_dir()?;
            CONFIG_FILENAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|p| p.exists())
        })
}

/// Returns the user-global config directory (`~/.config/pixelpost/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pixelpost").map(|d| d.config_dir().to_path_buf())
}

fn read_substituted(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(substitute_env(&raw))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

fn parse_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<PixelpostConfig> {
    match extension(path) {
        "toml" => toml::from_str(raw).map_err(|e| parse_error(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_error(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| parse_error(path, e)),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    match extension(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| parse_error(path, e))?;
            serde_json::to_value(v).map_err(|e| parse_error(path, e))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| parse_error(path, e))?;
            serde_json::to_value(v).map_err(|e| parse_error(path, e))
        },
        "json" => serde_json::from_str(raw).map_err(|e| parse_error(path, e)),
        ext => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
