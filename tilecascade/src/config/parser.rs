//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("max_tiles") {
            config.cache.max_tiles = parse_value("cache", "max_tiles", v, NON_NEGATIVE)?;
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("max_tries") {
            config.fetch.max_tries = parse_value("fetch", "max_tries", v, NON_NEGATIVE)?;
        }
        if let Some(v) = section.get("timeout_secs") {
            config.fetch.timeout_secs = parse_value("fetch", "timeout_secs", v, NON_NEGATIVE)?;
        }
        if let Some(v) = section.get("max_concurrent") {
            config.fetch.max_concurrent =
                parse_value("fetch", "max_concurrent", v, NON_NEGATIVE)?;
        }
    }

    // [viewport] section
    if let Some(section) = ini.section(Some("viewport")) {
        if let Some(v) = section.get("out_of_bounds") {
            config.viewport.out_of_bounds =
                parse_value("viewport", "out_of_bounds", v, "must be one of: clip, wrap")?;
        }
        if let Some(v) = section.get("tile_size") {
            let size: u32 = parse_value("viewport", "tile_size", v, NON_NEGATIVE)?;
            if size == 0 {
                return Err(ConfigFileError::InvalidValue {
                    section: "viewport".to_string(),
                    key: "tile_size".to_string(),
                    value: v.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.viewport.tile_size = size;
        }
    }

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        config.source.url_template = non_empty(section.get("url_template"));
        config.source.user_agent = non_empty(section.get("user_agent"));
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = PathBuf::from(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = v;
        }
    }

    Ok(config)
}

const NON_NEGATIVE: &str = "expected a non-negative integer";

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigFileError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
