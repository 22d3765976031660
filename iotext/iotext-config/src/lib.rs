// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod error;
mod settings;

pub use settings::{CentralSettings, HttpSettings, MonitorSettings, ResourceSettings, Settings};

use crate::error::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/iotext/config.toml";
pub const DEFAULT_CONFIG_DIRECTORY_PATH: &str = "/etc/iotext/config.d";

/// Reads `config_path`, then layers every `*.toml` file in `config_directory_path` on top of it
/// in file name order.
pub fn read_config<TConfig>(
    config_path: &std::path::Path,
    config_directory_path: &std::path::Path,
) -> Result<TConfig, Error>
where
    TConfig: serde::de::DeserializeOwned,
{
    let config = read_toml(config_path)?;
    finish(config, config_directory_path)
}

/// Like [`read_config`], but a missing main file is treated as an empty one.
pub fn read_config_or_default<TConfig>(
    config_path: &std::path::Path,
    config_directory_path: &std::path::Path,
) -> Result<TConfig, Error>
where
    TConfig: serde::de::DeserializeOwned,
{
    let config = match std::fs::read_to_string(config_path) {
        Ok(contents) => parse_toml(config_path, &contents)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            toml::Value::Table(toml::value::Table::new())
        }
        Err(err) => return Err(Error::ReadConfig(Some(config_path.to_owned()), Box::new(err))),
    };

    finish(config, config_directory_path)
}

fn finish<TConfig>(
    mut config: toml::Value,
    config_directory_path: &std::path::Path,
) -> Result<TConfig, Error>
where
    TConfig: serde::de::DeserializeOwned,
{
    for patch_path in patch_paths(config_directory_path)? {
        let patch = read_toml(&patch_path)?;
        merge_toml(&mut config, patch);
    }

    let config: TConfig = serde::Deserialize::deserialize(config)
        .map_err(|err| Error::ReadConfig(None, Box::new(err)))?;

    Ok(config)
}

fn patch_paths(config_directory_path: &std::path::Path) -> Result<Vec<std::path::PathBuf>, Error> {
    let directory_error = |err: std::io::Error| {
        Error::ReadConfig(Some(config_directory_path.to_owned()), Box::new(err))
    };

    let entries = match std::fs::read_dir(config_directory_path) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(directory_error(err)),
    };

    let mut patch_paths = vec![];
    for entry in entries {
        let entry = entry.map_err(directory_error)?;
        if !entry.file_type().map_err(directory_error)?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(std::ffi::OsStr::to_str) == Some("toml") {
            patch_paths.push(path);
        }
    }
    patch_paths.sort();

    Ok(patch_paths)
}

fn read_toml(path: &std::path::Path) -> Result<toml::Value, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| Error::ReadConfig(Some(path.to_owned()), Box::new(err)))?;

    parse_toml(path, &contents)
}

fn parse_toml(path: &std::path::Path, contents: &str) -> Result<toml::Value, Error> {
    toml::from_str(contents).map_err(|err| Error::ReadConfig(Some(path.to_owned()), Box::new(err)))
}

/// Tables merge key by key, arrays are concatenated, anything else in `patch` replaces `base`.
fn merge_toml(base: &mut toml::Value, patch: toml::Value) {
    match (base, patch) {
        (toml::Value::Table(base), toml::Value::Table(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }

        (toml::Value::Array(base), toml::Value::Array(patch)) => base.extend(patch),

        (base, patch) => *base = patch,
    }
}
