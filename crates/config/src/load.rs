//! Config file loading with `key.path=value` overrides.

use std::{fs, path::Path};

use toml::value::{Table, Value};
use tracing::debug;

use crate::{Config, ConfigError};

/// Reads the TOML file at `path`, applies `overrides` in order, then validates.
pub fn load_config(path: &Path, overrides: &[String]) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    load_config_str(&raw, overrides)
}

pub fn load_config_str(raw: &str, overrides: &[String]) -> Result<Config, ConfigError> {
    let mut table: Table = toml::from_str(raw)?;

    for o in overrides {
        let (path, val) = parse_override(o)?;
        debug!(%path, "applying config override");
        apply_override(&path, val, &mut table)?;
    }

    let config = Value::Table(table).try_into::<Config>()?;
    config.settlement.validate()?;
    Ok(config)
}

/// Splits `a.b.c=value` into its key path and a TOML value.
///
/// The value is parsed as a TOML scalar when possible (`gas_limit=5` is an
/// integer), otherwise it is taken verbatim as a string.
pub fn parse_override(s: &str) -> Result<(String, Value), ConfigError> {
    let (path, raw) = s
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidOverride(s.to_owned()))?;
    let path = path.trim();
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(ConfigError::InvalidOverride(s.to_owned()));
    }
    Ok((path.to_owned(), parse_value(raw.trim())))
}

/// Formats an override that sets `path` to the string `val`, quoted so it is
/// never read back as a number or boolean.
pub fn string_override(path: &str, val: &str) -> String {
    format!("{path}={}", Value::String(val.to_owned()))
}

fn parse_value(raw: &str) -> Value {
    match toml::from_str::<Table>(&format!("v = {raw}")) {
        Ok(mut t) => t.remove("v").unwrap_or_else(|| Value::String(raw.to_owned())),
        Err(_) => Value::String(raw.to_owned()),
    }
}

/// Sets `val` at the dotted `path`, creating intermediate tables as needed.
pub fn apply_override(path: &str, val: Value, table: &mut Table) -> Result<(), ConfigError> {
    let mut keys: Vec<&str> = path.split('.').collect();
    let Some(last) = keys.pop() else {
        return Err(ConfigError::InvalidOverride(path.to_owned()));
    };

    let mut cur = table;
    for key in keys {
        cur = match cur
            .entry(key.to_owned())
            .or_insert(Value::Table(Table::new()))
        {
            Value::Table(t) => t,
            _ => {
                return Err(ConfigError::TraverseNonTable {
                    key: key.to_owned(),
                    path: path.to_owned(),
                })
            }
        };
    }

    cur.insert(last.to_owned(), val);
    Ok(())
}
