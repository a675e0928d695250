use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot provide both fees and gas prices")]
    BothFeeModes,

    #[error("must provide either fees or gas prices")]
    NoFeeMode,

    #[error("must provide rollapp id")]
    MissingRollappId,

    #[error("io: reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// Override string is not of the form `key.path=value`.
    #[error("invalid override: '{0}'")]
    InvalidOverride(String),

    /// Tried to traverse into a primitive.
    #[error("can't traverse into non-table key '{key}' of override '{path}'")]
    TraverseNonTable { key: String, path: String },
}
