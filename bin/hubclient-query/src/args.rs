//! CLI argument parsing and environment variable handling.

use std::{env, path::PathBuf};

use argh::FromArgs;
use hubclient_config::string_override;

/// Prefix of environment variables that override config values.
const ENV_PREFIX: &str = "HUBCLIENT_";

/// Config keys that may be set from `HUBCLIENT_<KEY>` env vars.
const ENV_OVERRIDABLE: &[&str] = &[
    "node_address",
    "contract",
    "rollapp_id",
    "gas_prices",
    "gas_fees",
    "dym_account_name",
];

/// Configs overridable by environment. Mostly for deployment specific values.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnvArgs {
    vars: Vec<(&'static str, String)>,
}

impl EnvArgs {
    /// Loads environment variables that should override the config.
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let vars = ENV_OVERRIDABLE
            .iter()
            .filter_map(|key| {
                let name = format!("{ENV_PREFIX}{}", key.to_uppercase());
                lookup(&name).map(|val| (*key, val))
            })
            .collect();
        Self { vars }
    }

    /// Get strings of overrides gathered from env. Every overridable key is a
    /// string, so values are quoted.
    pub(crate) fn get_overrides(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(key, val)| string_override(&format!("settlement.{key}"), val))
            .collect()
    }
}

#[derive(Debug, FromArgs)]
#[argh(description = "Queries rollapp and sequencer state held by the settlement hub contract")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub(crate) config: PathBuf,

    /// Rollapp id that will override the one in the config toml.
    #[argh(option, short = 'r', description = "rollapp id")]
    pub(crate) rollapp_id: Option<String>,

    /// Other generic overrides to the config toml.
    /// Will be used, for example, as `-o settlement.gas_limit=400000`
    #[argh(option, short = 'o', description = "generic config overrides")]
    pub(crate) overrides: Vec<String>,

    #[argh(subcommand)]
    pub(crate) cmd: Subcommand,
}

impl Args {
    /// Get strings of overrides gathered from user and internal attributes.
    pub(crate) fn get_all_overrides(&self) -> Vec<String> {
        let mut overrides = self.overrides.clone();
        if let Some(id) = &self.rollapp_id {
            overrides.push(format!("settlement.rollapp_id={id}"));
        }
        overrides
    }
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub(crate) enum Subcommand {
    LatestStateIndex(SubcLatestStateIndex),
    StateInfo(SubcStateInfo),
    Sequencers(SubcSequencers),
    Watch(SubcWatch),
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "latest-state-index",
    description = "prints the latest state index of the rollapp"
)]
pub(crate) struct SubcLatestStateIndex {
    #[argh(switch, description = "only consider finalized states")]
    pub(crate) finalized: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "state-info",
    description = "prints a state info by index or by covered height"
)]
pub(crate) struct SubcStateInfo {
    #[argh(option, description = "state index")]
    pub(crate) index: Option<u64>,

    #[argh(option, description = "rollapp height covered by the state")]
    pub(crate) height: Option<u64>,

    #[argh(switch, description = "only consider finalized states")]
    pub(crate) finalized: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "sequencers",
    description = "prints the sequencers registered for the rollapp"
)]
pub(crate) struct SubcSequencers {}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "watch",
    description = "prints hub events matching a query until interrupted"
)]
pub(crate) struct SubcWatch {
    #[argh(
        option,
        default = "String::from(\"tm.event='NewBlock'\")",
        description = "event query"
    )]
    pub(crate) query: String,

    #[argh(option, description = "exit after this many events")]
    pub(crate) count: Option<usize>,

    #[argh(option, default = "16", description = "subscription buffer size")]
    pub(crate) capacity: usize,
}
