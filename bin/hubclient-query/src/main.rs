//! Command line client for the settlement hub contract.

use std::sync::Arc;

use anyhow::{Context, Result};
use argh::from_env;
use hubclient_chain::{ChainClient, InMemoryAccountRegistry};
use hubclient_common::logging;
use hubclient_config::{load_config, Config};
use tokio::runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::args::{Args, EnvArgs};

mod args;
mod cmd;

fn main() -> Result<()> {
    let args: Args = from_env();

    // Env overrides first so explicit args win.
    let mut overrides = EnvArgs::from_env().get_overrides();
    overrides.extend(args.get_all_overrides());
    let config = load_config(&args.config, &overrides)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    let rt = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("hubclient-rt")
        .build()
        .context("building runtime")?;

    rt.block_on(async {
        init_logging(&config)?;
        let res = run(args, &config).await;
        logging::finalize();
        res
    })
}

async fn run(args: Args, config: &Config) -> Result<()> {
    let client = ChainClient::connect(
        &config.settlement,
        Arc::new(InMemoryAccountRegistry::new()),
    )?;
    info!(rollapp_id = %client.context().rollapp_id(), contract = %client.context().contract(), "hub client ready");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupted");
                cancel.cancel();
            }
        });
    }

    cmd::exec(args.cmd, &client, &cancel).await
}

fn init_logging(config: &Config) -> Result<()> {
    logging::init_logging_from_config(logging::LoggingInitConfig {
        service_base_name: "hubclient-query",
        service_label: config.logging.service_label.as_deref(),
        otlp_url: config.logging.otlp_url.as_deref(),
        log_dir: config.logging.log_dir.as_ref(),
        log_file_prefix: config.logging.log_file_prefix.as_deref(),
        json_format: config.logging.json_format,
        default_log_prefix: "hubclient",
    })
    .context("initializing logging")
}
