use anyhow::{anyhow, bail, Result};
use hubclient_chain::{ChainClient, ChainClientError, EventError};
use hubclient_types::{rollapp, sequencer};
use hubclient_wasm::{RollappQuery, SequencerQuery};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::{SubcLatestStateIndex, SubcStateInfo, SubcWatch, Subcommand};

/// Subscriber id used for `watch`.
const SUBSCRIBER: &str = "hubclient-query";

pub(crate) async fn exec(
    cmd: Subcommand,
    client: &ChainClient,
    cancel: &CancellationToken,
) -> Result<()> {
    match cmd {
        Subcommand::LatestStateIndex(c) => latest_state_index(client, cancel, c).await,
        Subcommand::StateInfo(c) => state_info(client, cancel, c).await,
        Subcommand::Sequencers(_) => sequencers(client, cancel).await,
        Subcommand::Watch(c) => watch(client, cancel, c).await,
    }
}

fn print_json<T: Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

async fn latest_state_index(
    client: &ChainClient,
    cancel: &CancellationToken,
    c: SubcLatestStateIndex,
) -> Result<()> {
    let req = rollapp::QueryGetLatestStateIndexRequest::new(
        client.context().rollapp_id(),
        c.finalized,
    );
    let resp = client
        .rollapp_client()
        .latest_state_index(cancel, &req)
        .await?;
    print_json(&resp)
}

async fn state_info(
    client: &ChainClient,
    cancel: &CancellationToken,
    c: SubcStateInfo,
) -> Result<()> {
    if c.index.is_none() && c.height.is_none() {
        bail!("state-info needs --index or --height");
    }
    let req = rollapp::QueryGetStateInfoRequest {
        rollapp_id: client.context().rollapp_id().to_owned(),
        index: c.index.unwrap_or_default(),
        height: c.height.unwrap_or_default(),
        finalized: c.finalized,
    };
    let resp = client.rollapp_client().state_info(cancel, &req).await?;
    print_json(&resp)
}

async fn sequencers(client: &ChainClient, cancel: &CancellationToken) -> Result<()> {
    let req = sequencer::QueryGetSequencersByRollappRequest::new(client.context().rollapp_id());
    let resp = client
        .sequencer_client()
        .sequencers_by_rollapp(cancel, &req)
        .await?;
    print_json(&resp)
}

async fn watch(client: &ChainClient, cancel: &CancellationToken, c: SubcWatch) -> Result<()> {
    client.start_event_listener().await?;
    let quit = client.event_listener_quit();
    let mut events = client
        .subscribe_to_events(cancel, SUBSCRIBER, &c.query, Some(c.capacity))
        .await?;
    info!(query = %c.query, "watching events");

    let mut seen = 0usize;
    let res = loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Some(ev) => {
                    print_json(&ev)?;
                    seen += 1;
                    if c.count.is_some_and(|n| seen >= n) {
                        break Ok(());
                    }
                }
                None => break Ok(()),
            },
            _ = quit.wait() => {
                warn!("event listener quit");
                break Err(anyhow!("event listener quit after {seen} events"));
            }
        }
    };

    match client.stop_event_listener().await {
        Ok(()) | Err(ChainClientError::Event(EventError::NotRunning)) => {}
        Err(e) => warn!(%e, "stopping event listener"),
    }
    res
}
