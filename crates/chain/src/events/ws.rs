//! CometBFT websocket event transport.
//!
//! One connection task per run owns the socket and the subscription table.
//! Callers talk to it over a command channel; replies to `subscribe` and
//! `unsubscribe` are routed back by JSON-RPC request id. Node-side there is at
//! most one subscription per query, shared by every local subscriber to it.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, Mutex as AsyncMutex},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::*;

use super::{EventError, EventTransport, QuitSignal, ResultEvent};

/// How often the node is pinged. A ping left unanswered until the next tick
/// ends the connection.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// How long to wait for the node to answer a subscribe or unsubscribe.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

const COMMAND_BUFFER: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Reply = oneshot::Sender<Result<(), EventError>>;

/// Maps a configured node address onto its websocket endpoint.
///
/// `tcp://` and `http://` become `ws://`, `https://` becomes `wss://`, and
/// `/websocket` is appended when no path is given. The transport is built
/// without TLS, so `wss://` endpoints are refused at [`EventTransport::start`].
pub fn websocket_url(node_address: &str) -> String {
    let (scheme, rest) = match node_address.split_once("://") {
        Some(("https" | "wss", rest)) => ("wss", rest),
        Some((_, rest)) => ("ws", rest),
        None => ("ws", node_address),
    };
    let rest = rest.trim_end_matches('/');
    if rest.contains('/') {
        format!("{scheme}://{rest}")
    } else {
        format!("{scheme}://{rest}/websocket")
    }
}

/// [`EventTransport`] over the node's `/websocket` endpoint.
#[derive(Debug)]
pub struct WsEventTransport {
    url: String,
    ping_interval: Duration,
    listener: AsyncMutex<Option<Listener>>,
    quit: Mutex<QuitSignal>,
    next_handle: AtomicU64,
}

#[derive(Debug)]
struct Listener {
    commands: mpsc::Sender<Command>,
    stop: CancellationToken,
    /// Cancelled by the connection task once it stops serving.
    done: CancellationToken,
    task: JoinHandle<()>,
}

impl Listener {
    fn is_alive(&self) -> bool {
        !self.done.is_cancelled()
    }
}

#[derive(Debug)]
enum Command {
    Subscribe {
        subscriber: String,
        handle: u64,
        query: String,
        tx: mpsc::Sender<ResultEvent>,
        retired: CancellationToken,
        reply: Reply,
    },
    Unsubscribe {
        subscriber: String,
        query: String,
        reply: Reply,
    },
    /// Drops the one local subscription opened with `handle`, if still there.
    Release {
        query: String,
        handle: u64,
    },
    UnsubscribeAll {
        subscriber: String,
        reply: Reply,
    },
}

impl WsEventTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ping_interval: DEFAULT_PING_INTERVAL,
            listener: AsyncMutex::new(None),
            quit: Mutex::new(QuitSignal::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    pub fn from_node_address(node_address: &str) -> Self {
        Self::new(websocket_url(node_address))
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn commands(&self) -> Result<mpsc::Sender<Command>, EventError> {
        match self.listener.lock().await.as_ref() {
            Some(l) if l.is_alive() => Ok(l.commands.clone()),
            _ => Err(EventError::NotRunning),
        }
    }

    async fn request(
        commands: &mpsc::Sender<Command>,
        make: impl FnOnce(Reply) -> Command,
    ) -> Result<(), EventError> {
        let (reply, rx) = oneshot::channel();
        commands
            .send(make(reply))
            .await
            .map_err(|_| EventError::Closed)?;
        match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
            Ok(Ok(res)) => res,
            Ok(Err(_)) => Err(EventError::Closed),
            Err(_) => Err(EventError::Protocol("node did not answer in time".to_owned())),
        }
    }
}

#[async_trait]
impl EventTransport for WsEventTransport {
    async fn start(&self) -> Result<(), EventError> {
        let mut listener = self.listener.lock().await;
        if listener.as_ref().is_some_and(Listener::is_alive) {
            debug!(url = %self.url, "event listener already running");
            return Ok(());
        }

        if self.url.starts_with("wss://") {
            return Err(EventError::Connect {
                url: self.url.clone(),
                reason: "TLS websocket endpoints are not supported".to_owned(),
            });
        }

        let (ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| EventError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let quit = {
            let mut quit = self.quit.lock().unwrap_or_else(PoisonError::into_inner);
            if quit.has_fired() {
                *quit = QuitSignal::new();
            }
            quit.clone()
        };

        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let stop = CancellationToken::new();
        let done = CancellationToken::new();
        let conn = Connection::new(ws, rx, stop.clone(), self.ping_interval);
        let task = tokio::spawn(conn.run(done.clone(), quit));

        *listener = Some(Listener {
            commands,
            stop,
            done,
            task,
        });
        info!(url = %self.url, "event listener started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), EventError> {
        let listener = self.listener.lock().await.take();
        let Some(listener) = listener.filter(Listener::is_alive) else {
            return Err(EventError::NotRunning);
        };

        listener.stop.cancel();
        if let Err(e) = listener.task.await {
            warn!(%e, "event listener task failed");
        }
        info!(url = %self.url, "event listener stopped");
        Ok(())
    }

    fn quit(&self) -> QuitSignal {
        self.quit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn subscribe(
        &self,
        cancel: &CancellationToken,
        subscriber: &str,
        query: &str,
        capacity: usize,
    ) -> Result<mpsc::Receiver<ResultEvent>, EventError> {
        if cancel.is_cancelled() {
            return Err(EventError::Cancelled);
        }
        let commands = self.commands().await?;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let retired = CancellationToken::new();

        let res = tokio::select! {
            _ = cancel.cancelled() => Err(EventError::Cancelled),
            res = Self::request(&commands, |reply| Command::Subscribe {
                subscriber: subscriber.to_owned(),
                handle,
                query: query.to_owned(),
                tx,
                retired: retired.clone(),
                reply,
            }) => res,
        };
        if let Err(e) = res {
            // The request may still be queued or awaiting the node's reply.
            let cmd = Command::Release {
                query: query.to_owned(),
                handle,
            };
            let _ = commands.send(cmd).await;
            return Err(e);
        }
        debug!(%subscriber, %query, %handle, "subscribed");

        let cancel = cancel.clone();
        let subscriber = subscriber.to_owned();
        let query = query.to_owned();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = retired.cancelled() => {}
                _ = commands.closed() => {}
                _ = cancel.cancelled() => {
                    debug!(%subscriber, %query, %handle, "subscription cancelled");
                    let _ = commands.send(Command::Release { query, handle }).await;
                }
            }
        });

        Ok(rx)
    }

    async fn unsubscribe(&self, subscriber: &str, query: &str) -> Result<(), EventError> {
        let commands = self.commands().await?;
        Self::request(&commands, |reply| Command::Unsubscribe {
            subscriber: subscriber.to_owned(),
            query: query.to_owned(),
            reply,
        })
        .await
    }

    async fn unsubscribe_all(&self, subscriber: &str) -> Result<(), EventError> {
        let commands = self.commands().await?;
        Self::request(&commands, |reply| Command::UnsubscribeAll {
            subscriber: subscriber.to_owned(),
            reply,
        })
        .await
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcErrorObject {
    fn reason(&self) -> String {
        match &self.data {
            Some(Value::String(data)) => format!("{} ({}): {data}", self.message, self.code),
            Some(data) => format!("{} ({}): {data}", self.message, self.code),
            None => format!("{} ({})", self.message, self.code),
        }
    }
}

enum PendingRequest {
    Subscribe { query: String },
    Unsubscribe { reply: Option<Reply> },
}

#[derive(Debug)]
struct Subscriber {
    id: String,
    /// Unique per subscribe call, so a stale cancel never hits a newer
    /// subscription under the same id.
    handle: u64,
    tx: mpsc::Sender<ResultEvent>,
    /// Cancelled when the subscription is removed, ending its watcher.
    retired: CancellationToken,
}

/// Local subscribers of one node-side query. An entry exists only while the
/// node subscription is acknowledged or its subscribe request is in flight.
#[derive(Default)]
struct QueryEntry {
    acked: bool,
    subscribers: Vec<Subscriber>,
    /// Subscribers waiting on the node's subscribe reply.
    waiting: Vec<(Subscriber, Reply)>,
}

impl QueryEntry {
    fn contains(&self, subscriber: &str) -> bool {
        self.subscribers.iter().any(|s| s.id == subscriber)
            || self.waiting.iter().any(|(s, _)| s.id == subscriber)
    }

    fn is_idle(&self) -> bool {
        self.subscribers.is_empty() && self.waiting.is_empty()
    }
}

enum Exit {
    Stopped,
    Terminated(String),
}

struct Connection {
    ws: WsStream,
    commands: mpsc::Receiver<Command>,
    stop: CancellationToken,
    ping_interval: Duration,
    awaiting_pong: bool,
    next_id: u64,
    pending: HashMap<u64, PendingRequest>,
    queries: HashMap<String, QueryEntry>,
}

impl Connection {
    fn new(
        ws: WsStream,
        commands: mpsc::Receiver<Command>,
        stop: CancellationToken,
        ping_interval: Duration,
    ) -> Self {
        Self {
            ws,
            commands,
            stop,
            ping_interval,
            awaiting_pong: false,
            next_id: 0,
            pending: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    async fn run(mut self, done: CancellationToken, quit: QuitSignal) {
        let exit = self.event_loop().await;

        // Ends every subscription stream and fails outstanding requests.
        self.queries.clear();
        self.pending.clear();
        done.cancel();

        match exit {
            Exit::Stopped => {
                if let Err(e) = self.ws.close(None).await {
                    debug!(%e, "closing websocket");
                }
            }
            Exit::Terminated(reason) => {
                warn!(%reason, "event listener terminated");
                quit.fire();
            }
        }
    }

    async fn event_loop(&mut self) -> Exit {
        let mut ping = interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let res = tokio::select! {
                biased;
                _ = self.stop.cancelled() => Err(Exit::Stopped),
                msg = self.ws.next() => match msg {
                    Some(Ok(msg)) => self.handle_message(msg).await,
                    Some(Err(e)) => Err(Exit::Terminated(format!("read: {e}"))),
                    None => Err(Exit::Terminated("stream ended".to_owned())),
                },
                Some(cmd) = self.commands.recv() => self.handle_command(cmd).await,
                _ = ping.tick() => self.ping().await,
            };

            if let Err(exit) = res {
                return exit;
            }
        }
    }

    async fn ping(&mut self) -> Result<(), Exit> {
        if self.awaiting_pong {
            return Err(Exit::Terminated("no pong from node".to_owned()));
        }
        trace!("sending ping");
        self.send(Message::Ping(Default::default())).await?;
        self.awaiting_pong = true;
        Ok(())
    }

    async fn handle_message(&mut self, msg: Message) -> Result<(), Exit> {
        match msg {
            Message::Text(text) => self.handle_text(text.as_str()).await,
            Message::Pong(_) => {
                trace!("got pong");
                self.awaiting_pong = false;
                Ok(())
            }
            Message::Close(frame) => Err(Exit::Terminated(format!("closed by node: {frame:?}"))),
            _ => Ok(()),
        }
    }

    async fn handle_text(&mut self, text: &str) -> Result<(), Exit> {
        let resp: RpcResponse = match serde_json::from_str(text) {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%e, "ignoring malformed message from node");
                return Ok(());
            }
        };

        if let Some(result) = resp.result.as_ref().filter(|r| r.get("query").is_some()) {
            return match serde_json::from_value::<ResultEvent>(result.clone()) {
                Ok(ev) => self.dispatch(ev).await,
                Err(e) => {
                    warn!(%e, "ignoring malformed event");
                    Ok(())
                }
            };
        }

        let Some(id) = resp.id.as_u64() else {
            debug!(id = %resp.id, "reply with unexpected id");
            return Ok(());
        };
        let outcome = match resp.error {
            Some(err) => Err(err.reason()),
            None => Ok(()),
        };
        self.handle_reply(id, outcome).await
    }

    async fn handle_reply(&mut self, id: u64, outcome: Result<(), String>) -> Result<(), Exit> {
        match self.pending.remove(&id) {
            Some(PendingRequest::Subscribe { query }) => {
                let Some(entry) = self.queries.get_mut(&query) else {
                    return Ok(());
                };
                match outcome {
                    Ok(()) => {
                        entry.acked = true;
                        for (sub, reply) in entry.waiting.drain(..) {
                            if reply.send(Ok(())).is_ok() {
                                entry.subscribers.push(sub);
                            } else {
                                sub.retired.cancel();
                            }
                        }
                        if entry.is_idle() {
                            debug!(%query, "subscription acknowledged with no subscribers left");
                            return self.release_query(query, None).await;
                        }
                    }
                    Err(reason) => {
                        warn!(%query, %reason, "subscribe rejected");
                        if let Some(entry) = self.queries.remove(&query) {
                            for (_, reply) in entry.waiting {
                                let _ = reply.send(Err(EventError::SubscribeRejected {
                                    query: query.clone(),
                                    reason: reason.clone(),
                                }));
                            }
                        }
                    }
                }
            }
            Some(PendingRequest::Unsubscribe { reply }) => {
                if let Err(reason) = &outcome {
                    warn!(%reason, "unsubscribe rejected");
                }
                if let Some(reply) = reply {
                    let _ = reply.send(outcome.map_err(EventError::Protocol));
                }
            }
            None => debug!(%id, "reply for unknown request"),
        }
        Ok(())
    }

    async fn handle_command(&mut self, cmd: Command) -> Result<(), Exit> {
        match cmd {
            Command::Subscribe {
                subscriber,
                handle,
                query,
                tx,
                retired,
                reply,
            } => {
                let fresh = !self.queries.contains_key(&query);
                let entry = self.queries.entry(query.clone()).or_default();
                if entry.contains(&subscriber) {
                    let _ = reply.send(Err(EventError::AlreadySubscribed { subscriber, query }));
                    return Ok(());
                }

                let sub = Subscriber {
                    id: subscriber,
                    handle,
                    tx,
                    retired,
                };
                if entry.acked {
                    entry.subscribers.push(sub);
                    let _ = reply.send(Ok(()));
                    return Ok(());
                }

                entry.waiting.push((sub, reply));
                if fresh {
                    let id = self.next_id();
                    self.pending
                        .insert(id, PendingRequest::Subscribe { query: query.clone() });
                    self.send_request(id, "subscribe", json!({ "query": query }))
                        .await?;
                }
                Ok(())
            }

            Command::Unsubscribe {
                subscriber,
                query,
                reply,
            } => match self.remove_where(&query, |s| s.id == subscriber) {
                None => {
                    let _ = reply.send(Err(EventError::NotSubscribed { subscriber, query }));
                    Ok(())
                }
                Some(false) => {
                    let _ = reply.send(Ok(()));
                    Ok(())
                }
                Some(true) => self.release_idle(query, Some(reply)).await,
            },

            Command::Release { query, handle } => {
                if self.remove_where(&query, |s| s.handle == handle) == Some(true) {
                    self.release_idle(query, None).await?;
                }
                Ok(())
            }

            Command::UnsubscribeAll { subscriber, reply } => {
                let queries: Vec<String> = self.queries.keys().cloned().collect();
                let mut idle = Vec::new();
                for query in queries {
                    if self.remove_where(&query, |s| s.id == subscriber) == Some(true) {
                        idle.push(query);
                    }
                }
                for query in idle {
                    self.release_idle(query, None).await?;
                }
                let _ = reply.send(Ok(()));
                Ok(())
            }
        }
    }

    /// Delivers `ev` to every subscriber of its query, in subscription order.
    /// Waits while a subscriber's buffer is full.
    async fn dispatch(&mut self, ev: ResultEvent) -> Result<(), Exit> {
        let Some(entry) = self.queries.get(&ev.query) else {
            trace!(query = %ev.query, "event for unknown query");
            return Ok(());
        };
        let targets: Vec<(u64, mpsc::Sender<ResultEvent>)> = entry
            .subscribers
            .iter()
            .map(|s| (s.handle, s.tx.clone()))
            .collect();

        let mut gone = Vec::new();
        for (handle, tx) in targets {
            let sent = tokio::select! {
                biased;
                _ = self.stop.cancelled() => return Err(Exit::Stopped),
                res = tx.send(ev.clone()) => res.is_ok(),
            };
            if !sent {
                gone.push(handle);
            }
        }

        for handle in gone {
            debug!(%handle, query = %ev.query, "subscriber went away");
            if self.remove_where(&ev.query, |s| s.handle == handle) == Some(true) {
                self.release_idle(ev.query.clone(), None).await?;
            }
        }
        Ok(())
    }

    /// Removes the local subscribers of `query` matching `pred`, including
    /// ones still waiting on the node. Returns `None` if none matched,
    /// otherwise whether the query is left idle.
    fn remove_where(&mut self, query: &str, pred: impl Fn(&Subscriber) -> bool) -> Option<bool> {
        let entry = self.queries.get_mut(query)?;

        let (gone, kept): (Vec<_>, Vec<_>) = entry.subscribers.drain(..).partition(|s| pred(s));
        entry.subscribers = kept;
        let (gone_waiting, kept): (Vec<_>, Vec<_>) =
            entry.waiting.drain(..).partition(|(s, _)| pred(s));
        entry.waiting = kept;

        if gone.is_empty() && gone_waiting.is_empty() {
            return None;
        }
        for sub in gone {
            sub.retired.cancel();
        }
        for (sub, reply) in gone_waiting {
            sub.retired.cancel();
            let _ = reply.send(Err(EventError::Cancelled));
        }
        Some(entry.is_idle())
    }

    /// Releases an idle query. One whose subscribe is still in flight stays
    /// until the node answers, and is released then.
    async fn release_idle(&mut self, query: String, reply: Option<Reply>) -> Result<(), Exit> {
        if self.queries.get(&query).is_some_and(|e| e.acked) {
            return self.release_query(query, reply).await;
        }
        if let Some(reply) = reply {
            let _ = reply.send(Ok(()));
        }
        Ok(())
    }

    /// Drops the node-side subscription for a query nobody listens to anymore.
    async fn release_query(&mut self, query: String, reply: Option<Reply>) -> Result<(), Exit> {
        self.queries.remove(&query);
        let id = self.next_id();
        self.pending.insert(id, PendingRequest::Unsubscribe { reply });
        self.send_request(id, "unsubscribe", json!({ "query": query }))
            .await
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    async fn send_request(&mut self, id: u64, method: &str, params: Value) -> Result<(), Exit> {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let text = serde_json::to_string(&req)
            .map_err(|e| Exit::Terminated(format!("encoding {method}: {e}")))?;
        trace!(%id, %method, "sending request");
        self.send(Message::Text(text.into())).await
    }

    async fn send(&mut self, msg: Message) -> Result<(), Exit> {
        self.ws
            .send(msg)
            .await
            .map_err(|e| Exit::Terminated(format!("write: {e}")))
    }
}
