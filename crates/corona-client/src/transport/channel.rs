//! Transport channel.
//!
//! Responsibilities:
//! - Own one connection, one codec, one handler registry
//! - Drive the lifecycle: CONNECTING -> OPEN -> CLOSING -> CLOSED, or ERROR
//! - Encode outbound messages, decode and dispatch inbound frames
//!
//! One background task per channel does all socket work. Handlers are awaited
//! inline in that task, so they see messages in arrival order and never
//! overlap. Nothing here retries; see `supervisor` for reconnects.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch, Notify};

use corona_core::codec::{Codec, Frame};
use corona_core::error::{CoronaError, Result};
use corona_core::protocol::{Message, Tag};

use crate::dispatch::{Dispatch, Handler, HandlerRegistry};
use crate::transport::connector::{Connector, FrameSink, WsConnector};
use crate::transport::state::ConnectionState;
use crate::transport::stats::{ChannelStats, StatsSnapshot};

pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1024;

/// What `send` does when the channel is not open yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPolicy {
    /// Refuse with `NotOpen`.
    #[default]
    Reject,
    /// Buffer while CONNECTING, flush in order once OPEN.
    QueueUntilOpen,
}

/// Accepted send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the open connection's writer.
    Sent,
    /// Buffered until the handshake completes.
    Queued,
}

pub struct ChannelBuilder {
    url: String,
    codec: Arc<dyn Codec>,
    connector: Arc<dyn Connector>,
    registry: Arc<HandlerRegistry>,
    send_policy: SendPolicy,
    outbound_capacity: usize,
}

impl ChannelBuilder {
    pub fn new(url: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        Self {
            url: url.into(),
            codec,
            connector: Arc::new(WsConnector::new()),
            registry: Arc::new(HandlerRegistry::new()),
            send_policy: SendPolicy::default(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Share a registry, e.g. across reconnects. Call before `handler`.
    pub fn registry(mut self, registry: Arc<HandlerRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn handler(self, tag: Tag, handler: impl Handler + 'static) -> Self {
        self.registry.register(tag, Arc::new(handler));
        self
    }

    pub fn send_policy(mut self, policy: SendPolicy) -> Self {
        self.send_policy = policy;
        self
    }

    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Start connecting in the background. Must run inside a tokio runtime.
    pub fn open(self) -> Channel {
        let (out_tx, out_rx) = mpsc::channel(self.outbound_capacity);
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);

        let inner = Arc::new(ChannelInner {
            url: self.url,
            codec: self.codec,
            registry: self.registry,
            send_policy: self.send_policy,
            state: state_tx,
            outbound: out_tx,
            close_requested: Notify::new(),
            closed_locally: AtomicBool::new(false),
            opened: AtomicBool::new(false),
            last_error: Mutex::new(None),
            stats: ChannelStats::default(),
        });

        tracing::info!(url = %inner.url, codec = inner.codec.name(), "channel connecting");
        tokio::spawn(drive(Arc::clone(&inner), self.connector, out_rx));

        Channel { inner }
    }
}

/// Handle to one connection. Cheap to clone; all clones share the connection.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    url: String,
    codec: Arc<dyn Codec>,
    registry: Arc<HandlerRegistry>,
    send_policy: SendPolicy,
    state: watch::Sender<ConnectionState>,
    outbound: mpsc::Sender<Frame>,
    close_requested: Notify,
    closed_locally: AtomicBool,
    opened: AtomicBool,
    last_error: Mutex<Option<String>>,
    stats: ChannelStats,
}

impl Channel {
    /// Open with the WebSocket connector and default options.
    pub fn open(url: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        ChannelBuilder::new(url, codec).open()
    }

    pub fn builder(url: impl Into<String>, codec: Arc<dyn Codec>) -> ChannelBuilder {
        ChannelBuilder::new(url, codec)
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.inner.codec
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.inner.registry
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Transport error that moved the channel to ERROR, if any.
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    /// Whether the handshake ever completed.
    pub fn was_opened(&self) -> bool {
        self.inner.opened.load(Ordering::Relaxed)
    }

    pub fn closed_locally(&self) -> bool {
        self.inner.closed_locally.load(Ordering::Relaxed)
    }

    /// Last registration for a tag wins; the replaced handler is returned.
    pub fn register_callback(&self, tag: Tag, handler: impl Handler + 'static) -> Option<Arc<dyn Handler>> {
        self.inner.registry.register(tag, Arc::new(handler))
    }

    /// Encode `msg` and hand it to the connection writer.
    ///
    /// Never blocks. A refused send transmits nothing and says why.
    pub fn send(&self, msg: &Message) -> Result<SendOutcome> {
        let state = self.state();
        let outcome = match (state, self.inner.send_policy) {
            (ConnectionState::Open, _) => SendOutcome::Sent,
            (ConnectionState::Connecting, SendPolicy::QueueUntilOpen) => SendOutcome::Queued,
            _ => {
                self.inner.stats.inc_rejected();
                tracing::debug!(url = %self.inner.url, tag = %msg.tag(), %state, "send rejected");
                return Err(CoronaError::NotOpen { state: state.as_str() });
            }
        };

        let frame = self.inner.codec.encode(msg)?;
        match self.inner.outbound.try_send(frame) {
            Ok(()) => Ok(outcome),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.inner.stats.inc_rejected();
                Err(CoronaError::Backpressure)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.inner.stats.inc_rejected();
                Err(CoronaError::NotOpen {
                    state: self.state().as_str(),
                })
            }
        }
    }

    /// Decode and dispatch one inbound frame, exactly as if it had arrived on
    /// the connection. Decode failures are returned; the channel is unaffected.
    pub async fn deliver(&self, data: &[u8]) -> Result<Dispatch> {
        self.inner.deliver(data).await
    }

    /// Close locally. Once OPEN, frames already accepted by `send` are flushed
    /// first; frames queued during the handshake are counted as dropped.
    pub fn close(&self) {
        self.inner.closed_locally.store(true, Ordering::Relaxed);
        if self.inner.transition(ConnectionState::Closing) {
            self.inner.close_requested.notify_one();
        }
    }

    /// Wait for the handshake. Fails if the channel ends up anywhere but OPEN.
    pub async fn wait_open(&self) -> Result<()> {
        let mut rx = self.inner.state.subscribe();
        let reached = rx
            .wait_for(|s| *s != ConnectionState::Connecting)
            .await
            .map(|s| *s);
        match reached {
            Ok(ConnectionState::Open) => Ok(()),
            Ok(ConnectionState::Error) => Err(CoronaError::Transport(
                self.last_error().unwrap_or_else(|| "connection failed".into()),
            )),
            Ok(other) => Err(CoronaError::NotOpen { state: other.as_str() }),
            Err(_) => Err(CoronaError::Transport("channel state dropped".into())),
        }
    }

    /// Wait until the channel is CLOSED or ERROR and return which.
    pub async fn terminated(&self) -> ConnectionState {
        let mut rx = self.inner.state.subscribe();
        let reached = rx.wait_for(|s| s.is_terminal()).await.map(|s| *s);
        reached.unwrap_or_else(|_| *rx.borrow())
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("url", &self.inner.url)
            .field("codec", &self.inner.codec.name())
            .field("state", &self.state())
            .finish()
    }
}

impl ChannelInner {
    /// Apply a transition if the state machine allows it.
    fn transition(&self, next: ConnectionState) -> bool {
        let mut from = next;
        let changed = self.state.send_if_modified(|s| {
            if s.can_transition_to(next) {
                from = *s;
                *s = next;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!(url = %self.url, %from, to = %next, "channel state changed");
        }
        changed
    }

    fn fail(&self, error: CoronaError) {
        tracing::warn!(url = %self.url, %error, "network error");
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = Some(error.to_string());
        }
        // already closing: finish the close instead
        if !self.transition(ConnectionState::Error) {
            self.transition(ConnectionState::Closed);
        }
    }

    async fn deliver(&self, data: &[u8]) -> Result<Dispatch> {
        let msg = match self.codec.decode(data) {
            Ok(msg) => msg,
            Err(error) => {
                self.stats.inc_decode_errors();
                tracing::warn!(
                    url = %self.url,
                    codec = self.codec.name(),
                    bytes = data.len(),
                    %error,
                    "discarding undecodable frame"
                );
                return Err(error);
            }
        };

        let outcome = self.registry.dispatch(msg).await;
        match &outcome {
            Dispatch::Handled(_) => self.stats.inc_dispatched(),
            Dispatch::NoHandler(_) => self.stats.inc_unhandled(),
            Dispatch::Failed { .. } => self.stats.inc_handler_errors(),
        }
        Ok(outcome)
    }

    async fn finish_close(&self, sink: &mut FrameSink, outbound: &mut mpsc::Receiver<Frame>) {
        // no new frames past this point; send() now sees a closed queue
        outbound.close();
        while let Ok(frame) = outbound.try_recv() {
            if let Err(error) = sink.send(frame).await {
                tracing::debug!(url = %self.url, %error, "flush on close failed");
                self.stats.add_dropped(1);
                break;
            }
            self.stats.inc_transmitted();
        }
        self.discard_pending(outbound);
        if let Err(error) = sink.close().await {
            tracing::debug!(url = %self.url, %error, "close handshake failed");
        }
        self.transition(ConnectionState::Closing);
        self.transition(ConnectionState::Closed);
    }

    /// Close the outbound queue and count whatever is still in it as dropped.
    fn discard_pending(&self, outbound: &mut mpsc::Receiver<Frame>) {
        outbound.close();
        let mut dropped = 0u64;
        while outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            self.stats.add_dropped(dropped);
            tracing::warn!(url = %self.url, dropped, "connection ended with frames not transmitted");
        }
    }
}

// --------------------
// Connection driver
// --------------------
async fn drive(inner: Arc<ChannelInner>, connector: Arc<dyn Connector>, mut outbound: mpsc::Receiver<Frame>) {
    let connected = tokio::select! {
        res = connector.connect(&inner.url) => res,
        _ = inner.close_requested.notified() => {
            inner.discard_pending(&mut outbound);
            inner.transition(ConnectionState::Closed);
            return;
        }
    };

    let (mut sink, mut stream) = match connected {
        Ok(pair) => pair,
        Err(error) => {
            inner.discard_pending(&mut outbound);
            inner.fail(error);
            return;
        }
    };

    if !inner.transition(ConnectionState::Open) {
        // close() won the race against the handshake
        inner.discard_pending(&mut outbound);
        if let Err(error) = sink.close().await {
            tracing::debug!(url = %inner.url, %error, "close after handshake failed");
        }
        inner.transition(ConnectionState::Closed);
        return;
    }
    inner.opened.store(true, Ordering::Relaxed);

    loop {
        tokio::select! {
            biased;

            _ = inner.close_requested.notified() => {
                inner.finish_close(&mut sink, &mut outbound).await;
                return;
            }

            // inbound ahead of outbound: a busy sender must not starve dispatch
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(frame)) => {
                        // per-frame failures are logged in deliver and never end the loop
                        let _ = inner.deliver(frame.as_bytes()).await;
                    }
                    Some(Err(error)) => {
                        inner.discard_pending(&mut outbound);
                        inner.fail(error);
                        return;
                    }
                    None => {
                        tracing::info!(url = %inner.url, "remote closed the connection");
                        inner.discard_pending(&mut outbound);
                        inner.transition(ConnectionState::Closing);
                        inner.transition(ConnectionState::Closed);
                        return;
                    }
                }
            }

            maybe_out = outbound.recv() => {
                let Some(frame) = maybe_out else {
                    inner.finish_close(&mut sink, &mut outbound).await;
                    return;
                };
                if let Err(error) = sink.send(frame).await {
                    inner.stats.add_dropped(1);
                    inner.discard_pending(&mut outbound);
                    inner.fail(error);
                    return;
                }
                inner.stats.inc_transmitted();
            }
        }
    }
}
