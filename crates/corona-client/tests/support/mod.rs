//! In-memory connector and helpers shared by the client integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;

use corona_client::Handler;
use corona_client::transport::{Channel, ConnectionState, Connector, FrameSink, FrameStream};
use corona_core::codec::Frame;
use corona_core::error::{CoronaError, Result};
use corona_core::protocol::Message;

pub const WAIT: Duration = Duration::from_secs(2);
pub const QUIET: Duration = Duration::from_millis(100);

/// Server side of one in-memory connection. Dropping it closes the
/// connection from the remote end.
pub struct Peer {
    pub to_client: mpsc::UnboundedSender<Result<Frame>>,
    pub from_client: mpsc::UnboundedReceiver<Frame>,
}

impl Peer {
    pub fn push(&self, frame: Frame) {
        self.to_client.send(Ok(frame)).unwrap();
    }

    pub fn push_text(&self, s: &str) {
        self.push(Frame::Text(s.to_string()));
    }

    /// Simulate a network failure on the read side.
    pub fn fail(&self, reason: &str) {
        self.to_client
            .send(Err(CoronaError::Transport(reason.to_string())))
            .unwrap();
    }

    pub async fn recv(&mut self) -> Frame {
        timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client side closed")
    }

    /// `None` once the client dropped its end.
    pub async fn recv_or_closed(&mut self) -> Option<Frame> {
        timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")
    }

    pub async fn assert_silent(&mut self) {
        if let Ok(Some(frame)) = timeout(QUIET, self.from_client.recv()).await {
            panic!("unexpected frame from client: {frame:?}");
        }
    }
}

pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<Peer>,
    gate: Arc<Semaphore>,
    failures_left: AtomicU32,
    connects: AtomicU32,
}

impl MemoryConnector {
    /// Connections complete immediately.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        Self::build(Semaphore::MAX_PERMITS, 0)
    }

    /// Each connection waits for one `release()`.
    pub fn gated() -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        Self::build(0, 0)
    }

    /// The first `n` connections are refused.
    pub fn failing(n: u32) -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        Self::build(Semaphore::MAX_PERMITS, n)
    }

    fn build(permits: usize, failures: u32) -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            peers: tx,
            gate: Arc::new(Semaphore::new(permits)),
            failures_left: AtomicU32::new(failures),
            connects: AtomicU32::new(0),
        });
        (connector, rx)
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _url: &str) -> Result<(FrameSink, FrameStream)> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| CoronaError::Transport("gate closed".into()))?;
        permit.forget();

        let refused = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(CoronaError::Transport("connection refused".into()));
        }

        let (client_tx, from_client) = mpsc::unbounded_channel::<Frame>();
        let (to_client, client_rx) = mpsc::unbounded_channel::<Result<Frame>>();

        let sink = futures_util::sink::unfold(client_tx, |tx, frame: Frame| async move {
            tx.send(frame)
                .map_err(|_| CoronaError::Transport("peer gone".into()))?;
            Ok::<_, CoronaError>(tx)
        });
        let stream = futures_util::stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        let _ = self.peers.send(Peer {
            to_client,
            from_client,
        });
        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

pub async fn next_peer(peers: &mut mpsc::UnboundedReceiver<Peer>) -> Peer {
    timeout(WAIT, peers.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("connector dropped")
}

pub async fn wait_state(channel: &Channel, want: ConnectionState) {
    let mut rx = channel.subscribe();
    let reached = timeout(WAIT, rx.wait_for(|s| *s == want)).await.map(|r| r.is_ok());
    assert_eq!(reached, Ok(true), "channel never reached {want}, now {}", channel.state());
}

/// Poll `check` until it holds or the wait budget runs out.
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition never held: {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Handler that forwards every message it sees to the returned receiver.
pub fn recorder() -> (impl Handler, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = move |msg: Message| -> Result<()> {
        tx.send(msg)
            .map_err(|_| CoronaError::Handler("recorder dropped".into()))
    };
    (handler, rx)
}

pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a handler call")
        .expect("recorder dropped")
}
