//! Reconnect supervisor.
//!
//! A channel is terminal once CLOSED or ERROR. The supervisor sits outside
//! that state machine: when the current channel ends without a local close it
//! waits out a backoff delay and opens a fresh one. Handlers live in a
//! registry shared by every channel it opens, so they survive reconnects.

pub mod retry;

use std::sync::Arc;

use tokio::sync::watch;

use corona_core::codec::Codec;
use corona_core::error::{CoronaError, Result};
use corona_core::protocol::{Message, Tag};

use crate::config::ClientConfig;
use crate::dispatch::{Handler, HandlerRegistry};
use crate::transport::channel::DEFAULT_OUTBOUND_CAPACITY;
use crate::transport::{Channel, ChannelBuilder, Connector, SendOutcome, SendPolicy, WsConnector};

pub use retry::RetryPolicy;

pub struct Supervisor {
    url: String,
    codec: Arc<dyn Codec>,
    connector: Arc<dyn Connector>,
    registry: Arc<HandlerRegistry>,
    send_policy: SendPolicy,
    outbound_capacity: usize,
    retry: RetryPolicy,
    current: watch::Sender<Option<Channel>>,
    stop: watch::Sender<bool>,
}

impl Supervisor {
    pub fn new(url: impl Into<String>, codec: Arc<dyn Codec>, retry: RetryPolicy) -> Self {
        let (current, _) = watch::channel(None);
        let (stop, _) = watch::channel(false);
        Self {
            url: url.into(),
            codec,
            connector: Arc::new(WsConnector::new()),
            registry: Arc::new(HandlerRegistry::new()),
            send_policy: SendPolicy::default(),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            retry,
            current,
            stop,
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(cfg.client.url.clone(), cfg.client.codec.build(), cfg.retry.policy())
            .with_send_policy(cfg.client.send_policy.into())
            .with_outbound_capacity(cfg.client.outbound_capacity)
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_send_policy(mut self, policy: SendPolicy) -> Self {
        self.send_policy = policy;
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn register_callback(&self, tag: Tag, handler: impl Handler + 'static) -> Option<Arc<dyn Handler>> {
        self.registry.register(tag, Arc::new(handler))
    }

    /// The live channel, if one is up or connecting.
    pub fn current(&self) -> Option<Channel> {
        self.current.borrow().clone()
    }

    /// Watch channel replacements.
    pub fn channels(&self) -> watch::Receiver<Option<Channel>> {
        self.current.subscribe()
    }

    /// Send on the live channel.
    pub fn send(&self, msg: &Message) -> Result<SendOutcome> {
        match self.current() {
            Some(channel) => channel.send(msg),
            None => Err(CoronaError::NotOpen { state: "DISCONNECTED" }),
        }
    }

    /// Wait for a channel that reaches OPEN, across reconnects.
    pub async fn wait_open(&self) -> Result<Channel> {
        let mut rx = self.current.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(channel) = current {
                if channel.wait_open().await.is_ok() {
                    return Ok(channel);
                }
            }
            let stopped = *self.stop.borrow();
            if stopped {
                return Err(CoronaError::NotOpen { state: "CLOSED" });
            }
            rx.changed()
                .await
                .map_err(|_| CoronaError::Transport("supervisor dropped".into()))?;
        }
    }

    /// Ask `run` to close the live channel and return.
    pub fn shutdown(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once the supervisor has been shut down or has given up.
    pub async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        stop_requested(&mut rx).await;
    }

    /// Keep a channel alive until shutdown or until retries run out.
    pub async fn run(&self) -> Result<()> {
        let mut stop_rx = self.stop.subscribe();
        let mut attempt = 0u32;

        let result = loop {
            let stopped = *stop_rx.borrow();
            if stopped {
                break Ok(());
            }

            let channel = self.open_channel();
            self.current.send_replace(Some(channel.clone()));

            let end = tokio::select! {
                state = channel.terminated() => state,
                _ = stop_requested(&mut stop_rx) => {
                    channel.close();
                    channel.terminated().await;
                    break Ok(());
                }
            };
            self.current.send_replace(None);

            if channel.closed_locally() {
                tracing::info!(url = %self.url, "channel closed locally, supervisor stopping");
                break Ok(());
            }

            if channel.was_opened() {
                attempt = 0;
            }
            attempt += 1;
            if !self.retry.allows(attempt) {
                let attempts = attempt - 1;
                tracing::error!(url = %self.url, attempts, "giving up reconnecting");
                break Err(CoronaError::RetriesExhausted { attempts });
            }

            let delay = self.retry.backoff(attempt);
            tracing::warn!(
                url = %self.url,
                %end,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = channel.last_error().as_deref().unwrap_or("-"),
                "connection lost, reconnecting"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_requested(&mut stop_rx) => break Ok(()),
            }
        };

        self.stop.send_replace(true);
        self.current.send_replace(None);
        result
    }

    fn open_channel(&self) -> Channel {
        ChannelBuilder::new(self.url.clone(), Arc::clone(&self.codec))
            .connector(Arc::clone(&self.connector))
            .registry(Arc::clone(&self.registry))
            .send_policy(self.send_policy)
            .outbound_capacity(self.outbound_capacity)
            .open()
    }
}

async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
