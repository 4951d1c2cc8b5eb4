//! Connection factory seam.
//!
//! A connector yields a frame sink and a frame stream for one URL. The stream
//! ending means the remote side closed; an `Err` item means the network failed.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};

use corona_core::codec::Frame;
use corona_core::error::{CoronaError, Result};

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = CoronaError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame>> + Send>>;

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream)>;
}

/// WebSocket connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream)> {
        let (ws, _resp) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| CoronaError::Transport(format!("connect {url}: {e}")))?;

        let (write, read) = ws.split();

        let sink = write
            .with(|frame: Frame| future::ready(Ok::<_, tungstenite::Error>(to_ws(frame))))
            .sink_map_err(|e| CoronaError::Transport(format!("write: {e}")));
        let stream = read.filter_map(|item| future::ready(from_ws(item)));

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}

fn to_ws(frame: Frame) -> WsMessage {
    match frame {
        Frame::Text(s) => WsMessage::Text(s),
        Frame::Binary(b) => WsMessage::Binary(b.to_vec()),
    }
}

fn from_ws(item: std::result::Result<WsMessage, tungstenite::Error>) -> Option<Result<Frame>> {
    match item {
        Ok(WsMessage::Text(s)) => Some(Ok(Frame::Text(s))),
        Ok(WsMessage::Binary(b)) => Some(Ok(Frame::Binary(Bytes::from(b)))),
        // tungstenite answers pings itself; a close frame is followed by end of stream
        Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Close(_) | WsMessage::Frame(_)) => None,
        Err(tungstenite::Error::ConnectionClosed) => None,
        Err(e) => Some(Err(CoronaError::Transport(format!("read: {e}")))),
    }
}
