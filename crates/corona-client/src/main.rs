//! corona client
//!
//! - Loads `corona.yaml` (or the path given as first argument)
//! - Opens a supervised channel to the game server
//! - Joins with the configured username once the socket is open
//! - Logs every response; Ctrl-C closes the channel and exits

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use corona_client::{config, Supervisor};
use corona_core::protocol::{Message, Tag};
use corona_core::Result;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "corona.yaml".into());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let username = cfg.client.username.clone();

    let sup = Arc::new(Supervisor::from_config(&cfg));

    sup.register_callback(Tag::UserJoinResponse, |msg: Message| -> Result<()> {
        if let Message::UserJoinResponse(resp) = msg {
            tracing::info!(ok = resp.ok, alt_names = ?resp.alt_names, "join response");
        }
        Ok(())
    });
    sup.register_callback(Tag::ViewPortResponse, |msg: Message| -> Result<()> {
        if let Message::ViewPortResponse(resp) = msg {
            tracing::debug!(cookies = resp.cookies.len(), "viewport update");
        }
        Ok(())
    });
    sup.register_callback(Tag::CreateCookieResponse, |msg: Message| -> Result<()> {
        if let Message::CreateCookieResponse(resp) = msg {
            match resp.as_cookie_info() {
                Ok(cookie) => tracing::info!(id = cookie.id, x = cookie.x, y = cookie.y, "cookie created"),
                Err(e) => tracing::warn!(error = %e, "unrecognized create cookie response"),
            }
        }
        Ok(())
    });

    tracing::info!(url = %cfg.client.url, codec = cfg.client.codec.as_str(), "corona-client starting");
    let runner = {
        let sup = Arc::clone(&sup);
        tokio::spawn(async move { sup.run().await })
    };

    if let Some(name) = username {
        match sup.wait_open().await {
            Ok(channel) => {
                if let Err(e) = channel.send(&Message::user_join_request(name)) {
                    tracing::warn!(error = %e, "join request not sent");
                }
            }
            Err(e) => tracing::warn!(error = %e, "never connected"),
        }
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            sup.shutdown();
        }
        _ = sup.stopped() => {}
    }

    match runner.await {
        Ok(Ok(())) => tracing::info!("corona-client stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "corona-client stopped"),
        Err(e) => tracing::error!(error = %e, "supervisor task failed"),
    }
}
