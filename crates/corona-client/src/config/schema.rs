use std::time::Duration;

use serde::Deserialize;

use corona_core::codec::CodecKind;
use corona_core::error::{CoronaError, Result};

use crate::supervisor::RetryPolicy;
use crate::transport::SendPolicy;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    pub client: ClientSection,

    #[serde(default)]
    pub retry: RetrySection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(CoronaError::UnsupportedVersion);
        }
        self.client.validate()?;
        self.retry.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendPolicyName {
    #[default]
    Reject,
    Queue,
}

impl From<SendPolicyName> for SendPolicy {
    fn from(name: SendPolicyName) -> Self {
        match name {
            SendPolicyName::Reject => SendPolicy::Reject,
            SendPolicyName::Queue => SendPolicy::QueueUntilOpen,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    pub url: String,

    #[serde(default)]
    pub codec: CodecKind,

    #[serde(default)]
    pub send_policy: SendPolicyName,

    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    #[serde(default)]
    pub username: Option<String>,
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(CoronaError::Config(
                "client.url must start with ws:// or wss://".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_capacity) {
            return Err(CoronaError::Config(
                "client.outbound_capacity must be between 1 and 65536".into(),
            ));
        }
        if self.username.as_deref().is_some_and(str::is_empty) {
            return Err(CoronaError::Config("client.username must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetrySection {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(CoronaError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.base_delay_ms == 0 {
            return Err(CoronaError::Config("retry.base_delay_ms must be at least 1".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(CoronaError::Config(
                "retry.max_delay_ms must not be less than base_delay_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}

fn default_outbound_capacity() -> usize {
    1024
}
fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    30000
}
fn default_jitter() -> bool {
    true
}
