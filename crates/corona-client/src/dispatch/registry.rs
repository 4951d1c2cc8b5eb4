use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use corona_core::error::{CoronaError, Result};
use corona_core::protocol::{Message, Tag};

/// Callback invoked for every decoded message of one tag.
///
/// Plain closures `Fn(Message) -> Result<()>` implement this directly.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, msg: Message) -> Result<()>;
}

#[async_trait]
impl<F> Handler for F
where
    F: Fn(Message) -> Result<()> + Send + Sync,
{
    async fn handle(&self, msg: Message) -> Result<()> {
        (self)(msg)
    }
}

/// Outcome of dispatching one decoded message.
#[derive(Debug)]
pub enum Dispatch {
    Handled(Tag),
    /// Nothing registered for the tag; the message was dropped.
    NoHandler(Tag),
    /// The handler ran and reported an error.
    Failed { tag: Tag, error: CoronaError },
}

impl Dispatch {
    pub fn tag(&self) -> Tag {
        match self {
            Dispatch::Handled(t) | Dispatch::NoHandler(t) => *t,
            Dispatch::Failed { tag, .. } => *tag,
        }
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled(_))
    }

    pub fn into_result(self) -> Result<Tag> {
        match self {
            Dispatch::Handled(t) => Ok(t),
            Dispatch::NoHandler(t) => Err(CoronaError::NoHandler(t)),
            Dispatch::Failed { error, .. } => Err(error),
        }
    }
}

/// Tag -> handler map. One handler per tag; a later registration replaces
/// the earlier one.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<Tag, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Returns the handler that was replaced, if any.
    pub fn register(&self, tag: Tag, handler: Arc<dyn Handler>) -> Option<Arc<dyn Handler>> {
        let previous = self.handlers.insert(tag, handler);
        if previous.is_some() {
            tracing::debug!(%tag, "handler replaced");
        }
        previous
    }

    pub fn unregister(&self, tag: Tag) -> Option<Arc<dyn Handler>> {
        self.handlers.remove(&tag).map(|(_, h)| h)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.handlers.contains_key(&tag)
    }

    pub fn registered_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.handlers.iter().map(|e| *e.key()).collect();
        tags.sort();
        tags
    }

    /// Hand `msg` to the handler for its tag and await it.
    pub async fn dispatch(&self, msg: Message) -> Dispatch {
        let tag = msg.tag();
        // Clone out so the map shard is not locked while the handler runs.
        let Some(handler) = self.handlers.get(&tag).map(|e| e.value().clone()) else {
            tracing::warn!(%tag, "no handler registered, message dropped");
            return Dispatch::NoHandler(tag);
        };

        match handler.handle(msg).await {
            Ok(()) => {
                tracing::debug!(%tag, "message handled");
                Dispatch::Handled(tag)
            }
            Err(error) => {
                tracing::warn!(%tag, %error, "handler failed");
                Dispatch::Failed { tag, error }
            }
        }
    }
}
