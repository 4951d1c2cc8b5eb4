#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use corona_client::{ConnectionState, Dispatch, Handler, HandlerRegistry};
use corona_core::error::{CoronaError, ErrorKind, Result};
use corona_core::protocol::{Message, Tag};

/// Async handler that records usernames it was asked to greet.
#[derive(Default)]
struct Greeter {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Handler for Greeter {
    async fn handle(&self, msg: Message) -> Result<()> {
        match msg {
            Message::UserJoinRequest(req) => {
                self.seen.lock().await.push(req.username);
                Ok(())
            }
            other => Err(CoronaError::Handler(format!("unexpected {}", other.tag()))),
        }
    }
}

fn counting(counter: Arc<AtomicU32>) -> impl Handler {
    move |_msg: Message| -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn dispatch_invokes_the_registered_handler_once() {
    let registry = HandlerRegistry::new();
    let greeter = Arc::new(Greeter::default());
    registry.register(Tag::UserJoinRequest, greeter.clone());

    let outcome = registry.dispatch(Message::user_join_request("dora")).await;
    assert!(outcome.is_handled());
    assert_eq!(outcome.tag(), Tag::UserJoinRequest);
    assert_eq!(*greeter.seen.lock().await, vec!["dora".to_string()]);
}

#[tokio::test]
async fn missing_handler_is_an_explicit_outcome() {
    let registry = HandlerRegistry::new();
    let outcome = registry.dispatch(Message::create_cookie_request()).await;
    assert!(matches!(outcome, Dispatch::NoHandler(Tag::CreateCookieRequest)));

    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnregisteredTag);
    assert!(err.is_frame_local());
}

#[tokio::test]
async fn handler_error_is_reported_not_swallowed() {
    let registry = HandlerRegistry::new();
    registry.register(Tag::ViewPortResponse, Arc::new(Greeter::default()));

    let outcome = registry.dispatch(Message::view_port_response(vec![])).await;
    match outcome {
        Dispatch::Failed { tag, error } => {
            assert_eq!(tag, Tag::ViewPortResponse);
            assert_eq!(error.kind(), ErrorKind::Handler);
        }
        other => panic!("expected a handler failure, got {other:?}"),
    }
}

#[tokio::test]
async fn last_registration_wins() {
    let registry = HandlerRegistry::new();
    let first = Arc::new(AtomicU32::new(0));
    let second = Arc::new(AtomicU32::new(0));

    assert!(registry
        .register(Tag::UserJoinResponse, Arc::new(counting(first.clone())))
        .is_none());
    assert!(registry
        .register(Tag::UserJoinResponse, Arc::new(counting(second.clone())))
        .is_some());

    registry
        .dispatch(Message::user_join_response(true, Vec::<String>::new()))
        .await;
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unregister_restores_the_no_handler_outcome() {
    let registry = HandlerRegistry::new();
    let calls = Arc::new(AtomicU32::new(0));
    registry.register(Tag::ViewPortRequest, Arc::new(counting(calls.clone())));
    assert!(registry.contains(Tag::ViewPortRequest));

    assert!(registry.unregister(Tag::ViewPortRequest).is_some());
    assert!(!registry.contains(Tag::ViewPortRequest));

    let outcome = registry
        .dispatch(Message::view_port_request(0.0, 0.0, 1.0, 1.0))
        .await;
    assert!(matches!(outcome, Dispatch::NoHandler(Tag::ViewPortRequest)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn registered_tags_are_sorted() {
    let registry = HandlerRegistry::new();
    let calls = Arc::new(AtomicU32::new(0));
    for tag in [Tag::CreateCookieResponse, Tag::ViewPortResponse, Tag::UserJoinResponse] {
        registry.register(tag, Arc::new(counting(calls.clone())));
    }
    assert_eq!(
        registry.registered_tags(),
        vec![Tag::ViewPortResponse, Tag::UserJoinResponse, Tag::CreateCookieResponse]
    );
}

#[test]
fn lifecycle_transitions_follow_the_state_machine() {
    use ConnectionState::*;
    let all = [Connecting, Open, Closing, Closed, Error];
    let allowed = [
        (Connecting, Open),
        (Connecting, Error),
        (Connecting, Closing),
        (Open, Error),
        (Open, Closing),
        (Closing, Closed),
    ];
    for from in all {
        for to in all {
            assert_eq!(
                from.can_transition_to(to),
                allowed.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
    assert!(Closed.is_terminal());
    assert!(Error.is_terminal());
    assert!(!Closing.is_terminal());
    assert_eq!(Connecting.to_string(), "CONNECTING");
}
