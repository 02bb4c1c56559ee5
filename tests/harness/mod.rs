//! Shared fixtures for the integration tests.
//!
//! A scripted fake server that speaks just enough of the protocol to drive a
//! client through every path, plus an in-memory connector.

#![allow(dead_code)]

mod server;

pub use server::{
    BreakableConnector, DuplexConnector, Request, ServerConn, TestServer,
    switching_protocols,
};

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use wslink::Event;

/// Wait for the next event, failing the test after five seconds.
pub async fn next_event(events: &mut UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Assert nothing further arrives within a short grace period.
pub async fn assert_no_more_events(events: &mut UnboundedReceiver<Event>) {
    match tokio::time::timeout(Duration::from_millis(100), events.recv()).await {
        Ok(Some(event)) => panic!("unexpected event: {event:?}"),
        Ok(None) | Err(_) => {}
    }
}
