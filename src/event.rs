//! Application callbacks.
//!
//! Handlers are invoked synchronously, from the task that calls `connect()`
//! or `close()`, or from the receiver task. They must not block.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::message::Message;

/// Receives connection events.
///
/// `on_open` fires once after the handshake succeeds and `on_close` fires once
/// when the connection reaches `Closed` from `Open`. Everything else arrives
/// in between, in wire order.
pub trait EventHandler: Send + Sync + 'static {
    fn on_open(&self);

    fn on_close(&self);

    /// A text or binary message arrived.
    fn on_message(&self, message: Message);

    /// A ping arrived. Answering it is up to the application.
    fn on_ping(&self, payload: &[u8]) {
        debug!(len = payload.len(), "ping received");
    }

    fn on_pong(&self, payload: &[u8]) {
        debug!(len = payload.len(), "pong received");
    }

    /// A send failed or the receiver stopped on an error.
    fn on_error(&self, error: &Error) {
        warn!(%error, "connection error");
    }
}

impl<H: EventHandler + ?Sized> EventHandler for Arc<H> {
    fn on_open(&self) {
        (**self).on_open();
    }

    fn on_close(&self) {
        (**self).on_close();
    }

    fn on_message(&self, message: Message) {
        (**self).on_message(message);
    }

    fn on_ping(&self, payload: &[u8]) {
        (**self).on_ping(payload);
    }

    fn on_pong(&self, payload: &[u8]) {
        (**self).on_pong(payload);
    }

    fn on_error(&self, error: &Error) {
        (**self).on_error(error);
    }
}

/// A connection event, as delivered by [`ChannelHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    Open,
    Close,
    Message(Message),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Error(Error),
}

/// Forwards every callback as an [`Event`] on an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelHandler {
    /// Create a handler and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: Event) {
        if self.tx.send(event).is_err() {
            trace!("event receiver dropped");
        }
    }
}

impl EventHandler for ChannelHandler {
    fn on_open(&self) {
        self.forward(Event::Open);
    }

    fn on_close(&self) {
        self.forward(Event::Close);
    }

    fn on_message(&self, message: Message) {
        self.forward(Event::Message(message));
    }

    fn on_ping(&self, payload: &[u8]) {
        self.forward(Event::Ping(payload.to_vec()));
    }

    fn on_pong(&self, payload: &[u8]) {
        self.forward(Event::Pong(payload.to_vec()));
    }

    fn on_error(&self, error: &Error) {
        self.forward(Event::Error(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        opens: AtomicUsize,
        messages: AtomicUsize,
    }

    impl EventHandler for Counting {
        fn on_open(&self) {
            self.opens.fetch_add(1, Ordering::SeqCst);
        }

        fn on_close(&self) {}

        fn on_message(&self, _message: Message) {
            self.messages.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_default_callbacks_do_not_panic() {
        let handler = Counting::default();
        handler.on_ping(b"ping...");
        handler.on_pong(b"pong...");
        handler.on_error(&Error::NotConnected);
    }

    #[test]
    fn test_arc_handler_delegates() {
        let shared = Arc::new(Counting::default());
        let handler: Arc<dyn EventHandler> = Arc::new(Arc::clone(&shared));
        handler.on_open();
        handler.on_message(Message::text("x"));
        assert_eq!(shared.opens.load(Ordering::SeqCst), 1);
        assert_eq!(shared.messages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_handler_forwards_in_order() {
        let (handler, mut rx) = ChannelHandler::new();
        handler.on_open();
        handler.on_message(Message::text("hello"));
        handler.on_ping(b"p");
        handler.on_error(&Error::NotConnected);
        handler.on_close();

        assert_eq!(rx.recv().await, Some(Event::Open));
        assert_eq!(rx.recv().await, Some(Event::Message(Message::text("hello"))));
        assert_eq!(rx.recv().await, Some(Event::Ping(b"p".to_vec())));
        assert_eq!(rx.recv().await, Some(Event::Error(Error::NotConnected)));
        assert_eq!(rx.recv().await, Some(Event::Close));
    }

    #[test]
    fn test_channel_handler_survives_dropped_receiver() {
        let (handler, rx) = ChannelHandler::new();
        drop(rx);
        handler.on_open();
    }
}
