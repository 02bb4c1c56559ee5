//! The receiver task: reads frames from the server and dispatches them.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::connection::{CloseOrigin, Inner, StreamReader};
use crate::error::{DecodeError, Result};
use crate::message::Message;
use crate::protocol::Frame;
use crate::transport::Connector;

enum Flow {
    Continue,
    PeerClosed,
}

/// Runs until the stop signal fires, the peer closes, or a read fails.
///
/// Every exit except the stop signal goes through the shared teardown, so the
/// connection always ends `Closed` with a single `on_close`.
pub(super) async fn run<C: Connector>(
    inner: Arc<Inner<C>>,
    mut reader: StreamReader<C::Stream>,
    mut stop: watch::Receiver<bool>,
) {
    debug!("receiver started");
    loop {
        if *stop.borrow_and_update() {
            debug!("receiver stopped");
            return;
        }

        let read = tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
            frame = reader.read_frame() => frame,
        };

        match read.and_then(|frame| dispatch(&*inner, frame)) {
            Ok(Flow::Continue) => {}
            Ok(Flow::PeerClosed) => {
                if let Err(err) = inner.shutdown(CloseOrigin::Receiver).await {
                    debug!(error = %err, "teardown after peer close failed");
                }
                return;
            }
            Err(err) => {
                if *stop.borrow() {
                    debug!(error = %err, "read interrupted by close");
                    return;
                }
                warn!(error = %err, "receiver failed");
                inner.handler.on_error(&err);
                if let Err(err) = inner.shutdown(CloseOrigin::Receiver).await {
                    debug!(error = %err, "teardown after read error failed");
                }
                return;
            }
        }
    }
}

fn dispatch<C: Connector>(inner: &Inner<C>, frame: Frame) -> Result<Flow> {
    if frame.is_masked() {
        return Err(DecodeError::MaskedServerFrame.into());
    }
    trace!(opcode = %frame.opcode, fin = frame.fin, len = frame.payload().len(), "frame received");

    match Message::from_frame(frame)? {
        Message::Ping(payload) => inner.handler.on_ping(&payload),
        Message::Pong(payload) => inner.handler.on_pong(&payload),
        message @ Message::Close(_) => {
            debug!(code = ?message.close_code(), "peer sent close");
            return Ok(Flow::PeerClosed);
        }
        message => inner.handler.on_message(message),
    }
    Ok(Flow::Continue)
}
