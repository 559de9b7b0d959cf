use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportEvent};

/// In-process duplex transport.
///
/// Created as a connected pair: every unit sent on one side is delivered as a
/// `Unit` event on the other, in order. Both sides see `Open` first.
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: Sender<TransportEvent>,
    inbound: Receiver<TransportEvent>,
    closing: bool,
    closed: bool,
}

impl MemoryTransport {
    /// Create a connected pair of transports.
    pub fn pair() -> (Self, Self) {
        let (left_tx, right_rx) = channel();
        let (right_tx, left_rx) = channel();

        // Receivers are alive; these sends cannot fail.
        let _ = left_tx.send(TransportEvent::Open);
        let _ = right_tx.send(TransportEvent::Open);

        (
            Self::from_channels(left_tx, left_rx),
            Self::from_channels(right_tx, right_rx),
        )
    }

    fn from_channels(outbound: Sender<TransportEvent>, inbound: Receiver<TransportEvent>) -> Self {
        Self {
            outbound,
            inbound,
            closing: false,
            closed: false,
        }
    }

    /// Deliver an arbitrary lifecycle event to the other side.
    ///
    /// Lets an in-process peer simulate transport failures.
    pub fn notify_peer(&self, event: TransportEvent) -> Result<()> {
        self.outbound
            .send(event)
            .map_err(|_| TransportError::Disconnected)
    }

    /// Whether `close` has been requested on this side.
    pub fn is_closing(&self) -> bool {
        self.closing
    }
}

impl Transport for MemoryTransport {
    fn send_unit(&mut self, unit: Bytes) -> Result<()> {
        if self.closing || self.closed {
            return Err(TransportError::Shutdown);
        }
        debug!(len = unit.len(), "memory transport send");
        self.outbound
            .send(TransportEvent::Unit(unit))
            .map_err(|_| TransportError::Disconnected)
    }

    fn next_event(&mut self) -> Result<TransportEvent> {
        if self.closed {
            return Ok(TransportEvent::Closed);
        }

        let event = if self.closing {
            // Drain what the peer sent before our close, then confirm.
            match self.inbound.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {
                    TransportEvent::Closed
                }
            }
        } else {
            self.inbound.recv().unwrap_or(TransportEvent::Closed)
        };

        if event == TransportEvent::Closed {
            self.closed = true;
        }
        Ok(event)
    }

    fn close(&mut self) -> Result<()> {
        if self.closing || self.closed {
            return Ok(());
        }
        self.closing = true;
        debug!("memory transport close requested");
        // The peer may already be gone; closing is still complete locally.
        let _ = self.outbound.send(TransportEvent::Closed);
        Ok(())
    }
}
