//! Hand-driven channel for tests and offline demos.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{ChannelError, ChannelEvent, EventSender, LiveLocationChannel};
use crate::tracking::model::LocationUpdate;

/// A [`LiveLocationChannel`] whose events are pushed by the caller.
#[derive(Debug, Default)]
pub struct ManualChannel {
    sender: Mutex<Option<EventSender>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl ManualChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Number of times `close` actually released the channel.
    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Push an event. Returns `false` when nobody is listening.
    pub fn emit(&self, event: ChannelEvent) -> bool {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Push a raw location payload, parsed the same way the socket does.
    pub fn emit_payload(&self, payload: &Value) -> bool {
        match LocationUpdate::from_payload(payload) {
            Some(update) => self.emit(ChannelEvent::Position(update)),
            None => false,
        }
    }
}

impl LiveLocationChannel for ManualChannel {
    fn open(&self, events: EventSender) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        let mut sender = self.sender.lock();
        if sender.is_some() {
            return Err(ChannelError::AlreadyOpen);
        }
        *sender = Some(events);
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.sender.lock().take();
            self.close_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_open_emit_close() {
        let channel = ManualChannel::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        channel.open(tx).unwrap();
        assert!(channel.emit(ChannelEvent::Connected));
        assert!(channel.emit_payload(&json!({"driverId": 3, "lat": 24.0, "lng": 46.0})));
        assert!(!channel.emit_payload(&json!({"lat": 24.0})));

        assert_eq!(rx.try_recv().unwrap(), ChannelEvent::Connected);
        assert!(matches!(rx.try_recv().unwrap(), ChannelEvent::Position(u) if u.driver_id == 3));

        channel.close();
        channel.close();
        assert_eq!(channel.close_count(), 1);
        assert!(!channel.emit(ChannelEvent::Connected));
    }

    #[test]
    fn test_open_twice_and_after_close() {
        let channel = ManualChannel::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        channel.open(tx.clone()).unwrap();
        assert_eq!(channel.open(tx.clone()), Err(ChannelError::AlreadyOpen));

        channel.close();
        assert_eq!(channel.open(tx), Err(ChannelError::Closed));
    }
}
