//! Waiters for correlated replies.
//!
//! A caller of `send_and_await` parks a oneshot sender here keyed by the correlation id it
//! used; the dispatcher resolves it when an envelope carrying that id arrives. The reply may
//! come from the addressed peer or from a relay hop that could not deliver the request.

use super::prelude::*;

use tokio::sync::oneshot;

use std::sync::{Mutex, PoisonError};

/// A fresh, non-zero correlation id.
pub fn fresh_id() -> CorrelationId {
    loop {
        let id: CorrelationId = rand::random();
        if id != 0 {
            return id;
        }
    }
}

#[derive(Default)]
pub struct Waiters {
    pending: Mutex<HashMap<CorrelationId, oneshot::Sender<Envelope>>>,
}

impl Waiters {
    pub fn new() -> Self {
        Waiters::default()
    }

    pub fn register(&self, id: CorrelationId) -> oneshot::Receiver<Envelope> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.insert(id, tx).is_some() {
            warn!("replacing waiter for correlation id {}", id);
        }
        rx
    }

    /// Hands `envelope` to the waiter expecting it, if any.
    pub fn resolve(&self, envelope: &Envelope) -> bool {
        let id = match envelope.correlation_id() {
            Some(id) => id,
            None => return false,
        };
        let waiter = self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
        match waiter {
            // The receiver may have timed out in the meantime.
            Some(tx) => tx.send(envelope.clone()).is_ok(),
            None => false,
        }
    }

    pub fn cancel(&self, id: CorrelationId) {
        let _ = self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn resolves_exactly_once_by_correlation_id() {
        let waiters = Waiters::new();
        let me = PeerId::generate();
        let rx = waiters.register(7);

        // Wrong id, or no id at all.
        let other = Envelope::new(PeerId::generate(), me, Payload::Hello).with_correlation_id(8);
        assert!(!waiters.resolve(&other));
        assert!(!waiters.resolve(&Envelope::new(PeerId::generate(), me, Payload::Hello)));

        // Any sender carrying the id resolves it, e.g. the hop that could not deliver.
        let reply = Envelope::new(PeerId::generate(), me, Payload::error("Invalid recipient"))
            .with_correlation_id(7);
        assert!(waiters.resolve(&reply));
        assert_eq!(rx.await.unwrap(), reply);
        assert!(waiters.is_empty());
        assert!(!waiters.resolve(&reply));
    }

    #[test]
    fn cancel_removes_waiter() {
        let waiters = Waiters::new();
        let _rx = waiters.register(1);
        assert_eq!(waiters.len(), 1);
        waiters.cancel(1);
        assert!(waiters.is_empty());
        assert_ne!(fresh_id(), 0);
    }
}
