use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::telemetry::Metrics;

/// Keeps a connection counted as in flight until dropped.
///
/// The handler task owns the guard, so every exit path releases the slot.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
    metrics: Option<Arc<Metrics>>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>, metrics: Option<Arc<Metrics>>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(ref m) = metrics {
            m.connections_total.add(1, &[]);
            m.connections_active.add(1, &[]);
        }
        Self { counter, metrics }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
        if let Some(ref m) = self.metrics {
            m.connections_active.add(-1, &[]);
        }
    }
}
