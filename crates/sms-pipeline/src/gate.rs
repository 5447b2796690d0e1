//! Process-wide serialization of pipeline invocations
//!
//! The external library keeps its games root in a single mutable global and
//! caches loaded modules by name, so two invocations must never overlap
//! inside one interpreter. Every adapter call passes through a gate; the
//! default gate is shared by the whole process.

use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

static GLOBAL_GATE: Lazy<Arc<PipelineGate>> = Lazy::new(|| Arc::new(PipelineGate::new()));

/// At-most-one admission gate for pipeline invocations
#[derive(Debug, Default)]
pub struct PipelineGate {
    lock: Mutex<()>,
}

/// Proof of admission; the next invocation is admitted when this drops
pub type GatePass<'a> = MutexGuard<'a, ()>;

impl PipelineGate {
    /// Create a private gate
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The gate shared by every adapter in this process
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_GATE)
    }

    /// Wait for exclusive admission (FIFO)
    pub async fn enter(&self) -> GatePass<'_> {
        self.lock.lock().await
    }

    /// Check if an invocation currently holds the gate
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_gate_is_shared() {
        assert!(Arc::ptr_eq(&PipelineGate::global(), &PipelineGate::global()));
    }

    #[tokio::test]
    async fn pass_holds_gate_until_dropped() {
        let gate = PipelineGate::new();
        assert!(!gate.is_busy());
        let pass = gate.enter().await;
        assert!(gate.is_busy());
        drop(pass);
        assert!(!gate.is_busy());
    }
}
