//! Supersede tokens for in-flight hardware queries.
//!
//! A validation pass pins the generation counter when it starts; issuing a
//! newer token bumps the counter, which marks every earlier token stale. The
//! binding client checks its token between retry attempts, so a superseded
//! query stops backing off instead of finishing seconds after anyone stopped
//! caring about its answer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared generation counter. One per coordinator.
#[derive(Debug, Default, Clone)]
pub struct SupersedeSource {
    generation: Arc<AtomicU64>,
}

impl SupersedeSource {
    /// Creates a fresh source at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumps the generation and returns a token pinned to the new value.
    /// Every token issued earlier becomes stale.
    pub fn issue(&self) -> SupersedeToken {
        let mine = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        SupersedeToken {
            generation: Arc::clone(&self.generation),
            mine,
        }
    }
}

/// A token pinned to one validation pass.
#[derive(Debug, Clone)]
pub struct SupersedeToken {
    generation: Arc<AtomicU64>,
    mine: u64,
}

impl SupersedeToken {
    /// A token that can never be superseded, for callers that run outside
    /// any coordinator (diagnostics, tests).
    pub fn detached() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            mine: 0,
        }
    }

    /// Returns true once a newer token has been issued from the same source.
    pub fn is_superseded(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.mine
    }
}
