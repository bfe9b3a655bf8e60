//! Pool of reusable per-request scratch units.
//!
//! Each push request needs a signature buffer, a body buffer and an envelope
//! decode target. These are cached here instead of being allocated per
//! request. The pool is an allocation cache only: it never blocks or rejects a
//! caller, and creates a fresh unit whenever the idle set is empty.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::message::Envelope;
use crate::server::signature::SIGNATURE_BUF_CAPACITY;

/// A released unit whose buffers grew past this multiple of their initial
/// capacity is dropped rather than kept idle.
const RETAINED_CAPACITY_FACTOR: usize = 4;

/// Scratch state owned by exactly one request while acquired.
#[derive(Debug)]
pub struct ScratchUnit {
    /// Holds the sorted, concatenated credential strings
    pub signature_buf: Vec<u8>,
    /// Receives the streamed request body
    pub body_buf: Vec<u8>,
    /// Decode target for the body
    pub envelope: Envelope,
}

impl ScratchUnit {
    fn new(body_capacity: usize) -> Self {
        Self {
            signature_buf: Vec::with_capacity(SIGNATURE_BUF_CAPACITY),
            body_buf: Vec::with_capacity(body_capacity),
            envelope: Envelope::default(),
        }
    }

    /// Whether a request grew the buffers past what the pool keeps around.
    ///
    /// Envelope strings are filled from the body, so the body buffer bounds
    /// them too.
    fn is_oversized(&self, body_capacity: usize) -> bool {
        self.body_buf.capacity() > body_capacity.saturating_mul(RETAINED_CAPACITY_FACTOR)
            || self.signature_buf.capacity()
                > SIGNATURE_BUF_CAPACITY.saturating_mul(RETAINED_CAPACITY_FACTOR)
    }

    /// Clear everything a request may have written.
    fn reset(&mut self) {
        self.signature_buf.clear();
        self.body_buf.clear();
        self.envelope.reset();
    }
}

/// Thread-safe cache of idle [`ScratchUnit`]s.
#[derive(Debug)]
pub struct ScratchPool {
    idle: Mutex<Vec<Box<ScratchUnit>>>,
    body_capacity: usize,
    max_idle: usize,
}

impl ScratchPool {
    /// Create an empty pool.
    ///
    /// * `body_capacity` - initial capacity of each new unit's body buffer
    /// * `max_idle` - units released beyond this many idle ones are dropped
    pub fn new(body_capacity: usize, max_idle: usize) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(Vec::new()),
            body_capacity,
            max_idle,
        })
    }

    /// Take an idle unit, or build a new one if none is available.
    ///
    /// The unit goes back to the pool when the returned guard is dropped.
    pub fn acquire(self: &Arc<Self>) -> ScratchGuard {
        let recycled = self.idle.lock().pop();

        let unit = match recycled {
            Some(unit) => unit,
            None => {
                debug!(body_capacity = self.body_capacity, "scratch_unit_created");
                Box::new(ScratchUnit::new(self.body_capacity))
            }
        };

        ScratchGuard {
            unit: Some(unit),
            pool: Arc::clone(self),
        }
    }

    /// Number of units currently idle.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, mut unit: Box<ScratchUnit>) {
        if unit.is_oversized(self.body_capacity) {
            debug!(
                body_capacity = unit.body_buf.capacity(),
                signature_capacity = unit.signature_buf.capacity(),
                "scratch_unit_discarded"
            );
            return;
        }

        unit.reset();

        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(unit);
        }
    }
}

/// Exclusive handle on a pooled [`ScratchUnit`].
///
/// Dropping the guard resets the unit and returns it to its pool, so every
/// exit path of a request releases it.
#[derive(Debug)]
pub struct ScratchGuard {
    unit: Option<Box<ScratchUnit>>,
    pool: Arc<ScratchPool>,
}

impl ScratchGuard {
    /// Return the unit to the pool now.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for ScratchGuard {
    type Target = ScratchUnit;

    fn deref(&self) -> &ScratchUnit {
        // Only taken in drop
        self.unit.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for ScratchGuard {
    fn deref_mut(&mut self) -> &mut ScratchUnit {
        self.unit.as_deref_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let Some(unit) = self.unit.take() {
            self.pool.release(unit);
        }
    }
}
