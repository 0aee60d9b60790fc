//! Per-direction bookkeeping for in-flight operations.
//!
//! A port owns one [`PendingSlot`] for reads and one for writes. An operation
//! claims its slot for as long as its future is alive through a [`PendingOp`]
//! guard. Resolving the operation consumes the guard; dropping the future
//! before that (cancellation) drops the guard unresolved. Either way the slot
//! goes back to idle, so a new operation may start.

use super::error::PortError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Transfer direction of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Observable state of a direction's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// No operation in flight.
    Idle,
    /// An operation has been started and not yet resolved or cancelled.
    Pending,
}

/// Slot holding at most one in-flight operation for one direction.
#[derive(Debug)]
pub(crate) struct PendingSlot {
    direction: Direction,
    busy: AtomicBool,
}

impl PendingSlot {
    pub(crate) const fn new(direction: Direction) -> Self {
        Self {
            direction,
            busy: AtomicBool::new(false),
        }
    }

    /// Claim the slot, failing if another operation already holds it.
    pub(crate) fn begin(&self) -> Result<PendingOp<'_>, PortError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PortError::OperationPending(self.direction))?;

        Ok(PendingOp {
            slot: self,
            resolved: false,
        })
    }

    pub(crate) fn state(&self) -> OperationState {
        if self.busy.load(Ordering::Acquire) {
            OperationState::Pending
        } else {
            OperationState::Idle
        }
    }
}

/// Claim on a [`PendingSlot`] held by a running operation.
#[derive(Debug)]
pub(crate) struct PendingOp<'a> {
    slot: &'a PendingSlot,
    resolved: bool,
}

impl PendingOp<'_> {
    /// Hand the operation's outcome back to the caller and release the slot.
    pub(crate) fn resolve<T>(mut self, result: Result<T, PortError>) -> Result<T, PortError> {
        self.resolved = true;
        result
    }
}

impl Drop for PendingOp<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            debug!(direction = %self.slot.direction, "pending operation cancelled");
        }
        self.slot.busy.store(false, Ordering::Release);
    }
}
