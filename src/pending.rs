// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pending step window: a 64-slot out-of-order reception window for steps
//! arriving over an unreliable datagram transport.

use std::sync::Arc;

use crate::allocator::{HeapStepAllocator, StepAllocator};
use crate::auth::AuthoritativeBuffer;
use crate::error::{StepsError, StepsResult};
use crate::logging::{log_sink, LogSink, StepLogger};
use crate::receive_mask::ReceiveMask;
use crate::step_id::{StepId, NIMBLE_STEP_MAX};
use crate::verify::{verify, VerifyLimits};

/// Number of tick positions tracked by the pending window and the receive
/// mask it shares its horizon with.
pub const PENDING_WINDOW_SIZE: usize = 64;

#[derive(Debug, Default)]
struct PendingStep {
    payload: Option<Box<[u8]>>,
    payload_length: usize,
    id_for_debug: StepId,
    is_in_use: bool,
}

/// Fused read cursor: the slot index and the logical `StepId` it names
/// always move together (Design Notes: "Dual cursor").
#[derive(Debug, Clone, Copy)]
struct ReadCursor {
    index: usize,
    id: StepId,
}

impl ReadCursor {
    fn new(id: StepId) -> Self {
        Self { index: 0, id }
    }

    fn advance(&mut self) {
        self.index = (self.index + 1) % PENDING_WINDOW_SIZE;
        self.id += 1;
    }
}

/// Outcome of a [`PendingWindow::try_set`] call, replacing the C original's
/// overloaded 0/negative/positive return code with a closed enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrySetOutcome {
    /// The step was copied into the window for the first time.
    Inserted,
    /// The exact same bytes were already pending at this id; a no-op.
    AlreadyPresent,
    /// `step_id` is older than `read_id`; silently dropped.
    Stale,
    /// `step_id` is more than [`PENDING_WINDOW_SIZE`] ticks ahead of `read_id`.
    OutOfWindow,
}

/// Borrowed view of a just-read pending step. The underlying bytes remain
/// owned by the window's slot until [`PendingWindow::read_destroy`] releases
/// them; dropping this handle does not free anything.
pub struct PendingStepRef<'a> {
    window: &'a PendingWindow,
    slot_index: usize,
    step_id: StepId,
}

impl<'a> PendingStepRef<'a> {
    pub fn step_id(&self) -> StepId {
        self.step_id
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.window.steps[self.slot_index]
            .payload
            .as_deref()
            .unwrap_or(&[])
    }
}

/// Out-of-order reception window feeding an [`AuthoritativeBuffer`].
pub struct PendingWindow {
    steps: [PendingStep; PENDING_WINDOW_SIZE],
    write_index: usize,
    cursor: ReadCursor,
    debug_count: usize,
    receive_mask: ReceiveMask,
    has_received_any: bool,
    allocator: Arc<dyn StepAllocator>,
    log: LogSink,
}

impl PendingWindow {
    /// Create a fresh window, ready to accept steps starting at
    /// `late_join_step_id`.
    pub fn new(late_join_step_id: StepId, allocator: Arc<dyn StepAllocator>) -> Self {
        Self {
            steps: std::array::from_fn(|_| PendingStep::default()),
            write_index: 0,
            cursor: ReadCursor::new(late_join_step_id),
            debug_count: 0,
            receive_mask: ReceiveMask::new(late_join_step_id),
            has_received_any: false,
            allocator,
            log: LogSink::none("pending"),
        }
    }

    /// Create a window using the default heap allocator.
    pub fn with_heap_allocator(late_join_step_id: StepId) -> Self {
        Self::new(late_join_step_id, Arc::new(HeapStepAllocator))
    }

    /// Attach a logger with the given instance prefix.
    pub fn with_logger(mut self, logger: Arc<dyn StepLogger>, prefix: &'static str) -> Self {
        self.log = LogSink::new(Some(logger), prefix);
        self
    }

    /// Reset the window for a fresh `late_join_step_id`, freeing any
    /// still-in-use slots.
    pub fn reset(&mut self, late_join_step_id: StepId) {
        for slot in &mut self.steps {
            *slot = PendingStep::default();
        }
        self.write_index = 0;
        self.cursor = ReadCursor::new(late_join_step_id);
        self.debug_count = 0;
        self.has_received_any = false;
        self.receive_mask.init(late_join_step_id);
    }

    pub fn read_id(&self) -> StepId {
        self.cursor.id
    }

    pub fn debug_count(&self) -> usize {
        self.debug_count
    }

    /// Slot index the most recent accepted `try_set` landed in.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    fn step_id_to_index(&self, step_id: StepId) -> Option<usize> {
        if step_id < self.cursor.id {
            return None;
        }
        let delta = (step_id - self.cursor.id) as usize;
        if delta >= PENDING_WINDOW_SIZE {
            return None;
        }
        Some((self.cursor.index + delta) % PENDING_WINDOW_SIZE)
    }

    /// Try to set a pending step with the given `step_id`.
    pub fn try_set(&mut self, step_id: StepId, payload: &[u8]) -> StepsResult<TrySetOutcome> {
        if step_id < self.cursor.id {
            return Ok(TrySetOutcome::Stale);
        }
        let delta = (step_id - self.cursor.id) as usize;
        if delta >= PENDING_WINDOW_SIZE {
            return Ok(TrySetOutcome::OutOfWindow);
        }
        let index = (self.cursor.index + delta) % PENDING_WINDOW_SIZE;

        if self.steps[index].is_in_use {
            let existing = &self.steps[index];
            if existing.id_for_debug == step_id
                && existing.payload_length == payload.len()
                && existing.payload.as_deref() == Some(payload)
            {
                return Ok(TrySetOutcome::AlreadyPresent);
            }
            log_sink!(self.log, Warn, "step {step_id:08X} already pending with different bytes");
            return Err(StepsError::ConflictingDuplicate { step_id });
        }

        if step_id >= self.receive_mask.expecting_write_id() {
            self.write_index = index;
        }

        self.receive_mask.received(step_id)?;
        self.has_received_any = true;

        // Free any payload the slot still held from a prior read that
        // hasn't been explicitly destroyed yet.
        let mut stored = self.allocator.alloc(payload.len(), "pending-step");
        stored.copy_from_slice(payload);
        let slot = &mut self.steps[index];
        slot.payload = Some(stored);
        slot.payload_length = payload.len();
        slot.id_for_debug = step_id;
        slot.is_in_use = true;
        self.debug_count += 1;

        Ok(TrySetOutcome::Inserted)
    }

    /// Try to read the next step in order. Returns `None` if the slot at
    /// the read cursor is empty.
    pub fn try_read(&mut self) -> Option<PendingStepRef<'_>> {
        if self.debug_count == 0 {
            log_sink!(self.log, Warn, "no pending steps in the buffer to read");
            return None;
        }

        let index = self.cursor.index;
        if !self.steps[index].is_in_use {
            return None;
        }

        let step_id = self.cursor.id;
        self.cursor.advance();
        self.debug_count -= 1;
        self.steps[index].is_in_use = false;

        Some(PendingStepRef {
            window: self,
            slot_index: index,
            step_id,
        })
    }

    /// Free the bytes belonging to the slot one behind the read cursor, if
    /// its id matches.
    pub fn read_destroy(&mut self, id: StepId) -> StepsResult<()> {
        let slot_index = (self.cursor.index + PENDING_WINDOW_SIZE - 1) % PENDING_WINDOW_SIZE;
        let slot = &mut self.steps[slot_index];
        if slot.id_for_debug != id {
            return Err(StepsError::UnknownStepId { step_id: id });
        }
        slot.payload = None;
        slot.payload_length = 0;
        slot.id_for_debug = NIMBLE_STEP_MAX;
        Ok(())
    }

    pub fn has_step(&self, step_id: StepId) -> bool {
        match self.step_id_to_index(step_id) {
            Some(index) => self.steps[index].is_in_use && self.steps[index].id_for_debug == step_id,
            None => false,
        }
    }

    /// True if the slot at the read cursor holds a payload (possibly
    /// already consumed but not yet destroyed, matching the C original).
    pub fn can_be_advanced(&self) -> bool {
        self.steps[self.cursor.index].payload.is_some()
    }

    /// The newest `StepId` ever accepted by `try_set`, if any.
    pub fn latest_step_id(&self) -> Option<StepId> {
        if !self.has_received_any {
            return None;
        }
        Some(self.receive_mask.expecting_write_id() - 1)
    }

    /// Snapshot of the receive mask: the head id it is anchored at plus the
    /// raw bitmap.
    pub fn receive_mask_snapshot(&self) -> (StepId, u64) {
        (self.receive_mask.expecting_write_id(), self.receive_mask.bits())
    }

    /// Drain pending steps into `target` while it has room, verifying each
    /// step's framing before handing it to the authoritative write path.
    /// Returns the number of steps moved.
    pub fn copy_to(&mut self, target: &mut AuthoritativeBuffer, limits: VerifyLimits) -> StepsResult<usize> {
        let mut moved = 0usize;
        loop {
            if !target.allowed_to_add() || self.debug_count == 0 {
                break;
            }
            let (step_id, bytes) = match self.try_read() {
                Some(step) => (step.step_id(), step.bytes().to_vec()),
                None => break,
            };
            verify(&bytes, limits).map_err(|e| StepsError::BadStep(Box::new(e)))?;
            target.write(step_id, &bytes)?;
            moved += 1;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(bytes: &[u8]) -> Vec<u8> {
        bytes.to_vec()
    }

    #[test]
    fn pending_drain_scenario() {
        // Scenario 5: insert out of order, read back in order.
        let mut window = PendingWindow::with_heap_allocator(100);
        window.try_set(102, &step(b"P2")).unwrap();
        window.try_set(100, &step(b"P0")).unwrap();
        window.try_set(101, &step(b"P1")).unwrap();

        let r0 = window.try_read().unwrap();
        assert_eq!((r0.step_id(), r0.bytes()), (100, b"P0".as_slice()));
        drop(r0);
        let r1 = window.try_read().unwrap();
        assert_eq!((r1.step_id(), r1.bytes()), (101, b"P1".as_slice()));
        drop(r1);
        let r2 = window.try_read().unwrap();
        assert_eq!((r2.step_id(), r2.bytes()), (102, b"P2".as_slice()));
        drop(r2);

        assert!(window.try_read().is_none());
    }

    #[test]
    fn conflicting_duplicate_scenario() {
        // Scenario 6.
        let mut window = PendingWindow::with_heap_allocator(100);
        assert_eq!(window.try_set(100, b"AA").unwrap(), TrySetOutcome::Inserted);
        assert!(matches!(
            window.try_set(100, b"AB"),
            Err(StepsError::ConflictingDuplicate { step_id: 100 })
        ));
        assert_eq!(window.try_set(100, b"AA").unwrap(), TrySetOutcome::AlreadyPresent);
    }

    #[test]
    fn stale_and_out_of_window_are_silent_no_ops() {
        let mut window = PendingWindow::with_heap_allocator(100);
        assert_eq!(window.try_set(50, b"old").unwrap(), TrySetOutcome::Stale);
        assert_eq!(window.try_set(200, b"far").unwrap(), TrySetOutcome::OutOfWindow);
        assert_eq!(window.debug_count(), 0);
    }

    #[test]
    fn read_destroy_frees_the_last_read_slot() {
        let mut window = PendingWindow::with_heap_allocator(10);
        window.try_set(10, b"x").unwrap();
        {
            let r = window.try_read().unwrap();
            assert_eq!(r.step_id(), 10);
        }
        window.read_destroy(10).unwrap();
        assert!(matches!(
            window.read_destroy(10),
            Err(StepsError::UnknownStepId { .. })
        ));
    }

    #[test]
    fn has_step_reports_in_window_reception() {
        let mut window = PendingWindow::with_heap_allocator(0);
        window.try_set(5, b"z").unwrap();
        assert!(window.has_step(5));
        assert!(!window.has_step(6));
    }

    #[test]
    fn latest_step_id_tracks_the_newest_accepted_set() {
        let mut window = PendingWindow::with_heap_allocator(100);
        assert_eq!(window.latest_step_id(), None);
        window.try_set(103, b"z").unwrap();
        assert_eq!(window.latest_step_id(), Some(103));
        assert_eq!(window.write_index(), 3);
    }

    #[test]
    fn reset_clears_in_use_slots_and_rebases_read_id() {
        let mut window = PendingWindow::with_heap_allocator(0);
        window.try_set(0, b"a").unwrap();
        window.reset(500);
        assert_eq!(window.read_id(), 500);
        assert_eq!(window.debug_count(), 0);
        assert!(!window.has_step(0));
    }
}
