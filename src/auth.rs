// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Authoritative step buffer: a strictly in-order, fixed-capacity ring of
//! steps indexing into a discoid blob store, with random access by `StepId`
//! for retransmission/serialization.

use crate::discoid::{DiscoidRing, VecDiscoidRing};
use crate::error::{StepsError, StepsResult};
use crate::logging::{log_sink, LogSink, StepLogger};
use crate::step_id::{StepId, NIMBLE_STEP_MAX};
use crate::verify::{verify, VerifyLimits};
use std::sync::Arc;

/// Number of `StepInfo` slots tracked; bit-exact with the distilled spec.
pub const AUTH_WINDOW_SIZE: usize = 240;
/// `write` is refused once `steps_count` reaches this backpressure gate,
/// well before the buffer is physically full.
pub const AUTH_WRITE_ALLOWED_LIMIT: usize = AUTH_WINDOW_SIZE / 4;
/// `write` hard-fails once `steps_count` reaches this ceiling.
pub const AUTH_HARD_FULL: usize = AUTH_WINDOW_SIZE / 2;

/// A single authoritative buffer entry. Exclusively owned by its array slot;
/// `position_in_buffer` names a region in the discoid blob store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepInfo {
    pub position_in_buffer: usize,
    pub octet_count: usize,
    pub step_id: StepId,
    pub optional_time: u64,
}

/// Policy knobs for an [`AuthoritativeBuffer`]: the combined-step size cap
/// and the verifier variant applied at `write`/`read_exact_step_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthConfig {
    pub max_combined_octets: usize,
    pub write_limits: VerifyLimits,
}

impl AuthConfig {
    pub const fn new(max_combined_octets: usize, write_limits: VerifyLimits) -> Self {
        Self {
            max_combined_octets,
            write_limits,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_combined_octets: 256,
            write_limits: VerifyLimits::STRICT.with_max_payload_len(256),
        }
    }
}

/// Strictly consecutive 240-slot ring of steps, backed by a discoid blob
/// ring for the payload bytes.
pub struct AuthoritativeBuffer {
    steps_data: Box<dyn DiscoidRing>,
    infos: [StepInfo; AUTH_WINDOW_SIZE],
    steps_count: usize,
    expected_write_id: StepId,
    expected_read_id: StepId,
    info_head_index: usize,
    info_tail_index: usize,
    config: AuthConfig,
    log: LogSink,
}

impl AuthoritativeBuffer {
    /// Wire a fresh buffer around `ring`, ready for writes starting at
    /// `initial_id`.
    pub fn init(initial_id: StepId, ring: Box<dyn DiscoidRing>, config: AuthConfig) -> Self {
        let mut buffer = Self {
            steps_data: ring,
            infos: [StepInfo::default(); AUTH_WINDOW_SIZE],
            steps_count: 0,
            expected_write_id: 0,
            expected_read_id: 0,
            info_head_index: 0,
            info_tail_index: 0,
            config,
            log: LogSink::none("auth"),
        };
        buffer.re_init(initial_id);
        buffer
    }

    /// Wire a fresh buffer around the default in-process ring, sized
    /// `max_combined_octets * AUTH_HARD_FULL` as the distilled spec
    /// prescribes.
    pub fn with_default_ring(initial_id: StepId, config: AuthConfig) -> Self {
        let capacity = config.max_combined_octets * AUTH_HARD_FULL;
        Self::init(initial_id, Box::new(VecDiscoidRing::new(capacity)), config)
    }

    pub fn with_logger(mut self, logger: Arc<dyn StepLogger>, prefix: &'static str) -> Self {
        self.log = LogSink::new(Some(logger), prefix);
        self
    }

    /// Rewind counters and the backing ring to a fresh state for
    /// `initial_id`, keeping the same collaborators.
    pub fn re_init(&mut self, initial_id: StepId) {
        self.steps_count = 0;
        self.expected_write_id = initial_id;
        self.expected_read_id = initial_id;
        self.info_head_index = 0;
        self.info_tail_index = 0;
        self.steps_data.reset();
    }

    /// Reset to an uninitialized-looking state, matching the C original's
    /// `reset = re_init(NIMBLE_STEP_MAX)`.
    pub fn reset(&mut self) {
        self.re_init(NIMBLE_STEP_MAX);
    }

    pub fn steps_count(&self) -> usize {
        self.steps_count
    }

    pub fn expected_write_id(&self) -> StepId {
        self.expected_write_id
    }

    pub fn expected_read_id(&self) -> StepId {
        self.expected_read_id
    }

    /// True while there is backpressure headroom for the copy pipeline.
    pub fn allowed_to_add(&self) -> bool {
        self.steps_count < AUTH_WRITE_ALLOWED_LIMIT
    }

    /// Append `data` as `step_id`, which must equal `expected_write_id`.
    pub fn write(&mut self, step_id: StepId, data: &[u8]) -> StepsResult<()> {
        if self.steps_count >= AUTH_HARD_FULL {
            log_sink!(self.log, Error, "buffer is full at {} of {AUTH_HARD_FULL} slots", self.steps_count);
            return Err(StepsError::Full { capacity: AUTH_HARD_FULL });
        }

        if self.expected_write_id != step_id {
            log_sink!(self.log, Warn, "expected write {:08X} but got {step_id:08X}", self.expected_write_id);
            return Err(StepsError::WrongExpectedWrite {
                expected: self.expected_write_id,
                got: step_id,
            });
        }

        verify(data, self.config.write_limits).map_err(|e| StepsError::BadStep(Box::new(e)))?;

        let info = StepInfo {
            position_in_buffer: self.steps_data.write_index(),
            octet_count: data.len(),
            step_id,
            optional_time: 0,
        };
        log_sink!(
            self.log,
            Info,
            "write step {step_id:08X} at info head {} pos {} octets {}",
            self.info_head_index,
            info.position_in_buffer,
            info.octet_count
        );

        self.steps_data.write(data)?;
        self.infos[self.info_head_index] = info;
        self.info_head_index = (self.info_head_index + 1) % AUTH_WINDOW_SIZE;
        self.expected_write_id += 1;
        self.steps_count += 1;

        Ok(())
    }

    /// Same as [`Self::write`] but records `time` alongside the step.
    pub fn write_with_time(&mut self, step_id: StepId, data: &[u8], time: u64) -> StepsResult<()> {
        self.write(step_id, data)?;
        let last = (self.info_head_index + AUTH_WINDOW_SIZE - 1) % AUTH_WINDOW_SIZE;
        self.infos[last].optional_time = time;
        Ok(())
    }

    fn advance_tail(&mut self) -> StepsResult<StepInfo> {
        let info = self.infos[self.info_tail_index];
        self.info_tail_index = (self.info_tail_index + 1) % AUTH_WINDOW_SIZE;

        if info.step_id != self.expected_read_id {
            log_sink!(
                self.log,
                Error,
                "expected to read {:08X} but encountered {:08X}",
                self.expected_read_id,
                info.step_id
            );
            return Err(StepsError::OutOfOrder {
                expected: self.expected_read_id,
                found: info.step_id,
            });
        }

        self.expected_read_id += 1;
        self.steps_count -= 1;
        Ok(info)
    }

    /// Read the next step in order into `out`, returning its id and length.
    pub fn read(&mut self, out: &mut [u8]) -> StepsResult<(StepId, usize)> {
        if self.steps_count == 0 {
            return Err(StepsError::Empty);
        }
        let info = self.advance_tail()?;
        if out.len() < info.octet_count {
            return Err(StepsError::BufferTooSmall {
                needed: info.octet_count,
                have: out.len(),
            });
        }
        self.steps_data.read(&mut out[..info.octet_count])?;
        Ok((info.step_id, info.octet_count))
    }

    /// The id of the next step `read` would return, without consuming it.
    pub fn peek(&self) -> StepsResult<StepId> {
        if self.steps_count == 0 {
            return Err(StepsError::Empty);
        }
        Ok(self.expected_read_id)
    }

    /// Discard the next step in order without copying its bytes out.
    pub fn discard(&mut self) -> StepsResult<StepId> {
        let info = self.advance_tail()?;
        self.steps_data.skip(info.octet_count)?;
        Ok(info.step_id)
    }

    /// Discard steps in order until `expected_read_id == step_id_to_discard_to`.
    /// A target at or before the current read id is a no-op.
    pub fn discard_up_to(&mut self, step_id_to_discard_to: StepId) -> StepsResult<usize> {
        if self.steps_count == 0 {
            return Ok(0);
        }
        if step_id_to_discard_to <= self.expected_read_id {
            if step_id_to_discard_to < self.expected_read_id {
                log_sink!(
                    self.log,
                    Warn,
                    "discard target {step_id_to_discard_to:08X} is behind read cursor {:08X}",
                    self.expected_read_id
                );
            }
            return Ok(0);
        }

        let mut discarded = 0usize;
        while self.expected_read_id != step_id_to_discard_to && self.steps_count > 0 {
            self.discard()?;
            discarded += 1;
        }
        Ok(discarded)
    }

    /// Like [`Self::discard_up_to`] but the target id is itself discarded too.
    pub fn discard_including(&mut self, step_id_to_discard_to: StepId) -> StepsResult<usize> {
        self.discard_up_to(step_id_to_discard_to.wrapping_add(1))
    }

    /// Discard up to `count` steps unconditionally, returning how many were
    /// actually available to discard.
    pub fn discard_count(&mut self, count: usize) -> StepsResult<usize> {
        let mut discarded = 0usize;
        while discarded < count && self.steps_count > 0 {
            self.discard()?;
            discarded += 1;
        }
        Ok(discarded)
    }

    /// Resolve `step_id` to its raw `infos` slot index for random access.
    pub fn get_index_for_step(&self, step_id: StepId) -> StepsResult<usize> {
        if step_id >= self.expected_write_id {
            return Err(StepsError::UnknownStepId { step_id });
        }
        let backward = (self.expected_write_id - step_id) as usize;
        if backward > self.steps_count {
            return Err(StepsError::UnknownStepId { step_id });
        }
        Ok((self.info_head_index + AUTH_WINDOW_SIZE - backward) % AUTH_WINDOW_SIZE)
    }

    /// Peek the step stored at a raw `infos` index (as resolved by
    /// [`Self::get_index_for_step`]) without consuming it.
    pub fn read_at_index(&self, index: usize, out: &mut [u8]) -> StepsResult<usize> {
        let info = self.infos[index];
        if out.len() < info.octet_count {
            return Err(StepsError::BufferTooSmall {
                needed: info.octet_count,
                have: out.len(),
            });
        }
        self.steps_data.peek(info.position_in_buffer, &mut out[..info.octet_count])?;
        Ok(info.octet_count)
    }

    /// Random-access read of a specific `step_id`, re-verifying the stored
    /// framing before returning it (guards against discoid ring corruption).
    pub fn read_exact_step_id(&self, step_id: StepId, out: &mut [u8]) -> StepsResult<usize> {
        let index = self.get_index_for_step(step_id)?;
        let octet_count = self.read_at_index(index, out)?;
        verify(&out[..octet_count], self.config.write_limits).map_err(|e| StepsError::BadStep(Box::new(e)))?;
        Ok(octet_count)
    }

    pub fn latest_step_id(&self) -> Option<StepId> {
        if self.steps_count == 0 {
            None
        } else {
            Some(self.expected_write_id - 1)
        }
    }

    /// Number of steps that will never be delivered to a caller who last
    /// read `first_read_step_id`, because the buffer has since moved its
    /// write cursor past them.
    pub fn dropped(&self, first_read_step_id: StepId) -> usize {
        first_read_step_id.saturating_sub(self.expected_write_id) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(participant_count: u8) -> Vec<u8> {
        vec![participant_count]
    }

    fn buffer(initial_id: StepId) -> AuthoritativeBuffer {
        AuthoritativeBuffer::with_default_ring(initial_id, AuthConfig::default())
    }

    #[test]
    fn write_then_read_round_trips_in_order() {
        let mut buf = buffer(10);
        buf.write(10, &step(0)).unwrap();
        buf.write(11, &step(0)).unwrap();

        let mut out = [0u8; 8];
        let (id, len) = buf.read(&mut out).unwrap();
        assert_eq!((id, len), (10, 1));
        let (id, len) = buf.read(&mut out).unwrap();
        assert_eq!((id, len), (11, 1));
        assert!(matches!(buf.read(&mut out), Err(StepsError::Empty)));
    }

    #[test]
    fn write_out_of_sequence_is_rejected() {
        let mut buf = buffer(0);
        assert!(matches!(
            buf.write(5, &step(0)),
            Err(StepsError::WrongExpectedWrite { expected: 0, got: 5 })
        ));
    }

    #[test]
    fn write_refuses_past_hard_full() {
        let mut buf = buffer(0);
        for id in 0..AUTH_HARD_FULL as StepId {
            buf.write(id, &step(0)).unwrap();
        }
        assert!(matches!(
            buf.write(AUTH_HARD_FULL as StepId, &step(0)),
            Err(StepsError::Full { .. })
        ));
    }

    #[test]
    fn allowed_to_add_gates_well_before_hard_full() {
        let mut buf = buffer(0);
        for id in 0..AUTH_WRITE_ALLOWED_LIMIT as StepId {
            assert!(buf.allowed_to_add());
            buf.write(id, &step(0)).unwrap();
        }
        assert!(!buf.allowed_to_add());
    }

    #[test]
    fn discard_up_to_skips_without_returning_bytes() {
        let mut buf = buffer(0);
        for id in 0..5 {
            buf.write(id, &step(0)).unwrap();
        }
        let discarded = buf.discard_up_to(3).unwrap();
        assert_eq!(discarded, 3);
        assert_eq!(buf.peek().unwrap(), 3);
    }

    #[test]
    fn discard_including_also_drops_the_named_step() {
        let mut buf = buffer(0);
        for id in 0..5 {
            buf.write(id, &step(0)).unwrap();
        }
        buf.discard_including(2).unwrap();
        assert_eq!(buf.peek().unwrap(), 3);
    }

    #[test]
    fn random_access_read_matches_sequential_contents() {
        let mut buf = buffer(0);
        for id in 0..5u32 {
            buf.write(id, &step(0)).unwrap();
        }
        let index = buf.get_index_for_step(2).unwrap();
        let mut out = [0u8; 8];
        let n = buf.read_at_index(index, &mut out).unwrap();
        assert_eq!(&out[..n], &step(0)[..]);

        let mut out2 = [0u8; 8];
        let n2 = buf.read_exact_step_id(2, &mut out2).unwrap();
        assert_eq!(&out2[..n2], &step(0)[..]);
    }

    #[test]
    fn get_index_for_step_rejects_future_and_discarded_ids() {
        let mut buf = buffer(0);
        for id in 0..5u32 {
            buf.write(id, &step(0)).unwrap();
        }
        assert!(matches!(
            buf.get_index_for_step(100),
            Err(StepsError::UnknownStepId { step_id: 100 })
        ));
        buf.discard_up_to(4).unwrap();
        assert!(matches!(
            buf.get_index_for_step(0),
            Err(StepsError::UnknownStepId { step_id: 0 })
        ));
    }

    #[test]
    fn dropped_is_zero_once_the_write_cursor_has_passed_first_read_step_id() {
        let mut buf = buffer(0);
        for id in 0..10u32 {
            buf.write(id, &step(0)).unwrap();
        }
        buf.discard_up_to(6).unwrap();
        // expected_write_id is already 10, past every id written so far.
        assert_eq!(buf.dropped(0), 0);
        assert_eq!(buf.dropped(15), 5);
    }

    #[test]
    fn reset_rewinds_to_the_sentinel_id() {
        let mut buf = buffer(0);
        buf.write(0, &step(0)).unwrap();
        buf.reset();
        assert_eq!(buf.expected_write_id(), NIMBLE_STEP_MAX);
        assert_eq!(buf.steps_count(), 0);
    }
}
