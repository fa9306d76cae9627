// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy shared by the verifier, receive-mask engine, pending window,
//! and authoritative buffer.

use std::fmt;

/// Result alias used throughout this crate.
pub type StepsResult<T> = Result<T, StepsError>;

/// Everything that can go wrong while buffering or verifying steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepsError {
    /// Payload shorter than the minimum framing requires.
    PayloadTooSmall { len: usize, min: usize },
    /// Payload longer than the configured combined-step cap.
    PayloadTooLarge { len: usize, max: usize },
    /// Cursor would read past the end of the payload while walking participants.
    PayloadTruncated { offset: usize, len: usize },
    /// Leading participant count exceeds the configured limit.
    ParticipantCountTooHigh { count: u8, max: u8 },
    /// A participant id exceeds the configured limit.
    ParticipantIdTooHigh { id: u8, max: u8 },
    /// A per-participant octet count is zero or exceeds the configured limit.
    PerStepSizeInvalid { size: u8, max: u8 },
    /// `received(step_id)` would advance more than 63 ticks into the future.
    FutureTooFar { step_id: u32, expecting_write_id: u32 },
    /// `received(step_id)` names a step more than 63 ticks in the past.
    PastTooFar { step_id: u32, expecting_write_id: u32 },
    /// Same `StepId` already held in the pending window with different bytes.
    ConflictingDuplicate { step_id: u32 },
    /// Authoritative write arrived out of sequence.
    WrongExpectedWrite { expected: u32, got: u32 },
    /// Authoritative buffer is at `AUTH_HARD_FULL` capacity.
    Full { capacity: usize },
    /// No steps available to read or peek.
    Empty,
    /// Caller-provided output buffer is smaller than the stored step.
    BufferTooSmall { needed: usize, have: usize },
    /// Tail slot's `step_id` did not match `expected_read_id` (corruption).
    OutOfOrder { expected: u32, found: u32 },
    /// Verifier rejected a step at a write site; wraps the specific cause.
    BadStep(Box<StepsError>),
    /// The discoid blob ring could not satisfy a write/read/peek/skip.
    RingOverrun { requested: usize, available: usize },
    /// `StepId` requested via `get_index_for_step`/`read_exact_step_id` is not buffered.
    UnknownStepId { step_id: u32 },
}

impl fmt::Display for StepsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooSmall { len, min } => {
                write!(f, "payload too small: {len} octets, need at least {min}")
            }
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload too large: {len} octets, max {max}")
            }
            Self::PayloadTruncated { offset, len } => {
                write!(f, "payload truncated: cursor at {offset} exceeds length {len}")
            }
            Self::ParticipantCountTooHigh { count, max } => {
                write!(f, "participant count {count} exceeds max {max}")
            }
            Self::ParticipantIdTooHigh { id, max } => {
                write!(f, "participant id {id} exceeds max {max}")
            }
            Self::PerStepSizeInvalid { size, max } => {
                write!(f, "per-step octet count {size} invalid (max {max}, min 1)")
            }
            Self::FutureTooFar { step_id, expecting_write_id } => write!(
                f,
                "step {step_id:08X} is too far in the future of expecting_write_id {expecting_write_id:08X}"
            ),
            Self::PastTooFar { step_id, expecting_write_id } => write!(
                f,
                "step {step_id:08X} is too far in the past of expecting_write_id {expecting_write_id:08X}"
            ),
            Self::ConflictingDuplicate { step_id } => {
                write!(f, "step {step_id:08X} already pending with different bytes")
            }
            Self::WrongExpectedWrite { expected, got } => {
                write!(f, "expected write of step {expected:08X} but got {got:08X}")
            }
            Self::Full { capacity } => write!(f, "authoritative buffer is full ({capacity} slots)"),
            Self::Empty => write!(f, "no steps available"),
            Self::BufferTooSmall { needed, have } => {
                write!(f, "output buffer too small: need {needed}, have {have}")
            }
            Self::OutOfOrder { expected, found } => write!(
                f,
                "authoritative buffer corrupted: expected to read {expected:08X} but found {found:08X}"
            ),
            Self::BadStep(inner) => write!(f, "step rejected by verifier: {inner}"),
            Self::RingOverrun { requested, available } => {
                write!(f, "discoid ring overrun: requested {requested}, available {available}")
            }
            Self::UnknownStepId { step_id } => {
                write!(f, "step {step_id:08X} is not present in the buffer")
            }
        }
    }
}

impl std::error::Error for StepsError {}
