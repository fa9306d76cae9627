// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The monotonic 32-bit tick identifier and its sentinel value.

/// Monotonic tick identifier. Ordinary unsigned arithmetic; no modular
/// comparison is performed (a session is expected to end long before
/// wraparound).
pub type StepId = u32;

/// Sentinel denoting "absent/uninitialized".
pub const NIMBLE_STEP_MAX: StepId = 0xFFFF_FFFF;
