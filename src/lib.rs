// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # nimble-steps
//!
//! Lockstep step buffering core for networked deterministic simulation: an
//! authoritative, strictly in-order ring buffer of "steps" (one tick's
//! opaque input payload) backed by a discoid blob store, fed by a 64-slot
//! out-of-order reception window that reassembles steps arriving over an
//! unreliable transport.
//!
//! ## Quick Start
//!
//! ```rust
//! use nimble_steps::{AuthConfig, AuthoritativeBuffer, PendingWindow, VerifyLimits};
//!
//! let mut pending = PendingWindow::with_heap_allocator(0);
//! let mut auth = AuthoritativeBuffer::with_default_ring(0, AuthConfig::default());
//!
//! pending.try_set(0, &[0]).unwrap();
//! pending.copy_to(&mut auth, VerifyLimits::LENIENT).unwrap();
//!
//! let mut out = [0u8; 8];
//! let (step_id, len) = auth.read(&mut out).unwrap();
//! assert_eq!((step_id, len), (0, 1));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |  datagrams (external, out of scope)                         |
//! +-------------------------------------------------------------+
//!                  | try_set(step_id, bytes)
//!                  v
//! +-------------------------------------------------------------+
//! |  PendingWindow   64-slot reorder window + ReceiveMask        |
//! +-------------------------------------------------------------+
//!                  | copy_to (try_read while allowed_to_add)
//!                  v
//! +-------------------------------------------------------------+
//! |  AuthoritativeBuffer   240-slot strictly-ordered ring         |
//! +-------------------------------------------------------------+
//!                  | read / peek / discard / read_exact_step_id
//!                  v
//! +-------------------------------------------------------------+
//! |  simulation (external, out of scope)                        |
//! +-------------------------------------------------------------+
//! ```
//!
//! The reverse direction (what to ask a peer to retransmit) runs off
//! [`PendingWindow::receive_mask_snapshot`] through [`ranges::ranges`].
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PendingWindow`] | Out-of-order reception window, keyed by `StepId` |
//! | [`AuthoritativeBuffer`] | Strictly in-order ring consumed by the simulation |
//! | [`ReceiveMask`] | Sliding 64-bit reception bitmap |
//! | [`ranges::ranges`] | Missing-step range synthesis from a mask |
//! | [`StepsError`] | Shared error taxonomy for both engines |

/// Strictly in-order step ring indexing into a discoid blob store.
pub mod auth;
/// Pluggable payload allocator consumed by the pending window.
pub mod allocator;
/// Bounds-checked read cursor used by the verifier.
pub mod cursor;
/// Fixed-capacity byte ring backing the authoritative buffer.
pub mod discoid;
/// Shared error taxonomy for both engines.
pub mod error;
/// Per-instance, optional leveled logging.
pub mod logging;
/// 64-slot out-of-order reception window.
pub mod pending;
/// Sliding 64-bit reception bitmap.
pub mod receive_mask;
/// Missing-step range synthesis from a receive mask.
pub mod ranges;
/// Monotonic tick identifier.
pub mod step_id;
/// Combined-step framing verifier.
pub mod verify;

pub use allocator::{HeapStepAllocator, StepAllocator};
pub use auth::{AuthConfig, AuthoritativeBuffer, StepInfo, AUTH_HARD_FULL, AUTH_WINDOW_SIZE, AUTH_WRITE_ALLOWED_LIMIT};
pub use discoid::{DiscoidRing, VecDiscoidRing};
pub use error::{StepsError, StepsResult};
#[cfg(feature = "logging")]
pub use logging::FacadeLogger;
pub use logging::{LogLevel, LogSink, StepLogger};
pub use pending::{PendingStepRef, PendingWindow, TrySetOutcome, PENDING_WINDOW_SIZE};
pub use ranges::{ranges, StepRange};
pub use receive_mask::ReceiveMask;
pub use step_id::{StepId, NIMBLE_STEP_MAX};
pub use verify::{verify, VerifyLimits};
