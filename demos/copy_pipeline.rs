// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small end-to-end demonstration of the pending -> authoritative drain
//! loop, for manual inspection. Not part of the library's public API.

use std::sync::Arc;

use nimble_steps::{AuthConfig, AuthoritativeBuffer, FacadeLogger, PendingWindow, VerifyLimits};

fn combined_step(participant_count: u8) -> Vec<u8> {
    vec![participant_count]
}

fn main() {
    env_logger::init();

    let logger = Arc::new(FacadeLogger);
    let mut pending = PendingWindow::with_heap_allocator(0).with_logger(logger.clone(), "demo.pending");
    let mut auth = AuthoritativeBuffer::with_default_ring(0, AuthConfig::default()).with_logger(logger, "demo.auth");

    // Feed steps out of order, as they'd arrive over an unreliable transport.
    for &id in &[2u32, 0, 1, 4, 3] {
        let outcome = pending.try_set(id, &combined_step(0)).expect("valid step");
        println!("try_set({id}) -> {outcome:?}");
    }

    let moved = pending.copy_to(&mut auth, VerifyLimits::LENIENT).expect("drain");
    println!("drained {moved} steps into the authoritative buffer");

    let mut out = [0u8; 64];
    while let Ok((step_id, len)) = auth.read(&mut out) {
        println!("simulation reads step {step_id} ({len} bytes)");
    }

    let (head, mask) = pending.receive_mask_snapshot();
    println!("receive mask head={head} bits={mask:016X}");
}
