// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Black-box scenarios and invariant checks run against the public API only.

use nimble_steps::{
    ranges, AuthConfig, AuthoritativeBuffer, PendingWindow, ReceiveMask, StepRange, StepsError,
    TrySetOutcome, VerifyLimits, AUTH_WRITE_ALLOWED_LIMIT,
};

fn combined_step(byte_count: usize) -> Vec<u8> {
    // participant_count = 0 is always a valid, minimal framing.
    let mut payload = vec![0u8; byte_count.max(1)];
    payload[0] = 0;
    payload
}

#[test]
fn scenario_7_authoritative_write_ordering() {
    let mut auth = AuthoritativeBuffer::with_default_ring(0, AuthConfig::default());
    auth.re_init(10);

    auth.write(10, &combined_step(1)).unwrap();
    assert!(matches!(
        auth.write(12, &combined_step(1)),
        Err(StepsError::WrongExpectedWrite { expected: 11, got: 12 })
    ));
    auth.write(11, &combined_step(1)).unwrap();

    let mut out = [0u8; 8];
    let (id0, _) = auth.read(&mut out).unwrap();
    let (id1, _) = auth.read(&mut out).unwrap();
    assert_eq!((id0, id1), (10, 11));
}

#[test]
fn scenario_8_copy_pipeline_backpressure() {
    let mut pending = PendingWindow::with_heap_allocator(0);
    let mut auth = AuthoritativeBuffer::with_default_ring(0, AuthConfig::default());

    for id in 0..60u32 {
        assert_eq!(
            pending.try_set(id, &combined_step(10)).unwrap(),
            TrySetOutcome::Inserted
        );
    }

    let moved = pending.copy_to(&mut auth, VerifyLimits::LENIENT).unwrap();
    assert_eq!(moved, AUTH_WRITE_ALLOWED_LIMIT);
    assert!(!auth.allowed_to_add());

    let mut out = [0u8; 16];
    auth.read(&mut out).unwrap();
    assert!(auth.allowed_to_add());

    let remaining = pending.copy_to(&mut auth, VerifyLimits::LENIENT).unwrap();
    assert_eq!(remaining, 1);
}

#[test]
fn property_p2_steps_count_matches_write_read_delta() {
    let mut auth = AuthoritativeBuffer::with_default_ring(0, AuthConfig::default());
    for id in 0..5u32 {
        auth.write(id, &combined_step(1)).unwrap();
    }
    assert_eq!(auth.steps_count(), auth.expected_write_id() as usize - auth.expected_read_id() as usize);

    let mut out = [0u8; 8];
    auth.read(&mut out).unwrap();
    auth.discard().unwrap();
    assert_eq!(auth.steps_count(), auth.expected_write_id() as usize - auth.expected_read_id() as usize);
    assert_eq!(auth.steps_count(), 3);
}

#[test]
fn property_p4_round_trip_preserves_bytes_and_id() {
    let mut auth = AuthoritativeBuffer::with_default_ring(7, AuthConfig::default());
    let payload = combined_step(5);
    auth.write(7, &payload).unwrap();

    let mut out = [0u8; 16];
    let (id, len) = auth.read(&mut out).unwrap();
    assert_eq!(id, 7);
    assert_eq!(&out[..len], &payload[..]);
}

#[test]
fn property_p5_pending_drain_yields_contiguous_prefix_only() {
    let mut pending = PendingWindow::with_heap_allocator(0);
    pending.try_set(3, b"c").unwrap();
    pending.try_set(0, b"a").unwrap();
    pending.try_set(1, b"b").unwrap();
    // 2 is missing, so only ids 0 and 1 should ever be readable right now.

    let r0 = pending.try_read().unwrap();
    assert_eq!(r0.step_id(), 0);
    drop(r0);
    let r1 = pending.try_read().unwrap();
    assert_eq!(r1.step_id(), 1);
    drop(r1);

    assert!(pending.try_read().is_none());
}

#[test]
fn property_p6_ranges_partition_missing_bits_within_available_window() {
    let mut mask = ReceiveMask::new(50);
    mask.received(52).unwrap();
    mask.received(54).unwrap();

    let (expecting, bits) = (mask.expecting_write_id(), mask.bits());
    let out = ranges(expecting, 200, bits, 8, 256);

    // Every range is within bounds and none overlap, and every id in a range
    // is genuinely a zero bit in the mask.
    let mut seen_ids = Vec::new();
    for StepRange { start_id, count } in &out {
        for offset in 0..*count as u32 {
            let id = start_id + offset;
            assert!(!mask.is_received(id), "range claims {id} missing but mask has it set");
            seen_ids.push(id);
        }
    }
    seen_ids.sort_unstable();
    seen_ids.dedup();
    assert_eq!(seen_ids.len(), out.iter().map(|r| r.count).sum::<usize>());
}
