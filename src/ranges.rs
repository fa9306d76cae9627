// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synthesize a bounded list of missing-step ranges from a receive mask.

use crate::step_id::StepId;

/// A half-open `[start_id, start_id + count)` interval naming missing steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRange {
    pub start_id: StepId,
    pub count: usize,
}

/// Scan `mask` from bit 63 (oldest) down to bit 0 (newest) and emit the
/// maximal runs of missing (zero) bits as ranges, clamped by `max_ranges`
/// and the total step budget `max_steps`.
///
/// `mask_starts_at_one_less` is the `expecting_write_id` the mask is
/// anchored at (bit `i` names `mask_starts_at_one_less - 1 - i`).
/// `maximum_available_plus_one` bounds candidate start ids: we never ask for
/// retransmission of a step the authoritative side could not have produced.
pub fn ranges(
    mask_starts_at_one_less: StepId,
    maximum_available_plus_one: StepId,
    mask: u64,
    max_ranges: usize,
    max_steps: usize,
) -> Vec<StepRange> {
    let mut out = Vec::new();
    let mut range_start_bit: Option<i32> = None;
    let mut step_total = 0usize;

    for i in (0..64i32).rev() {
        let bit_set = (mask >> i) & 0x1 != 0;

        if !bit_set && range_start_bit.is_none() {
            let candidate = mask_starts_at_one_less.wrapping_sub(i as u32 + 1);
            if candidate >= maximum_available_plus_one {
                // We cannot retransmit what the sender never produced.
                continue;
            }
            range_start_bit = Some(i);
        } else if bit_set {
            if let Some(start_bit) = range_start_bit.take() {
                let count = (start_bit - i) as usize;
                let start_id = mask_starts_at_one_less - (start_bit as u32) - 1;
                out.push(StepRange { start_id, count });

                if step_total + count > max_steps {
                    let remaining = max_steps.saturating_sub(step_total);
                    out.last_mut().unwrap().count = remaining;
                    return out;
                }
                step_total += count;

                if out.len() == max_ranges {
                    return out;
                }
            }
        }
    }

    if let Some(start_bit) = range_start_bit {
        let count = (start_bit + 1) as usize;
        let start_id = mask_starts_at_one_less - (start_bit as u32) - 1;
        out.push(StepRange { start_id, count });
        let last = out.last_mut().unwrap();
        if step_total + last.count > max_steps {
            last.count = max_steps.saturating_sub(step_total);
        }
    }

    out
}
