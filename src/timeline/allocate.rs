use crate::{
    foundation::core::{Millis, TimeSpan},
    foundation::error::{GrimError, GrimResult},
};

/// Image pacing rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacingRules {
    /// Floor on every segment's nominal length.
    pub min_image_duration: Millis,
    /// Optional ceiling; longer slots are split and images repeat cyclically.
    pub max_image_duration: Option<Millis>,
    /// Crossfade shared by two adjacent segments.
    pub transition_overlap: Millis,
}

impl Default for PacingRules {
    fn default() -> Self {
        Self {
            min_image_duration: Millis(3_000),
            max_image_duration: None,
            transition_overlap: Millis(1_000),
        }
    }
}

/// Time interval during which one image is on screen.
///
/// Adjacent segments overlap by the crossfade: `next.start == prev.end - prev.transition_out`
/// and `prev.transition_out == next.transition_in`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSegment {
    pub index: usize,
    /// Ordinal of the displayed [`ImageAsset`](crate::ImageAsset).
    pub image: usize,
    pub start: Millis,
    pub end: Millis,
    pub transition_in: Millis,
    pub transition_out: Millis,
}

impl ImageSegment {
    pub fn span(&self) -> TimeSpan {
        TimeSpan {
            start: self.start,
            end: self.end,
        }
    }

    pub fn len(&self) -> Millis {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Distribute `total` narration time across `image_count` images.
///
/// Produces contiguous segments covering exactly `[0, total]`: the nominal lengths sum to
/// `total + (slots - 1) * overlap`. When `total / image_count` is below the floor, fewer slots
/// are used and the chosen images are spread across the story in order. When a ceiling is set
/// and exceeded, more slots are used and images repeat cyclically. Timestamps are integer
/// milliseconds and the last segment absorbs the rounding residual.
///
/// `total == 0` yields one empty segment, which plan validation rejects.
#[tracing::instrument]
pub fn allocate_segments(
    total: Millis,
    image_count: usize,
    rules: &PacingRules,
) -> GrimResult<Vec<ImageSegment>> {
    if image_count == 0 {
        return Err(GrimError::invalid_asset(
            "at least one image is required to allocate display time",
        ));
    }
    if total.is_zero() {
        return Ok(vec![ImageSegment {
            index: 0,
            image: 0,
            start: Millis::ZERO,
            end: Millis::ZERO,
            transition_in: Millis::ZERO,
            transition_out: Millis::ZERO,
        }]);
    }

    let slots = slot_count(total, image_count, rules);
    let overlap = if slots > 1 {
        rules.transition_overlap
    } else {
        Millis::ZERO
    };

    let slots_u64 = slots as u64;
    let nominal_total = total.0 + (slots_u64 - 1) * overlap.0;
    let base = nominal_total / slots_u64;

    let mut segments = Vec::with_capacity(slots);
    let mut start = Millis::ZERO;
    for index in 0..slots {
        let last = index + 1 == slots;
        let end = if last { total } else { Millis(start.0 + base) };
        segments.push(ImageSegment {
            index,
            image: image_for_slot(index, slots, image_count),
            start,
            end,
            transition_in: if index == 0 { Millis::ZERO } else { overlap },
            transition_out: if last { Millis::ZERO } else { overlap },
        });
        start = end - overlap;
    }

    if slots != image_count {
        tracing::debug!(
            images = image_count,
            slots,
            "image count adjusted to respect pacing bounds"
        );
    }
    Ok(segments)
}

/// Number of display slots for `image_count` images.
///
/// A slot count `k` meets the floor `f` when `k * f <= total + (k - 1) * overlap`.
fn slot_count(total: Millis, image_count: usize, rules: &PacingRules) -> usize {
    let d = total.0;
    let t = rules.transition_overlap.0;
    // A segment must outlast its crossfade.
    let floor = rules.min_image_duration.0.max(t + 1);

    let max_slots = if d > t { (d - t) / (floor - t) } else { 1 };
    let mut slots = image_count as u64;

    if let Some(ceiling) = rules.max_image_duration
        && ceiling.0 > t
        && d > t
    {
        let wanted = (d - t).div_ceil(ceiling.0 - t);
        slots = slots.max(wanted);
    }

    slots.min(max_slots).max(1) as usize
}

/// Which image a slot shows: spread in story order when slots are scarce, cyclic when plenty.
fn image_for_slot(slot: usize, slots: usize, image_count: usize) -> usize {
    if slots <= image_count {
        ((slot as u128 * image_count as u128) / slots as u128) as usize
    } else {
        slot % image_count
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/allocate.rs"]
mod tests;
