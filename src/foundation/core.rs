use std::{fmt, ops::Sub};

use crate::foundation::error::{GrimError, GrimResult};

/// Fixed-point timeline position or duration in whole milliseconds.
///
/// Every timestamp in a [`RenderPlan`](crate::RenderPlan) is a `Millis`, so plans built from
/// identical inputs are identical down to the serialized byte.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Millis(pub u64);

impl Millis {
    /// Zero duration.
    pub const ZERO: Millis = Millis(0);

    /// Convert seconds to milliseconds, rounding to the nearest millisecond.
    pub fn from_secs_f64(secs: f64) -> GrimResult<Self> {
        if !secs.is_finite() {
            return Err(GrimError::invalid_asset(format!(
                "duration must be finite, got {secs}"
            )));
        }
        if secs < 0.0 {
            return Err(GrimError::invalid_asset(format!(
                "duration must be >= 0, got {secs}s"
            )));
        }
        let ms = (secs * 1000.0).round();
        if ms > u64::MAX as f64 {
            return Err(GrimError::invalid_asset(format!(
                "duration {secs}s does not fit the millisecond timeline"
            )));
        }
        Ok(Self(ms as u64))
    }

    pub fn as_secs_f64(self) -> f64 {
        (self.0 as f64) / 1000.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, rhs: Millis) -> Millis {
        Millis(self.0.saturating_sub(rhs.0))
    }

    /// `self * num / den` with a 128-bit intermediate, rounded half-up.
    ///
    /// `den` must be non-zero.
    pub(crate) fn scale(self, num: u64, den: u64) -> Millis {
        let den = u128::from(den);
        let v = (u128::from(self.0) * u128::from(num) + den / 2) / den;
        Millis(v as u64)
    }
}

impl Sub for Millis {
    type Output = Millis;

    fn sub(self, rhs: Millis) -> Millis {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Half-open span `[start, end)` on the narration timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeSpan {
    pub start: Millis,
    pub end: Millis,
}

impl TimeSpan {
    pub fn new(start: Millis, end: Millis) -> GrimResult<Self> {
        if start > end {
            return Err(GrimError::timeline(
                "span-order",
                format!("span start {start} is after end {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn len(self) -> Millis {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, t: Millis) -> bool {
        self.start <= t && t < self.end
    }

    pub fn within(self, total: Millis) -> bool {
        self.end <= total
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
