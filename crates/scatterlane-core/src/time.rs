use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest step the placement cursor takes per iteration, in seconds.
pub const MIN_CURSOR_ADVANCE: f64 = 0.1;

/// Overshoot past a window end still treated as inside it, in seconds.
pub const EDGE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TimeWindowError {
    #[error("invalid time window [{start}, {end}): end must be finite and after start")]
    Invalid { start: f64, end: f64 },
}

/// Half-open time region `[start, end)` in seconds. Construction fails for
/// empty, inverted or non-finite bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct TimeWindow {
    start: f64,
    end: f64,
}

#[derive(Serialize, Deserialize)]
struct RawWindow {
    start: f64,
    end: f64,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = TimeWindowError;

    fn try_from(value: RawWindow) -> Result<Self, Self::Error> {
        Self::new(value.start, value.end)
    }
}

impl From<TimeWindow> for RawWindow {
    fn from(value: TimeWindow) -> Self {
        Self {
            start: value.start,
            end: value.end,
        }
    }
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Result<Self, TimeWindowError> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(TimeWindowError::Invalid { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> f64 {
        self.end
    }

    #[must_use]
    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    /// True when `[start, start + length)` lies inside the window. The end
    /// may overshoot by `EDGE_TOLERANCE` to absorb trimming round-off.
    #[must_use]
    pub fn encloses(&self, start: f64, length: f64) -> bool {
        length >= 0.0 && start >= self.start && start + length <= self.end + EDGE_TOLERANCE
    }

    /// Sub-window starting at `start` and ending at `end` clamped to this
    /// window, or `None` when nothing of it remains.
    #[must_use]
    pub fn sub_window(&self, start: f64, end: f64) -> Option<Self> {
        Self::new(start.max(self.start), end.min(self.end)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_inverted_windows() {
        assert!(TimeWindow::new(5.0, 5.0).is_err());
        assert!(TimeWindow::new(6.0, 5.0).is_err());
        assert!(TimeWindow::new(0.0, f64::INFINITY).is_err());
        assert!(TimeWindow::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn encloses_respects_half_open_end() {
        let window = TimeWindow::new(2.0, 10.0).expect("window should be valid");
        assert!(window.encloses(9.0, 1.0));
        assert!(!window.encloses(9.5, 1.0));
        assert!(!window.encloses(1.5, 1.0));
        assert!(window.encloses(9.0, 1.0 + EDGE_TOLERANCE / 2.0));
        assert!(!window.encloses(2.0, -1.0));
        assert!(window.contains(2.0));
        assert!(!window.contains(10.0));
        assert!((window.len() - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sub_window_clamps_to_parent() {
        let window = TimeWindow::new(0.0, 10.0).expect("window should be valid");
        let sub = window
            .sub_window(8.0, 14.0)
            .expect("overlapping sub window should exist");
        assert!((sub.end() - 10.0).abs() < f64::EPSILON);
        assert!(window.sub_window(10.0, 12.0).is_none());
    }

    #[test]
    fn deserializing_invalid_window_fails() {
        let parsed: Result<TimeWindow, _> = serde_json::from_str(r#"{"start":3.0,"end":1.0}"#);
        assert!(parsed.is_err());
        let parsed: TimeWindow =
            serde_json::from_str(r#"{"start":1.0,"end":3.0}"#).expect("valid window json");
        assert!((parsed.len() - 2.0).abs() < f64::EPSILON);
    }
}
