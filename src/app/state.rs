// SPDX-License-Identifier: GPL-3.0-only

//! Guided capture state machine
//!
//! ```text
//! Instructions ──Begin──▶ Left/Top ─▶ … ─▶ Left/Elevated ─▶ Right/Top ─▶ … ─▶ Right/Elevated
//!                              ▲                                                     │
//!                              │ Reset / Retake(slot)                                ▼
//!                              └──────────────────────────────────────────────── Review ──Complete──▶ Complete
//! ```
//!
//! [`CaptureStep::apply`] is the only place transitions are decided. Camera
//! acquisition and release hang off step entry and exit in
//! [`crate::app::CaptureController`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

/// Which foot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Anatomical view of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Angle {
    Top,
    Side,
    Sole,
    Rear,
    Elevated,
}

impl Angle {
    /// Capture order within one side
    pub const ALL: [Angle; 5] = [Angle::Top, Angle::Side, Angle::Sole, Angle::Rear, Angle::Elevated];
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Angle::Top => "top",
            Angle::Side => "side",
            Angle::Sole => "sole",
            Angle::Rear => "rear",
            Angle::Elevated => "elevated",
        };
        f.write_str(name)
    }
}

/// One (side, angle) pairing
///
/// Ordering follows the capture sequence: every left angle, then every right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaptureSlot {
    pub side: Side,
    pub angle: Angle,
}

impl CaptureSlot {
    pub const fn new(side: Side, angle: Angle) -> Self {
        Self { side, angle }
    }

    /// All slots in capture order
    pub fn sequence() -> impl Iterator<Item = CaptureSlot> {
        Side::ALL
            .into_iter()
            .flat_map(|side| Angle::ALL.into_iter().map(move |angle| CaptureSlot { side, angle }))
    }

    /// First slot of the sequence
    pub fn first() -> Self {
        Self::new(Side::Left, Angle::Top)
    }

    /// Number of slots in a full scan
    pub fn count() -> usize {
        Side::ALL.len() * Angle::ALL.len()
    }
}

impl fmt::Display for CaptureSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.side, self.angle)
    }
}

/// Where the guided flow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureStep {
    #[default]
    Instructions,
    Capture(CaptureSlot),
    Review,
    /// Terminal
    Complete,
}

/// Operator or controller request to move the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Leave the instructions
    Begin,
    /// The current slot has been filled
    Advance,
    /// Re-enter the current capture step after a device failure
    Retry,
    /// Go back from review to one slot
    Retake(CaptureSlot),
    /// Go back from review to the first slot
    Reset,
    /// Finish from review
    Complete,
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepAction::Begin => write!(f, "begin"),
            StepAction::Advance => write!(f, "advance"),
            StepAction::Retry => write!(f, "retry"),
            StepAction::Retake(slot) => write!(f, "retake {}", slot),
            StepAction::Reset => write!(f, "reset"),
            StepAction::Complete => write!(f, "complete"),
        }
    }
}

impl CaptureStep {
    /// The slot being captured, if any
    pub fn slot(&self) -> Option<CaptureSlot> {
        match self {
            CaptureStep::Capture(slot) => Some(*slot),
            _ => None,
        }
    }

    /// Whether this step holds a camera session
    pub fn is_capture(&self) -> bool {
        self.slot().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureStep::Complete)
    }

    /// Next step for `action`, or `None` if the action is not allowed here
    ///
    /// `filled` holds the slots that already have an image. Advancing moves
    /// to the next unfilled slot after the current one, or to review.
    pub fn apply(self, action: StepAction, filled: &BTreeSet<CaptureSlot>) -> Option<CaptureStep> {
        match (self, action) {
            (CaptureStep::Instructions, StepAction::Begin) => {
                Some(CaptureStep::Capture(CaptureSlot::first()))
            }
            (CaptureStep::Capture(current), StepAction::Advance) => Some(
                CaptureSlot::sequence()
                    .filter(|slot| *slot > current && !filled.contains(slot))
                    .map(CaptureStep::Capture)
                    .next()
                    .unwrap_or(CaptureStep::Review),
            ),
            (CaptureStep::Capture(current), StepAction::Retry) => Some(CaptureStep::Capture(current)),
            (CaptureStep::Review, StepAction::Retake(slot)) => Some(CaptureStep::Capture(slot)),
            (CaptureStep::Review, StepAction::Reset) => Some(CaptureStep::Capture(CaptureSlot::first())),
            (CaptureStep::Review, StepAction::Complete) => Some(CaptureStep::Complete),
            _ => None,
        }
    }
}

impl fmt::Display for CaptureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureStep::Instructions => write!(f, "instructions"),
            CaptureStep::Capture(slot) => write!(f, "capture {}", slot),
            CaptureStep::Review => write!(f, "review"),
            CaptureStep::Complete => write!(f, "complete"),
        }
    }
}

/// How the current slot is acquired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Photo,
    Video,
}

/// Video take state of the current capture step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// Not recording
    #[default]
    Idle,
    /// Actively recording
    Recording {
        /// When recording started
        start_time: Instant,
    },
    /// The cap stopped the take; it is waiting to be collected
    CapReached,
}

impl RecordingState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording { .. })
    }

    /// Time since recording started
    pub fn elapsed_duration(&self) -> Duration {
        match self {
            RecordingState::Recording { start_time } => start_time.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_order() {
        let slots: Vec<_> = CaptureSlot::sequence().collect();
        assert_eq!(slots.len(), 10);
        assert_eq!(slots[0], CaptureSlot::new(Side::Left, Angle::Top));
        assert_eq!(slots[4], CaptureSlot::new(Side::Left, Angle::Elevated));
        assert_eq!(slots[5], CaptureSlot::new(Side::Right, Angle::Top));
        assert!(slots.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_full_walk_reaches_review() {
        let mut filled = BTreeSet::new();
        let mut step = CaptureStep::Instructions.apply(StepAction::Begin, &filled).unwrap();
        let mut visited = 0;

        while let Some(slot) = step.slot() {
            filled.insert(slot);
            visited += 1;
            step = step.apply(StepAction::Advance, &filled).unwrap();
        }

        assert_eq!(visited, 10);
        assert_eq!(step, CaptureStep::Review);
    }

    #[test]
    fn test_retake_returns_to_review() {
        let filled: BTreeSet<_> = CaptureSlot::sequence().collect();
        let slot = CaptureSlot::new(Side::Left, Angle::Sole);

        let step = CaptureStep::Review.apply(StepAction::Retake(slot), &filled).unwrap();
        assert_eq!(step, CaptureStep::Capture(slot));
        assert_eq!(step.apply(StepAction::Advance, &filled), Some(CaptureStep::Review));
    }

    #[test]
    fn test_reset_and_invalid_actions() {
        let filled = BTreeSet::new();
        assert_eq!(
            CaptureStep::Review.apply(StepAction::Reset, &filled),
            Some(CaptureStep::Capture(CaptureSlot::first()))
        );
        assert_eq!(CaptureStep::Complete.apply(StepAction::Reset, &filled), None);
        assert_eq!(CaptureStep::Instructions.apply(StepAction::Complete, &filled), None);
        assert_eq!(
            CaptureStep::Capture(CaptureSlot::first()).apply(StepAction::Complete, &filled),
            None
        );
    }

    #[test]
    fn test_display() {
        let step = CaptureStep::Capture(CaptureSlot::new(Side::Right, Angle::Rear));
        assert_eq!(step.to_string(), "capture right rear");
    }
}
