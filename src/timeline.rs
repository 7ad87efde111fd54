//! Phase segmentation of the unit progress domain.

use crate::ease::Ease;

/// Named sub-range of the progress domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Phase {
    Hold,
    Transition,
    Settled,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Segment {
    pub phase: Phase,
    pub start: f64,
    pub end: f64,
}

/// Contiguous, non-overlapping segments covering `[0, 1]`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PhaseTimeline {
    segments: Vec<Segment>,
    hold: f64,
    end: f64,
}

impl PhaseTimeline {
    /// Build `hold | transition | settled` from two boundaries.
    ///
    /// Boundaries come from markup and are clamped rather than rejected:
    /// both are clamped into `[0, 1]`, and `hold >= end` collapses the
    /// transition to an instantaneous step at `hold`. Empty segments are
    /// dropped so every stored segment has `start < end`.
    pub fn from_boundaries(hold: f64, end: f64) -> Self {
        let hold = finite_or(hold, 0.0).clamp(0.0, 1.0);
        let end = finite_or(end, 1.0).clamp(0.0, 1.0);
        if hold >= end {
            tracing::debug!(hold, end, "phase boundaries out of order, using a step");
        }
        let end = end.max(hold);
        let segments = [
            Segment {
                phase: Phase::Hold,
                start: 0.0,
                end: hold,
            },
            Segment {
                phase: Phase::Transition,
                start: hold,
                end,
            },
            Segment {
                phase: Phase::Settled,
                start: end,
                end: 1.0,
            },
        ]
        .into_iter()
        .filter(|s| s.start < s.end)
        .collect();
        Self {
            segments,
            hold,
            end,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn hold(&self) -> f64 {
        self.hold
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Phase containing `progress`; boundaries belong to the earlier phase,
    /// matching [`PhaseTimeline::local_position`].
    pub fn phase_at(&self, progress: f64) -> Phase {
        let p = progress.clamp(0.0, 1.0);
        if p <= self.hold {
            Phase::Hold
        } else if p <= self.end {
            Phase::Transition
        } else {
            Phase::Settled
        }
    }

    /// Linear position within the transition: 0 at or before `hold`, 1 after
    /// `end`, linear in between.
    pub fn local_position(&self, progress: f64) -> f64 {
        let p = finite_or(progress, 0.0);
        if p <= self.hold {
            0.0
        } else if p > self.end || self.end <= self.hold {
            1.0
        } else {
            ((p - self.hold) / (self.end - self.hold)).clamp(0.0, 1.0)
        }
    }

    /// `true` while `progress` is strictly inside the transition.
    pub fn is_transitioning(&self, progress: f64) -> bool {
        progress > self.hold && progress < self.end
    }

    /// [`PhaseTimeline::local_position`] passed through `ease`.
    pub fn eased(&self, progress: f64, ease: Ease) -> f64 {
        ease.apply(self.local_position(progress))
    }
}

/// Stagger offset of element `index` of `count`, spread over `[0, amount)`.
pub fn stagger_offset(index: usize, count: usize, amount: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let amount = finite_or(amount, 0.0).clamp(0.0, 0.95);
    amount * index as f64 / count as f64
}

/// Per-element local t: `clamp((position - offset) / (1 - offset), 0, 1)`.
pub fn staggered(position: f64, offset: f64) -> f64 {
    let span = 1.0 - offset;
    if span <= 0.0 {
        return if position >= 1.0 { 1.0 } else { 0.0 };
    }
    ((position - offset) / span).clamp(0.0, 1.0)
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}
