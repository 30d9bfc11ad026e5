//! Page-flip state machine.
//!
//! `Idle -> Preparing -> Animating -> Idle`. Leaving `Idle` is the only guard
//! against overlapping flips: it happens in [`FlipAnimator::begin`] before any
//! page is rendered, and nothing but [`FlipAnimator::finish`] returns to it.
//! The commit is a deadline, not a callback; whoever drives the animator polls
//! [`FlipAnimator::due`] and runs the commit exactly once.

use std::time::{Duration, Instant};

use flipbook_core::{AnimationState, FlipDirection, Spread, SurfaceId};

/// Which pages go where for one flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipPlan {
    pub direction: FlipDirection,
    pub from: Spread,
    pub to: Spread,
    /// Page on the flip sheet's front face.
    pub front: u32,
    /// Page on the flip sheet's back face.
    pub back: u32,
    /// Static surface revealed as the sheet lifts, and the page it gets.
    pub underlay: (SurfaceId, u32),
    /// Static surface the sheet lands on, re-rendered at commit.
    pub landing: (SurfaceId, u32),
}

impl FlipPlan {
    pub fn new(direction: FlipDirection, from: Spread) -> Self {
        let left = from.left();
        let to = from.flipped(direction);
        match direction {
            FlipDirection::Next => Self {
                direction,
                from,
                to,
                front: left + 1,
                back: left + 2,
                underlay: (SurfaceId::StaticRight, left + 3),
                landing: (SurfaceId::StaticLeft, to.left()),
            },
            FlipDirection::Prev => Self {
                direction,
                from,
                to,
                front: left.saturating_sub(1),
                back: left,
                underlay: (SurfaceId::StaticLeft, left.saturating_sub(2)),
                landing: (SurfaceId::StaticRight, to.right()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipRejected {
    Busy,
    OutOfBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Preparing(FlipPlan),
    Animating {
        plan: FlipPlan,
        started_at: Instant,
        commit_at: Instant,
    },
}

#[derive(Debug, Clone)]
pub struct FlipAnimator {
    phase: Phase,
    duration: Duration,
}

impl FlipAnimator {
    pub fn new(duration: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn state(&self) -> AnimationState {
        match self.phase {
            Phase::Idle => AnimationState::Idle,
            Phase::Preparing(plan) | Phase::Animating { plan, .. } => {
                AnimationState::Animating(plan.direction)
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn begin(
        &mut self,
        direction: FlipDirection,
        spread: Spread,
        total_pages: u32,
    ) -> Result<FlipPlan, FlipRejected> {
        if !self.is_idle() {
            return Err(FlipRejected::Busy);
        }
        let in_bounds = match direction {
            FlipDirection::Next => spread.can_flip_next(total_pages),
            FlipDirection::Prev => spread.can_flip_prev(),
        };
        if !in_bounds {
            return Err(FlipRejected::OutOfBounds);
        }

        let plan = FlipPlan::new(direction, spread);
        self.phase = Phase::Preparing(plan);
        log::debug!("flip {direction}: preparing {} -> {}", spread.left(), plan.to.left());
        Ok(plan)
    }

    /// Starts the clock on a prepared flip and returns the commit deadline.
    pub fn launch(&mut self, now: Instant) -> Option<Instant> {
        let Phase::Preparing(plan) = self.phase else {
            return None;
        };
        let commit_at = now + self.duration;
        self.phase = Phase::Animating {
            plan,
            started_at: now,
            commit_at,
        };
        Some(commit_at)
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Animating { commit_at, .. } => Some(commit_at),
            _ => None,
        }
    }

    pub fn due(&self, now: Instant) -> Option<FlipPlan> {
        match self.phase {
            Phase::Animating {
                plan, commit_at, ..
            } if now >= commit_at => Some(plan),
            _ => None,
        }
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Fraction of the flip elapsed at `now`, in `0.0..=1.0`.
    pub fn progress(&self, now: Instant) -> Option<(FlipDirection, f32)> {
        let Phase::Animating {
            plan, started_at, ..
        } = self.phase
        else {
            return None;
        };
        let total = self.duration.as_secs_f32();
        let elapsed = now.saturating_duration_since(started_at).as_secs_f32();
        let fraction = if total <= 0.0 {
            1.0
        } else {
            (elapsed / total).clamp(0.0, 1.0)
        };
        Some((plan.direction, fraction))
    }
}
