use flipbook_core::{AnimationState, Progress, Spread};

/// Everything a backend needs to draw the navigation bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    pub label: String,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub progress: Progress,
    pub animating: bool,
}

impl Controls {
    // Enablement is bound-based only; the animation guard rejects input on its own.
    pub fn compute(spread: &Spread, total_pages: u32, state: AnimationState) -> Self {
        Self {
            label: spread.label(total_pages),
            prev_enabled: spread.left() > 1,
            next_enabled: spread.right() < total_pages,
            progress: Progress::for_spread(spread, total_pages),
            animating: !state.is_idle(),
        }
    }
}
