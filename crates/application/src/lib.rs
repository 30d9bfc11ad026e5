//! Spread and page-flip controller for Flipbook.

mod animator;
mod controls;
mod debounce;
mod overlay;
mod renderer;
mod surface;
mod viewer;

pub use animator::{FlipAnimator, FlipPlan, FlipRejected};
pub use controls::Controls;
pub use debounce::Debouncer;
pub use overlay::PLACEHOLDER_SUBTITLE;
pub use renderer::{PageRenderer, RenderOutcome};
pub use surface::{DocumentSource, OverlayContent, OverlayLayer, Stage, Surface};
pub use viewer::{GotoOutcome, Viewer};
