use std::f32::consts::PI;

use flipbook_core::{FlipDirection, SurfaceId};
use ratatui::layout::Rect;

/// Where the turning sheet sits at `progress` (0.0..=1.0) of a flip.
///
/// The sheet pivots on the spine, shrinking over the half it leaves and then
/// growing over the half it lands on. A forward turn lifts the front face and
/// lands the back; a backward turn lifts the back face and lands the front.
/// Returns `None` while the sheet is edge-on.
pub(crate) fn sheet(
    left_half: Rect,
    right_half: Rect,
    direction: FlipDirection,
    progress: f32,
) -> Option<(SurfaceId, Rect)> {
    let progress = progress.clamp(0.0, 1.0);
    let lifting = progress < 0.5;
    let (face, half, anchored_right) = match (direction, lifting) {
        (FlipDirection::Next, true) => (SurfaceId::FlipFront, right_half, false),
        (FlipDirection::Next, false) => (SurfaceId::FlipBack, left_half, true),
        (FlipDirection::Prev, true) => (SurfaceId::FlipBack, left_half, true),
        (FlipDirection::Prev, false) => (SurfaceId::FlipFront, right_half, false),
    };

    let width = foreshortened(half.width, progress);
    if width == 0 || half.height == 0 {
        return None;
    }
    let x = if anchored_right {
        half.x + half.width - width
    } else {
        half.x
    };
    Some((face, Rect::new(x, half.y, width, half.height)))
}

fn foreshortened(width: u16, progress: f32) -> u16 {
    let scale = (PI * progress).cos().abs();
    ((f32::from(width) * scale).round() as u16).min(width)
}
