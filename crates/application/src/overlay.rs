use flipbook_core::{VideoConfig, VideoDescriptor};

use crate::surface::{OverlayContent, OverlayLayer, Surface};

pub const PLACEHOLDER_SUBTITLE: &str = "Coming soon";

pub fn resolve(videos: &VideoConfig, page: u32) -> Option<&VideoDescriptor> {
    videos.lookup(page)
}

/// Decides surface visibility versus the video layer for one page.
pub fn apply(
    descriptor: Option<&VideoDescriptor>,
    layer: &mut impl OverlayLayer,
    surface: &mut impl Surface,
) {
    layer.clear();

    let Some(video) = descriptor else {
        layer.set_visible(false);
        surface.set_visible(true);
        return;
    };

    layer.set_visible(true);
    if video.replace_content {
        surface.set_visible(false);
        layer.set_replacing(true);
    } else {
        surface.set_visible(true);
    }

    layer.push(OverlayContent::Badge(video.badge().to_string()));
    if video.is_placeholder() {
        layer.push(OverlayContent::Placeholder {
            title: video.title.clone(),
            subtitle: PLACEHOLDER_SUBTITLE.to_string(),
        });
    } else {
        layer.push(OverlayContent::Player {
            title: video.title.clone(),
            src: video.src.clone(),
        });
    }
}
