//! Capabilities the controller needs from a rendering backend.

use std::time::Duration;

use flipbook_core::{FlipDirection, PageBitmap, SurfaceId, TocItem};

use crate::Controls;

/// Paginated source the viewer reads pages from. Pages are 1-based.
pub trait DocumentSource {
    fn page_count(&self) -> u32;
    fn render_page(&self, page: u32, scale: f32) -> anyhow::Result<PageBitmap>;
}

/// A single page-sized drawing target.
pub trait Surface {
    fn clear(&mut self);
    fn set_visible(&mut self, visible: bool);
    fn set_label(&mut self, page: Option<u32>);
    fn paint(&mut self, bitmap: PageBitmap);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayContent {
    Badge(String),
    Placeholder { title: String, subtitle: String },
    Player { title: String, src: String },
}

/// Layer stacked above a [`Surface`] that carries video content.
pub trait OverlayLayer {
    /// Empties the layer and drops the replacing mark; visibility is left as is.
    fn clear(&mut self);
    fn set_visible(&mut self, visible: bool);
    fn set_replacing(&mut self, replacing: bool);
    fn push(&mut self, content: OverlayContent);
}

pub trait Stage {
    type Surface: Surface;
    type Layer: OverlayLayer;

    fn slot(&mut self, id: SurfaceId) -> (&mut Self::Surface, &mut Self::Layer);
    fn start_flip(&mut self, direction: FlipDirection, duration: Duration);
    fn finish_flip(&mut self);
    fn show_controls(&mut self, controls: &Controls);
    fn show_toc(&mut self, items: &[TocItem]);
    fn set_sidebar_open(&mut self, open: bool);
    fn set_loading(&mut self, loading: bool);
    fn report_error(&mut self, message: &str);
}
