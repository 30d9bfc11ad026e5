use flipbook_core::VideoConfig;

use crate::overlay;
use crate::surface::{DocumentSource, OverlayLayer, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Page outside the document; surface cleared.
    Cleared,
    Painted,
    /// A replace-mode video stands in for the page.
    Replaced,
    /// The document failed to rasterise; the surface keeps its previous content.
    Failed,
}

#[derive(Debug)]
pub struct PageRenderer<D> {
    document: D,
    videos: VideoConfig,
    scale: f32,
}

impl<D: DocumentSource> PageRenderer<D> {
    pub fn new(document: D, videos: VideoConfig, scale: f32) -> Self {
        Self {
            document,
            videos,
            scale,
        }
    }

    pub fn total_pages(&self) -> u32 {
        self.document.page_count()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn render(
        &self,
        page: u32,
        surface: &mut impl Surface,
        layer: &mut impl OverlayLayer,
    ) -> RenderOutcome {
        if page < 1 || page > self.total_pages() {
            surface.clear();
            surface.set_label(None);
            layer.set_visible(false);
            return RenderOutcome::Cleared;
        }

        surface.set_label(Some(page));

        let video = overlay::resolve(&self.videos, page);
        overlay::apply(video, layer, surface);
        if video.is_some_and(|video| video.replace_content) {
            surface.clear();
            return RenderOutcome::Replaced;
        }

        match self.document.render_page(page, self.scale) {
            Ok(bitmap) => {
                surface.paint(bitmap);
                RenderOutcome::Painted
            }
            Err(err) => {
                log::warn!("render page {page} failed: {err:#}");
                RenderOutcome::Failed
            }
        }
    }
}
