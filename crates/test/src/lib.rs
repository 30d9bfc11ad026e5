//! Test helpers and fixtures.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::time::Duration;

use flipbook_application::{Controls, DocumentSource, OverlayContent, OverlayLayer, Stage, Surface};
use flipbook_core::{
    FlipDirection, PageBitmap, Settings, SurfaceId, TocItem, VideoConfig, VideoDescriptor,
};

/// In-memory document: every page renders to a 1x1 bitmap unless told to fail.
#[derive(Debug, Default)]
pub struct FakeDocument {
    pages: u32,
    failing: RefCell<BTreeSet<u32>>,
    renders: RefCell<Vec<u32>>,
}

impl FakeDocument {
    pub fn new(pages: u32) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn fail_page(&self, page: u32) {
        self.failing.borrow_mut().insert(page);
    }

    pub fn heal_page(&self, page: u32) {
        self.failing.borrow_mut().remove(&page);
    }

    /// Pages rasterised so far, in call order.
    pub fn renders(&self) -> Vec<u32> {
        self.renders.borrow().clone()
    }

    pub fn clear_renders(&self) {
        self.renders.borrow_mut().clear();
    }
}

impl DocumentSource for FakeDocument {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn render_page(&self, page: u32, _scale: f32) -> anyhow::Result<PageBitmap> {
        self.renders.borrow_mut().push(page);
        if self.failing.borrow().contains(&page) {
            anyhow::bail!("page {page} is corrupt");
        }
        Ok(PageBitmap {
            page,
            width: 1,
            height: 1,
            stride: 4,
            pixels: vec![255, 255, 255, 255],
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedSurface {
    pub visible: bool,
    pub label: Option<u32>,
    /// Page of the last bitmap painted, `None` once cleared.
    pub painted: Option<u32>,
    pub paints: usize,
}

impl Surface for RecordedSurface {
    fn clear(&mut self) {
        self.painted = None;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_label(&mut self, page: Option<u32>) {
        self.label = page;
    }

    fn paint(&mut self, bitmap: PageBitmap) {
        self.painted = Some(bitmap.page);
        self.paints += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedLayer {
    pub visible: bool,
    pub replacing: bool,
    pub contents: Vec<OverlayContent>,
}

impl OverlayLayer for RecordedLayer {
    fn clear(&mut self) {
        self.replacing = false;
        self.contents.clear();
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_replacing(&mut self, replacing: bool) {
        self.replacing = replacing;
    }

    fn push(&mut self, content: OverlayContent) {
        self.contents.push(content);
    }
}

/// Stage that remembers everything the viewer told it.
#[derive(Debug, Default)]
pub struct RecordingStage {
    pub surfaces: [RecordedSurface; 4],
    pub layers: [RecordedLayer; 4],
    pub flip: Option<(FlipDirection, Duration)>,
    pub flips_started: usize,
    pub flips_finished: usize,
    pub controls: Option<Controls>,
    pub toc: Vec<TocItem>,
    pub sidebar_open: bool,
    pub loading: bool,
    pub errors: Vec<String>,
}

impl RecordingStage {
    pub fn surface(&self, id: SurfaceId) -> &RecordedSurface {
        &self.surfaces[id.index()]
    }

    pub fn layer(&self, id: SurfaceId) -> &RecordedLayer {
        &self.layers[id.index()]
    }

    /// Pages painted on the static spread as `(left, right)`.
    pub fn spread_painted(&self) -> (Option<u32>, Option<u32>) {
        (
            self.surface(SurfaceId::StaticLeft).painted,
            self.surface(SurfaceId::StaticRight).painted,
        )
    }

    pub fn label(&self) -> Option<&str> {
        self.controls.as_ref().map(|c| c.label.as_str())
    }
}

impl Stage for RecordingStage {
    type Surface = RecordedSurface;
    type Layer = RecordedLayer;

    fn slot(&mut self, id: SurfaceId) -> (&mut RecordedSurface, &mut RecordedLayer) {
        (&mut self.surfaces[id.index()], &mut self.layers[id.index()])
    }

    fn start_flip(&mut self, direction: FlipDirection, duration: Duration) {
        self.flip = Some((direction, duration));
        self.flips_started += 1;
    }

    fn finish_flip(&mut self) {
        self.flip = None;
        self.flips_finished += 1;
    }

    fn show_controls(&mut self, controls: &Controls) {
        self.controls = Some(controls.clone());
    }

    fn show_toc(&mut self, items: &[TocItem]) {
        self.toc = items.to_vec();
    }

    fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn report_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

pub fn make_settings(flip_duration_ms: u64) -> Settings {
    Settings {
        flip_duration_ms,
        ..Settings::default()
    }
}

pub fn video(page: u32, src: &str, title: &str, replace_content: bool) -> VideoDescriptor {
    VideoDescriptor {
        page,
        src: src.to_string(),
        title: title.to_string(),
        replace_content,
    }
}

pub fn videos(entries: Vec<VideoDescriptor>) -> VideoConfig {
    VideoConfig::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_settings() {
        let settings = make_settings(400);
        assert_eq!(settings.flip_duration_ms, 400);
        assert_eq!(settings.render_scale, flipbook_core::DEFAULT_RENDER_SCALE);
    }

    #[test]
    fn fake_document_records_and_fails() {
        let doc = FakeDocument::new(3);
        doc.fail_page(2);
        assert!(doc.render_page(1, 1.0).is_ok());
        assert!(doc.render_page(2, 1.0).is_err());
        doc.heal_page(2);
        assert!(doc.render_page(2, 1.0).is_ok());
        assert_eq!(doc.renders(), vec![1, 2, 2]);
    }

    #[test]
    fn recorded_surface_tracks_paints() {
        let mut surface = RecordedSurface::default();
        surface.paint(PageBitmap {
            page: 7,
            width: 1,
            height: 1,
            stride: 4,
            pixels: vec![0; 4],
        });
        assert_eq!(surface.painted, Some(7));
        surface.clear();
        assert_eq!(surface.painted, None);
        assert_eq!(surface.paints, 1);
    }
}
