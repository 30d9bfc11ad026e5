use std::sync::Arc;
use std::time::Duration;

use flipbook_application::{Controls, OverlayContent, OverlayLayer, Stage, Surface};
use flipbook_core::{FlipDirection, PageBitmap, SurfaceId, TocItem};

/// A page image slot. `generation` bumps on every change so cached
/// terminal protocols can tell when they are stale.
#[derive(Debug, Clone, Default)]
pub struct TuiSurface {
    visible: bool,
    label: Option<u32>,
    image: Option<Arc<image::DynamicImage>>,
    generation: u64,
}

impl TuiSurface {
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn label(&self) -> Option<u32> {
        self.label
    }

    pub fn image(&self) -> Option<&Arc<image::DynamicImage>> {
        self.image.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

impl Surface for TuiSurface {
    fn clear(&mut self) {
        self.image = None;
        self.touch();
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_label(&mut self, page: Option<u32>) {
        self.label = page;
    }

    fn paint(&mut self, bitmap: PageBitmap) {
        let page = bitmap.page;
        match bitmap_to_image(bitmap) {
            Some(image) => self.image = Some(Arc::new(image)),
            None => {
                log::warn!("page {page}: pixel buffer does not match its dimensions");
                self.image = None;
            }
        }
        self.touch();
    }
}

#[derive(Debug, Clone, Default)]
pub struct TuiLayer {
    visible: bool,
    replacing: bool,
    contents: Vec<OverlayContent>,
}

impl TuiLayer {
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn replacing(&self) -> bool {
        self.replacing
    }

    pub fn contents(&self) -> &[OverlayContent] {
        &self.contents
    }
}

impl OverlayLayer for TuiLayer {
    fn clear(&mut self) {
        self.contents.clear();
        self.replacing = false;
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

#[derive(Debug, Clone, Default)]
pub struct Pane {
    pub surface: TuiSurface,
    pub layer: TuiLayer,
}

/// Terminal-side state the viewer draws into; the UI reads it back each frame.
#[derive(Debug, Default)]
pub struct TuiStage {
    panes: [Pane; 4],
    controls: Option<Controls>,
    flip: Option<(FlipDirection, Duration)>,
    toc: Vec<TocItem>,
    sidebar_open: bool,
    loading: bool,
    alert: Option<String>,
}

impl TuiStage {
    pub fn new() -> Self {
        let mut stage = Self::default();
        for id in [SurfaceId::StaticLeft, SurfaceId::StaticRight] {
            stage.panes[id.index()].surface.visible = true;
        }
        stage
    }

    pub fn pane(&self, id: SurfaceId) -> &Pane {
        &self.panes[id.index()]
    }

    pub fn controls(&self) -> Option<&Controls> {
        self.controls.as_ref()
    }

    pub fn flip(&self) -> Option<(FlipDirection, Duration)> {
        self.flip
    }

    pub fn toc(&self) -> &[TocItem] {
        &self.toc
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) -> bool {
        self.alert.take().is_some()
    }
}

impl Stage for TuiStage {
    type Surface = TuiSurface;
    type Layer = TuiLayer;

    fn slot(&mut self, id: SurfaceId) -> (&mut TuiSurface, &mut TuiLayer) {
        let pane = &mut self.panes[id.index()];
        (&mut pane.surface, &mut pane.layer)
    }

    fn start_flip(&mut self, direction: FlipDirection, duration: Duration) {
        self.flip = Some((direction, duration));
    }

    fn finish_flip(&mut self) {
        self.flip = None;
        for id in [SurfaceId::FlipFront, SurfaceId::FlipBack] {
            let pane = &mut self.panes[id.index()];
            pane.surface.visible = false;
            pane.layer.visible = false;
        }
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
        self.alert = Some(message.to_string());
    }
}

/// Converts a renderer bitmap to an RGBA image, dropping any row padding.
pub(crate) fn bitmap_to_image(bitmap: PageBitmap) -> Option<image::DynamicImage> {
    let width = u32::try_from(bitmap.width).ok()?;
    let height = u32::try_from(bitmap.height).ok()?;
    let row = bitmap.width.checked_mul(4)?;

    let pixels = if bitmap.stride == row {
        bitmap.pixels
    } else {
        if bitmap.stride < row {
            return None;
        }
        let mut packed = Vec::with_capacity(row.saturating_mul(bitmap.height));
        for chunk in bitmap.pixels.chunks(bitmap.stride).take(bitmap.height) {
            packed.extend_from_slice(chunk.get(..row)?);
        }
        packed
    };

    let image = image::RgbaImage::from_raw(width, height, pixels)?;
    Some(image::DynamicImage::ImageRgba8(image))
}
