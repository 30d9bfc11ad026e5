//! PDF document source.

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use flipbook_application::DocumentSource;
use flipbook_core::PageBitmap;
use pdf::file::FileOptions;
use pdfium_render::prelude::{PdfBitmapFormat, PdfRenderConfig, Pdfium};

const MAX_RENDER_WIDTH_PX: i32 = 4096;
const MAX_RENDER_HEIGHT_PX: i32 = 4096;

#[derive(Debug, Default)]
pub struct Engine {
    pdfium: RefCell<PdfiumState>,
}

#[derive(Debug, Default)]
enum PdfiumState {
    #[default]
    Uninitialized,
    Available(Pdfium),
    Unavailable(String),
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_pdfium(&self) -> anyhow::Result<()> {
        if pdfium_disabled() {
            anyhow::bail!("pdfium disabled via FLIPBOOK_DISABLE_PDFIUM");
        }
        let _ = self.pdfium()?;
        Ok(())
    }

    pub fn page_count(&self, path: &Path) -> anyhow::Result<u32> {
        let file = FileOptions::cached()
            .open(path)
            .with_context(|| format!("open pdf {}", path.display()))?;
        Ok(file.num_pages())
    }

    /// Rasterises the zero-based `page_index` at `scale` times its size in points.
    pub fn render_page_bitmap_rgba(
        &self,
        path: &Path,
        page_index: u32,
        scale: f32,
    ) -> anyhow::Result<PageBitmap> {
        if pdfium_disabled() {
            anyhow::bail!("pdfium disabled via FLIPBOOK_DISABLE_PDFIUM");
        }

        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| format!("load pdf {}", path.display()))?;

        let index =
            u16::try_from(page_index).map_err(|_| anyhow::anyhow!("page index out of range"))?;
        let page = document
            .pages()
            .get(index)
            .map_err(|err| anyhow::anyhow!(err))?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .set_maximum_width(MAX_RENDER_WIDTH_PX)
            .set_maximum_height(MAX_RENDER_HEIGHT_PX)
            .render_form_data(false)
            .use_grayscale_rendering(false)
            .set_reverse_byte_order(false)
            .set_format(PdfBitmapFormat::BGRA);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|err| anyhow::anyhow!(err))?;

        let width = bitmap.width().max(0) as usize;
        let height = bitmap.height().max(0) as usize;
        let pixels = bgra_to_rgba(&bitmap.as_raw_bytes(), width, height);

        Ok(PageBitmap {
            page: page_index.saturating_add(1),
            width,
            height,
            stride: width.saturating_mul(4),
            pixels,
        })
    }

    fn pdfium(&self) -> anyhow::Result<Ref<'_, Pdfium>> {
        let init_error = {
            let mut state = self.pdfium.borrow_mut();
            match &*state {
                PdfiumState::Available(_) => None,
                PdfiumState::Unavailable(err) => Some(err.clone()),
                PdfiumState::Uninitialized => match bind_pdfium() {
                    Ok(pdfium) => {
                        *state = PdfiumState::Available(pdfium);
                        None
                    }
                    Err(err) => {
                        let msg = err.to_string();
                        log::warn!("pdfium unavailable: {msg}");
                        *state = PdfiumState::Unavailable(msg.clone());
                        Some(msg)
                    }
                },
            }
        };

        if let Some(err) = init_error {
            return Err(anyhow::anyhow!(err));
        }

        let state = self.pdfium.borrow();
        match &*state {
            PdfiumState::Available(_) => Ok(Ref::map(state, |state| match state {
                PdfiumState::Available(pdfium) => pdfium,
                _ => unreachable!("pdfium state checked above"),
            })),
            PdfiumState::Unavailable(err) => Err(anyhow::anyhow!(err.clone())),
            PdfiumState::Uninitialized => unreachable!("pdfium state initialized above"),
        }
    }
}

/// A PDF opened for viewing. The page count is read once at load time.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    title: String,
    page_count: u32,
    engine: Engine,
}

impl Document {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("document not found: {}", path.display());
        }

        let engine = Engine::new();
        let page_count = engine.page_count(path)?;
        if page_count == 0 {
            anyhow::bail!("document has no pages: {}", path.display());
        }

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();
        log::info!("opened {} ({page_count} pages)", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            title,
            page_count,
            engine,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl DocumentSource for Document {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn render_page(&self, page: u32, scale: f32) -> anyhow::Result<PageBitmap> {
        let page_index = page
            .checked_sub(1)
            .ok_or_else(|| anyhow::anyhow!("pages start at 1"))?;
        self.engine
            .render_page_bitmap_rgba(&self.path, page_index, scale)
            .with_context(|| format!("render page {page} of {}", self.title))
    }
}

fn pdfium_disabled() -> bool {
    std::env::var("FLIPBOOK_DISABLE_PDFIUM")
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false)
}

fn bind_pdfium() -> anyhow::Result<Pdfium> {
    if let Ok(path) = std::env::var("FLIPBOOK_PDFIUM_LIB_PATH") {
        let path = PathBuf::from(path);
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|err| anyhow::anyhow!(err))
            .map_err(|err| {
                anyhow::anyhow!(
                    "{err}\n\nFailed to load Pdfium from FLIPBOOK_PDFIUM_LIB_PATH={}.",
                    path.display()
                )
            })?;
        return Ok(Pdfium::new(bindings));
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(dir) = std::env::var("FLIPBOOK_PDFIUM_DIR") {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(
            &dir,
        )));
    }
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(dir));
    }
    candidates.push(Pdfium::pdfium_platform_library_name_at_path(Path::new(
        ".pdfium",
    )));

    for path in candidates {
        if let Ok(bindings) = Pdfium::bind_to_library(&path) {
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library()
        .map_err(|err| anyhow::anyhow!(err))
        .map_err(|err| {
            let lib_name = Pdfium::pdfium_platform_library_name();
            anyhow::anyhow!(
                "{err}\n\nPdfium library not found.\n- Install it system-wide, or\n- Place {} next to the executable, or\n- Set FLIPBOOK_PDFIUM_LIB_PATH.\n",
                lib_name.to_string_lossy()
            )
        })?;

    Ok(Pdfium::new(bindings))
}

/// Repacks pdfium's BGRA rows (possibly padded) into tight RGBA.
fn bgra_to_rgba(src: &[u8], width: usize, height: usize) -> Vec<u8> {
    let src_stride = if height == 0 { 0 } else { src.len() / height };

    let mut pixels = Vec::with_capacity(width.saturating_mul(height).saturating_mul(4));
    for y in 0..height {
        let base = y.saturating_mul(src_stride);
        for x in 0..width {
            let idx = base.saturating_add(x.saturating_mul(4));
            let b = src.get(idx).copied().unwrap_or(255);
            let g = src.get(idx + 1).copied().unwrap_or(255);
            let r = src.get(idx + 2).copied().unwrap_or(255);
            let a = src.get(idx + 3).copied().unwrap_or(255);
            pixels.extend_from_slice(&[r, g, b, a]);
        }
    }
    pixels
}
