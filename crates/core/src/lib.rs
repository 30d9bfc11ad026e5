//! Core domain types for Flipbook.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod video;

pub use video::{ConfigError, VideoConfig, VideoDescriptor};

pub const DEFAULT_FLIP_DURATION_MS: u64 = 1200;
pub const DEFAULT_RENDER_SCALE: f32 = 1.5;
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_LOADER_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Next,
    Prev,
}

impl FlipDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlipDirection::Next => "next",
            FlipDirection::Prev => "prev",
        }
    }
}

impl std::fmt::Display for FlipDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only one flip may be in flight; `Idle` is the sole state in which the
/// current spread may be replaced by anything other than a flip commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Animating(FlipDirection),
}

impl AnimationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, AnimationState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    StaticLeft,
    StaticRight,
    FlipFront,
    FlipBack,
}

impl SurfaceId {
    pub fn index(&self) -> usize {
        match self {
            SurfaceId::StaticLeft => 0,
            SurfaceId::StaticRight => 1,
            SurfaceId::FlipFront => 2,
            SurfaceId::FlipBack => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceId::StaticLeft => "static-left",
            SurfaceId::StaticRight => "static-right",
            SurfaceId::FlipFront => "flip-front",
            SurfaceId::FlipBack => "flip-back",
        }
    }
}

/// A pair of facing pages, anchored on the 1-based odd left page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spread {
    left: u32,
}

impl Default for Spread {
    fn default() -> Self {
        Self { left: 1 }
    }
}

impl Spread {
    pub fn starting_at(page: u32) -> Self {
        Self {
            left: normalize_left(page),
        }
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn right(&self) -> u32 {
        self.left.saturating_add(1)
    }

    pub fn right_within(&self, total_pages: u32) -> Option<u32> {
        let right = self.right();
        (right <= total_pages).then_some(right)
    }

    pub fn last_visible(&self, total_pages: u32) -> u32 {
        self.right().min(total_pages)
    }

    pub fn label(&self, total_pages: u32) -> String {
        format!(
            "Pages {}-{} of {}",
            self.left,
            self.last_visible(total_pages),
            total_pages
        )
    }

    /// The next spread must have at least its left page; for odd totals this
    /// still reaches the trailing single-page spread.
    pub fn can_flip_next(&self, total_pages: u32) -> bool {
        self.left.saturating_add(2) <= total_pages
    }

    pub fn can_flip_prev(&self) -> bool {
        self.left > 1
    }

    pub fn flipped(&self, direction: FlipDirection) -> Self {
        match direction {
            FlipDirection::Next => Self {
                left: self.left.saturating_add(2),
            },
            FlipDirection::Prev => Self {
                left: self.left.saturating_sub(2).max(1),
            },
        }
    }
}

/// Nearest odd page at or below `page`, never below 1.
pub fn normalize_left(page: u32) -> u32 {
    if page <= 1 {
        1
    } else if page % 2 == 0 {
        page - 1
    } else {
        page
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    pub title: String,
    pub page: u32,
}

/// One entry per spread start: every odd page from 1 through `total_pages`.
pub fn spread_toc(total_pages: u32) -> Vec<TocItem> {
    (1..=total_pages)
        .step_by(2)
        .map(|page| TocItem {
            title: format!("Pages {}-{}", page, page.saturating_add(1).min(total_pages)),
            page,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Progress {
    pub fn for_spread(spread: &Spread, total_pages: u32) -> Self {
        Self {
            current_page: spread.right(),
            total_pages,
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.total_pages == 0 {
            0.0
        } else {
            f64::from(self.current_page) / f64::from(self.total_pages)
        }
    }

    pub fn percent(&self) -> f32 {
        (self.fraction() * 100.0) as f32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GotoError {
    #[error("enter a page number")]
    Empty,
    #[error("invalid page number: {0}")]
    NotANumber(String),
    #[error("page out of range (1..={total})")]
    OutOfRange { page: u32, total: u32 },
}

/// Parses direct page-number entry and checks it against the document.
pub fn parse_page_input(input: &str, total_pages: u32) -> Result<u32, GotoError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(GotoError::Empty);
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GotoError::NotANumber(input.to_string()));
    }
    let page = input
        .parse::<u32>()
        .map_err(|_| GotoError::NotANumber(input.to_string()))?;
    if page < 1 || page > total_pages {
        return Err(GotoError::OutOfRange {
            page,
            total: total_pages,
        });
    }
    Ok(page)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBitmap {
    pub page: u32,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub flip_duration_ms: u64,
    pub render_scale: f32,
    pub resize_debounce_ms: u64,
    pub loader_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            flip_duration_ms: DEFAULT_FLIP_DURATION_MS,
            render_scale: DEFAULT_RENDER_SCALE,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            loader_delay_ms: DEFAULT_LOADER_DELAY_MS,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.flip_duration_ms = self.flip_duration_ms.clamp(100, 10_000);
        self.render_scale = if self.render_scale.is_finite() {
            self.render_scale.clamp(0.25, 4.0)
        } else {
            DEFAULT_RENDER_SCALE
        };
        self.resize_debounce_ms = self.resize_debounce_ms.min(5_000);
        self.loader_delay_ms = self.loader_delay_ms.min(5_000);
    }

    pub fn flip_duration(&self) -> Duration {
        Duration::from_millis(self.flip_duration_ms)
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn loader_delay(&self) -> Duration {
        Duration::from_millis(self.loader_delay_ms)
    }
}
