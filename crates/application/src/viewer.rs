use std::time::Instant;

use flipbook_core::{
    AnimationState, FlipDirection, GotoError, Settings, Spread, SurfaceId, TocItem, VideoConfig,
    parse_page_input, spread_toc,
};

use crate::animator::{FlipAnimator, FlipPlan, FlipRejected};
use crate::controls::Controls;
use crate::debounce::Debouncer;
use crate::renderer::{PageRenderer, RenderOutcome};
use crate::surface::{DocumentSource, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GotoOutcome {
    Jumped(Spread),
    /// A flip is in flight; the request was dropped.
    Busy,
}

/// Owns the spread, the flip state machine and the stage they draw on.
pub struct Viewer<D, S> {
    renderer: PageRenderer<D>,
    stage: S,
    spread: Spread,
    animator: FlipAnimator,
    resize: Debouncer,
    settings: Settings,
    toc: Vec<TocItem>,
    sidebar_open: bool,
    loader_hide_at: Option<Instant>,
}

impl<D: DocumentSource, S: Stage> Viewer<D, S> {
    pub fn new(document: D, videos: VideoConfig, mut settings: Settings, stage: S) -> Self {
        settings.normalize();
        let toc = spread_toc(document.page_count());
        Self {
            renderer: PageRenderer::new(document, videos, settings.render_scale),
            stage,
            spread: Spread::default(),
            animator: FlipAnimator::new(settings.flip_duration()),
            resize: Debouncer::new(settings.resize_debounce()),
            settings,
            toc,
            sidebar_open: false,
            loader_hide_at: None,
        }
    }

    /// Paints the first spread and schedules the loader to go away.
    pub fn start(&mut self, now: Instant) {
        log::info!("viewer start: {} pages", self.total_pages());
        self.stage.set_loading(true);
        self.render_spread();
        self.refresh_controls();
        self.stage.show_toc(&self.toc);
        self.stage.set_sidebar_open(self.sidebar_open);
        self.loader_hide_at = Some(now + self.settings.loader_delay());
    }

    pub fn total_pages(&self) -> u32 {
        self.renderer.total_pages()
    }

    pub fn spread(&self) -> Spread {
        self.spread
    }

    pub fn animation_state(&self) -> AnimationState {
        self.animator.state()
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    pub fn document(&self) -> &D {
        self.renderer.document()
    }

    pub fn toc(&self) -> &[TocItem] {
        &self.toc
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn controls(&self) -> Controls {
        Controls::compute(&self.spread, self.total_pages(), self.animator.state())
    }

    pub fn flip_progress(&self, now: Instant) -> Option<(FlipDirection, f32)> {
        self.animator.progress(now)
    }

    /// Re-renders the static spread anchored at `left`. Ignored mid-flip.
    pub fn show_spread(&mut self, left: u32) -> bool {
        if !self.animator.is_idle() {
            log::debug!("show_spread({left}) ignored: flip in progress");
            return false;
        }
        self.spread = Spread::starting_at(left);
        self.render_spread();
        self.refresh_controls();
        true
    }

    pub fn flip_next(&mut self, now: Instant) -> bool {
        self.flip(FlipDirection::Next, now)
    }

    pub fn flip_prev(&mut self, now: Instant) -> bool {
        self.flip(FlipDirection::Prev, now)
    }

    fn flip(&mut self, direction: FlipDirection, now: Instant) -> bool {
        let plan = match self.animator.begin(direction, self.spread, self.total_pages()) {
            Ok(plan) => plan,
            Err(FlipRejected::Busy) => {
                log::debug!("flip {direction} dropped: already animating");
                return false;
            }
            Err(FlipRejected::OutOfBounds) => {
                log::debug!("flip {direction} rejected at left page {}", self.spread.left());
                return false;
            }
        };

        self.render_into(SurfaceId::FlipFront, plan.front);
        self.render_into(SurfaceId::FlipBack, plan.back);
        let (underlay, page) = plan.underlay;
        self.render_into(underlay, page);

        self.animator.launch(now);
        self.stage.start_flip(direction, self.animator.duration());
        self.refresh_controls();
        true
    }

    /// Jumps straight to the spread holding page `input`, without animation.
    pub fn go_to_page(&mut self, input: &str) -> Result<GotoOutcome, GotoError> {
        if !self.animator.is_idle() {
            return Ok(GotoOutcome::Busy);
        }
        let page = match parse_page_input(input, self.total_pages()) {
            Ok(page) => page,
            Err(err) => {
                self.stage.report_error(&err.to_string());
                return Err(err);
            }
        };

        self.stage.set_loading(true);
        self.show_spread(page);
        self.stage.set_loading(false);
        log::debug!("jumped to page {page} (spread {})", self.spread.left());
        Ok(GotoOutcome::Jumped(self.spread))
    }

    /// Jumps to a table-of-contents entry and closes the sidebar.
    pub fn select_toc_entry(&mut self, index: usize) -> Option<GotoOutcome> {
        let page = self.toc.get(index)?.page;
        let outcome = self.go_to_page(&page.to_string()).ok()?;
        if matches!(outcome, GotoOutcome::Jumped(_)) && self.sidebar_open {
            self.toggle_sidebar();
        }
        Some(outcome)
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
        self.stage.set_sidebar_open(self.sidebar_open);
    }

    pub fn notify_resize(&mut self, now: Instant) {
        self.resize.poke(now);
    }

    /// Earliest instant at which [`Viewer::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.animator.deadline(),
            self.resize.deadline(),
            self.loader_hide_at,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Runs whatever came due: the flip commit, the debounced resize, the loader.
    /// Returns whether anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if let Some(plan) = self.animator.due(now) {
            self.commit(plan);
            changed = true;
        }

        if self.resize.fire(now) {
            if self.animator.is_idle() {
                self.render_spread();
                self.refresh_controls();
                changed = true;
            } else {
                log::debug!("resize dropped: flip in progress");
            }
        }

        if let Some(at) = self.loader_hide_at
            && now >= at
        {
            self.loader_hide_at = None;
            self.stage.set_loading(false);
            changed = true;
        }

        changed
    }

    fn commit(&mut self, plan: FlipPlan) {
        self.spread = plan.to;
        let (landing, page) = plan.landing;
        self.render_into(landing, page);
        self.stage.finish_flip();
        self.animator.finish();
        self.refresh_controls();
        log::debug!(
            "flip {} committed: now at left page {}",
            plan.direction,
            self.spread.left()
        );
    }

    fn render_spread(&mut self) {
        let left = self.spread.left();
        self.render_into(SurfaceId::StaticLeft, left);
        self.render_into(SurfaceId::StaticRight, left + 1);
    }

    fn render_into(&mut self, id: SurfaceId, page: u32) {
        let (surface, layer) = self.stage.slot(id);
        let outcome = self.renderer.render(page, surface, layer);
        if outcome != RenderOutcome::Painted {
            log::debug!("{} page {page}: {outcome:?}", id.as_str());
        }
    }

    fn refresh_controls(&mut self) {
        let controls = self.controls();
        self.stage.show_controls(&controls);
    }
}
