//! Terminal front end: draws the spread, the turning sheet and the navigation bar.

use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use flipbook_application::{Controls, DocumentSource, GotoOutcome, OverlayContent, Viewer};
use flipbook_core::{Progress, SurfaceId};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, Gauge, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::Protocol as ImageProtocol;
use ratatui_image::{Image as ImageWidget, Resize};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

mod flip;
mod image_protocol;
mod stage;

pub use stage::{Pane, TuiLayer, TuiStage, TuiSurface};

const IDLE_TICK: Duration = Duration::from_millis(250);
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const IMAGE_CACHE_LIMIT: usize = 8;
const SIDEBAR_WIDTH: u16 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiExit {
    Quit,
}

pub struct Ui<D> {
    viewer: Viewer<D, TuiStage>,
    title: String,
    goto_panel: GotoPanel,
    toc_panel: TocPanel,
    image_picker: Picker,
    images: ImageCache,
}

impl<D: DocumentSource> Ui<D> {
    pub fn new(viewer: Viewer<D, TuiStage>, title: impl Into<String>) -> Self {
        Self {
            viewer,
            title: title.into(),
            goto_panel: GotoPanel::default(),
            toc_panel: TocPanel::default(),
            image_picker: Picker::halfblocks(),
            images: ImageCache::default(),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<UiExit> {
        let mut terminal = setup_terminal()?;
        self.image_picker = image_protocol::detect_picker();
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(exit)), Ok(())) => Ok(exit),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), Ok(())) => Err(err),
            (Ok(Err(err)), Err(restore_err)) => Err(err.context(format!(
                "additionally failed to restore terminal: {restore_err}"
            ))),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<UiExit> {
        self.viewer.start(Instant::now());
        let mut needs_redraw = true;

        loop {
            let now = Instant::now();
            if self.viewer.tick(now) {
                needs_redraw = true;
            }

            let animating = !self.viewer.animation_state().is_idle();
            if needs_redraw || animating {
                terminal.draw(|frame| self.draw(frame.area(), frame, now))?;
                needs_redraw = false;
            }

            let cap = if animating { FRAME_INTERVAL } else { IDLE_TICK };
            let timeout = poll_timeout(Instant::now(), self.viewer.next_deadline(), cap);
            if !event::poll(timeout)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    self.images.clear();
                    self.viewer.notify_resize(Instant::now());
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    if let Some(exit) = self.handle_key(key) {
                        return Ok(exit);
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(UiExit::Quit);
        }

        if self.viewer.stage_mut().dismiss_alert() {
            return None;
        }

        if self.goto_panel.open {
            self.handle_goto_panel_key(key);
            None
        } else if self.viewer.sidebar_open() {
            self.handle_sidebar_key(key)
        } else {
            self.handle_book_key(key)
        }
    }

    fn handle_book_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(UiExit::Quit),
            KeyCode::Right | KeyCode::PageDown | KeyCode::Char('l') | KeyCode::Char(' ') => {
                self.viewer.flip_next(Instant::now());
            }
            KeyCode::Left | KeyCode::PageUp | KeyCode::Char('h') => {
                self.viewer.flip_prev(Instant::now());
            }
            KeyCode::Home => self.jump("1"),
            KeyCode::End => {
                let last = self.viewer.total_pages().to_string();
                self.jump(&last);
            }
            KeyCode::Char('g') => {
                self.goto_panel.open = true;
                self.goto_panel.input.clear();
            }
            KeyCode::Char('t') => self.open_sidebar(),
            _ => {}
        }
        None
    }

    fn jump(&mut self, input: &str) {
        match self.viewer.go_to_page(input) {
            Ok(GotoOutcome::Jumped(_)) => {}
            Ok(GotoOutcome::Busy) => log::debug!("jump to {input} skipped: flip in progress"),
            Err(err) => log::debug!("jump to {input} rejected: {err}"),
        }
    }

    fn handle_goto_panel_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.goto_panel.open = false;
                self.goto_panel.input.clear();
            }
            KeyCode::Enter => match self.viewer.go_to_page(&self.goto_panel.input) {
                Ok(GotoOutcome::Jumped(_)) => {
                    self.goto_panel.open = false;
                    self.goto_panel.input.clear();
                }
                Ok(GotoOutcome::Busy) => {}
                // The stage raises the alert; keep the input so it can be fixed.
                Err(_) => {}
            },
            KeyCode::Backspace => {
                self.goto_panel.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.goto_panel.input.clear();
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                self.goto_panel.input.push(ch);
            }
            _ => {}
        }
    }

    fn open_sidebar(&mut self) {
        let left = self.viewer.spread().left();
        self.toc_panel.selected = self
            .viewer
            .toc()
            .iter()
            .rposition(|item| item.page <= left)
            .unwrap_or(0);
        self.viewer.toggle_sidebar();
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> Option<UiExit> {
        let len = self.viewer.toc().len();
        match key.code {
            KeyCode::Char('q') => return Some(UiExit::Quit),
            KeyCode::Esc | KeyCode::Char('t') => self.viewer.toggle_sidebar(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.toc_panel.selected = self.toc_panel.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if len > 0 {
                    self.toc_panel.selected = (self.toc_panel.selected + 1).min(len - 1);
                }
            }
            KeyCode::Enter => {
                if let Some(GotoOutcome::Busy) = self.viewer.select_toc_entry(self.toc_panel.selected)
                {
                    log::debug!("contents entry skipped: flip in progress");
                }
            }
            KeyCode::Right | KeyCode::PageDown => {
                self.viewer.flip_next(Instant::now());
            }
            KeyCode::Left | KeyCode::PageUp => {
                self.viewer.flip_prev(Instant::now());
            }
            _ => {}
        }
        None
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame, now: Instant) {
        frame.render_widget(Clear, area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                truncate_to_width(&self.title, area.width.saturating_sub(16) as usize),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  {}", image_protocol::protocol_label(&self.image_picker)),
                Style::default().fg(Color::DarkGray),
            ),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, layout[0]);

        let book_area = if self.viewer.stage().sidebar_open() {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
                .split(layout[1]);
            self.draw_sidebar(body[0], frame);
            body[1]
        } else {
            layout[1]
        };

        self.draw_book(book_area, frame, now);
        if let Some(controls) = self.viewer.stage().controls() {
            draw_controls(controls, layout[2], frame);
        }

        if self.goto_panel.open {
            self.draw_goto_panel(area, frame);
        }
        if self.viewer.stage().loading() {
            draw_loader(area, frame);
        }
        if let Some(message) = self.viewer.stage().alert() {
            draw_alert(message, area, frame);
        }
    }

    fn draw_book(&mut self, area: Rect, frame: &mut ratatui::Frame, now: Instant) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let stage = self.viewer.stage();
        for (id, half) in [
            (SurfaceId::StaticLeft, halves[0]),
            (SurfaceId::StaticRight, halves[1]),
        ] {
            draw_pane(
                id,
                stage.pane(id),
                half,
                frame,
                &mut self.images,
                &self.image_picker,
            );
        }

        if stage.flip().is_none() {
            return;
        }
        if let Some((direction, progress)) = self.viewer.flip_progress(now)
            && let Some((face, rect)) = flip::sheet(halves[0], halves[1], direction, progress)
        {
            frame.render_widget(Clear, rect);
            draw_pane(
                face,
                stage.pane(face),
                rect,
                frame,
                &mut self.images,
                &self.image_picker,
            );
        }
    }

    fn draw_sidebar(&self, area: Rect, frame: &mut ratatui::Frame) {
        let toc = self.viewer.stage().toc();
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!("Contents — {}", toc.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ));

        let current = self.viewer.spread().left();
        let max_width = area.width.saturating_sub(6) as usize;
        let items: Vec<ListItem> = toc
            .iter()
            .map(|item| {
                let style = if item.page == current {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::styled(truncate_to_width(&item.title, max_width), style))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        if !toc.is_empty() {
            state.select(Some(self.toc_panel.selected.min(toc.len() - 1)));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_goto_panel(&self, area: Rect, frame: &mut ratatui::Frame) {
        let popup_area = centered_rect(48, 28, area);
        frame.render_widget(Clear, popup_area);

        let title = format!("Go to page (1..={})", self.viewer.total_pages());
        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let lines = vec![
            Line::from(vec![
                Span::styled("Page: ", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(self.goto_panel.input.clone()),
            ]),
            Line::raw(""),
            Line::raw("Enter jumps, Esc cancels, Ctrl+u clears."),
        ];
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .wrap(Wrap { trim: true })
                .block(block),
            popup_area,
        );
    }
}

#[derive(Debug, Clone, Default)]
struct GotoPanel {
    open: bool,
    input: String,
}

#[derive(Debug, Clone, Default)]
struct TocPanel {
    selected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ImageKey {
    id: SurfaceId,
    generation: u64,
    width: u16,
    height: u16,
}

struct CachedProtocol {
    key: ImageKey,
    protocol: ImageProtocol,
}

/// Encoded terminal images, reused until the surface repaints or the cell area changes.
#[derive(Default)]
struct ImageCache {
    entries: VecDeque<CachedProtocol>,
}

impl ImageCache {
    fn clear(&mut self) {
        self.entries.clear();
    }

    fn protocol(
        &mut self,
        key: ImageKey,
        image: &image::DynamicImage,
        picker: &Picker,
    ) -> Option<&ImageProtocol> {
        if let Some(pos) = self.entries.iter().position(|entry| entry.key == key) {
            return self.entries.get(pos).map(|entry| &entry.protocol);
        }
        if key.width == 0 || key.height == 0 {
            return None;
        }

        let size = Rect::new(0, 0, key.width, key.height);
        let protocol = match picker.new_protocol(
            image.clone(),
            size,
            Resize::Fit(Some(image::imageops::FilterType::Triangle)),
        ) {
            Ok(protocol) => protocol,
            Err(err) => {
                log::warn!("{} image encode failed: {err:?}", key.id.as_str());
                return None;
            }
        };

        self.entries
            .retain(|entry| entry.key.id != key.id || entry.key.generation == key.generation);
        while self.entries.len() >= IMAGE_CACHE_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(CachedProtocol { key, protocol });
        self.entries.back().map(|entry| &entry.protocol)
    }
}

fn draw_pane(
    id: SurfaceId,
    pane: &Pane,
    area: Rect,
    frame: &mut ratatui::Frame,
    images: &mut ImageCache,
    picker: &Picker,
) {
    let title = pane
        .surface
        .label()
        .map(|page| format!(" p{page} "))
        .unwrap_or_default();
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if pane.surface.visible() {
        match pane.surface.image() {
            Some(image) => {
                let key = ImageKey {
                    id,
                    generation: pane.surface.generation(),
                    width: inner.width,
                    height: inner.height,
                };
                if let Some(protocol) = images.protocol(key, image, picker) {
                    let proto_area = protocol.area();
                    let draw_width = proto_area.width.min(inner.width);
                    let draw_height = proto_area.height.min(inner.height);
                    let draw_area = Rect::new(
                        inner.x + inner.width.saturating_sub(draw_width) / 2,
                        inner.y + inner.height.saturating_sub(draw_height) / 2,
                        draw_width,
                        draw_height,
                    );
                    frame.render_widget(ImageWidget::new(protocol), draw_area);
                }
            }
            None if pane.surface.label().is_some() => {
                frame.render_widget(
                    Paragraph::new("page unavailable")
                        .style(Style::default().fg(Color::DarkGray))
                        .alignment(Alignment::Center),
                    inner,
                );
            }
            None => {}
        }
    }

    if pane.layer.visible() {
        let overlay = overlay_area(inner, pane.layer.replacing());
        frame.render_widget(Clear, overlay);
        frame.render_widget(
            Paragraph::new(Text::from(overlay_lines(pane.layer.contents())))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Yellow)),
                ),
            overlay,
        );
    }
}

/// Replace mode takes the whole page; otherwise a strip along the bottom.
fn overlay_area(inner: Rect, replacing: bool) -> Rect {
    if replacing {
        return inner;
    }
    let height = (inner.height / 3).clamp(4, 6).min(inner.height);
    let width = inner.width.saturating_sub(2).max(inner.width.min(1));
    Rect::new(
        inner.x + inner.width.saturating_sub(width) / 2,
        inner.y + inner.height - height,
        width,
        height,
    )
}

fn overlay_lines(contents: &[OverlayContent]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for content in contents {
        match content {
            OverlayContent::Badge(badge) => lines.push(Line::from(Span::styled(
                format!(" {badge} "),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ))),
            OverlayContent::Placeholder { title, subtitle } => {
                lines.push(Line::from(Span::styled(
                    title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(Span::styled(
                    subtitle.clone(),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                )));
            }
            OverlayContent::Player { title, src } => {
                lines.push(Line::from(vec![
                    Span::styled("▶ ", Style::default().fg(Color::Yellow)),
                    Span::styled(title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                ]));
                lines.push(Line::from(Span::styled(
                    src.clone(),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }
    lines
}

fn draw_controls(controls: &Controls, area: Rect, frame: &mut ratatui::Frame) {
    let block = Block::default().borders(Borders::TOP);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(10),
            Constraint::Min(10),
            Constraint::Length(24),
            Constraint::Length(10),
        ])
        .split(inner);

    let hint_style = |enabled: bool| {
        if enabled && !controls.animating {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    frame.render_widget(
        Paragraph::new(Span::styled("← prev", hint_style(controls.prev_enabled))),
        cols[0],
    );
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Yellow))
            .ratio(gauge_ratio(&controls.progress))
            .label(format!("{:.0}%", controls.progress.percent().min(100.0))),
        cols[1],
    );
    frame.render_widget(
        Paragraph::new(controls.label.clone()).alignment(Alignment::Center),
        cols[2],
    );
    frame.render_widget(
        Paragraph::new(Span::styled("next →", hint_style(controls.next_enabled)))
            .alignment(Alignment::Right),
        cols[3],
    );
}

fn draw_loader(area: Rect, frame: &mut ratatui::Frame) {
    let popup_area = centered_rect(30, 20, area);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(
        Paragraph::new("Loading…")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL)),
        popup_area,
    );
}

fn draw_alert(message: &str, area: Rect, frame: &mut ratatui::Frame) {
    let popup_area = centered_rect(50, 25, area);
    frame.render_widget(Clear, popup_area);
    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::styled("press any key", Style::default().fg(Color::DarkGray)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Error")),
        popup_area,
    );
}

fn gauge_ratio(progress: &Progress) -> f64 {
    progress.fraction().clamp(0.0, 1.0)
}

/// How long `event::poll` may block before the next frame or viewer deadline.
fn poll_timeout(now: Instant, deadline: Option<Instant>, cap: Duration) -> Duration {
    match deadline {
        Some(at) => at.saturating_duration_since(now).min(cap),
        None => cap,
    }
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
