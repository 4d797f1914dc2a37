//! `spl tui`: interactive full-screen timeline.
//!
//! Mouse drives the same gestures the engine exposes: press a bar body to
//! drag it, press its first or last cell to resize, click a header to focus
//! that period. On quit, only the items a gesture changed are written back,
//! onto a fresh read of the board file, so edits made by other `spl` runs
//! while the timeline was open are kept.

use std::io::{self, Stdout, stdout};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use sprintline_core::board::{Board, BoardError};
use sprintline_core::coords::ZoomLevel;
use sprintline_core::engine::{BarTone, Direction, TimelineBar, TimelineEngine, TimelineView};
use sprintline_core::interaction::{Edge, Gesture, PointerTarget};
use tracing::{debug, info};

use super::Session;

/// Horizontal pixels one terminal cell stands for.
pub const PX_PER_CELL: f64 = 10.0;

/// Width of the item title column.
const LABEL_COLS: u16 = 24;

/// Cells moved per arrow key press.
const SCROLL_STEP_CELLS: f64 = 8.0;

const TICK: Duration = Duration::from_millis(100);

/// Arguments for `spl tui`.
#[derive(Args, Debug)]
pub struct TuiArgs {
    /// Initial zoom level. Defaults to the configured zoom.
    #[arg(long)]
    pub zoom: Option<ZoomLevel>,

    /// Date treated as today (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,
}

/// Screen regions, recomputed on every draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Areas {
    labels: Rect,
    /// Header strip row plus one row per bar.
    body: Rect,
    status: Rect,
}

fn layout(area: Rect) -> (Rect, Areas) {
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let [content, status] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
    let [labels, body] =
        Layout::horizontal([Constraint::Length(LABEL_COLS), Constraint::Min(1)]).areas(content);
    (inner, Areas { labels, body, status })
}

/// Which part of a bar the terminal cell `col` (relative to the body) hits.
///
/// Pixel handles are narrower than a cell, so the first and last cell of a
/// bar act as handles instead. Bars shorter than three cells are all body.
fn classify_cell(bar: &TimelineBar, scroll_x: f64, col: u16) -> Option<PointerTarget> {
    let (first, last) = bar_cells(bar, scroll_x);
    let col = f64::from(col);
    if col < first || col > last {
        return None;
    }
    if last - first < 2.0 {
        return Some(PointerTarget::Body);
    }
    if (col - first).abs() < f64::EPSILON {
        Some(PointerTarget::Handle(Edge::Start))
    } else if (col - last).abs() < f64::EPSILON {
        Some(PointerTarget::Handle(Edge::End))
    } else {
        Some(PointerTarget::Body)
    }
}

/// First and last body column a bar occupies; may fall outside the screen.
fn bar_cells(bar: &TimelineBar, scroll_x: f64) -> (f64, f64) {
    let first = ((bar.x - scroll_x) / PX_PER_CELL).floor();
    let last = ((bar.x + bar.width - scroll_x) / PX_PER_CELL).ceil() - 1.0;
    (first, last.max(first))
}

fn cell_to_x(scroll_x: f64, col: u16) -> f64 {
    f64::from(col).mul_add(PX_PER_CELL, scroll_x)
}

fn tone_color(tone: BarTone) -> Color {
    match tone {
        BarTone::Blocked => Color::Red,
        BarTone::AtRisk => Color::Yellow,
        BarTone::Done => Color::Green,
        BarTone::Active => Color::Blue,
        BarTone::Neutral => Color::Gray,
    }
}

/// Header strip and bars for the visible slice of a [`TimelineView`].
struct TimelineWidget<'a> {
    view: &'a TimelineView,
    scroll_x: f64,
    scroll_row: usize,
}

impl TimelineWidget<'_> {
    #[allow(clippy::cast_sign_loss)]
    fn render_headers(&self, area: Rect, buf: &mut Buffer) {
        let mut left = 0.0;
        for segment in &self.view.headers {
            let right = left + segment.width;
            let first = ((left - self.scroll_x) / PX_PER_CELL).floor();
            let last = ((right - self.scroll_x) / PX_PER_CELL).ceil();
            left = right;
            if last <= 0.0 || first >= f64::from(area.width) {
                continue;
            }

            let mut style = Style::default().fg(Color::DarkGray);
            if segment.is_weekend {
                style = style.fg(Color::Rgb(90, 90, 110));
            }
            if segment.is_current {
                style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
            }
            if segment.is_focused {
                style = style.add_modifier(Modifier::REVERSED);
            }

            let start = first.max(0.0) as u16;
            let span = (last as u16).min(area.width).saturating_sub(start);
            for col in start..start + span {
                if let Some(cell) = buf.cell_mut((area.x + col, area.y)) {
                    cell.set_char(if col == start { '▏' } else { ' ' }).set_style(style);
                }
            }
            if span > 1 {
                buf.set_stringn(
                    area.x + start + 1,
                    area.y,
                    segment.title(),
                    usize::from(span - 1),
                    style,
                );
            }
        }
    }

    fn render_bar(&self, bar: &TimelineBar, area: Rect, y: u16, buf: &mut Buffer) {
        let (first, last) = bar_cells(bar, self.scroll_x);
        let mut style = Style::default().fg(tone_color(bar.tone));
        if bar.is_selected {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        if bar.is_active {
            style = style.add_modifier(Modifier::REVERSED);
        }

        for col in 0..area.width {
            let c = f64::from(col);
            if c < first || c > last {
                continue;
            }
            let is_edge = (c - first).abs() < f64::EPSILON || (c - last).abs() < f64::EPSILON;
            let glyph = if last - first >= 2.0 && is_edge {
                '▌'
            } else {
                '█'
            };
            if let Some(cell) = buf.cell_mut((area.x + col, y)) {
                cell.set_char(glyph).set_style(style);
            }
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn render_marker(x: f64, scroll_x: f64, glyph: char, style: Style, area: Rect, buf: &mut Buffer) {
        let col = ((x - scroll_x) / PX_PER_CELL).floor();
        if col < 0.0 || col >= f64::from(area.width) {
            return;
        }
        let col = area.x + col as u16;
        for y in area.y + 1..area.bottom() {
            if let Some(cell) = buf.cell_mut((col, y))
                && cell.symbol() == " "
            {
                cell.set_char(glyph).set_style(style);
            }
        }
    }
}

impl Widget for TimelineWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        self.render_headers(area, buf);

        let rows = usize::from(area.height.saturating_sub(1));
        for (offset, bar) in self.view.bars.iter().skip(self.scroll_row).take(rows).enumerate() {
            let y = area.y + 1 + offset as u16;
            self.render_bar(bar, area, y, buf);
        }

        Self::render_marker(
            self.view.today_x,
            self.scroll_x,
            '┆',
            Style::default().fg(Color::Yellow),
            area,
            buf,
        );
        if let Some(preview) = self.view.preview_x {
            Self::render_marker(
                preview,
                self.scroll_x,
                '│',
                Style::default().fg(Color::Magenta),
                area,
                buf,
            );
        }
    }
}

/// Interactive timeline state. The board is the engine's host.
struct TimelineApp {
    board: Board,
    saved: Board,
    engine: TimelineEngine,
    view: TimelineView,
    areas: Areas,
    scroll_x: f64,
    scroll_row: usize,
    should_quit: bool,
}

impl TimelineApp {
    fn new(board: Board, mut engine: TimelineEngine) -> Self {
        let view = engine.recompute(&board.items);
        Self {
            saved: board.clone(),
            board,
            engine,
            view,
            areas: Areas::default(),
            scroll_x: 0.0,
            scroll_row: 0,
            should_quit: false,
        }
    }

    fn is_dirty(&self) -> bool {
        self.board != self.saved
    }

    /// Merge this session's edits into the board file and adopt the result
    /// as the new baseline.
    fn write_back(&mut self, path: &Path) -> Result<(), BoardError> {
        let changed = self.board.changed_since(&self.saved).count();
        let written = self.board.save_changes(&self.saved, path)?;
        info!(changed, items = written.items.len(), "timeline edits written back");
        self.saved = written.clone();
        self.board = written;
        self.refresh();
        Ok(())
    }

    fn refresh(&mut self) {
        self.view = self.engine.recompute(&self.board.items);
    }

    /// Recompute and scroll so today sits in the middle of the body.
    fn refresh_centered(&mut self) {
        self.refresh();
        let half = f64::from(self.areas.body.width) * PX_PER_CELL / 2.0;
        self.scroll_x = (self.view.today_x - half).max(0.0);
    }

    fn set_areas(&mut self, areas: Areas) {
        let first = self.areas.body.width == 0;
        self.areas = areas;
        if first {
            self.refresh_centered();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('+' | '=') => {
                self.engine.zoom_in();
                self.refresh_centered();
            }
            KeyCode::Char('-') => {
                self.engine.zoom_out();
                self.refresh_centered();
            }
            KeyCode::Char('h') => {
                self.engine.navigate(&self.board.items, Direction::Back);
                self.refresh();
                self.scroll_x = 0.0;
            }
            KeyCode::Char('l') => {
                self.engine.navigate(&self.board.items, Direction::Forward);
                self.refresh();
                self.scroll_x = 0.0;
            }
            KeyCode::Char('t') => {
                self.engine.reset();
                self.refresh_centered();
            }
            KeyCode::Char('c') => {
                self.engine.clear_focus();
                self.refresh();
            }
            KeyCode::Esc => {
                self.engine.clear_selection();
                self.refresh();
            }
            KeyCode::Left => {
                self.scroll_x = SCROLL_STEP_CELLS.mul_add(-PX_PER_CELL, self.scroll_x).max(0.0);
            }
            KeyCode::Right => {
                let max = (self.view.total_width
                    - f64::from(self.areas.body.width) * PX_PER_CELL)
                    .max(0.0);
                self.scroll_x = SCROLL_STEP_CELLS.mul_add(PX_PER_CELL, self.scroll_x).min(max);
            }
            KeyCode::Up => self.scroll_row = self.scroll_row.saturating_sub(1),
            KeyCode::Down => {
                if self.scroll_row + 1 < self.view.bars.len() {
                    self.scroll_row += 1;
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let body = self.areas.body;
        let inside = body.contains(Position::new(mouse.column, mouse.row));
        let col = mouse.column.saturating_sub(body.x);
        let x = cell_to_x(self.scroll_x, col);

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if inside => {
                let toggle = mouse
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::SHIFT);
                if mouse.row == body.y {
                    self.press_header(x);
                } else {
                    let row = self.scroll_row + usize::from(mouse.row - body.y - 1);
                    self.press_bar(row, col, x, toggle);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if inside {
                    let items = self.board.items.clone();
                    self.engine.pointer_move(&items, x, &mut self.board);
                } else if self.engine.is_busy() {
                    self.leave_body(mouse.column, x);
                }
                self.refresh();
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let items = self.board.items.clone();
                self.engine.pointer_up(&items, &mut self.board);
                self.refresh();
            }
            MouseEventKind::ScrollUp => self.scroll_row = self.scroll_row.saturating_sub(1),
            MouseEventKind::ScrollDown => {
                if self.scroll_row + 1 < self.view.bars.len() {
                    self.scroll_row += 1;
                }
            }
            _ => {}
        }
    }

    fn press_header(&mut self, x: f64) {
        if let Some(segment) = self.view.header_at(x).cloned() {
            debug!(anchor = %segment.anchor, "header pressed");
            self.engine.focus_segment(&segment);
            self.refresh();
            self.scroll_x = 0.0;
        }
    }

    fn press_bar(&mut self, row: usize, col: u16, x: f64, toggle: bool) {
        let hit = self
            .view
            .bars
            .iter()
            .find(|bar| bar.row == row)
            .and_then(|bar| classify_cell(bar, self.scroll_x, col).map(|t| (bar.item_id.clone(), t)));
        let Some((id, target)) = hit else {
            return;
        };
        let items = self.board.items.clone();
        self.engine
            .pointer_down(&items, &id, target, x, toggle, &mut self.board);
        self.refresh();
    }

    /// Pointer left the body mid-gesture. Drags end here; a resize keeps
    /// tracking against the nearest body edge.
    fn leave_body(&mut self, column: u16, x: f64) {
        let body = self.areas.body;
        if matches!(self.engine.controller().gesture(), Gesture::Dragging(_)) {
            self.engine.pointer_leave(&mut self.board);
            return;
        }
        let x = if column < body.x {
            self.scroll_x
        } else if column >= body.right() {
            cell_to_x(self.scroll_x, body.width.saturating_sub(1))
        } else {
            x
        };
        let items = self.board.items.clone();
        self.engine.pointer_move(&items, x, &mut self.board);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::FocusLost => {
                self.engine.capture_lost(&mut self.board);
                self.refresh();
            }
            _ => {}
        }
    }

    fn status_line(&self) -> Line<'static> {
        let window = self.view.window;
        let mut spans = vec![
            Span::styled(
                format!(" {} .. {} ", window.start(), window.end()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("zoom {} ", self.view.zoom)),
            Span::raw(format!("sel {} ", self.engine.selection().len())),
        ];
        if let Some(focused) = self.engine.focused() {
            spans.push(Span::raw(format!("focus {focused} ")));
        }
        if self.is_dirty() {
            spans.push(Span::styled("modified ", Style::default().fg(Color::Yellow)));
        }
        spans.push(Span::styled(
            "+/- zoom  h/l move  t today  c unfocus  esc deselect  q quit",
            Style::default().fg(Color::DarkGray),
        ));
        Line::from(spans)
    }

    fn render(&mut self, frame: &mut ratatui::Frame<'_>) {
        let area = frame.area();
        let (_, areas) = layout(area);
        self.set_areas(areas);

        frame.render_widget(
            Block::default().borders(Borders::ALL).title(" sprintline "),
            area,
        );

        let label_rows = usize::from(areas.labels.height.saturating_sub(1));
        let labels: Vec<Line<'_>> = std::iter::once(Line::raw(""))
            .chain(
                self.view
                    .bars
                    .iter()
                    .skip(self.scroll_row)
                    .take(label_rows)
                    .map(|bar| {
                        let style = if bar.is_selected {
                            Style::default().add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        };
                        Line::styled(bar.title.clone(), style)
                    }),
            )
            .collect();
        frame.render_widget(Paragraph::new(labels), areas.labels);

        frame.render_widget(
            TimelineWidget {
                view: &self.view,
                scroll_x: self.scroll_x,
                scroll_row: self.scroll_row,
            },
            areas.body,
        );
        frame.render_widget(Paragraph::new(self.status_line()), areas.status);
    }
}

/// Execute `spl tui`.
pub fn run_tui(args: &TuiArgs, session: &Session) -> Result<()> {
    let board = session.load_board()?;
    let mut engine = session.engine(args.today);
    if let Some(zoom) = args.zoom {
        engine.set_zoom(zoom);
    }
    let mut app = TimelineApp::new(board, engine);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)
        .context("failed to enter alternate screen")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(out)).context("failed to create terminal")?;

    let result = event_loop(&mut terminal, &mut app);

    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    result?;

    if app.is_dirty() {
        app.write_back(&session.board_path).map_err(|err| session.report_board(&err))?;
    }
    Ok(())
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut TimelineApp) -> io::Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| app.render(frame))?;
        if event::poll(TICK)? {
            app.handle_event(event::read()?);
        }
    }
    // A release never arrives once we stop reading.
    app.engine.capture_lost(&mut app.board);
    Ok(())
}
