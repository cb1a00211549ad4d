//! Terminal preview of the drink menu and cup viewer

use brewviz_core::error::RemoteError;
use brewviz_core::{
    submit_order, Catalog, Effect, FrameDriver, OrderRequest, RemoteStore, SelectionMachine,
    StatusTone, SurfaceSize, Table, UiEvent, ViewState, ViewerConfig, ViewerSession,
};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod error;
pub mod renderer;

pub use error::TerminalError;
pub use renderer::AsciiRenderer;

/// Orbit drag per arrow key press, in cells
const DRAG_STEP: f32 = 4.0;
const ZOOM_STEP: f32 = 1.0;
const DEFAULT_VARIANT: &str = "regular";

/// Endpoint type for a host without a network client. Never constructed.
pub enum Offline {}

impl RemoteStore for Offline {
    async fn insert(&self, _table: Table, _row: serde_json::Value) -> Result<(), RemoteError> {
        match *self {}
    }
}

/// Terminal cells are roughly twice as tall as wide
fn surface_for(cols: u16, rows: u16) -> SurfaceSize {
    SurfaceSize::new(cols as u32, rows as u32 * 2)
}

/// Main application struct for the terminal viewer
pub struct TerminalApp {
    catalog: Catalog,
    session: ViewerSession,
    driver: FrameDriver,
    selection: SelectionMachine,
    renderer: AsciiRenderer,
    cursor: usize,
    drawer: Option<String>,
    started: Instant,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// Build the viewer and show `initial`, or the featured drink when `None`
    pub fn new(catalog: Catalog, config: ViewerConfig, initial: Option<&str>) -> Result<Self, TerminalError> {
        let (width, height) = terminal::size()?;
        Self::with_size(catalog, config, initial, width, height)
    }

    pub fn with_size(
        catalog: Catalog,
        config: ViewerConfig,
        initial: Option<&str>,
        width: u16,
        height: u16,
    ) -> Result<Self, TerminalError> {
        let first = match initial {
            Some(key) => catalog
                .get(key)
                .ok_or_else(|| TerminalError::UnknownDrink(key.to_string()))?,
            None => catalog.featured(&config.featured_key)?,
        }
        .key
        .clone();

        let session = ViewerSession::init(surface_for(width, height), config);
        let selection = SelectionMachine::new(&session.config);

        let mut app = Self {
            cursor: catalog.index_of(&first).unwrap_or(0),
            catalog,
            session,
            driver: FrameDriver::new(),
            selection,
            renderer: AsciiRenderer::new(width as usize, height as usize),
            drawer: None,
            started: Instant::now(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        };
        app.dispatch(UiEvent::HoverEnter(first));
        Ok(app)
    }

    pub fn session(&self) -> &ViewerSession {
        &self.session
    }

    pub fn selection(&self) -> &SelectionMachine {
        &self.selection
    }

    pub fn drawer(&self) -> Option<&str> {
        self.drawer.as_deref()
    }

    pub fn run(&mut self) -> Result<(), TerminalError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn main_loop(&mut self) -> Result<(), TerminalError> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                self.handle_input(event::read()?);
            }

            let effects = self.selection.poll(self.now_ms());
            self.apply(effects);

            let time = self.started.elapsed().as_secs_f64();
            self.driver.tick(&mut self.session, time, &mut self.renderer);
            self.draw()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn current_key(&self) -> Option<String> {
        self.catalog.at(self.cursor).map(|r| r.key.clone())
    }

    fn move_cursor(&mut self, step: isize) {
        let len = self.catalog.len() as isize;
        if len == 0 {
            return;
        }
        self.cursor = (self.cursor as isize + step).rem_euclid(len) as usize;
        if let Some(key) = self.current_key() {
            self.dispatch(UiEvent::HoverEnter(key));
        }
    }

    pub fn handle_input(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => self.handle_key(code),
            Event::Resize(width, height) => {
                self.session.resize(surface_for(width, height));
                self.renderer.resize(width as usize, height as usize);
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => {
                self.running = false;
            }
            KeyCode::Tab | KeyCode::Char('n') => self.move_cursor(1),
            KeyCode::BackTab | KeyCode::Char('p') => self.move_cursor(-1),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < self.catalog.len() {
                    self.cursor = index;
                    if let Some(key) = self.current_key() {
                        self.dispatch(UiEvent::HoverEnter(key));
                    }
                }
            }
            KeyCode::Char('l') => self.dispatch(UiEvent::HoverLeave),
            KeyCode::Enter => {
                if let Some(key) = self.current_key() {
                    self.dispatch(UiEvent::Click(key));
                }
            }
            KeyCode::Esc => self.dispatch(UiEvent::Close),
            KeyCode::Char('o') => {
                let ordered_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
                self.dispatch(UiEvent::Confirm {
                    variant: DEFAULT_VARIANT.to_string(),
                    ordered_at,
                });
            }
            KeyCode::Left | KeyCode::Char('a') => self.drag(-DRAG_STEP, 0.0),
            KeyCode::Right | KeyCode::Char('d') => self.drag(DRAG_STEP, 0.0),
            KeyCode::Up | KeyCode::Char('w') => self.drag(0.0, -DRAG_STEP),
            KeyCode::Down | KeyCode::Char('s') => self.drag(0.0, DRAG_STEP),
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom(-ZOOM_STEP),
            KeyCode::Char('-') => self.zoom(ZOOM_STEP),
            _ => {}
        }
    }

    fn drag(&mut self, dx: f32, dy: f32) {
        let height = self.renderer.height() as f32;
        if let Some(controls) = self.session.controls.as_mut() {
            controls.drag(dx, dy, height);
        }
    }

    fn zoom(&mut self, delta: f32) {
        if let Some(controls) = self.session.controls.as_mut() {
            controls.wheel(delta);
        }
    }

    pub fn dispatch(&mut self, event: UiEvent) {
        let effects = self.selection.handle(event, self.now_ms());
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ShowCup(key) => match self.catalog.get(&key) {
                    Some(record) => {
                        if let Err(e) = self.session.show_drink(record) {
                            log::warn!("cannot show `{key}`: {e}");
                        }
                    }
                    None => log::debug!("no drink `{key}` on the menu"),
                },
                Effect::HideViewer => self.session.hide_drink(),
                Effect::Highlight(Some(key)) => {
                    if let Some(index) = self.catalog.index_of(&key) {
                        self.cursor = index;
                    }
                }
                Effect::Highlight(None) => {}
                Effect::OpenDrawer(key) => self.drawer = Some(key),
                Effect::CloseDrawer => self.drawer = None,
                Effect::SubmitOrder(order) => self.submit(order),
            }
        }
    }

    /// The terminal has no endpoint configured, so orders take the
    /// degraded path and surface as an error indicator.
    fn submit(&mut self, order: OrderRequest) {
        let result = pollster::block_on(submit_order::<Offline>(None, &order));
        self.selection.submission_finished(&result, self.now_ms());
    }

    fn draw(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Brewviz | FPS: {:.1} | Tab/1-9=Browse Enter=Details O=Order L=Leave Arrows=Orbit +/-=Zoom Q=Quit",
                self.fps
            )),
            ResetColor
        )?;

        for (row, record) in self.catalog.iter().enumerate() {
            let marker = if row == self.cursor { '>' } else { ' ' };
            let color = if Some(record.key.as_str()) == self.selection.state().key() {
                Color::Yellow
            } else {
                Color::Grey
            };
            queue!(
                stdout,
                cursor::MoveTo(0, row as u16 + 2),
                SetForegroundColor(color),
                Print(format!("{marker} {} {}", row + 1, record.name)),
                ResetColor
            )?;
        }

        let bottom = self.renderer.height().saturating_sub(1) as u16;
        let mut lines = Vec::new();
        if let Some(record) = self.session.active_drink().and_then(|key| self.catalog.get(key)) {
            let recipe: Vec<String> = record
                .ingredients
                .iter()
                .map(|i| format!("{} {}", i.name, i.volume))
                .collect();
            lines.push((Color::White, format!("{} [{}]", record.name, record.category.label())));
            lines.push((Color::DarkGrey, recipe.join(" / ")));
        }
        if let Some(record) = self.drawer.as_deref().and_then(|key| self.catalog.get(key)) {
            lines.push((Color::Cyan, record.description.clone()));
        }
        if let Some(status) = self.selection.status() {
            let color = match status.tone {
                StatusTone::Pending => Color::Yellow,
                StatusTone::Success => Color::Green,
                StatusTone::Error => Color::Red,
            };
            lines.push((color, status.message.clone()));
        }

        let first_row = bottom.saturating_sub(lines.len().saturating_sub(1) as u16);
        for (offset, (color, text)) in lines.into_iter().enumerate() {
            queue!(
                stdout,
                cursor::MoveTo(0, first_row + offset as u16),
                terminal::Clear(ClearType::CurrentLine),
                SetForegroundColor(color),
                Print(text),
                ResetColor
            )?;
        }

        stdout.flush()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn view_state(&self) -> &ViewState {
        self.selection.state()
    }
}
