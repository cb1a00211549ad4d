//! Brewviz Web - WASM host for the menu cup viewer
//!
//! Wraps one [`ViewerSession`] behind a JavaScript-facing handle. The page
//! forwards DOM events (hover, click, close, order) and the browser drives
//! frames through `requestAnimationFrame`; drawing goes to a Canvas2D context.

use std::cell::RefCell;
use std::rc::Rc;

use brewviz_core::{
    submit_feedback, submit_order, Catalog, Effect, FrameDriver, SelectionMachine, StatusTone,
    SurfaceSize, UiEvent, ViewState, ViewerConfig, ViewerSession,
};
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

pub mod canvas;
pub mod store;

pub use canvas::CanvasRenderer;
pub use store::RestStore;

struct ViewerState {
    catalog: Catalog,
    session: ViewerSession,
    driver: FrameDriver,
    selection: SelectionMachine,
    renderer: CanvasRenderer,
    drawer: Option<String>,
    highlighted: Option<String>,
}

impl ViewerState {
    fn dispatch(&mut self, event: UiEvent, now: f64) -> Vec<Effect> {
        let effects = self.selection.handle(event, now);
        self.apply(effects)
    }

    /// Carry out scene effects; order submissions are handed back
    fn apply(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut pending = Vec::new();
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
                Effect::Highlight(key) => self.highlighted = key,
                Effect::OpenDrawer(key) => self.drawer = Some(key),
                Effect::CloseDrawer => self.drawer = None,
                submit @ Effect::SubmitOrder(_) => pending.push(submit),
            }
        }
        pending
    }
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

fn canvas_by_id(id: &str) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element `{id}`")))?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("`{id}` is not a canvas")))?;
    let context = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    Ok((canvas, context))
}

/// Poll timers, then update and draw one frame
fn advance(state: &RefCell<ViewerState>, now_ms: f64) {
    let mut state = state.borrow_mut();
    let effects = state.selection.poll(now_ms);
    // Timers never submit orders
    let _ = state.apply(effects);

    let ViewerState {
        session,
        driver,
        renderer,
        ..
    } = &mut *state;
    driver.tick(session, now_ms / 1000.0, renderer);
}

/// Bookkeeping that keeps the rAF loop to a single chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FrameSchedule {
    running: bool,
    pending: Option<i32>,
}

impl FrameSchedule {
    /// Returns true when a frame has to be queued
    fn start(&mut self) -> bool {
        let was_running = std::mem::replace(&mut self.running, true);
        !was_running && self.pending.is_none()
    }

    /// Returns the queued frame, which the caller cancels
    fn stop(&mut self) -> Option<i32> {
        self.running = false;
        self.pending.take()
    }

    fn queued(&mut self, id: i32) {
        self.pending = Some(id);
    }

    /// A queued frame fired; returns true when it should draw and requeue
    fn fired(&mut self) -> bool {
        self.pending = None;
        self.running
    }
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct WebViewer {
    state: Rc<RefCell<ViewerState>>,
    store: Option<Rc<RestStore>>,
    frame_loop: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    schedule: Rc<RefCell<FrameSchedule>>,
}

#[wasm_bindgen]
impl WebViewer {
    /// Attach to `<canvas id=canvas_id>`. `config_json` is a partial
    /// viewer config; missing fields keep their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, config_json: Option<String>) -> Result<WebViewer, JsValue> {
        let config = match config_json {
            Some(json) => ViewerConfig::from_json(&json).map_err(to_js)?,
            None => ViewerConfig::default(),
        };
        let catalog = Catalog::embedded().map_err(to_js)?;
        let featured = catalog.featured(&config.featured_key).map_err(to_js)?.key.clone();

        let (canvas, context) = canvas_by_id(canvas_id)?;
        let pixel_ratio = web_sys::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0) as f32;
        let surface = SurfaceSize::new(canvas.client_width().max(0) as u32, canvas.client_height().max(0) as u32)
            .with_pixel_ratio(pixel_ratio);

        let session = ViewerSession::init(surface, config);
        let renderer = CanvasRenderer::new(canvas, context);
        let effective = surface.effective();
        renderer.resize(effective.width, effective.height, effective.pixel_ratio);

        let mut state = ViewerState {
            selection: SelectionMachine::new(&session.config),
            catalog,
            session,
            driver: FrameDriver::new(),
            renderer,
            drawer: None,
            highlighted: None,
        };
        state.dispatch(UiEvent::HoverEnter(featured), now_ms());

        Ok(WebViewer {
            state: Rc::new(RefCell::new(state)),
            store: None,
            frame_loop: Rc::new(RefCell::new(None)),
            schedule: Rc::new(RefCell::new(FrameSchedule::default())),
        })
    }

    /// Orders and feedback fail with an "unavailable" message until this is called
    pub fn connect_store(&mut self, url: &str, api_key: &str) {
        self.store = Some(Rc::new(RestStore::new(url, api_key)));
        log::info!("remote store connected");
    }

    pub fn hover_enter(&self, key: String) {
        self.dispatch(UiEvent::HoverEnter(key));
    }

    pub fn hover_leave(&self) {
        self.dispatch(UiEvent::HoverLeave);
    }

    pub fn viewer_enter(&self) {
        self.dispatch(UiEvent::ViewerEnter);
    }

    pub fn viewer_leave(&self) {
        self.dispatch(UiEvent::ViewerLeave);
    }

    pub fn click(&self, key: String) {
        self.dispatch(UiEvent::Click(key));
    }

    pub fn close(&self) {
        self.dispatch(UiEvent::Close);
    }

    /// Order the drink in the open drawer. The promise resolves once the
    /// status indicator reflects the outcome.
    pub fn confirm(&self, variant: String) -> js_sys::Promise {
        let ordered_at = String::from(js_sys::Date::new_0().to_iso_string());
        let pending = self
            .state
            .borrow_mut()
            .dispatch(UiEvent::Confirm { variant, ordered_at }, now_ms());

        let state = Rc::clone(&self.state);
        let store = self.store.clone();
        future_to_promise(async move {
            for effect in pending {
                if let Effect::SubmitOrder(order) = effect {
                    let result = submit_order(store.as_deref(), &order).await;
                    state.borrow_mut().selection.submission_finished(&result, now_ms());
                }
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Rate a drink 1..=5. Rejects with a readable message on failure.
    pub fn submit_feedback(&self, drink_id: String, rating: Option<i32>) -> js_sys::Promise {
        let store = self.store.clone();
        future_to_promise(async move {
            submit_feedback(store.as_deref(), &drink_id, rating.map(i64::from))
                .await
                .map(|_| JsValue::from_str("Thanks for the feedback!"))
                .map_err(|e| JsValue::from_str(&e.user_message()))
        })
    }

    /// Advance timers and draw one frame. `now_ms` is the rAF timestamp.
    pub fn tick(&self, now_ms: f64) {
        advance(&self.state, now_ms);
    }

    /// Drive frames from `requestAnimationFrame` until [`WebViewer::stop`].
    /// At most one frame is queued at a time.
    pub fn start(&self) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        if !self.schedule.borrow_mut().start() {
            return Ok(());
        }

        if self.frame_loop.borrow().is_none() {
            let state = Rc::clone(&self.state);
            let schedule = Rc::clone(&self.schedule);
            let frame_loop = Rc::clone(&self.frame_loop);
            let next_window = window.clone();

            *self.frame_loop.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
                if !schedule.borrow_mut().fired() {
                    return;
                }
                advance(&state, timestamp);
                if let Some(callback) = frame_loop.borrow().as_ref() {
                    match next_window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                        Ok(id) => schedule.borrow_mut().queued(id),
                        Err(_) => {
                            log::warn!("requestAnimationFrame failed, viewer stopped");
                            schedule.borrow_mut().stop();
                        }
                    }
                }
            }) as Box<dyn FnMut(f64)>));
        }

        if let Some(callback) = self.frame_loop.borrow().as_ref() {
            match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                Ok(id) => self.schedule.borrow_mut().queued(id),
                Err(e) => {
                    self.schedule.borrow_mut().stop();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Stop the frame loop and cancel the queued frame
    pub fn stop(&self) {
        let Some(id) = self.schedule.borrow_mut().stop() else {
            return;
        };
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.cancel_animation_frame(id) {
                log::debug!("cancelAnimationFrame failed: {e:?}");
            }
        }
    }

    pub fn resize(&self, width: u32, height: u32, pixel_ratio: f32) {
        let mut state = self.state.borrow_mut();
        let surface = SurfaceSize::new(width, height).with_pixel_ratio(pixel_ratio);
        state.session.resize(surface);
        let effective = surface.effective();
        state.renderer.resize(effective.width, effective.height, effective.pixel_ratio);
    }

    pub fn drag(&self, dx: f32, dy: f32) {
        let mut state = self.state.borrow_mut();
        let height = state.session.settings.height as f32;
        if let Some(controls) = state.session.controls.as_mut() {
            controls.drag(dx, dy, height);
        }
    }

    pub fn wheel(&self, delta: f32) {
        if let Some(controls) = self.state.borrow_mut().session.controls.as_mut() {
            controls.wheel(delta);
        }
    }

    /// Menu keys in display order, as JSON
    pub fn menu(&self) -> String {
        let state = self.state.borrow();
        let items: Vec<_> = state
            .catalog
            .iter()
            .map(|r| {
                json!({
                    "key": r.key,
                    "name": r.name,
                    "description": r.description,
                    "category": r.category.label(),
                })
            })
            .collect();
        serde_json::Value::Array(items).to_string()
    }

    /// Current selection, drawer and status indicator, as JSON
    pub fn ui_state(&self) -> String {
        let state = self.state.borrow();
        let view = match state.selection.state() {
            ViewState::Idle => "idle",
            ViewState::Selected(_) => "selected",
            ViewState::DrawerOpen(_) => "drawer_open",
        };
        let status = state.selection.status().map(|s| {
            json!({
                "message": s.message,
                "tone": match s.tone {
                    StatusTone::Pending => "pending",
                    StatusTone::Success => "success",
                    StatusTone::Error => "error",
                },
            })
        });
        json!({
            "view": view,
            "key": state.selection.state().key(),
            "shown": state.session.active_drink(),
            "highlighted": state.highlighted,
            "drawer": state.drawer,
            "status": status,
        })
        .to_string()
    }
}

impl WebViewer {
    fn dispatch(&self, event: UiEvent) {
        // Only `Confirm` yields orders, and it goes through `confirm`
        let _ = self.state.borrow_mut().dispatch(event, now_ms());
    }
}


#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).map_err(to_js)?;
    Ok(())
}
