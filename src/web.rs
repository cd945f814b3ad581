//! Browser binding
//!
//! Mounts the engine on a canvas, wires DOM input to it and drives it from
//! `requestAnimationFrame`. The page talks to it through [`TileFieldHandle`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use web_sys::{AddEventListenerOptions, Element, EventTarget, HtmlCanvasElement, PointerEvent, WheelEvent};

use crate::engine::{Engine, EngineEvent, ImpactSource};
use crate::error::FieldError;
use crate::renderer::{RasterSurface, RenderState};
use crate::settings::{QualityPreset, Settings};

/// Pointer-downs on these never strike the field
const CONTROL_SELECTOR: &str = "button, input, textarea, select, [role=\"button\"], .no-brick";

type Listener = Closure<dyn FnMut(web_sys::Event)>;

struct App {
    engine: Engine,
    surface: Option<RenderState>,
    canvas: HtmlCanvasElement,
    dpr_cap: f32,
    focus_requests: VecDeque<usize>,
    listeners: Vec<(EventTarget, &'static str, Listener)>,
    destroyed: bool,
}

impl App {
    /// Physical backing size for a CSS size, honoring the DPR cap
    fn backing_size(&self, css_w: f32, css_h: f32) -> (u32, u32) {
        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio() as f32)
            .unwrap_or(1.0)
            .min(self.dpr_cap)
            .max(1.0);
        ((css_w * dpr) as u32, (css_h * dpr) as u32)
    }

    fn resize(&mut self, css_w: f32, css_h: f32, now: f64) {
        let (w, h) = self.backing_size(css_w, css_h);
        self.canvas.set_width(w);
        self.canvas.set_height(h);
        self.engine.resize(css_w, css_h, now);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(w, h);
        }
    }

    fn frame(&mut self, time: f64) -> bool {
        if self.destroyed {
            return false;
        }
        let out = self.engine.tick(time);

        for event in self.engine.drain_events() {
            match event {
                EngineEvent::FocusFirstControl { section } => self.focus_requests.push_back(section),
                EngineEvent::FocusChanged { section } => log::debug!("Focused section {}", section),
                EngineEvent::BurstAbandoned { attempts } => {
                    log::warn!("Impact burst abandoned after {} attempts", attempts)
                }
                EngineEvent::Settled { .. } | EngineEvent::BurstFired { .. } => {}
            }
        }

        if let (Some(list), Some(surface)) = (out.draw, self.surface.as_mut()) {
            match surface.present(&list) {
                Ok(()) => {}
                Err(FieldError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {}", e),
            }
        }

        out.running
    }
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

fn viewport_size() -> (f32, f32) {
    let Some(window) = web_sys::window() else {
        return (0.0, 0.0);
    };
    let dim = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
    (dim(window.inner_width()), dim(window.inner_height()))
}

/// Handle returned to the page
#[wasm_bindgen]
pub struct TileFieldHandle {
    app: Rc<RefCell<App>>,
}

#[wasm_bindgen]
impl TileFieldHandle {
    /// Mount on the canvas with id `canvas_id`, paging over `section_count` sections
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, section_count: usize) -> Result<TileFieldHandle, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str("no canvas"))?
            .dyn_into()?;

        // The field sits behind the page and must never swallow input
        let style = canvas.style();
        style.set_property("pointer-events", "none")?;

        let settings = Settings::load();
        let dpr_cap = settings.quality.dpr_cap();
        let (css_w, css_h) = viewport_size();
        let now = now_ms();
        let seed = js_sys::Date::now() as u64;
        let engine = Engine::new(settings, seed, css_w, css_h, section_count, now);

        let app = Rc::new(RefCell::new(App {
            engine,
            surface: None,
            canvas: canvas.clone(),
            dpr_cap,
            focus_requests: VecDeque::new(),
            listeners: Vec::new(),
            destroyed: false,
        }));
        {
            let mut a = app.borrow_mut();
            let (w, h) = a.backing_size(css_w, css_h);
            a.canvas.set_width(w);
            a.canvas.set_height(h);
        }

        setup_input_handlers(&window, app.clone())?;

        let gpu_app = app.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match init_surface(canvas, &gpu_app).await {
                Ok(surface) => {
                    let mut a = gpu_app.borrow_mut();
                    if !a.destroyed {
                        a.surface = Some(surface);
                        a.engine.attach_surface();
                    }
                }
                Err(e) => log::error!("Tile field disabled, static background only: {}", e),
            }
        });

        request_animation_frame(app.clone());

        Ok(TileFieldHandle { app })
    }

    /// Page to `index`; `burst` adds a few impacts near the center
    pub fn request_page(&self, index: i32, burst: bool) {
        self.app
            .borrow_mut()
            .engine
            .request_page(index as i64, burst, now_ms());
    }

    /// Page by `direction` relative to the current target
    pub fn next_page(&self, direction: i32, burst: bool) {
        self.app
            .borrow_mut()
            .engine
            .step_page(direction as i64, burst, now_ms());
    }

    pub fn current_section(&self) -> u32 {
        self.app.borrow().engine.current_section() as u32
    }

    pub fn focused_section(&self) -> u32 {
        self.app.borrow().engine.focused_section() as u32
    }

    /// Per-section transforms as a JSON array
    pub fn section_transforms(&self) -> Result<String, JsValue> {
        let transforms = self.app.borrow().engine.section_transforms();
        serde_json::to_string(&transforms).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Next section whose first control should take keyboard focus
    pub fn poll_focus_request(&self) -> Option<u32> {
        self.app
            .borrow_mut()
            .focus_requests
            .pop_front()
            .map(|s| s as u32)
    }

    /// Switch to the quality preset named `preset` and remember it
    pub fn set_quality(&self, preset: &str) -> Result<(), JsValue> {
        let preset = QualityPreset::from_str(preset)
            .ok_or_else(|| JsValue::from_str(&format!("unknown quality preset: {}", preset)))?;
        let mut a = self.app.borrow_mut();
        a.dpr_cap = preset.dpr_cap();
        a.engine.set_quality(preset, now_ms());
        let (css_w, css_h) = viewport_size();
        a.resize(css_w, css_h, now_ms());
        Ok(())
    }

    pub fn celebrate(&self) {
        self.app.borrow_mut().engine.celebrate();
    }

    /// Stop the frame loop and remove every listener
    pub fn destroy(&self) {
        let listeners = {
            let mut a = self.app.borrow_mut();
            if a.destroyed {
                return;
            }
            a.destroyed = true;
            a.engine.teardown();
            a.surface = None;
            std::mem::take(&mut a.listeners)
        };
        for (target, kind, closure) in listeners {
            let _ = target.remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
        }
        log::info!("Tile field destroyed");
    }
}

async fn init_surface(canvas: HtmlCanvasElement, app: &Rc<RefCell<App>>) -> Result<RenderState, FieldError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
        ..Default::default()
    });

    let (width, height) = (canvas.width(), canvas.height());
    let surface = instance
        .create_surface(wgpu::SurfaceTarget::Canvas(canvas))
        .map_err(|e| FieldError::ContextUnavailable(e.to_string()))?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| FieldError::ContextUnavailable(e.to_string()))?;

    log::info!("Using adapter: {:?}", adapter.get_info().name);

    let mut state = RenderState::new(surface, &adapter, width, height).await?;

    // The viewport may have changed while the device was being created
    let (w, h) = {
        let a = app.borrow();
        (a.canvas.width(), a.canvas.height())
    };
    if (w, h) != (width, height) {
        state.resize(w, h);
    }
    Ok(state)
}

fn listen(
    app: &Rc<RefCell<App>>,
    target: &EventTarget,
    kind: &'static str,
    options: Option<&AddEventListenerOptions>,
    handler: impl FnMut(web_sys::Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Listener::new(handler);
    match options {
        Some(options) => target.add_event_listener_with_callback_and_add_event_listener_options(
            kind,
            closure.as_ref().unchecked_ref(),
            options,
        )?,
        None => target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?,
    }
    app.borrow_mut().listeners.push((target.clone(), kind, closure));
    Ok(())
}

fn setup_input_handlers(window: &web_sys::Window, app: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let target: &EventTarget = window.as_ref();

    // Pointer move feeds the influence field
    {
        let app_ref = app.clone();
        listen(&app, target, "pointermove", None, move |event| {
            if let Some(event) = event.dyn_ref::<PointerEvent>() {
                app_ref
                    .borrow_mut()
                    .engine
                    .pointer_move(event.client_x() as f32, event.client_y() as f32);
            }
        })?;
    }

    // Pointer down strikes the field unless it landed on a control
    {
        let app_ref = app.clone();
        listen(&app, target, "pointerdown", None, move |event| {
            let Some(pointer) = event.dyn_ref::<PointerEvent>() else {
                return;
            };
            let on_control = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest(CONTROL_SELECTOR).ok().flatten())
                .is_some();
            let source = if on_control {
                ImpactSource::Control
            } else {
                ImpactSource::Field
            };
            let result = app_ref.borrow_mut().engine.impact(
                pointer.client_x() as f32,
                pointer.client_y() as f32,
                source,
            );
            if let Err(e) = result {
                log::debug!("Impact ignored: {}", e);
            }
        })?;
    }

    // Wheel pages; not passive so the native scroll can be suppressed
    {
        let app_ref = app.clone();
        let options = AddEventListenerOptions::new();
        options.set_passive(false);
        listen(&app, target, "wheel", Some(&options), move |event| {
            if let Some(wheel) = event.dyn_ref::<WheelEvent>() {
                event.prevent_default();
                app_ref
                    .borrow_mut()
                    .engine
                    .wheel(wheel.delta_y() as f32, now_ms());
            }
        })?;
    }

    // Resize rebuilds the grid
    {
        let app_ref = app.clone();
        listen(&app, target, "resize", None, move |_event| {
            let (w, h) = viewport_size();
            app_ref.borrow_mut().resize(w, h, now_ms());
        })?;
    }

    Ok(())
}

fn request_animation_frame(app: Rc<RefCell<App>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let closure = Closure::once(move |time: f64| {
        frame_loop(app, time);
    });
    let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
    closure.forget();
}

fn frame_loop(app: Rc<RefCell<App>>, time: f64) {
    let running = app.borrow_mut().frame(time);
    if running {
        request_animation_frame(app);
    }
}
