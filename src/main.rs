//! Tilefield entry point
//!
//! In the browser this installs logging and mounts the field on `#canvas`.
//! Natively it runs a short scripted session against a recording surface.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

    log::info!("Tilefield starting...");

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let Some(canvas) = document.get_element_by_id("canvas") else {
        log::info!("No #canvas element; waiting for the page to mount a TileFieldHandle");
        return;
    };
    let sections = canvas
        .get_attribute("data-sections")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1);

    match tilefield::web::TileFieldHandle::new("canvas", sections) {
        Ok(handle) => {
            // Expose the handle so page scripts can drive paging
            if let Some(window) = web_sys::window() {
                let _ = js_sys::Reflect::set(&window, &JsValue::from_str("tilefield"), &JsValue::from(handle));
            }
            log::info!("Tilefield running with {} sections", sections);
        }
        Err(e) => log::error!("Tilefield failed to mount: {:?}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Tilefield (native) starting...");
    log::info!("Native mode is headless - run with `trunk serve` for the web version");

    headless_session();
}

/// Drive a few seconds of paging, impacts and confetti without a GPU
#[cfg(not(target_arch = "wasm32"))]
fn headless_session() {
    use tilefield::renderer::{RasterSurface, RecordingSurface};
    use tilefield::{Engine, EngineEvent, ImpactSource, Settings};

    const FRAME_MS: f64 = 1000.0 / 60.0;

    let (width, height) = (1280.0, 800.0);
    let mut engine = Engine::new(Settings::load(), 0x7153, width, height, 4, 0.0);
    let mut surface = RecordingSurface::new(width as u32, height as u32);
    engine.attach_surface();

    let mut now = 0.0;
    let mut frames = 0usize;
    for step in 0..240 {
        now = step as f64 * FRAME_MS;
        match step {
            10 => {
                engine.pointer_move(width / 2.0, height / 2.0);
                if let Err(e) = engine.impact(width / 2.0, height / 2.0, ImpactSource::Field) {
                    log::warn!("Impact failed: {}", e);
                }
            }
            30 => {
                engine.request_page(2, true, now);
            }
            90 => {
                engine.wheel(120.0, now);
            }
            150 => engine.celebrate(),
            _ => {}
        }

        let out = engine.tick(now);
        if let Some(list) = out.draw {
            if let Err(e) = surface.present(&list) {
                log::warn!("Render error: {}", e);
            }
            frames += 1;
        }

        for event in engine.drain_events() {
            match event {
                EngineEvent::FocusFirstControl { section } => {
                    log::info!("Focus first control of section {}", section)
                }
                other => log::info!("{:?}", other),
            }
        }
    }

    engine.teardown();
    let commands = surface.last().map(|l| l.len()).unwrap_or(0);
    println!(
        "Ran {:.1}s: {} frames drawn, {} commands in the last frame, focused section {}",
        now / 1000.0,
        frames,
        commands,
        engine.focused_section()
    );
}
