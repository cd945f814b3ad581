//! Tilefield - animated brick background and scroll-paging engine
//!
//! Core modules:
//! - `sim`: Tile field physics, impacts, paging, settle detection, confetti
//! - `scheduler`: Capped frame scheduler and cooperative timers
//! - `engine`: Composition root wiring the components together
//! - `renderer`: Draw commands, tessellation and the wgpu surface
//! - `settings`: Data-driven tuning and quality presets

pub mod engine;
pub mod error;
pub mod renderer;
pub mod scheduler;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use engine::{Engine, EngineEvent, FrameOutput, ImpactSource};
pub use error::FieldError;
pub use settings::{QualityPreset, Settings};

/// Engine configuration constants
pub mod consts {
    /// Default frame-rate ceiling for the tile field (Hz)
    pub const FRAME_CAP: f32 = 40.0;
    /// Default ceiling on the device pixel ratio of the backing surface
    pub const DPR_CAP: f32 = 1.2;
    /// Largest `dt` handed to the tile simulation (ms)
    pub const MAX_FRAME_DT_MS: f64 = 40.0;

    /// Hard cap on tiles per grid
    pub const MAX_TILES: usize = 700;
    /// Viewports narrower than this get the large tile size
    pub const NARROW_VIEWPORT: f32 = 640.0;
    pub const TILE_SIZE_NARROW: (f32, f32) = (120.0, 56.0);
    pub const TILE_SIZE_WIDE: (f32, f32) = (96.0, 44.0);

    /// Gravity applied to detached tiles (px/s²)
    pub const FALL_GRAVITY: f32 = 900.0;
    /// Extra fall distance past the viewport before removal
    pub const FALL_REMOVE_MARGIN: f32 = 120.0;
    /// Opacity reaches zero at this multiple of viewport height
    pub const FALL_FADE_SPAN: f32 = 1.2;

    /// Influence radius as a fraction of the larger viewport dimension
    pub const INFLUENCE_SPAN: f32 = 0.6;
    /// Falloff exponent (< 1 boosts mid-range influence)
    pub const INFLUENCE_EXPONENT: f32 = 0.95;

    /// Per-frame multiplicative lift velocity decay
    pub const LIFT_DECAY: f32 = 0.92;
    /// Additional damping of lift velocity per unit influence per second
    pub const LIFT_DAMPING: f32 = 20.0;
    /// Per-frame linear pop decay
    pub const POP_DECAY: f32 = 0.02;
    /// Maximum lift in pixels
    pub const LIFT_CAP: f32 = 14.0;
    pub const LIFT_FROM_INFLUENCE: f32 = 10.0;
    pub const LIFT_FROM_POP: f32 = 20.0;
    /// Lift velocity to pixel drift scale
    pub const DRIFT_SCALE: f32 = 50.0;

    /// Idle oscillation
    pub const VIBRATE_AMPLITUDE: f32 = 6.0;
    pub const VIBRATE_FREQ: f32 = 6.0;
    /// Frequency ramps up by this fraction over `VIBRATE_RAMP_SECS`
    pub const VIBRATE_RAMP: f32 = 0.25;
    pub const VIBRATE_RAMP_SECS: f32 = 60.0;

    /// Impacts
    pub const DETACH_MIN_DISTANCE: f32 = 120.0;
    pub const DETACH_VIEWPORT_FRACTION: f32 = 0.06;
    pub const DETACH_FALL_SPEED_MIN: f32 = 200.0;
    pub const DETACH_FALL_SPEED_SPREAD: f32 = 220.0;
    pub const POP_RADIUS: f32 = 140.0;

    /// Paging
    pub const WHEEL_THRESHOLD: f32 = 80.0;
    pub const WHEEL_LOCK_MS: f64 = 420.0;
    pub const PAGE_EASING: f32 = 0.12;

    /// Settle detection
    pub const SETTLE_POLL_MS: f64 = 60.0;
    pub const SETTLE_TIMEOUT_MS: f64 = 1400.0;
    pub const SETTLE_TOLERANCE: f32 = 6.0;
    pub const SETTLE_CONFIRM_DELAY_MS: f64 = 80.0;

    /// Programmatic burst feedback
    pub const BURST_IMPACTS: usize = 4;
    pub const BURST_STAGGER_MS: f64 = 80.0;
    pub const BURST_SPREAD: (f32, f32) = (30.0, 18.0);
    pub const BURST_RETRY_ATTEMPTS: u32 = 10;
    pub const BURST_RETRY_BACKOFF_MS: f64 = 120.0;

    /// Confetti
    pub const CONFETTI_PIECES: usize = 60;
    pub const CONFETTI_GRAVITY: f32 = 0.25;
}

/// Theme colors as 0-255 RGB
pub mod palette {
    pub const BACKGROUND: [u8; 3] = [0x05, 0x06, 0x0A];
    pub const PRIMARY: [u8; 3] = [0x7C, 0x3A, 0xED];
    pub const CYAN: [u8; 3] = [0x06, 0xB6, 0xD4];
    pub const ACCENT: [u8; 3] = [0x00, 0xE5, 0xFF];
    pub const WARM: [u8; 3] = [0xFF, 0xB8, 0x6B];

    /// Confetti colors
    pub const CONFETTI: [[u8; 3]; 4] = [PRIMARY, CYAN, ACCENT, WARM];

    /// Translucent overlay drawn under the tiles each frame
    pub const OVERLAY: [f32; 4] = [4.0 / 255.0, 6.0 / 255.0, 10.0 / 255.0, 0.46];
}

/// Blend two RGB colors, rounding each channel
#[inline]
pub fn mix_rgb(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let ch = |i: usize| sim::falloff::lerp(a[i] as f32, b[i] as f32, t).round() as u8;
    [ch(0), ch(1), ch(2)]
}

/// Convert 0-255 channels plus alpha to a normalized RGBA color
#[inline]
pub fn rgba(rgb: [f32; 3], alpha: f32) -> [f32; 4] {
    [rgb[0] / 255.0, rgb[1] / 255.0, rgb[2] / 255.0, alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_rgb_endpoints() {
        assert_eq!(mix_rgb(palette::PRIMARY, palette::CYAN, 0.0), palette::PRIMARY);
        assert_eq!(mix_rgb(palette::PRIMARY, palette::CYAN, 1.0), palette::CYAN);
    }

    #[test]
    fn test_mix_rgb_midpoint_rounds() {
        // (124 + 6) / 2 = 65, (58 + 182) / 2 = 120, (237 + 212) / 2 = 224.5
        assert_eq!(mix_rgb(palette::PRIMARY, palette::CYAN, 0.5), [65, 120, 225]);
    }
}
