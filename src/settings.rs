//! Field settings and quality presets
//!
//! Persisted in LocalStorage. Every field has a default, so partial JSON
//! documents are accepted.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::FieldError;
use crate::scheduler::RetryPolicy;
use crate::sim::{SettleTiming, WheelAccumulator};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Tile budget for this preset (never above `MAX_TILES`)
    pub fn tile_budget(&self) -> usize {
        match self {
            QualityPreset::Low => 300,
            QualityPreset::Medium => MAX_TILES,
            QualityPreset::High => MAX_TILES,
        }
    }

    /// Frame-rate ceiling for the tile field (Hz)
    pub fn frame_cap(&self) -> f32 {
        match self {
            QualityPreset::Low => 24.0,
            QualityPreset::Medium => FRAME_CAP,
            QualityPreset::High => 60.0,
        }
    }

    /// Upper bound on the device pixel ratio used for the backing surface
    pub fn dpr_cap(&self) -> f32 {
        match self {
            QualityPreset::Low => 1.0,
            QualityPreset::Medium => DPR_CAP,
            QualityPreset::High => 1.5,
        }
    }
}

/// Field settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Paging ===
    /// Accumulated wheel delta that triggers a page step
    pub wheel_threshold: f32,
    /// Debounce after a wheel page step (ms)
    pub wheel_lock_ms: f64,
    /// Per-frame easing factor toward the target offset
    pub easing: f32,

    // === Settle detection ===
    pub settle_poll_ms: f64,
    pub settle_timeout_ms: f64,
    pub settle_tolerance: f32,
    pub settle_confirm_delay_ms: f64,

    // === Effects ===
    /// Fire synthetic impacts when a page request asks for them
    pub burst_feedback: bool,
    /// Confetti on celebrate
    pub celebration: bool,

    // === Accessibility ===
    /// Reduced motion (no bursts, no confetti)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,

            wheel_threshold: WHEEL_THRESHOLD,
            wheel_lock_ms: WHEEL_LOCK_MS,
            easing: PAGE_EASING,

            settle_poll_ms: SETTLE_POLL_MS,
            settle_timeout_ms: SETTLE_TIMEOUT_MS,
            settle_tolerance: SETTLE_TOLERANCE,
            settle_confirm_delay_ms: SETTLE_CONFIRM_DELAY_MS,

            burst_feedback: true,
            celebration: true,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, FieldError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, FieldError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Effective burst feedback (respects reduced_motion)
    pub fn effective_burst_feedback(&self) -> bool {
        self.burst_feedback && !self.reduced_motion
    }

    /// Effective celebration (respects reduced_motion)
    pub fn effective_celebration(&self) -> bool {
        self.celebration && !self.reduced_motion
    }

    pub fn tile_budget(&self) -> usize {
        self.quality.tile_budget().min(MAX_TILES)
    }

    pub fn frame_cap(&self) -> f32 {
        self.quality.frame_cap()
    }

    pub fn wheel(&self) -> WheelAccumulator {
        WheelAccumulator::new(self.wheel_threshold, self.wheel_lock_ms)
    }

    pub fn settle_timing(&self) -> SettleTiming {
        SettleTiming {
            poll_ms: self.settle_poll_ms,
            timeout_ms: self.settle_timeout_ms,
            tolerance: self.settle_tolerance,
            confirm_delay_ms: self.settle_confirm_delay_ms,
        }
    }

    pub fn burst_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: BURST_RETRY_ATTEMPTS,
            backoff_ms: BURST_RETRY_BACKOFF_MS,
        }
    }

    /// Switch preset and persist the result
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;
        self.save();
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "tilefield_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY)
        {
            match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring stored settings: {}", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage
            && let Ok(json) = self.to_json()
        {
            let _ = storage.set_item(Self::STORAGE_KEY, &json);
            log::info!("Settings saved");
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
