//! Deterministic simulation module
//!
//! Everything that moves lives here. This module must stay pure and deterministic:
//! - Time only arrives through explicit arguments
//! - Seeded RNG only
//! - Stable iteration order (by tile index)
//! - No rendering or platform dependencies

pub mod burst;
pub mod falloff;
pub mod impact;
pub mod paging;
pub mod settle;
pub mod tile;

pub use burst::{Burst, BurstPiece};
pub use falloff::{distance, lerp, linear_falloff, smoothed_falloff};
pub use impact::{ImpactOutcome, apply_impact, nearest_tile};
pub use paging::{PageController, PageTarget, ScrollState, SectionTransform, WheelAccumulator};
pub use settle::{SettleDetector, SettlePoll, SettleTiming, SettleWatch};
pub use tile::{FieldClock, GridLayout, Tile, TileField, TilePose};
