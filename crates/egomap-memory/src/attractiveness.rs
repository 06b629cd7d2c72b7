//! Attractiveness policy.
//!
//! A bundle's attractiveness has a base value fixed by what the bundle
//! affords and decays exponentially with the number of ticks since it was
//! last confirmed:
//!
//! ```text
//! attractiveness(t) = round(base × decay^(t − last_time_bundled))
//! ```
//!
//! Touched (peripersonal) and merely seen (extrapersonal) bundles decay at
//! different rates.

use std::f32::consts::PI;

use egomap_types::{Kinematic, Reach, Taste};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;

/// Angular width of one retina pixel.
pub const PIXEL_SPAN: f32 = PI / 12.0;

fn default_unknown() -> i32 {
    200
}
fn default_hard() -> i32 {
    -300
}
fn default_food() -> i32 {
    400
}
fn default_cuddle() -> i32 {
    300
}
fn default_span_bonus_per_pixel() -> i32 {
    5
}
fn default_remembered_penalty() -> i32 {
    10
}
fn default_peripersonal_decay() -> f32 {
    0.95
}
fn default_extrapersonal_decay() -> f32 {
    0.8
}

/// Tunable scoring constants.  Missing fields fall back to their defaults
/// when deserialised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttractivenessPolicy {
    /// Score of a visual value no bundle explains yet.
    #[serde(default = "default_unknown")]
    pub unknown: i32,
    /// Score of an obstacle in contact.
    #[serde(default = "default_hard")]
    pub hard: i32,
    #[serde(default = "default_food")]
    pub food: i32,
    #[serde(default = "default_cuddle")]
    pub cuddle: i32,
    #[serde(default)]
    pub background: i32,
    /// Bonus per retina pixel of angular span.
    #[serde(default = "default_span_bonus_per_pixel")]
    pub span_bonus_per_pixel: i32,
    /// Subtracted from remembered-but-unseen targets.
    #[serde(default = "default_remembered_penalty")]
    pub remembered_penalty: i32,
    #[serde(default = "default_peripersonal_decay")]
    pub peripersonal_decay: f32,
    #[serde(default = "default_extrapersonal_decay")]
    pub extrapersonal_decay: f32,
}

impl Default for AttractivenessPolicy {
    fn default() -> Self {
        Self {
            unknown: default_unknown(),
            hard: default_hard(),
            food: default_food(),
            cuddle: default_cuddle(),
            background: 0,
            span_bonus_per_pixel: default_span_bonus_per_pixel(),
            remembered_penalty: default_remembered_penalty(),
            peripersonal_decay: default_peripersonal_decay(),
            extrapersonal_decay: default_extrapersonal_decay(),
        }
    }
}

impl AttractivenessPolicy {
    /// Score of `bundle` at `tick`.  Deterministic and side-effect free.
    pub fn score(&self, bundle: &Bundle, tick: u64, reach: Reach) -> i32 {
        let base = self.base(bundle, reach);
        let elapsed = tick.saturating_sub(bundle.last_time_bundled);
        let decay = match reach {
            Reach::Peripersonal => self.peripersonal_decay,
            Reach::Extrapersonal => self.extrapersonal_decay,
        }
        .clamp(0.0, 1.0);
        let exponent = i32::try_from(elapsed).unwrap_or(i32::MAX);
        (base as f32 * decay.powi(exponent)).round() as i32
    }

    /// Bonus for a visual grouping `span` radians wide.
    pub fn span_bonus(&self, span: f32) -> i32 {
        (span / PIXEL_SPAN).round() as i32 * self.span_bonus_per_pixel
    }

    fn base(&self, bundle: &Bundle, reach: Reach) -> i32 {
        match bundle.gustatory {
            Some(Taste::Food) => self.food,
            Some(Taste::Cuddle) => self.cuddle,
            _ if reach == Reach::Peripersonal && bundle.kinematic == Some(Kinematic::Bump) => {
                self.hard
            }
            _ => self.background,
        }
    }
}
