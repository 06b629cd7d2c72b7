//! `egomap-perception` – egocentric geometry and perceptual grouping.
//!
//! # Modules
//!
//! - [`geometry`] – [`Vec3`][geometry::Vec3], [`Quaternion`][geometry::Quaternion]
//!   and [`Transform3D`][geometry::Transform3D], plus the agent-level
//!   [`MotionDelta`][geometry::MotionDelta] whose inverse keeps a memory of
//!   places anchored to the agent, and the nine egocentric
//!   [`Direction`][geometry::Direction] cells.
//! - [`salience`] – [`SalienceExtractor`][salience::SalienceExtractor]: a
//!   single left-to-right run-length segmentation of a visual or tactile
//!   sensor ring into [`Salience`][salience::Salience] groupings.

pub mod geometry;
pub mod salience;

pub use geometry::{Direction, MotionDelta, Quaternion, Transform3D, Vec3};
pub use salience::{RangedSample, Salience, SalienceExtractor};
