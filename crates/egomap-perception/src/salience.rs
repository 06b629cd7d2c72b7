//! Run-length segmentation of sensor rings into saliences.
//!
//! A sensor ring is an ordered sequence of stimulations, sample `i` facing
//! `start_angle + i * angular_step`.  [`SalienceExtractor`] walks it once,
//! left to right, and closes a [`Salience`] whenever the stimulation
//! changes.  The walk never wraps from the last sample back to the first.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use egomap_perception::salience::SalienceExtractor;
//! use egomap_types::{Stimulation, StimulationValue, Touch};
//!
//! let wall = Arc::new(Stimulation::new(StimulationValue::Tactile(Touch::Wall)));
//! let empty = Arc::new(Stimulation::new(StimulationValue::Tactile(Touch::Empty)));
//! let ring = vec![empty.clone(), wall.clone(), wall, empty];
//!
//! let saliences = SalienceExtractor::new(0.5, 0.0).extract(&ring);
//! assert_eq!(saliences.len(), 3);
//! assert!((saliences[1].span - 1.0).abs() < 1e-5);
//! ```

use std::f32::consts::{FRAC_PI_4, PI};
use std::sync::Arc;

use egomap_types::{BundleId, Modality, StimulationRef, StimulationValue};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::geometry::Vec3;

/// Directions closer than this to the frontal axis count as "in front".
const FRONTAL_TOLERANCE: f32 = 0.01;

// ────────────────────────────────────────────────────────────────────────────
// Salience
// ────────────────────────────────────────────────────────────────────────────

/// A transient perceptual grouping produced for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salience {
    /// Heading of the grouping's centre, radians, counter-clockwise from ahead.
    pub direction: f32,
    /// Angular width.  Zero for saliences synthesised from memory.
    pub span: f32,
    pub distance: f32,
    pub value: StimulationValue,
    /// Signed score; negative values repel.
    pub attractiveness: i32,
    pub evoked_bundle: Option<BundleId>,
}

impl Salience {
    pub fn new(direction: f32, span: f32, distance: f32, value: StimulationValue) -> Self {
        Self {
            direction,
            span,
            distance,
            value,
            attractiveness: 0,
            evoked_bundle: None,
        }
    }

    /// A salience standing for something remembered at `position` rather
    /// than currently sensed.
    pub fn remembered(
        value: StimulationValue,
        position: Vec3,
        bundle: BundleId,
        attractiveness: i32,
    ) -> Self {
        Self {
            direction: position.direction(),
            span: 0.0,
            distance: position.length(),
            value,
            attractiveness,
            evoked_bundle: Some(bundle),
        }
    }

    pub fn modality(&self) -> Modality {
        self.value.modality()
    }

    /// Egocentric position of the grouping's centre.
    pub fn position(&self) -> Vec3 {
        Vec3::from_polar(self.direction, self.distance)
    }

    /// Whether the grouping overlaps the frontal axis.
    pub fn is_frontal(&self) -> bool {
        self.direction - self.span / 2.0 < FRONTAL_TOLERANCE
            && self.direction + self.span / 2.0 > -FRONTAL_TOLERANCE
    }
}

/// One sample of a ranged ring (the visual retina): a stimulation and how far
/// away it was sensed.
#[derive(Debug, Clone, PartialEq)]
pub struct RangedSample {
    pub stimulation: StimulationRef,
    pub distance: f32,
}

impl RangedSample {
    pub fn new(stimulation: StimulationRef, distance: f32) -> Self {
        Self {
            stimulation,
            distance,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SalienceExtractor
// ────────────────────────────────────────────────────────────────────────────

/// Angular layout of one sensor ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalienceExtractor {
    pub angular_step: f32,
    pub start_angle: f32,
}

impl SalienceExtractor {
    pub fn new(angular_step: f32, start_angle: f32) -> Self {
        Self {
            angular_step,
            start_angle,
        }
    }

    /// A forward retina of `pixels` equal pixels spanning the half-plane
    /// ahead, pixel 0 on the right.
    pub fn retina(pixels: usize) -> Self {
        let step = PI / pixels.max(1) as f32;
        Self::new(step, -PI / 2.0 + step / 2.0)
    }

    /// The twelve-pixel retina: pixel `i` faces `-11π/24 + i·π/12`.
    pub fn visual() -> Self {
        Self::retina(12)
    }

    /// The eight tactile sectors: sector `i` faces `-3π/4 + i·π/4`.
    pub fn tactile() -> Self {
        Self::new(FRAC_PI_4, -3.0 * FRAC_PI_4)
    }

    /// Heading of sample `index`.
    pub fn angle_of(&self, index: usize) -> f32 {
        self.start_angle + index as f32 * self.angular_step
    }

    /// Segment a ring sensed at unit distance.
    pub fn extract(&self, ring: &[StimulationRef]) -> Vec<Salience> {
        self.segment(ring.iter().map(|s| (s, 1.0)))
    }

    /// Segment a ring whose samples carry their own distance; each salience
    /// gets the mean distance of its run.
    pub fn extract_ranged(&self, ring: &[RangedSample]) -> Vec<Salience> {
        self.segment(ring.iter().map(|s| (&s.stimulation, s.distance)))
    }

    fn segment<'a>(&self, samples: impl Iterator<Item = (&'a StimulationRef, f32)>) -> Vec<Salience> {
        let mut saliences = Vec::new();
        let mut run: Option<Run<'a>> = None;

        for (index, (stimulation, distance)) in samples.enumerate() {
            let angle = self.angle_of(index);
            match run.as_mut() {
                Some(current) if current.matches(stimulation) => current.push(angle, distance),
                _ => {
                    if let Some(closed) = run.take() {
                        saliences.push(closed.close(self.angular_step));
                    }
                    run = Some(Run::start(stimulation, angle, distance));
                }
            }
        }
        if let Some(closed) = run {
            saliences.push(closed.close(self.angular_step));
        }

        trace!(count = saliences.len(), "ring segmented");
        saliences
    }
}

/// An open run of identical stimulations.
struct Run<'a> {
    stimulation: &'a StimulationRef,
    angle_sum: f32,
    distance_sum: f32,
    count: usize,
}

impl<'a> Run<'a> {
    fn start(stimulation: &'a StimulationRef, angle: f32, distance: f32) -> Self {
        Self {
            stimulation,
            angle_sum: angle,
            distance_sum: distance,
            count: 1,
        }
    }

    // Interned stimulations compare by identity; value equality covers rings
    // built outside a registry.
    fn matches(&self, other: &StimulationRef) -> bool {
        Arc::ptr_eq(self.stimulation, other) || self.stimulation == other
    }

    fn push(&mut self, angle: f32, distance: f32) {
        self.angle_sum += angle;
        self.distance_sum += distance;
        self.count += 1;
    }

    fn close(self, angular_step: f32) -> Salience {
        let n = self.count as f32;
        Salience::new(
            self.angle_sum / n,
            n * angular_step,
            self.distance_sum / n,
            self.stimulation.value(),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use egomap_types::{Rgb, Stimulation, Touch};
    use proptest::prelude::*;

    fn tactile(touch: Touch) -> StimulationRef {
        Arc::new(Stimulation::new(StimulationValue::Tactile(touch)))
    }

    fn visual(rgb: u32) -> StimulationRef {
        Arc::new(Stimulation::new(StimulationValue::Visual(Rgb(rgb))))
    }

    // ── run-length segmentation ─────────────────────────────────────────────

    #[test]
    fn three_runs_with_expected_spans_and_directions() {
        let a = tactile(Touch::Wall);
        let b = tactile(Touch::Empty);
        let c = tactile(Touch::Food);
        let ring = vec![a.clone(), a.clone(), a, b.clone(), b, c];
        let step = 0.3;
        let extractor = SalienceExtractor::new(step, -1.0);

        let s = extractor.extract(&ring);
        assert_eq!(s.len(), 3);
        assert!((s[0].span - 3.0 * step).abs() < 1e-5);
        assert!((s[1].span - 2.0 * step).abs() < 1e-5);
        assert!((s[2].span - step).abs() < 1e-5);

        // Mean member angles: indices {0,1,2}, {3,4}, {5}.
        assert!((s[0].direction - extractor.angle_of(1)).abs() < 1e-5);
        assert!((s[1].direction - (extractor.angle_of(3) + extractor.angle_of(4)) / 2.0).abs() < 1e-5);
        assert!((s[2].direction - extractor.angle_of(5)).abs() < 1e-5);
        assert_eq!(s[2].value, StimulationValue::Tactile(Touch::Food));
    }

    #[test]
    fn segmentation_does_not_wrap_around() {
        let a = tactile(Touch::Wall);
        let b = tactile(Touch::Empty);
        let s = SalienceExtractor::tactile().extract(&[a.clone(), b, a]);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn empty_ring_yields_nothing() {
        assert!(SalienceExtractor::tactile().extract(&[]).is_empty());
    }

    #[test]
    fn equal_values_from_distinct_handles_share_a_run() {
        let s = SalienceExtractor::tactile().extract(&[tactile(Touch::Wall), tactile(Touch::Wall)]);
        assert_eq!(s.len(), 1);
    }

    // ── ranged rings ────────────────────────────────────────────────────────

    #[test]
    fn ranged_run_averages_distance() {
        let green = visual(0x00_80_00);
        let ring = vec![
            RangedSample::new(green.clone(), 1.0),
            RangedSample::new(green, 3.0),
            RangedSample::new(visual(0xFF_FF_FF), 10.0),
        ];
        let s = SalienceExtractor::visual().extract_ranged(&ring);
        assert_eq!(s.len(), 2);
        assert!((s[0].distance - 2.0).abs() < 1e-5);
        assert!((s[1].distance - 10.0).abs() < 1e-5);
    }

    #[test]
    fn twelve_pixel_retina_layout() {
        let r = SalienceExtractor::visual();
        assert!((r.angular_step - PI / 12.0).abs() < 1e-6);
        assert!((r.start_angle + 11.0 * PI / 24.0).abs() < 1e-6);
    }

    #[test]
    fn full_uniform_retina_is_centred_ahead() {
        let grey = visual(0x80_80_80);
        let ring: Vec<_> = (0..12).map(|_| RangedSample::new(grey.clone(), 1.0)).collect();
        let s = SalienceExtractor::visual().extract_ranged(&ring);
        assert_eq!(s.len(), 1);
        assert!(s[0].direction.abs() < 1e-5);
        assert!((s[0].span - PI).abs() < 1e-5);
        assert!(s[0].is_frontal());
    }

    // ── Salience ────────────────────────────────────────────────────────────

    #[test]
    fn frontal_test_uses_span() {
        let value = StimulationValue::Tactile(Touch::Wall);
        assert!(Salience::new(0.0, 0.0, 1.0, value).is_frontal());
        assert!(Salience::new(0.3, 0.7, 1.0, value).is_frontal());
        assert!(!Salience::new(0.3, 0.2, 1.0, value).is_frontal());
        assert!(!Salience::new(-FRAC_PI_4, FRAC_PI_4, 1.0, value).is_frontal());
    }

    #[test]
    fn remembered_salience_recovers_position() {
        let p = Vec3::new(0.0, 1.5, 0.0);
        let s = Salience::remembered(StimulationValue::Tactile(Touch::Food), p, BundleId(1), 42);
        assert!(s.position().distance(p) < 1e-5);
        assert_eq!(s.span, 0.0);
        assert_eq!(s.evoked_bundle, Some(BundleId(1)));
    }

    proptest! {
        #[test]
        fn spans_cover_the_ring(codes in proptest::collection::vec(0i32..4, 1..16)) {
            let ring: Vec<_> = codes
                .iter()
                .map(|c| tactile(Touch::from_code(*c).unwrap_or(Touch::Empty)))
                .collect();
            let step = 0.25;
            let s = SalienceExtractor::new(step, 0.0).extract(&ring);
            let total: f32 = s.iter().map(|x| x.span).sum();
            prop_assert!((total - step * ring.len() as f32).abs() < 1e-4);
            for pair in s.windows(2) {
                prop_assert_ne!(pair[0].value, pair[1].value);
            }
        }
    }
}
