//! Attention Selector.
//!
//! Every salience of the cycle is given a signed attractiveness and the one
//! with the largest magnitude becomes the focus.  Repulsive saliences
//! compete on equal terms with attractive ones; only the sign differs.
//!
//! Scoring rules:
//!
//! * visual: the bundle seen with that colour (if any) at extrapersonal
//!   reach, else the "unknown" score, plus a bonus per pixel of span.  Unseen
//!   pixels score the background value.
//! * frontal wall contact: the touched bundle at peripersonal reach, else
//!   the "hard" score.
//! * food contact: the touched bundle at peripersonal reach, which is also
//!   (re)placed in local-space memory at the contact position.
//! * remembered food places are added as extra candidates so an object out
//!   of view can still win attention.

use egomap_memory::{AttractivenessPolicy, BundleTable, LocalSpaceMemory};
use egomap_perception::Salience;
use egomap_types::{Reach, Rgb, SpatialError, StimulationValue, Taste, Touch};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct AttentionSelector {
    policy: AttractivenessPolicy,
}

impl AttentionSelector {
    pub fn new(policy: AttractivenessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AttractivenessPolicy {
        &self.policy
    }

    /// Score `saliences` in place.
    pub fn score(
        &self,
        saliences: &mut [Salience],
        bundles: &BundleTable,
        memory: &mut LocalSpaceMemory,
        tick: u64,
    ) {
        for salience in saliences.iter_mut() {
            match salience.value {
                StimulationValue::Visual(rgb) => self.score_visual(salience, rgb, bundles, tick),
                StimulationValue::Tactile(touch) => {
                    self.score_tactile(salience, touch, bundles, memory, tick)
                }
                _ => salience.attractiveness = self.policy.background,
            }
        }
    }

    fn score_visual(&self, salience: &mut Salience, rgb: Rgb, bundles: &BundleTable, tick: u64) {
        if rgb == Rgb::UNSEEN {
            salience.attractiveness = self.policy.background;
            return;
        }
        let bonus = self.policy.span_bonus(salience.span);
        match bundles.see(rgb) {
            Some(bundle) => {
                salience.attractiveness =
                    self.policy.score(bundle, tick, Reach::Extrapersonal) + bonus;
                salience.evoked_bundle = Some(bundle.id);
            }
            None => salience.attractiveness = self.policy.unknown + bonus,
        }
    }

    fn score_tactile(
        &self,
        salience: &mut Salience,
        touch: Touch,
        bundles: &BundleTable,
        memory: &mut LocalSpaceMemory,
        tick: u64,
    ) {
        salience.attractiveness = self.policy.background;
        let frontal_wall = touch == Touch::Wall && salience.is_frontal();
        if !frontal_wall && touch != Touch::Food {
            return;
        }
        match bundles.touch(touch) {
            Some(bundle) => {
                salience.attractiveness = self.policy.score(bundle, tick, Reach::Peripersonal);
                salience.evoked_bundle = Some(bundle.id);
                if touch == Touch::Food {
                    memory.add_or_replace(bundle.id, salience.position(), tick);
                }
            }
            None if frontal_wall => salience.attractiveness = self.policy.hard,
            None => {}
        }
    }

    /// Candidates for food remembered in local-space memory.
    pub fn remembered(
        &self,
        bundles: &BundleTable,
        memory: &LocalSpaceMemory,
        tick: u64,
    ) -> Vec<Salience> {
        memory
            .places()
            .iter()
            .filter_map(|place| {
                let bundle = bundles.get(place.bundle)?;
                (bundle.gustatory == Some(Taste::Food)).then(|| {
                    let score = self.policy.score(bundle, tick, Reach::Extrapersonal)
                        - self.policy.remembered_penalty;
                    let value = bundle
                        .visual
                        .map_or(StimulationValue::Tactile(Touch::Food), StimulationValue::Visual);
                    Salience::remembered(
                        value,
                        place.position,
                        bundle.id,
                        score,
                    )
                })
            })
            .collect()
    }
}

/// Pick the salience with the largest absolute attractiveness.  Scanning is
/// left to right with a strict comparison, so the first of equal magnitudes
/// wins.
pub fn select(saliences: &[Salience]) -> Result<&Salience, SpatialError> {
    let mut iter = saliences.iter();
    let mut best = iter.next().ok_or(SpatialError::EmptySalienceList)?;
    for candidate in iter {
        if candidate.attractiveness.unsigned_abs() > best.attractiveness.unsigned_abs() {
            best = candidate;
        }
    }
    debug!(
        attractiveness = best.attractiveness,
        direction = best.direction,
        "focus selected"
    );
    Ok(best)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
