//! Bundle formation from co-occurring stimulations in front of the agent.
//!
//! Each rule looks at what is remembered ahead (or here) and either creates
//! a new bundle and places it, or adds evidence to the remembered one.  The
//! remembered bundle is read again before every rule, so a single
//! co-occurrence never produces two bundles in one cycle.

use std::f32::consts::PI;

use egomap_memory::{BundleKey, BundleTable, LocalSpaceMemory};
use egomap_perception::{Direction, Salience, Vec3};
use egomap_types::{BundleId, Kinematic, Rgb, SpatialError, StimulationValue, Taste, Touch};
use tracing::debug;

/// A frontal visual grouping must be wider than this to be bound to a touch.
const FRONT_VISUAL_MIN_SPAN: f32 = PI / 6.0 + 0.01;

/// What was sensed together this cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooccurrence {
    pub front_visual: Option<Rgb>,
    pub front_touch: Touch,
    pub kinematic: Kinematic,
    pub taste: Taste,
}

/// The visual colour straight ahead: the last frontal visual grouping wide
/// enough to be bound, ignoring unseen pixels.
pub fn front_visual(saliences: &[Salience]) -> Option<Rgb> {
    saliences
        .iter()
        .filter(|s| s.is_frontal() && s.span > FRONT_VISUAL_MIN_SPAN)
        .filter_map(|s| match s.value {
            StimulationValue::Visual(rgb) if rgb != Rgb::UNSEEN => Some(rgb),
            _ => None,
        })
        .last()
}

/// Apply every formation rule for one cycle.
pub fn form_bundles(
    sensed: &Cooccurrence,
    bundles: &mut BundleTable,
    memory: &mut LocalSpaceMemory,
    tick: u64,
) -> Result<(), SpatialError> {
    let ahead = Direction::Ahead.position();
    let here = Direction::Here.position();
    let visual = sensed.front_visual.map(StimulationValue::Visual);

    // Touch and bump.
    if sensed.kinematic == Kinematic::Bump {
        match placed(bundles, memory, ahead) {
            None if sensed.front_touch == Touch::Wall => {
                let key = key_of(&[
                    StimulationValue::Tactile(Touch::Wall),
                    StimulationValue::Kinematic(Kinematic::Bump),
                ]);
                let id = bundles.create_or_update(with_visual(key, visual), tick);
                memory.add_or_replace(id, ahead, tick);
            }
            Some((id, Touch::Wall)) => {
                reinforce(bundles, memory, id, StimulationValue::Kinematic(Kinematic::Bump), ahead, tick)?;
            }
            _ => {}
        }
    }

    // Touch and taste.
    if sensed.taste == Taste::Food {
        let food_key = key_of(&[
            StimulationValue::Tactile(Touch::Food),
            StimulationValue::Gustatory(Taste::Food),
        ]);
        match placed(bundles, memory, here) {
            None => {
                bundles.create_or_update(food_key, tick);
            }
            Some((id, Touch::Food)) => eat(bundles, memory, id, here, tick)?,
            _ => {}
        }
        if sensed.front_touch == Touch::Food {
            match placed(bundles, memory, ahead) {
                None => {
                    let id = bundles.create_or_update(food_key, tick);
                    if let Some(v) = visual {
                        bundles.add_evidence(id, v, tick)?;
                    }
                }
                Some((id, Touch::Food)) => eat(bundles, memory, id, ahead, tick)?,
                _ => {}
            }
        }
    }

    // Touch and social contact.
    if sensed.taste == Taste::Cuddle && sensed.front_touch == Touch::Agent {
        let cuddle = StimulationValue::Gustatory(Taste::Cuddle);
        match placed(bundles, memory, ahead) {
            None => {
                let key = key_of(&[StimulationValue::Tactile(Touch::Agent), cuddle]);
                let mut id = bundles.create_or_update(key, tick);
                if let Some(v) = visual {
                    id = bundles.add_evidence(id, v, tick)?;
                }
                memory.add_or_replace(id, ahead, tick);
            }
            Some((id, Touch::Agent)) => {
                reinforce(bundles, memory, id, cuddle, ahead, tick)?;
            }
            _ => {}
        }
    }

    // Sight and touch.
    if let Some(v) = visual {
        match placed(bundles, memory, ahead) {
            None if sensed.front_touch != Touch::Empty => {
                let key = key_of(&[v, StimulationValue::Tactile(sensed.front_touch)]);
                let id = bundles.create_or_update(key, tick);
                memory.add_or_replace(id, ahead, tick);
            }
            Some((id, touch)) if touch == sensed.front_touch => {
                reinforce(bundles, memory, id, v, ahead, tick)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Clear the ahead and here places whose remembered touch contradicts what
/// is sensed there now.  Returns how many places were forgotten.
pub fn resolve_conflicts(
    sensed_ahead: Touch,
    sensed_here: Touch,
    bundles: &BundleTable,
    memory: &mut LocalSpaceMemory,
) -> usize {
    let mut cleared = 0;
    for (direction, sensed) in [(Direction::Ahead, sensed_ahead), (Direction::Here, sensed_here)] {
        let position = direction.position();
        if let Some((id, remembered)) = placed(bundles, memory, position)
            && remembered != sensed
        {
            debug!(bundle = %id, ?direction, ?remembered, ?sensed, "memory contradicted");
            memory.clear(position);
            cleared += 1;
        }
    }
    cleared
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// The bundle remembered at `position` and its touch (empty when unset).
fn placed(
    bundles: &BundleTable,
    memory: &LocalSpaceMemory,
    position: Vec3,
) -> Option<(BundleId, Touch)> {
    let id = memory.bundle_at(position)?;
    let touch = bundles
        .get(id)
        .and_then(|b| b.tactile)
        .unwrap_or(Touch::Empty);
    Some((id, touch))
}

fn key_of(values: &[StimulationValue]) -> BundleKey {
    values.iter().fold(BundleKey::default(), |key, v| key.with(*v))
}

fn with_visual(key: BundleKey, visual: Option<StimulationValue>) -> BundleKey {
    visual.map_or(key, |v| key.with(v))
}

/// Add evidence to a placed bundle; if that resolves to another bundle, the
/// place now holds it.
fn reinforce(
    bundles: &mut BundleTable,
    memory: &mut LocalSpaceMemory,
    id: BundleId,
    value: StimulationValue,
    position: Vec3,
    tick: u64,
) -> Result<BundleId, SpatialError> {
    let got = bundles.add_evidence(id, value, tick)?;
    if got != id {
        memory.add_or_replace(got, position, tick);
    }
    Ok(got)
}

/// The food at `position` was tasted: it joins its bundle and is gone.
fn eat(
    bundles: &mut BundleTable,
    memory: &mut LocalSpaceMemory,
    id: BundleId,
    position: Vec3,
    tick: u64,
) -> Result<(), SpatialError> {
    bundles.add_evidence(id, StimulationValue::Gustatory(Taste::Food), tick)?;
    memory.clear(position);
    debug!(bundle = %id, "food eaten");
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: Rgb = Rgb(0x00_80_00);

    fn sensed(front_visual: Option<Rgb>, front_touch: Touch, kinematic: Kinematic, taste: Taste) -> Cooccurrence {
        Cooccurrence {
            front_visual,
            front_touch,
            kinematic,
            taste,
        }
    }

    fn ahead() -> Vec3 {
        Direction::Ahead.position()
    }

    // ── front_visual ────────────────────────────────────────────────────────

    #[test]
    fn front_visual_needs_width_and_colour() {
        let wide = Salience::new(0.0, PI / 4.0, 2.0, StimulationValue::Visual(GREEN));
        let narrow = Salience::new(0.0, PI / 6.0, 2.0, StimulationValue::Visual(GREEN));
        let unseen = Salience::new(0.0, PI, 2.0, StimulationValue::Visual(Rgb::UNSEEN));
        assert_eq!(front_visual(&[wide]), Some(GREEN));
        assert_eq!(front_visual(&[narrow]), None);
        assert_eq!(front_visual(&[unseen]), None);
    }

    // ── bump ────────────────────────────────────────────────────────────────

    #[test]
    fn bump_into_wall_creates_one_bundle_ahead() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        form_bundles(&sensed(None, Touch::Wall, Kinematic::Bump, Taste::Nothing), &mut bundles, &mut memory, 1)
            .unwrap();
        assert_eq!(bundles.len(), 1);
        let id = memory.bundle_at(ahead()).unwrap();
        let b = bundles.get(id).unwrap();
        assert_eq!(b.tactile, Some(Touch::Wall));
        assert_eq!(b.kinematic, Some(Kinematic::Bump));
    }

    #[test]
    fn seen_wall_bump_creates_a_single_bundle() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        form_bundles(
            &sensed(Some(GREEN), Touch::Wall, Kinematic::Bump, Taste::Nothing),
            &mut bundles,
            &mut memory,
            1,
        )
        .unwrap();
        assert_eq!(bundles.len(), 1);
        let b = bundles.get(memory.bundle_at(ahead()).unwrap()).unwrap();
        assert_eq!(b.visual, Some(GREEN));
        assert_eq!(b.kinematic, Some(Kinematic::Bump));
    }

    #[test]
    fn bump_reinforces_remembered_wall() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        let wall = bundles.create_or_update(key_of(&[StimulationValue::Tactile(Touch::Wall)]), 1);
        memory.add_or_replace(wall, ahead(), 1);
        form_bundles(&sensed(None, Touch::Wall, Kinematic::Bump, Taste::Nothing), &mut bundles, &mut memory, 2)
            .unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles.get(wall).unwrap().kinematic, Some(Kinematic::Bump));
    }

    // ── taste ───────────────────────────────────────────────────────────────

    #[test]
    fn tasting_remembered_food_eats_it() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        let food = bundles.create_or_update(key_of(&[StimulationValue::Tactile(Touch::Food)]), 1);
        memory.add_or_replace(food, Direction::Here.position(), 1);
        form_bundles(&sensed(None, Touch::Empty, Kinematic::Forward, Taste::Food), &mut bundles, &mut memory, 2)
            .unwrap();
        assert_eq!(bundles.get(food).unwrap().gustatory, Some(Taste::Food));
        assert!(memory.is_empty());
    }

    #[test]
    fn tasting_unknown_food_creates_a_food_bundle() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        form_bundles(&sensed(None, Touch::Empty, Kinematic::Forward, Taste::Food), &mut bundles, &mut memory, 1)
            .unwrap();
        assert_eq!(bundles.len(), 1);
        assert!(bundles.touch(Touch::Food).is_some());
        assert!(memory.is_empty());
    }

    #[test]
    fn tasting_seen_food_ahead_binds_its_colour() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        let blue = Rgb(0x64_95_ED);
        form_bundles(&sensed(Some(blue), Touch::Food, Kinematic::Forward, Taste::Food), &mut bundles, &mut memory, 1)
            .unwrap();
        let b = bundles.touch(Touch::Food).unwrap();
        assert_eq!(b.visual, Some(blue));
        assert_eq!(bundles.see(blue).map(|b| b.id), Some(b.id));
    }

    // ── social ──────────────────────────────────────────────────────────────

    #[test]
    fn cuddle_with_agent_ahead_creates_social_bundle() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        let orange = Rgb(0xFF_A5_00);
        form_bundles(
            &sensed(Some(orange), Touch::Agent, Kinematic::Forward, Taste::Cuddle),
            &mut bundles,
            &mut memory,
            1,
        )
        .unwrap();
        assert_eq!(bundles.len(), 1);
        let b = bundles.get(memory.bundle_at(ahead()).unwrap()).unwrap();
        assert_eq!(b.gustatory, Some(Taste::Cuddle));
        assert_eq!(b.visual, Some(orange));
    }

    // ── sight ───────────────────────────────────────────────────────────────

    #[test]
    fn seen_and_touched_creates_visio_tactile_bundle() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        form_bundles(
            &sensed(Some(GREEN), Touch::Wall, Kinematic::Forward, Taste::Nothing),
            &mut bundles,
            &mut memory,
            1,
        )
        .unwrap();
        let b = bundles.get(memory.bundle_at(ahead()).unwrap()).unwrap();
        assert_eq!(b.visual, Some(GREEN));
        assert_eq!(b.tactile, Some(Touch::Wall));
        assert_eq!(b.kinematic, None);
    }

    #[test]
    fn seen_without_touch_creates_nothing() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        form_bundles(
            &sensed(Some(GREEN), Touch::Empty, Kinematic::Forward, Taste::Nothing),
            &mut bundles,
            &mut memory,
            1,
        )
        .unwrap();
        assert!(bundles.is_empty());
    }

    // ── conflicts ───────────────────────────────────────────────────────────

    #[test]
    fn contradicted_places_are_cleared() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        let wall = bundles.create_or_update(key_of(&[StimulationValue::Tactile(Touch::Wall)]), 1);
        memory.add_or_replace(wall, ahead(), 1);
        memory.add_or_replace(wall, Direction::Left.position(), 1);

        assert_eq!(resolve_conflicts(Touch::Wall, Touch::Empty, &bundles, &mut memory), 0);
        assert_eq!(resolve_conflicts(Touch::Empty, Touch::Empty, &bundles, &mut memory), 1);
        assert_eq!(memory.bundle_at(ahead()), None);
        assert_eq!(memory.bundle_at(Direction::Left.position()), Some(wall));
    }

    #[test]
    fn visual_only_bundle_agrees_with_empty_touch() {
        let mut bundles = BundleTable::new();
        let mut memory = LocalSpaceMemory::default();
        let seen = bundles.create_or_update(key_of(&[StimulationValue::Visual(GREEN)]), 1);
        memory.add_or_replace(seen, Direction::Here.position(), 1);
        assert_eq!(resolve_conflicts(Touch::Empty, Touch::Empty, &bundles, &mut memory), 0);
    }
}
