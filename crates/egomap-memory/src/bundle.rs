//! Bundle Table.
//!
//! A bundle is a persistent multimodal identity: the visual, tactile,
//! kinematic and gustatory values that were sensed together, any of which
//! may be unset.  The table never holds two bundles with the same value
//! tuple; asking to create a duplicate confirms the existing bundle instead.
//!
//! The table is small and scanned linearly.  Places in
//! [`LocalSpaceMemory`] refer to bundles by [`BundleId`], so removing a
//! bundle during [`BundleTable::merge`] repoints those places.
//!
//! # Example
//!
//! ```rust
//! use egomap_memory::bundle::{BundleKey, BundleTable};
//! use egomap_types::{Kinematic, StimulationValue, Touch};
//!
//! let mut table = BundleTable::new();
//! let key = BundleKey::default()
//!     .with(StimulationValue::Tactile(Touch::Wall))
//!     .with(StimulationValue::Kinematic(Kinematic::Bump));
//!
//! let first = table.create_or_update(key, 1);
//! let again = table.create_or_update(key, 4);
//! assert_eq!(first, again);
//! assert_eq!(table.len(), 1);
//! assert_eq!(table.get(first).unwrap().last_time_bundled, 4);
//! ```

use std::collections::BTreeSet;

use egomap_types::{
    BundleId, Kinematic, Reach, Rgb, SpatialError, StimulationValue, Taste, Touch,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attractiveness::AttractivenessPolicy;
use crate::local_space::LocalSpaceMemory;

// ────────────────────────────────────────────────────────────────────────────
// BundleKey
// ────────────────────────────────────────────────────────────────────────────

/// A (possibly partial) modality-value tuple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleKey {
    pub visual: Option<Rgb>,
    pub tactile: Option<Touch>,
    pub kinematic: Option<Kinematic>,
    pub gustatory: Option<Taste>,
}

impl BundleKey {
    /// Set the field matching `value`'s modality.  Values that carry no
    /// evidence (unseen colour, empty touch, plain forward motion, nothing
    /// tasted) leave the key unchanged.
    pub fn with(mut self, value: StimulationValue) -> Self {
        match value {
            StimulationValue::Visual(rgb) if rgb != Rgb::UNSEEN => self.visual = Some(rgb),
            StimulationValue::Tactile(touch) if touch != Touch::Empty => {
                self.tactile = Some(touch)
            }
            StimulationValue::Kinematic(Kinematic::Bump) => {
                self.kinematic = Some(Kinematic::Bump)
            }
            StimulationValue::Gustatory(taste) if taste != Taste::Nothing => {
                self.gustatory = Some(taste)
            }
            _ => {}
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill every unset field from `other`.
    fn absorb(&mut self, other: BundleKey) {
        self.visual = self.visual.or(other.visual);
        self.tactile = self.tactile.or(other.tactile);
        self.kinematic = self.kinematic.or(other.kinematic);
        self.gustatory = self.gustatory.or(other.gustatory);
    }

    /// Every populated field of `self` equals the same field of `bundle`.
    pub fn matches(&self, bundle: &Bundle) -> bool {
        fn agree<T: PartialEq>(wanted: Option<T>, actual: Option<T>) -> bool {
            wanted.is_none() || wanted == actual
        }
        agree(self.visual, bundle.visual)
            && agree(self.tactile, bundle.tactile)
            && agree(self.kinematic, bundle.kinematic)
            && agree(self.gustatory, bundle.gustatory)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Bundle
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub visual: Option<Rgb>,
    pub tactile: Option<Touch>,
    pub kinematic: Option<Kinematic>,
    pub gustatory: Option<Taste>,
    /// Labels of the interactions enacted on this bundle.
    pub acts: BTreeSet<String>,
    /// Tick of the last confirmation.
    pub last_time_bundled: u64,
}

impl Bundle {
    pub fn new(id: BundleId, tick: u64) -> Self {
        Self {
            id,
            visual: None,
            tactile: None,
            kinematic: None,
            gustatory: None,
            acts: BTreeSet::new(),
            last_time_bundled: tick,
        }
    }

    fn from_key(id: BundleId, key: BundleKey, tick: u64) -> Self {
        Self {
            visual: key.visual,
            tactile: key.tactile,
            kinematic: key.kinematic,
            gustatory: key.gustatory,
            ..Self::new(id, tick)
        }
    }

    pub fn key(&self) -> BundleKey {
        BundleKey {
            visual: self.visual,
            tactile: self.tactile,
            kinematic: self.kinematic,
            gustatory: self.gustatory,
        }
    }

    /// Display colour: the visual value, else the tactile colour.
    pub fn value(&self) -> Rgb {
        self.visual
            .or_else(|| self.tactile.map(Touch::color))
            .unwrap_or(Rgb::UNSEEN)
    }

    /// Whether this bundle carries `value` for its modality.
    pub fn has(&self, value: StimulationValue) -> bool {
        match value {
            StimulationValue::Visual(rgb) => self.visual == Some(rgb),
            StimulationValue::Tactile(touch) => self.tactile == Some(touch),
            StimulationValue::Kinematic(k) => self.kinematic == Some(k),
            StimulationValue::Gustatory(taste) => self.gustatory == Some(taste),
        }
    }

    fn absorb_fields(&mut self, other: BundleKey) {
        let mut key = self.key();
        key.absorb(other);
        self.visual = key.visual;
        self.tactile = key.tactile;
        self.kinematic = key.kinematic;
        self.gustatory = key.gustatory;
    }

    /// One-line summary for logs and traces.
    pub fn summary(&self) -> String {
        fn field<T: std::fmt::Debug>(v: Option<T>) -> String {
            v.map_or_else(|| "-".to_string(), |v| format!("{v:?}"))
        }
        format!(
            "{} v={} t={} k={} g={}",
            self.id,
            self.visual.map_or_else(|| "-".to_string(), Rgb::hex),
            field(self.tactile),
            field(self.kinematic),
            field(self.gustatory),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// BundleTable
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct BundleTable {
    bundles: Vec<Bundle>,
    next_id: u32,
}

impl BundleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.iter()
    }

    pub fn get(&self, id: BundleId) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BundleId) -> Result<&mut Bundle, SpatialError> {
        self.bundles
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(SpatialError::UnknownBundle(id))
    }

    /// First bundle agreeing with every populated field of `key`.
    pub fn find_by_values(&self, key: &BundleKey) -> Option<&Bundle> {
        self.bundles.iter().find(|b| key.matches(b))
    }

    fn find_exact(&self, key: &BundleKey) -> Option<BundleId> {
        self.bundles.iter().find(|b| b.key() == *key).map(|b| b.id)
    }

    /// Confirm the bundle whose tuple is exactly `key`, or register a new one.
    pub fn create_or_update(&mut self, key: BundleKey, tick: u64) -> BundleId {
        if let Some(bundle) = self.bundles.iter_mut().find(|b| b.key() == key) {
            bundle.last_time_bundled = tick;
            debug!(bundle = %bundle.id, tick, "bundle confirmed");
            return bundle.id;
        }
        let id = BundleId(self.next_id);
        self.next_id += 1;
        let bundle = Bundle::from_key(id, key, tick);
        info!(bundle = %bundle.summary(), "bundle created");
        self.bundles.push(bundle);
        id
    }

    /// Refresh `last_time_bundled`.
    pub fn confirm(&mut self, id: BundleId, tick: u64) -> Result<(), SpatialError> {
        self.get_mut(id)?.last_time_bundled = tick;
        Ok(())
    }

    /// Record that `value` was sensed together with bundle `id`.
    ///
    /// An unset field is filled; a set one is never overwritten.  If filling
    /// would make the tuple identical to another bundle's, that bundle is
    /// confirmed and returned instead and `id` is left as it was.
    pub fn add_evidence(
        &mut self,
        id: BundleId,
        value: StimulationValue,
        tick: u64,
    ) -> Result<BundleId, SpatialError> {
        let current = self.get(id).ok_or(SpatialError::UnknownBundle(id))?.key();
        let mut extended = current;
        extended.absorb(BundleKey::default().with(value));

        if extended != current
            && let Some(existing) = self.find_exact(&extended)
        {
            self.confirm(existing, tick)?;
            debug!(bundle = %id, existing = %existing, "evidence matches an existing bundle");
            return Ok(existing);
        }
        let bundle = self.get_mut(id)?;
        bundle.absorb_fields(extended);
        bundle.last_time_bundled = tick;
        debug!(bundle = %bundle.summary(), "evidence added");
        Ok(id)
    }

    /// Fold `absorb` into `keep`: unset fields of `keep` are filled from
    /// `absorb`, acts are united, the most recent confirmation is kept.
    /// `absorb` leaves the table and every place that referenced it now
    /// references `keep`.  Any other bundle whose tuple now equals `keep`'s
    /// is folded in the same way.
    pub fn merge(
        &mut self,
        keep: BundleId,
        absorb: BundleId,
        memory: &mut LocalSpaceMemory,
    ) -> Result<BundleId, SpatialError> {
        if keep == absorb {
            return Err(SpatialError::SelfMerge(keep));
        }
        self.get(keep).ok_or(SpatialError::UnknownBundle(keep))?;
        let index = self
            .bundles
            .iter()
            .position(|b| b.id == absorb)
            .ok_or(SpatialError::UnknownBundle(absorb))?;
        let absorbed = self.bundles.remove(index);

        let survivor = self.get_mut(keep)?;
        survivor.absorb_fields(absorbed.key());
        survivor.acts.extend(absorbed.acts);
        survivor.last_time_bundled = survivor.last_time_bundled.max(absorbed.last_time_bundled);
        let key = survivor.key();

        let repointed = memory.repoint(absorb, keep);
        let duplicates = self.fold_duplicates(keep, key, memory)?;
        let summary = self.get(keep).map(Bundle::summary).unwrap_or_default();
        info!(bundle = %summary, absorbed = %absorb, repointed, duplicates, "bundles merged");
        Ok(keep)
    }

    /// Remove every bundle other than `keep` whose tuple is `key`, folding
    /// its acts and confirmation into `keep`.  Returns how many were removed.
    fn fold_duplicates(
        &mut self,
        keep: BundleId,
        key: BundleKey,
        memory: &mut LocalSpaceMemory,
    ) -> Result<usize, SpatialError> {
        let mut folded = 0;
        while let Some(index) = self
            .bundles
            .iter()
            .position(|b| b.id != keep && b.key() == key)
        {
            let duplicate = self.bundles.remove(index);
            let survivor = self.get_mut(keep)?;
            survivor.acts.extend(duplicate.acts);
            survivor.last_time_bundled = survivor.last_time_bundled.max(duplicate.last_time_bundled);
            memory.repoint(duplicate.id, keep);
            debug!(bundle = %keep, duplicate = %duplicate.id, "duplicate tuple folded");
            folded += 1;
        }
        Ok(folded)
    }

    /// Record that `act` was enacted on bundle `id`.  When another bundle
    /// already holds `act` both denote the same object: `id` is merged into
    /// it and the survivor is returned.
    pub fn associate_act(
        &mut self,
        id: BundleId,
        act: &str,
        memory: &mut LocalSpaceMemory,
    ) -> Result<BundleId, SpatialError> {
        self.get(id).ok_or(SpatialError::UnknownBundle(id))?;
        let holder = self
            .bundles
            .iter()
            .find(|b| b.id != id && b.acts.contains(act))
            .map(|b| b.id);
        let survivor = match holder {
            Some(other) => self.merge(other, id, memory)?,
            None => id,
        };
        self.get_mut(survivor)?.acts.insert(act.to_string());
        Ok(survivor)
    }

    /// First bundle on which `act` was enacted.
    pub fn evoke(&self, act: &str) -> Option<&Bundle> {
        self.bundles.iter().find(|b| b.acts.contains(act))
    }

    /// First bundle with this visual value that has also been touched.
    pub fn see(&self, visual: Rgb) -> Option<&Bundle> {
        self.bundles
            .iter()
            .find(|b| b.visual == Some(visual) && b.tactile.is_some())
    }

    /// First bundle with this tactile value that also affords something
    /// (a bump or a taste).
    pub fn touch(&self, tactile: Touch) -> Option<&Bundle> {
        self.bundles.iter().find(|b| {
            b.tactile == Some(tactile) && (b.kinematic.is_some() || b.gustatory.is_some())
        })
    }

    pub fn attractiveness(
        &self,
        id: BundleId,
        tick: u64,
        reach: Reach,
        policy: &AttractivenessPolicy,
    ) -> Result<i32, SpatialError> {
        let bundle = self.get(id).ok_or(SpatialError::UnknownBundle(id))?;
        Ok(policy.score(bundle, tick, reach))
    }

    /// Serialisable copy of every bundle.
    pub fn snapshot(&self) -> Vec<Bundle> {
        self.bundles.clone()
    }

    /// Forget every bundle.  Identifiers are not reused.
    pub fn clear(&mut self) {
        self.bundles.clear();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
