//! Local-Space Memory.
//!
//! A small set of egocentric [`Place`]s, each remembering which bundle was
//! last sensed there.  Positions are stored by value in the agent's frame
//! and re-anchored every cycle with [`LocalSpaceMemory::step`]; places that
//! drift further than the memory radius are forgotten by
//! [`LocalSpaceMemory::evict_out_of_range`].
//!
//! A query position belongs to a place when it lies strictly within the
//! location radius of the place's position.  When several places qualify,
//! the nearest one wins.
//!
//! # Example
//!
//! ```rust
//! use egomap_memory::local_space::LocalSpaceMemory;
//! use egomap_perception::{Direction, MotionDelta, Vec3};
//! use egomap_types::BundleId;
//!
//! let mut memory = LocalSpaceMemory::default();
//! memory.add_or_replace(BundleId(0), Direction::Ahead.position(), 1);
//!
//! // The agent steps forward: what was ahead is now here.
//! memory.step(&MotionDelta::new(Vec3::new(1.0, 0.0, 0.0), 0.0));
//! assert_eq!(memory.bundle_at(Direction::Here.position()), Some(BundleId(0)));
//! assert_eq!(memory.bundle_at(Direction::Ahead.position()), None);
//! ```

use egomap_perception::{Direction, MotionDelta, Vec3};
use egomap_types::{BundleId, Rgb};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bundle::BundleTable;

/// Default distance under which two positions denote the same place.
pub const DEFAULT_LOCATION_RADIUS: f32 = 0.5;
/// Default distance beyond which places are forgotten.
pub const DEFAULT_MEMORY_RADIUS: f32 = 2.0;

// ────────────────────────────────────────────────────────────────────────────
// Place
// ────────────────────────────────────────────────────────────────────────────

/// One remembered cell.  The bundle is referenced, not owned: several places
/// may point at the same bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub position: Vec3,
    pub bundle: BundleId,
    /// Tick of the last sensing that (re)placed the bundle here.
    pub updated_at: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// LocalSpaceMemory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocalSpaceMemory {
    places: Vec<Place>,
    location_radius: f32,
    memory_radius: f32,
}

impl Default for LocalSpaceMemory {
    fn default() -> Self {
        Self::new(DEFAULT_LOCATION_RADIUS, DEFAULT_MEMORY_RADIUS)
    }
}

impl LocalSpaceMemory {
    /// Both radii are clamped to be non-negative, and the memory radius is
    /// never smaller than the location radius.
    pub fn new(location_radius: f32, memory_radius: f32) -> Self {
        let location_radius = location_radius.max(0.0);
        Self {
            places: Vec::new(),
            location_radius,
            memory_radius: memory_radius.max(location_radius),
        }
    }

    pub fn location_radius(&self) -> f32 {
        self.location_radius
    }

    pub fn memory_radius(&self) -> f32 {
        self.memory_radius
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Re-anchor every place after the agent performed `motion`: rotate by
    /// `-rotation` about the agent, then translate by `-translation`.
    pub fn step(&mut self, motion: &MotionDelta) {
        if motion.is_stationary() {
            return;
        }
        let transform = motion.memory_transform();
        for place in &mut self.places {
            place.position = transform.apply(place.position);
        }
    }

    /// Forget every place further than the memory radius from the agent.
    /// Returns how many were removed.
    pub fn evict_out_of_range(&mut self) -> usize {
        let radius = self.memory_radius;
        let before = self.places.len();
        self.places.retain(|p| p.position.length() <= radius);
        let evicted = before - self.places.len();
        if evicted > 0 {
            debug!(evicted, "places out of range");
        }
        evicted
    }

    /// Remember `bundle` at `position`, replacing the bundle of the place
    /// covering it or creating a new place.
    pub fn add_or_replace(&mut self, bundle: BundleId, position: Vec3, tick: u64) -> Place {
        match self.index_at(position) {
            Some(i) => {
                let place = &mut self.places[i];
                place.bundle = bundle;
                place.updated_at = tick;
                *place
            }
            None => {
                let place = Place {
                    position,
                    bundle,
                    updated_at: tick,
                };
                self.places.push(place);
                place
            }
        }
    }

    /// Forget the place covering `position`, if any.
    pub fn clear(&mut self, position: Vec3) -> Option<Place> {
        let i = self.index_at(position)?;
        let place = self.places.remove(i);
        debug!(bundle = %place.bundle, "place cleared");
        Some(place)
    }

    /// Forget every place.
    pub fn clear_all(&mut self) {
        self.places.clear();
    }

    pub fn place_at(&self, position: Vec3) -> Option<&Place> {
        self.index_at(position).map(|i| &self.places[i])
    }

    pub fn bundle_at(&self, position: Vec3) -> Option<BundleId> {
        self.place_at(position).map(|p| p.bundle)
    }

    /// Display colour of whatever is remembered at `position`, or
    /// [`Rgb::UNSEEN`].
    pub fn value_at(&self, position: Vec3, bundles: &BundleTable) -> Rgb {
        self.bundle_at(position)
            .and_then(|id| bundles.get(id))
            .map_or(Rgb::UNSEEN, |b| b.value())
    }

    /// Colour of the nine egocentric cells, indexed by [`Direction`].  A cell
    /// with nothing remembered shows what lies twice as far in that
    /// direction.
    pub fn cell_colors(&self, bundles: &BundleTable) -> [Rgb; 9] {
        Direction::ALL.map(|d| {
            let near = self.value_at(d.position(), bundles);
            if near == Rgb::UNSEEN {
                self.value_at(d.position().scale(2.0), bundles)
            } else {
                near
            }
        })
    }

    /// Point every place holding `from` at `to`.  Returns how many changed.
    pub fn repoint(&mut self, from: BundleId, to: BundleId) -> usize {
        let mut changed = 0;
        for place in self.places.iter_mut().filter(|p| p.bundle == from) {
            place.bundle = to;
            changed += 1;
        }
        changed
    }

    fn index_at(&self, position: Vec3) -> Option<usize> {
        self.places
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.position.distance(position)))
            .filter(|(_, d)| *d < self.location_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
