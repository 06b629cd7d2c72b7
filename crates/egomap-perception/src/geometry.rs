//! Egocentric geometry.
//!
//! Everything the spatial system remembers is expressed in the agent's own
//! frame: `+X` straight ahead, `+Y` to the left, angles measured
//! counter-clockwise from `+X`.  When the agent moves, the remembered world
//! must move the *other* way, which is what
//! [`MotionDelta::memory_transform`] produces.
//!
//! # Example
//!
//! ```rust
//! use egomap_perception::geometry::{MotionDelta, Vec3};
//!
//! // The agent stepped one unit forward: a place that was ahead is now here.
//! let step = MotionDelta::new(Vec3::new(1.0, 0.0, 0.0), 0.0);
//! let p = step.memory_transform().apply(Vec3::new(1.0, 0.0, 0.0));
//! assert!(p.length() < 1e-5);
//! ```

use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use egomap_types::{Action, Kinematic};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A position or displacement in the agent's frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Planar vector of length `distance` pointing at `direction` radians.
    pub fn from_polar(direction: f32, distance: f32) -> Self {
        Self::new(direction.cos() * distance, direction.sin() * distance, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn neg(self) -> Self {
        self.scale(-1.0)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, rhs: Self) -> f32 {
        self.sub(rhs).length()
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == 0.0 { Self::zero() } else { self.scale(1.0 / len) }
    }

    /// Heading of the planar projection, in `(-π, π]`.
    pub fn direction(self) -> f32 {
        self.y.atan2(self.x)
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// The caller is responsible for providing a unit quaternion.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle` radians about the vertical (Z) axis.
    pub fn from_yaw(angle: f32) -> Self {
        let half = angle * 0.5;
        Self::new(half.cos(), 0.0, 0.0, half.sin())
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body transform: rotate a point by `rotation`, then add
/// `translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Map a point through this transform.
    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.rotation.rotate(point).add(self.translation)
    }

    /// Compose two transforms.  If `self` = T_A_B and `other` = T_B_C, the
    /// result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation.add(self.rotation.rotate(other.translation));
        let rotated = self.rotation.mul(other.rotation);
        Self::new(translated, rotated)
    }

    /// The transform that undoes `self`.
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.conjugate();
        Self::new(rotation.rotate(self.translation).neg(), rotation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MotionDelta
// ────────────────────────────────────────────────────────────────────────────

/// The agent's realised motion over one cycle, expressed in its previous
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionDelta {
    pub translation: Vec3,
    /// Counter-clockwise turn in radians.
    pub rotation: f32,
}

impl MotionDelta {
    pub fn new(translation: Vec3, rotation: f32) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn stationary() -> Self {
        Self::default()
    }

    /// Motion of one discrete step of `action`.
    ///
    /// A forward step that bumped into something leaves the agent in place;
    /// turns are a quarter of a right angle.
    pub fn from_action(action: Action, kinematic: Kinematic) -> Self {
        match action {
            Action::Forward if kinematic == Kinematic::Bump => Self::stationary(),
            Action::Forward => Self::new(Vec3::new(1.0, 0.0, 0.0), 0.0),
            Action::TurnLeft => Self::new(Vec3::zero(), FRAC_PI_4),
            Action::TurnRight => Self::new(Vec3::zero(), -FRAC_PI_4),
        }
    }

    pub fn is_stationary(&self) -> bool {
        self.translation == Vec3::zero() && self.rotation == 0.0
    }

    /// The transform that re-anchors remembered positions in the agent's new
    /// frame: rotate by `-rotation` about the origin, then translate by
    /// `-translation`.
    pub fn memory_transform(&self) -> Transform3D {
        Transform3D::new(self.translation.neg(), Quaternion::from_yaw(-self.rotation))
    }

    /// The motion that brings the agent back: applying `self` then
    /// `self.inverse()` to a memory leaves it unchanged.
    pub fn inverse(&self) -> Self {
        Self::new(
            Quaternion::from_yaw(self.rotation)
                .rotate(self.translation)
                .neg(),
            -self.rotation,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Direction
// ────────────────────────────────────────────────────────────────────────────

/// The nine egocentric cells around the agent.  The discriminant is the index
/// of the matching sector in the tactile ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    BehindRight = 0,
    Right = 1,
    AheadRight = 2,
    Ahead = 3,
    AheadLeft = 4,
    Left = 5,
    BehindLeft = 6,
    Behind = 7,
    Here = 8,
}

impl Direction {
    pub const ALL: [Direction; 9] = [
        Direction::BehindRight,
        Direction::Right,
        Direction::AheadRight,
        Direction::Ahead,
        Direction::AheadLeft,
        Direction::Left,
        Direction::BehindLeft,
        Direction::Behind,
        Direction::Here,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Centre of the cell in the agent's frame.
    pub fn position(self) -> Vec3 {
        let d = FRAC_1_SQRT_2;
        match self {
            Direction::BehindRight => Vec3::new(-d, -d, 0.0),
            Direction::Right => Vec3::new(0.0, -1.0, 0.0),
            Direction::AheadRight => Vec3::new(d, -d, 0.0),
            Direction::Ahead => Vec3::new(1.0, 0.0, 0.0),
            Direction::AheadLeft => Vec3::new(d, d, 0.0),
            Direction::Left => Vec3::new(0.0, 1.0, 0.0),
            Direction::BehindLeft => Vec3::new(-d, d, 0.0),
            Direction::Behind => Vec3::new(-1.0, 0.0, 0.0),
            Direction::Here => Vec3::zero(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    // ── Vec3 ────────────────────────────────────────────────────────────────

    #[test]
    fn vec3_polar_and_direction_agree() {
        let v = Vec3::from_polar(FRAC_PI_2, 2.0);
        assert!(v.x.abs() < 1e-5);
        assert!((v.y - 2.0).abs() < 1e-5);
        assert!((v.direction() - FRAC_PI_2).abs() < 1e-5);
        assert!((v.length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec3::zero().normalize(), Vec3::zero());
        let n = Vec3::new(3.0, 4.0, 0.0).normalize();
        assert!((n.length() - 1.0).abs() < 1e-5);
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn quaternion_identity_rotate_is_noop() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!(close(Quaternion::identity().rotate(v), v));
    }

    #[test]
    fn yaw_quarter_turn_rotates_x_to_y() {
        let r = Quaternion::from_yaw(FRAC_PI_2).rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(close(r, Vec3::new(0.0, 1.0, 0.0)), "got {r:?}");
    }

    #[test]
    fn quaternion_conjugate_is_inverse() {
        let q = Quaternion::from_yaw(0.7);
        let prod = q.mul(q.conjugate());
        assert!((prod.w - 1.0).abs() < 1e-5);
        assert!(prod.z.abs() < 1e-5);
    }

    // ── Transform3D ─────────────────────────────────────────────────────────

    #[test]
    fn transform_compose_translations_add() {
        let t1 = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
        let t2 = Transform3D::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity());
        let composed = t1.compose(t2);
        assert!((composed.translation.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn transform_inverse_undoes_apply() {
        let t = Transform3D::new(Vec3::new(0.3, -1.2, 0.0), Quaternion::from_yaw(1.1));
        let p = Vec3::new(0.5, 0.25, 0.0);
        assert!(close(t.inverse().apply(t.apply(p)), p));
    }

    // ── MotionDelta ─────────────────────────────────────────────────────────

    #[test]
    fn forward_step_brings_ahead_to_here() {
        let step = MotionDelta::from_action(Action::Forward, Kinematic::Forward);
        let p = step.memory_transform().apply(Direction::Ahead.position());
        assert!(close(p, Vec3::zero()));
    }

    #[test]
    fn bumped_forward_step_is_stationary() {
        assert!(MotionDelta::from_action(Action::Forward, Kinematic::Bump).is_stationary());
    }

    #[test]
    fn turning_left_moves_ahead_to_the_right() {
        // After a right-angle turn left, what was ahead is on the right.
        let turn = MotionDelta::new(Vec3::zero(), FRAC_PI_2);
        let p = turn.memory_transform().apply(Direction::Ahead.position());
        assert!(close(p, Direction::Right.position()), "got {p:?}");
    }

    #[test]
    fn memory_transform_rotates_before_translating() {
        // Turn half way round and step forward one unit in the old frame.
        let motion = MotionDelta::new(Vec3::new(1.0, 0.0, 0.0), PI);
        let p = motion.memory_transform().apply(Vec3::new(2.0, 0.0, 0.0));
        // Rotate (2,0) by -π → (-2,0), then translate by -1 → (-3,0).
        assert!(close(p, Vec3::new(-3.0, 0.0, 0.0)), "got {p:?}");
    }

    // ── Direction ───────────────────────────────────────────────────────────

    #[test]
    fn direction_index_roundtrip() {
        for (i, d) in Direction::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
            assert_eq!(Direction::from_index(i), Some(*d));
        }
        assert!(Direction::from_index(9).is_none());
    }

    #[test]
    fn sector_positions_match_tactile_angles() {
        // Sector i of the ring faces -3π/4 + i·π/4.
        for d in Direction::ALL.iter().take(8) {
            let expected = -3.0 * FRAC_PI_4 + d.index() as f32 * FRAC_PI_4;
            let actual = d.position().direction();
            let diff = (actual - expected).rem_euclid(2.0 * PI);
            assert!(diff < 1e-4 || (2.0 * PI - diff) < 1e-4, "{d:?}");
        }
    }

    proptest! {
        #[test]
        fn motion_inverse_restores_positions(
            tx in -1.5f32..1.5, ty in -1.5f32..1.5, rot in -PI..PI,
            px in -2.0f32..2.0, py in -2.0f32..2.0,
        ) {
            let motion = MotionDelta::new(Vec3::new(tx, ty, 0.0), rot);
            let p = Vec3::new(px, py, 0.0);
            let moved = motion.memory_transform().apply(p);
            let back = motion.inverse().memory_transform().apply(moved);
            prop_assert!(back.distance(p) < 1e-4);
        }
    }
}
