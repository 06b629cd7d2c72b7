//! Observation Builder.
//!
//! Turns the cycle's focus into the [`Observation`] handed to the decision
//! layer, including the symbolic feedback describing how the focus moved
//! relative to the agent since the previous cycle.
//!
//! ## Relative speed
//!
//! ```text
//! speed = position − previous_position + normalize(−y, x) × (−rotation)
//! ```
//!
//! The last term removes the apparent motion caused by the agent's own turn.
//!
//! ## Feedback
//!
//! The *initial feedback* is computed once, on the first cycle of an action:
//!
//! | focus      | action  | condition                            | feedback   |
//! |------------|---------|--------------------------------------|------------|
//! | attractive | forward | `speed·position < 0`, `abs(dir) < π/4` | `+` else `-` |
//! | attractive | turn    | `speed.x > 0`                        | `+` else `-` |
//! | repulsive  | any     | previous focus was attractive        | `*`        |
//! | repulsive  | forward | `speed·position < 0`, `abs(dir) < π/4` | `*` else `_` |
//! | repulsive  | turn    | `speed.x > 0`                        | `*` else `_` |
//!
//! The *dynamic feature* repeats it on every cycle, marked with `|` on the
//! side where the focus lies outside the fovea, or becomes `e` while
//! something is tasted.

use std::f32::consts::FRAC_PI_4;

use egomap_perception::{Salience, Vec3};
use egomap_types::{Action, BundleId, Kinematic, Rgb, Taste};
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};

/// Half-width of the fovea for an attractive focus.
const ATTRACTIVE_FOVEA: f32 = FRAC_PI_4 - 0.01;
/// Half-width of the fovea for a repulsive focus.
const REPULSIVE_FOVEA: f32 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Feedback {
    #[default]
    None,
    /// `+`
    Closer,
    /// `-`
    Farther,
    /// `*`
    Appeared,
    /// `_`
    Receded,
    /// `e`
    Eat,
}

impl Feedback {
    pub fn symbol(self) -> &'static str {
        match self {
            Feedback::None => "",
            Feedback::Closer => "+",
            Feedback::Farther => "-",
            Feedback::Appeared => "*",
            Feedback::Receded => "_",
            Feedback::Eat => "e",
        }
    }
}

/// The per-cycle result reported to the decision layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Observation {
    pub tick: u64,
    /// Heading of the focus, radians, counter-clockwise from ahead.
    pub direction: f32,
    pub distance: f32,
    pub span: f32,
    pub attractiveness: i32,
    /// Colour of the focus (its bundle's colour when it evokes one).
    pub focus_value: Rgb,
    pub focus_bundle: Option<BundleId>,
    pub kinematic: Kinematic,
    pub gustatory: Taste,
    /// Motion of the focus relative to the agent since the previous cycle.
    pub speed: Vec3,
    pub initial_feedback: Feedback,
    pub dynamic_feature: String,
}

impl Observation {
    pub fn position(&self) -> Vec3 {
        Vec3::from_polar(self.direction, self.distance)
    }

    /// `w` when the agent bumped, then the dynamic feature.
    pub fn stimuli(&self) -> String {
        let prefix = if self.kinematic == Kinematic::Bump { "w" } else { "" };
        format!("{prefix}{}", self.dynamic_feature)
    }
}

/// JSON schema of [`Observation`] for consumers that validate it.
pub fn observation_schema() -> RootSchema {
    schemars::schema_for!(Observation)
}

/// Everything besides the focus that an observation depends on.
#[derive(Debug, Clone, Copy)]
pub struct ObservationContext<'a> {
    pub tick: u64,
    pub previous: Option<&'a Observation>,
    pub kinematic: Kinematic,
    pub gustatory: Taste,
    /// The agent's rotation during this cycle.
    pub rotation: f32,
    /// The action in progress, if any.
    pub action: Option<Action>,
    /// Feedback already fixed for this action; `None` on its first cycle.
    pub initial_feedback: Option<Feedback>,
}

/// Build the observation for `focus`.
pub fn build(focus: &Salience, focus_value: Rgb, ctx: &ObservationContext<'_>) -> Observation {
    let position = focus.position();
    let speed = ctx
        .previous
        .map_or(Vec3::zero(), |prev| relative_speed(position, prev.position(), ctx.rotation));

    let initial = ctx.initial_feedback.unwrap_or_else(|| match (ctx.action, ctx.previous) {
        (Some(action), Some(prev)) => initial_feedback(
            action,
            focus.attractiveness,
            prev.attractiveness,
            focus.direction,
            position,
            speed,
        ),
        _ => Feedback::None,
    });

    let dynamic_feature = dynamic_feature(
        initial,
        focus.attractiveness,
        focus.direction,
        ctx.gustatory,
    );

    Observation {
        tick: ctx.tick,
        direction: focus.direction,
        distance: focus.distance,
        span: focus.span,
        attractiveness: focus.attractiveness,
        focus_value,
        focus_bundle: focus.evoked_bundle,
        kinematic: ctx.kinematic,
        gustatory: ctx.gustatory,
        speed,
        initial_feedback: initial,
        dynamic_feature,
    }
}

pub fn relative_speed(position: Vec3, previous: Vec3, rotation: f32) -> Vec3 {
    let tangent = Vec3::new(-position.y, position.x, 0.0).normalize();
    position.sub(previous).add(tangent.scale(-rotation))
}

pub fn initial_feedback(
    action: Action,
    attractiveness: i32,
    previous_attractiveness: i32,
    direction: f32,
    position: Vec3,
    speed: Vec3,
) -> Feedback {
    let approaching = match action {
        Action::Forward => speed.dot(position) < 0.0 && direction.abs() < FRAC_PI_4,
        Action::TurnLeft | Action::TurnRight => speed.x > 0.0,
    };
    if attractiveness >= 0 {
        if approaching { Feedback::Closer } else { Feedback::Farther }
    } else if previous_attractiveness >= 0 || approaching {
        Feedback::Appeared
    } else {
        Feedback::Receded
    }
}

pub fn dynamic_feature(
    initial: Feedback,
    attractiveness: i32,
    direction: f32,
    gustatory: Taste,
) -> String {
    if gustatory != Taste::Nothing {
        return Feedback::Eat.symbol().to_string();
    }
    let symbol = initial.symbol();
    if symbol.is_empty() {
        return String::new();
    }
    let fovea = if attractiveness >= 0 { ATTRACTIVE_FOVEA } else { REPULSIVE_FOVEA };
    let (right_edge, left_edge) = if attractiveness >= 0 {
        (direction <= -fovea, direction >= fovea)
    } else {
        (direction < -fovea, direction > fovea)
    };
    if right_edge {
        format!("|{symbol}")
    } else if left_edge {
        format!("{symbol}|")
    } else {
        symbol.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egomap_types::{StimulationValue, Touch};
    use std::f32::consts::FRAC_PI_2;

    fn focus(direction: f32, distance: f32, attractiveness: i32) -> Salience {
        let mut s = Salience::new(direction, 0.5, distance, StimulationValue::Tactile(Touch::Wall));
        s.attractiveness = attractiveness;
        s
    }

    fn ctx<'a>(previous: Option<&'a Observation>, action: Option<Action>) -> ObservationContext<'a> {
        ObservationContext {
            tick: 2,
            previous,
            kinematic: Kinematic::Forward,
            gustatory: Taste::Nothing,
            rotation: 0.0,
            action,
            initial_feedback: None,
        }
    }

    // ── speed ───────────────────────────────────────────────────────────────

    #[test]
    fn speed_is_zero_without_previous() {
        let obs = build(&focus(0.0, 3.0, 200), Rgb(0x00_80_00), &ctx(None, Some(Action::Forward)));
        assert_eq!(obs.speed, Vec3::zero());
        assert_eq!(obs.initial_feedback, Feedback::None);
        assert_eq!(obs.dynamic_feature, "");
    }

    #[test]
    fn turning_corrects_apparent_motion() {
        // A target straight ahead; the agent turns left by a small angle.
        let p = Vec3::new(1.0, 0.0, 0.0);
        let speed = relative_speed(p, p, 0.1);
        assert!((speed.y + 0.1).abs() < 1e-5);
        assert!(speed.x.abs() < 1e-5);
        assert_eq!(relative_speed(Vec3::zero(), Vec3::zero(), 0.5), Vec3::zero());
    }

    // ── initial feedback ────────────────────────────────────────────────────

    #[test]
    fn stepping_toward_attractive_focus_is_closer() {
        let prev = build(&focus(0.0, 3.0, 200), Rgb::UNSEEN, &ctx(None, None));
        let obs = build(&focus(0.0, 2.0, 200), Rgb::UNSEEN, &ctx(Some(&prev), Some(Action::Forward)));
        assert_eq!(obs.initial_feedback, Feedback::Closer);
        assert_eq!(obs.dynamic_feature, "+");
    }

    #[test]
    fn stepping_away_is_farther() {
        let prev = build(&focus(0.0, 2.0, 200), Rgb::UNSEEN, &ctx(None, None));
        let obs = build(&focus(0.0, 3.0, 200), Rgb::UNSEEN, &ctx(Some(&prev), Some(Action::Forward)));
        assert_eq!(obs.initial_feedback, Feedback::Farther);
    }

    #[test]
    fn repulsive_focus_appearing_after_attractive_one() {
        let prev = build(&focus(0.0, 3.0, 200), Rgb::UNSEEN, &ctx(None, None));
        let obs = build(&focus(0.0, 3.0, -300), Rgb::UNSEEN, &ctx(Some(&prev), Some(Action::TurnLeft)));
        assert_eq!(obs.initial_feedback, Feedback::Appeared);
    }

    #[test]
    fn repulsive_focus_receding_while_turning() {
        let prev = build(&focus(0.0, 1.0, -300), Rgb::UNSEEN, &ctx(None, None));
        // After a right turn the wall ahead appears on the left.
        let obs = build(&focus(FRAC_PI_4, 1.0, -300), Rgb::UNSEEN, &ctx(Some(&prev), Some(Action::TurnRight)));
        assert!(obs.speed.x < 0.0);
        assert_eq!(obs.initial_feedback, Feedback::Receded);
        assert_eq!(obs.dynamic_feature, "_|");
    }

    #[test]
    fn fixed_initial_feedback_is_reused() {
        let prev = build(&focus(0.0, 2.0, 200), Rgb::UNSEEN, &ctx(None, None));
        let mut c = ctx(Some(&prev), Some(Action::Forward));
        c.initial_feedback = Some(Feedback::Closer);
        let obs = build(&focus(0.0, 3.0, 200), Rgb::UNSEEN, &c);
        assert_eq!(obs.initial_feedback, Feedback::Closer);
    }

    // ── dynamic feature ─────────────────────────────────────────────────────

    #[test]
    fn fovea_marks_depend_on_sign() {
        assert_eq!(dynamic_feature(Feedback::Closer, 100, -FRAC_PI_2, Taste::Nothing), "|+");
        assert_eq!(dynamic_feature(Feedback::Closer, 100, FRAC_PI_2, Taste::Nothing), "+|");
        assert_eq!(dynamic_feature(Feedback::Closer, 100, 0.5, Taste::Nothing), "+");
        assert_eq!(dynamic_feature(Feedback::Appeared, -300, 0.5, Taste::Nothing), "*|");
        assert_eq!(dynamic_feature(Feedback::Appeared, -300, 0.05, Taste::Nothing), "*");
    }

    #[test]
    fn tasting_overrides_feature() {
        assert_eq!(dynamic_feature(Feedback::Farther, 100, 1.0, Taste::Food), "e");
        assert_eq!(dynamic_feature(Feedback::None, 0, 0.0, Taste::Cuddle), "e");
    }

    #[test]
    fn stimuli_prefix_bump() {
        let mut c = ctx(None, None);
        c.kinematic = Kinematic::Bump;
        c.gustatory = Taste::Food;
        let obs = build(&focus(0.0, 1.0, -300), Rgb::UNSEEN, &c);
        assert_eq!(obs.stimuli(), "we");
    }

    // ── serialisation ───────────────────────────────────────────────────────

    #[test]
    fn observation_roundtrips_through_json() {
        let obs = build(&focus(0.3, 1.5, 215), Rgb(0x00_80_00), &ctx(None, None));
        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(obs, back);
    }

    #[test]
    fn schema_names_the_feedback_fields() {
        let schema = serde_json::to_value(observation_schema()).unwrap();
        let props = &schema["properties"];
        assert!(props.get("initial_feedback").is_some());
        assert!(props.get("dynamic_feature").is_some());
        assert!(props.get("attractiveness").is_some());
    }
}
