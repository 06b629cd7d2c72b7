//! The per-cycle spatial system.
//!
//! [`SpatialSystem`] owns every piece of state (registry, bundle table,
//! local-space memory, clock, previous observation) and runs one perception
//! cycle per [`SpatialSystem::step`]:
//!
//! 1. validate and intern the raw frame (nothing changes on rejection),
//! 2. tick the clock and move remembered places by the agent's motion,
//! 3. extract visual and tactile saliences,
//! 4. form bundles from what co-occurs in front of the agent,
//! 5. forget places contradicted by touch,
//! 6. score every salience, add remembered food, select the focus,
//! 7. build the observation and report it to the trace sink, if any.
//!
//! # Example
//!
//! ```rust
//! use egomap_runtime::{SensorFrame, SpatialSystem};
//!
//! let mut system = SpatialSystem::default();
//! let mut tactile = [0; 9];
//! tactile[3] = 1; // wall ahead
//! let frame = SensorFrame::blind(12, tactile).with_kinematic(1); // bumped
//!
//! let obs = system.step(&frame).unwrap();
//! assert_eq!(obs.attractiveness, -300);
//! assert_eq!(system.bundles().len(), 1);
//! ```

use egomap_memory::{Bundle, BundleTable, LocalSpaceMemory, StimulationRegistry};
use egomap_perception::{MotionDelta, RangedSample, SalienceExtractor, Vec3};
use egomap_types::{
    Action, BundleId, Kinematic, Modality, Rgb, SpatialError, StimulationRef, StimulationValue,
    Taste, Touch,
};
use tracing::{debug, debug_span, warn};

use crate::attention::{AttentionSelector, select};
use crate::config::SpatialConfig;
use crate::formation::{Cooccurrence, form_bundles, front_visual, resolve_conflicts};
use crate::observation::{self, Feedback, Observation, ObservationContext};
use crate::trace::{TraceEvent, TraceSink};

/// Index of the sector straight ahead in the tactile ring.
const TACTILE_AHEAD: usize = 3;
/// Index of the agent's own cell in the tactile ring.
const TACTILE_HERE: usize = 8;
/// Sectors around the agent; the last ring entry is the agent's own cell.
const TACTILE_SECTORS: usize = 8;

// ────────────────────────────────────────────────────────────────────────────
// SensorFrame
// ────────────────────────────────────────────────────────────────────────────

/// Raw sensor input for one cycle, as produced by the host environment.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    /// One `(0xRRGGBB, distance)` sample per retina pixel, rightmost first.
    pub visual: Vec<(u32, f32)>,
    /// Touch codes for the eight sectors around the agent, then the agent's
    /// own cell.
    pub tactile: [i32; 9],
    pub kinematic: i32,
    pub gustatory: i32,
    /// Explicit motion since the previous cycle.  When absent it is derived
    /// from `action`, or the agent is assumed not to have moved.
    pub motion: Option<MotionDelta>,
    /// An action starting with this cycle.
    pub action: Option<Action>,
}

impl SensorFrame {
    /// A frame where every pixel is unseen.
    pub fn blind(pixels: usize, tactile: [i32; 9]) -> Self {
        Self {
            visual: vec![(Rgb::UNSEEN.0, 10.0); pixels],
            tactile,
            kinematic: Kinematic::Forward.code(),
            gustatory: Taste::Nothing.code(),
            motion: None,
            action: None,
        }
    }

    pub fn with_kinematic(mut self, code: i32) -> Self {
        self.kinematic = code;
        self
    }

    pub fn with_gustatory(mut self, code: i32) -> Self {
        self.gustatory = code;
        self
    }

    pub fn with_motion(mut self, motion: MotionDelta) -> Self {
        self.motion = Some(motion);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }
}

/// A frame whose every code named a known value.
struct DecodedFrame {
    visual: Vec<(Rgb, f32)>,
    tactile: [Touch; 9],
    kinematic: Kinematic,
    taste: Taste,
}

fn malformed(channel: &str, details: String) -> SpatialError {
    SpatialError::MalformedInput {
        channel: channel.to_string(),
        details,
    }
}

fn decode(frame: &SensorFrame, resolution: usize) -> Result<DecodedFrame, SpatialError> {
    if frame.visual.len() != resolution {
        return Err(malformed(
            "visual",
            format!("expected {resolution} pixels, got {}", frame.visual.len()),
        ));
    }
    let visual = frame
        .visual
        .iter()
        .enumerate()
        .map(|(i, &(packed, distance))| {
            let rgb = Rgb::from_packed(packed)
                .ok_or_else(|| malformed("visual", format!("pixel {i}: {packed:#x} is not 0xRRGGBB")))?;
            if !distance.is_finite() || distance < 0.0 {
                return Err(malformed("visual", format!("pixel {i}: bad distance {distance}")));
            }
            Ok((rgb, distance))
        })
        .collect::<Result<Vec<_>, SpatialError>>()?;

    let mut tactile = [Touch::Empty; 9];
    for (slot, &code) in tactile.iter_mut().zip(frame.tactile.iter()) {
        *slot = Touch::from_code(code)
            .ok_or_else(|| malformed("tactile", format!("unknown touch code {code}")))?;
    }

    let kinematic = match StimulationValue::decode(Modality::Kinematic, frame.kinematic)? {
        StimulationValue::Kinematic(k) => k,
        other => return Err(malformed("kinematic", format!("decoded as {other:?}"))),
    };
    let taste = Taste::from_code(frame.gustatory)
        .ok_or_else(|| malformed("gustatory", format!("unknown taste code {}", frame.gustatory)))?;

    Ok(DecodedFrame {
        visual,
        tactile,
        kinematic,
        taste,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// SpatialSystem
// ────────────────────────────────────────────────────────────────────────────

pub struct SpatialSystem {
    config: SpatialConfig,
    registry: StimulationRegistry,
    bundles: BundleTable,
    memory: LocalSpaceMemory,
    selector: AttentionSelector,
    clock: u64,
    previous: Option<Observation>,
    action: Option<Action>,
    /// Fixed on the first cycle of `action`.
    initial_feedback: Option<Feedback>,
    trace: Option<Box<dyn TraceSink>>,
}

impl Default for SpatialSystem {
    fn default() -> Self {
        Self::new(SpatialConfig::default())
    }
}

impl SpatialSystem {
    pub fn new(config: SpatialConfig) -> Self {
        Self {
            registry: StimulationRegistry::new(),
            bundles: BundleTable::new(),
            memory: LocalSpaceMemory::new(config.location_radius, config.memory_radius),
            selector: AttentionSelector::new(config.attractiveness),
            clock: 0,
            previous: None,
            action: None,
            initial_feedback: None,
            trace: None,
            config,
        }
    }

    /// Attach a sink receiving one [`TraceEvent`] per cycle.
    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.trace = Some(sink);
        self
    }

    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.trace = sink;
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    pub fn bundles(&self) -> &BundleTable {
        &self.bundles
    }

    pub fn memory(&self) -> &LocalSpaceMemory {
        &self.memory
    }

    pub fn registry(&self) -> &StimulationRegistry {
        &self.registry
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn previous_observation(&self) -> Option<&Observation> {
        self.previous.as_ref()
    }

    /// Mark the start of `action`.  The next observation computes a fresh
    /// initial feedback; the ones after it reuse that feedback until another
    /// action begins.
    pub fn begin_action(&mut self, action: Action) {
        debug!(action = %action.label(), "action begins");
        self.action = Some(action);
        self.initial_feedback = None;
    }

    /// Run one perception cycle.
    ///
    /// # Errors
    ///
    /// [`SpatialError::MalformedInput`] when the frame does not decode; the
    /// system is left exactly as it was.
    pub fn step(&mut self, frame: &SensorFrame) -> Result<Observation, SpatialError> {
        let decoded = decode(frame, self.config.retina_resolution).inspect_err(|e| {
            warn!(error = %e, "sensor frame rejected");
        })?;

        self.clock += 1;
        let tick = self.clock;
        let _span = debug_span!("cycle", tick).entered();

        let ranged: Vec<RangedSample> = decoded
            .visual
            .iter()
            .map(|&(rgb, distance)| {
                RangedSample::new(self.registry.intern(StimulationValue::Visual(rgb)), distance)
            })
            .collect();
        let touches: Vec<StimulationRef> = decoded
            .tactile
            .iter()
            .map(|&t| self.registry.intern(StimulationValue::Tactile(t)))
            .collect();
        self.registry.intern(StimulationValue::Kinematic(decoded.kinematic));
        self.registry.intern(StimulationValue::Gustatory(decoded.taste));

        if let Some(action) = frame.action {
            self.begin_action(action);
        }
        let motion = frame.motion.unwrap_or_else(|| {
            frame.action.map_or(MotionDelta::stationary(), |a| {
                MotionDelta::from_action(a, decoded.kinematic)
            })
        });
        self.memory.step(&motion);
        let evicted = self.memory.evict_out_of_range();

        let mut saliences = SalienceExtractor::retina(self.config.retina_resolution).extract_ranged(&ranged);
        saliences.extend(SalienceExtractor::tactile().extract(&touches[..TACTILE_SECTORS]));

        let sensed = Cooccurrence {
            front_visual: front_visual(&saliences),
            front_touch: decoded.tactile[TACTILE_AHEAD],
            kinematic: decoded.kinematic,
            taste: decoded.taste,
        };
        form_bundles(&sensed, &mut self.bundles, &mut self.memory, tick)?;
        let forgotten = resolve_conflicts(
            decoded.tactile[TACTILE_AHEAD],
            decoded.tactile[TACTILE_HERE],
            &self.bundles,
            &mut self.memory,
        );

        self.selector.score(&mut saliences, &self.bundles, &mut self.memory, tick);
        saliences.extend(self.selector.remembered(&self.bundles, &self.memory, tick));
        let focus = select(&saliences)?;

        let focus_bundle = focus.evoked_bundle.and_then(|id| self.bundles.get(id));
        let focus_value = focus_bundle.map_or(focus.value.color(), Bundle::value);

        let ctx = ObservationContext {
            tick,
            previous: self.previous.as_ref(),
            kinematic: decoded.kinematic,
            gustatory: decoded.taste,
            rotation: motion.rotation,
            action: self.action,
            initial_feedback: self.initial_feedback,
        };
        let obs = observation::build(focus, focus_value, &ctx);
        if self.action.is_some() {
            self.initial_feedback = Some(obs.initial_feedback);
        }

        debug!(
            saliences = saliences.len(),
            evicted,
            forgotten,
            focus = %obs.focus_value,
            attractiveness = obs.attractiveness,
            stimuli = %obs.stimuli(),
            "cycle done"
        );

        if let Some(sink) = self.trace.as_mut() {
            let event = TraceEvent::new(
                tick,
                focus_value,
                obs.attractiveness,
                focus_bundle,
                self.memory.cell_colors(&self.bundles),
            );
            sink.record(&event);
        }

        self.previous = Some(obs.clone());
        Ok(obs)
    }

    /// Colour of the egocentric 3×3 cell at `row` (0 = left) and `col`
    /// (0 = ahead), as of the last cycle.
    pub fn cell_value(&self, row: usize, col: usize) -> Rgb {
        if let Some(prev) = &self.previous {
            if (row, col) == (1, 0) && prev.kinematic == Kinematic::Bump {
                return Kinematic::Bump.color();
            }
            if (row, col) == (1, 1) && prev.gustatory == Taste::Food {
                return Taste::Food.color();
            }
        }
        let position = Vec3::new(1.0 - col as f32, 1.0 - row as f32, 0.0);
        self.memory.value_at(position, &self.bundles)
    }

    pub fn merge_bundles(&mut self, keep: BundleId, absorb: BundleId) -> Result<BundleId, SpatialError> {
        self.bundles.merge(keep, absorb, &mut self.memory)
    }

    pub fn associate_act(&mut self, bundle: BundleId, act: &str) -> Result<BundleId, SpatialError> {
        self.bundles.associate_act(bundle, act, &mut self.memory)
    }

    /// Forget everything learned and start the clock again.  The
    /// configuration and trace sink are kept.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.bundles = BundleTable::new();
        self.memory.clear_all();
        self.clock = 0;
        self.previous = None;
        self.action = None;
        self.initial_feedback = None;
        debug!("spatial system reset");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
