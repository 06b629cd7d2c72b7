//! `egomap-types` – shared vocabulary of the egocentric spatial system.
//!
//! Every raw integer code that crosses the sensor boundary is decoded into one
//! of the closed enumerations below, so an illegal stimulation can only exist
//! as a [`SpatialError::MalformedInput`], never as a value flowing through the
//! memory.

use std::fmt;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Modalities and stimulation values
// ────────────────────────────────────────────────────────────────────────────

/// The sensory channel a stimulation arrives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Modality {
    Visual,
    Tactile,
    Kinematic,
    Gustatory,
    /// Social contact, delivered on the gustatory channel.
    Social,
}

/// A packed `0xRRGGBB` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Rgb(pub u32);

impl Rgb {
    /// Sentinel returned for cells and pixels where nothing has been seen.
    pub const UNSEEN: Rgb = Rgb(0xFF_FF_FF);

    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self((u32::from(red) << 16) | (u32::from(green) << 8) | u32::from(blue))
    }

    /// Accept a packed colour, rejecting anything wider than 24 bits.
    pub fn from_packed(packed: u32) -> Option<Self> {
        (packed <= 0xFF_FF_FF).then_some(Self(packed))
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Six upper-case hex digits, e.g. `"008000"`.
    pub fn hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.red(), self.green(), self.blue())
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// What a tactile sector reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Touch {
    Empty,
    Wall,
    Food,
    Agent,
}

impl Touch {
    pub fn code(self) -> i32 {
        match self {
            Touch::Empty => 0,
            Touch::Wall => 1,
            Touch::Food => 2,
            Touch::Agent => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Touch::Empty),
            1 => Some(Touch::Wall),
            2 => Some(Touch::Food),
            3 => Some(Touch::Agent),
            _ => None,
        }
    }

    /// Display colour used by trace dumps and the cell view.
    pub fn color(self) -> Rgb {
        match self {
            Touch::Empty => Rgb::UNSEEN,
            Touch::Wall => Rgb(0x00_80_00),
            Touch::Food => Rgb(0x64_95_ED),
            Touch::Agent => Rgb(0xFF_A5_00),
        }
    }
}

/// Outcome of the agent's own motion during the last cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Kinematic {
    Forward,
    Bump,
}

impl Kinematic {
    pub fn code(self) -> i32 {
        match self {
            Kinematic::Forward => 0,
            Kinematic::Bump => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Kinematic::Forward),
            1 => Some(Kinematic::Bump),
            _ => None,
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Kinematic::Forward => Rgb::UNSEEN,
            Kinematic::Bump => Rgb(0xFF_00_00),
        }
    }
}

/// What the gustatory channel reports.  `Cuddle` is a social contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Taste {
    Nothing,
    Food,
    Cuddle,
}

impl Taste {
    pub fn code(self) -> i32 {
        match self {
            Taste::Nothing => 0,
            Taste::Food => 1,
            Taste::Cuddle => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Taste::Nothing),
            1 => Some(Taste::Food),
            2 => Some(Taste::Cuddle),
            _ => None,
        }
    }

    pub fn modality(self) -> Modality {
        match self {
            Taste::Cuddle => Modality::Social,
            _ => Modality::Gustatory,
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Taste::Nothing => Rgb::UNSEEN,
            Taste::Food => Rgb(0xFF_FF_00),
            Taste::Cuddle => Rgb(0xFF_69_B4),
        }
    }
}

/// A decoded stimulation value.  The variant fixes the modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum StimulationValue {
    Visual(Rgb),
    Tactile(Touch),
    Kinematic(Kinematic),
    Gustatory(Taste),
}

impl StimulationValue {
    pub fn modality(self) -> Modality {
        match self {
            StimulationValue::Visual(_) => Modality::Visual,
            StimulationValue::Tactile(_) => Modality::Tactile,
            StimulationValue::Kinematic(_) => Modality::Kinematic,
            StimulationValue::Gustatory(taste) => taste.modality(),
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            StimulationValue::Visual(rgb) => rgb,
            StimulationValue::Tactile(touch) => touch.color(),
            StimulationValue::Kinematic(kinematic) => kinematic.color(),
            StimulationValue::Gustatory(taste) => taste.color(),
        }
    }

    /// Decode a raw upstream code for `modality`.
    ///
    /// # Errors
    ///
    /// [`SpatialError::MalformedInput`] when the code does not name a value of
    /// that modality.
    pub fn decode(modality: Modality, code: i32) -> Result<Self, SpatialError> {
        let decoded = match modality {
            Modality::Visual => u32::try_from(code)
                .ok()
                .and_then(Rgb::from_packed)
                .map(StimulationValue::Visual),
            Modality::Tactile => Touch::from_code(code).map(StimulationValue::Tactile),
            Modality::Kinematic => Kinematic::from_code(code).map(StimulationValue::Kinematic),
            Modality::Gustatory | Modality::Social => Taste::from_code(code)
                .filter(|taste| modality == Modality::Gustatory || taste.modality() == modality)
                .map(StimulationValue::Gustatory),
        };
        decoded.ok_or_else(|| SpatialError::MalformedInput {
            channel: format!("{modality:?}"),
            details: format!("unknown code {code}"),
        })
    }
}

/// One canonical stimulation.  Instances are owned by the stimulation
/// registry; everybody else holds a [`StimulationRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stimulation {
    value: StimulationValue,
}

impl Stimulation {
    pub fn new(value: StimulationValue) -> Self {
        Self { value }
    }

    pub fn value(&self) -> StimulationValue {
        self.value
    }

    pub fn modality(&self) -> Modality {
        self.value.modality()
    }
}

/// Shared handle to an interned [`Stimulation`].
pub type StimulationRef = Arc<Stimulation>;

// ────────────────────────────────────────────────────────────────────────────
// Identities and interaction vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// Handle of a bundle in the bundle table.  Never reused within one table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct BundleId(pub u32);

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bundle#{}", self.0)
    }
}

/// Primitive actions the decision layer may intend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Action {
    /// `>` – move one step forward.
    Forward,
    /// `^` – turn counter-clockwise.
    TurnLeft,
    /// `v` – turn clockwise.
    TurnRight,
}

impl Action {
    pub fn label(self) -> char {
        match self {
            Action::Forward => '>',
            Action::TurnLeft => '^',
            Action::TurnRight => 'v',
        }
    }

    pub fn from_label(label: char) -> Option<Self> {
        match label {
            '>' => Some(Action::Forward),
            '^' => Some(Action::TurnLeft),
            'v' => Some(Action::TurnRight),
            _ => None,
        }
    }
}

/// Attractiveness regime: touched (peripersonal) or only seen (extrapersonal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Reach {
    Peripersonal,
    Extrapersonal,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by every egomap crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpatialError {
    #[error("Malformed {channel} input: {details}")]
    MalformedInput { channel: String, details: String },

    #[error("Unknown bundle: {0}")]
    UnknownBundle(BundleId),

    #[error("Cannot merge {0} into itself")]
    SelfMerge(BundleId),

    #[error("Attention selection over an empty salience list")]
    EmptySalienceList,

    #[error("Configuration error: {0}")]
    Config(String),
}
