//! `egomap-memory` – what the agent remembers.
//!
//! All three stores are plain owned values; the runtime's spatial system
//! holds one of each and threads them through every cycle.
//!
//! # Modules
//!
//! - [`stimulation`] – [`StimulationRegistry`][stimulation::StimulationRegistry]:
//!   interns decoded stimulation values into shared handles.
//! - [`bundle`] – [`BundleTable`][bundle::BundleTable]: persistent multimodal
//!   identities, deduplicated by value tuple, merged when a shared act proves
//!   two of them denote the same object.
//! - [`local_space`] – [`LocalSpaceMemory`][local_space::LocalSpaceMemory]:
//!   egocentric places re-anchored after every motion and forgotten beyond a
//!   fixed radius.
//! - [`attractiveness`] – [`AttractivenessPolicy`][attractiveness::AttractivenessPolicy]:
//!   the decaying score attention uses to rank bundles.

pub mod attractiveness;
pub mod bundle;
pub mod local_space;
pub mod stimulation;

pub use attractiveness::AttractivenessPolicy;
pub use bundle::{Bundle, BundleKey, BundleTable};
pub use local_space::{LocalSpaceMemory, Place};
pub use stimulation::StimulationRegistry;
