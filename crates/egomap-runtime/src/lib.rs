//! `egomap-runtime` – the per-cycle spatial attention loop.
//!
//! Ties the registry, bundle table and local-space memory together into one
//! [`SpatialSystem`] that turns raw sensor frames into [`Observation`]s for a
//! decision layer.
//!
//! # Modules
//!
//! - [`system`] – [`SpatialSystem`]: owns all state and runs one
//!   perception cycle per [`SpatialSystem::step`].
//! - [`attention`] – [`AttentionSelector`]: scores saliences against known
//!   bundles and picks the focus with the largest absolute attractiveness.
//! - [`formation`] – bundle creation and reinforcement from stimulations
//!   sensed together in front of the agent, and eviction of contradicted
//!   places.
//! - [`observation`] – [`Observation`] and the symbolic feedback describing
//!   how the focus moved relative to the agent.
//! - [`trace`] – [`TraceSink`] and the per-cycle [`TraceEvent`].
//! - [`config`] – [`SpatialConfig`], loaded from TOML with `EGOMAP_*`
//!   environment overrides.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to export cycle spans to
//!   any OTLP-compatible collector.

pub mod attention;
pub mod config;
pub mod formation;
pub mod observation;
pub mod system;
pub mod telemetry;
pub mod trace;

pub use attention::{AttentionSelector, select};
pub use config::SpatialConfig;
pub use observation::{Feedback, Observation, observation_schema};
pub use system::{SensorFrame, SpatialSystem};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use trace::{JsonLinesSink, LogSink, RecordingSink, TraceEvent, TraceSink};
