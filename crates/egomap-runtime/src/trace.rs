//! Per-cycle trace events.
//!
//! A [`TraceSink`] attached to the spatial system receives one
//! [`TraceEvent`] per cycle: the focus, the bundle it evokes, and the colour
//! of the nine egocentric cells.  Sinks only observe; the system computes the
//! same observations with or without one.

use std::io::Write;

use chrono::{DateTime, Utc};
use egomap_memory::Bundle;
use egomap_types::{BundleId, Kinematic, Rgb, Taste, Touch};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Serialisable view of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleSummary {
    pub id: BundleId,
    /// Six hex digits, when the bundle has a visual value.
    pub visual: Option<String>,
    pub tactile: Option<Touch>,
    pub kinematic: Option<Kinematic>,
    pub gustatory: Option<Taste>,
    pub last_time_bundled: u64,
}

impl From<&Bundle> for BundleSummary {
    fn from(bundle: &Bundle) -> Self {
        Self {
            id: bundle.id,
            visual: bundle.visual.map(Rgb::hex),
            tactile: bundle.tactile,
            kinematic: bundle.kinematic,
            gustatory: bundle.gustatory,
            last_time_bundled: bundle.last_time_bundled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub clock: u64,
    /// Hex colour of the focus.
    pub focus_value: String,
    pub focus_attractiveness: i32,
    pub focus_bundle: Option<BundleSummary>,
    /// Hex colour of each egocentric cell, indexed by direction.
    pub local_space: [String; 9],
}

impl TraceEvent {
    pub fn new(
        clock: u64,
        focus_value: Rgb,
        focus_attractiveness: i32,
        focus_bundle: Option<&Bundle>,
        cells: [Rgb; 9],
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            clock,
            focus_value: focus_value.hex(),
            focus_attractiveness,
            focus_bundle: focus_bundle.map(BundleSummary::from),
            local_space: cells.map(Rgb::hex),
        }
    }
}

/// Receiver of per-cycle trace events.
pub trait TraceSink: Send {
    fn record(&mut self, event: &TraceEvent);
}

/// Emits each event as a structured `tracing` record.
#[derive(Debug, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn record(&mut self, event: &TraceEvent) {
        info!(
            clock = event.clock,
            focus = %event.focus_value,
            attractiveness = event.focus_attractiveness,
            bundle = ?event.focus_bundle.as_ref().map(|b| b.id),
            local_space = ?event.local_space,
            "focus"
        );
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for RecordingSink {
    fn record(&mut self, event: &TraceEvent) {
        self.events.push(event.clone());
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> TraceSink for JsonLinesSink<W> {
    fn record(&mut self, event: &TraceEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "trace event not serialisable");
                return;
            }
        };
        if let Err(e) = writeln!(self.writer, "{line}") {
            warn!(error = %e, "trace write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> TraceEvent {
        let mut bundle = Bundle::new(BundleId(3), 7);
        bundle.tactile = Some(Touch::Wall);
        bundle.kinematic = Some(Kinematic::Bump);
        let mut cells = [Rgb::UNSEEN; 9];
        cells[3] = Touch::Wall.color();
        TraceEvent::new(7, Touch::Wall.color(), -300, Some(&bundle), cells)
    }

    #[test]
    fn event_renders_hex_cells() {
        let e = event();
        assert_eq!(e.focus_value, "008000");
        assert_eq!(e.local_space[3], "008000");
        assert_eq!(e.local_space[8], "FFFFFF");
        assert_eq!(e.focus_bundle.as_ref().map(|b| b.id), Some(BundleId(3)));
    }

    #[test]
    fn recording_sink_keeps_events() {
        let mut sink = RecordingSink::default();
        sink.record(&event());
        sink.record(&event());
        assert_eq!(sink.events.len(), 2);
        assert_ne!(sink.events[0].id, sink.events[1].id);
    }

    #[test]
    fn json_lines_sink_writes_one_line_per_event() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.record(&event());
        sink.record(&event());
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: TraceEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back.clock, 7);
        assert_eq!(back.focus_attractiveness, -300);
    }

    #[test]
    fn log_sink_accepts_events() {
        LogSink.record(&event());
    }
}
