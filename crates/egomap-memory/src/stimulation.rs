//! Stimulation Registry.
//!
//! Canonicalises decoded stimulation values into shared
//! [`StimulationRef`] handles so that two samples of the same value are the
//! *same* allocation.  Interning is idempotent and never removes anything;
//! the registry lives as long as the simulation and is only emptied by
//! [`StimulationRegistry::clear`] on restart.

use std::collections::HashMap;
use std::sync::Arc;

use egomap_types::{Modality, SpatialError, Stimulation, StimulationRef, StimulationValue};
use tracing::trace;

#[derive(Debug, Default)]
pub struct StimulationRegistry {
    interned: HashMap<StimulationValue, StimulationRef>,
}

impl StimulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical handle for `value`, creating it on first use.
    pub fn intern(&mut self, value: StimulationValue) -> StimulationRef {
        self.interned
            .entry(value)
            .or_insert_with(|| {
                trace!(?value, "new stimulation");
                Arc::new(Stimulation::new(value))
            })
            .clone()
    }

    /// Decode a raw upstream `code` for `modality` and intern it.
    ///
    /// # Errors
    ///
    /// [`SpatialError::MalformedInput`] when `code` is not a value of
    /// `modality`.
    pub fn intern_raw(
        &mut self,
        modality: Modality,
        code: i32,
    ) -> Result<StimulationRef, SpatialError> {
        let value = StimulationValue::decode(modality, code)?;
        Ok(self.intern(value))
    }

    pub fn get(&self, value: StimulationValue) -> Option<&StimulationRef> {
        self.interned.get(&value)
    }

    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }

    pub fn clear(&mut self) {
        self.interned.clear();
    }
}
