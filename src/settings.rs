//! Conversion settings
//!
//! Options recognized by the engine. Hosts embedding the library can
//! round-trip these through serde.

use serde::{Deserialize, Serialize};

/// Which target notation the walker emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// Graphical score notation: pitch/duration tokens, barlines,
    /// positioning hints in halfspace units
    Score,
    /// Real-time performance-following notation: beat-cursor event list,
    /// measure markers instead of barline glyphs
    Performance,
}

/// When barlines are emitted at measure boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarPolicy {
    /// A bar after every measure (unless the measure suppresses it)
    Always,
    /// Only after measures the voice underfilled, where the filler makes
    /// the boundary worth marking
    WhenUnderfull,
}

/// Restrict conversion to a measure subrange.
///
/// Outside the range, output is suppressed but position tracking still
/// advances, so cursors are correct when the range is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureRange {
    pub start: u32,
    pub end: u32,
    /// Extra ticks past the end measure's barline, for ranges that stop
    /// mid-measure
    pub end_offset: Option<i64>,
}

/// Configuration options consumed by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub dialect: Dialect,

    /// Emit measure-number comments into the output tree
    pub generate_comments: bool,

    /// Track stem direction changes and emit stem tags
    pub generate_stems: bool,

    pub generate_bars: BarPolicy,

    /// Enable horizontal-position inference from the time-position index.
    /// When false, only literal relative offsets present in the source
    /// are used.
    pub generate_positions: bool,

    pub measure_range: Option<MeasureRange>,

    /// Part IDs to convert; `None` means all
    pub parts: Option<Vec<String>>,
    /// Voice numbers to convert; `None` means all
    pub voices: Option<Vec<i32>>,
    /// Staff numbers to convert; `None` means all
    pub staves: Option<Vec<i32>>,
    /// Measure numbers to convert; `None` means all
    pub measures: Option<Vec<u32>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Score,
            generate_comments: false,
            generate_stems: true,
            generate_bars: BarPolicy::Always,
            generate_positions: true,
            measure_range: None,
            parts: None,
            voices: None,
            staves: None,
            measures: None,
        }
    }
}

impl Settings {
    pub fn wants_part(&self, id: &str) -> bool {
        match &self.parts {
            Some(ids) => ids.iter().any(|p| p == id),
            None => true,
        }
    }

    pub fn wants_voice(&self, voice: i32) -> bool {
        match &self.voices {
            Some(vs) => vs.contains(&voice),
            None => true,
        }
    }

    pub fn wants_staff(&self, staff: i32) -> bool {
        match &self.staves {
            Some(ss) => ss.contains(&staff),
            None => true,
        }
    }

    /// Measure-range/measure-filter predicate gating all output emission
    pub fn in_measure_range(&self, number: u32) -> bool {
        if let Some(range) = &self.measure_range {
            if number < range.start || number > range.end {
                return false;
            }
        }
        match &self.measures {
            Some(ms) => ms.contains(&number),
            None => true,
        }
    }
}
