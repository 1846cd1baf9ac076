//! Begin/end matching for split constructs
//!
//! Beams, slurs, ties, tuplets, wedges and octave shifts arrive as
//! separate "start" and "stop" markers that must be reassembled into
//! paired output nodes. Each kind keeps its own small state machine:
//!
//! - Beams: XML beam numbers are reused across simultaneously open
//!   groups, so every begin gets an engine-assigned sequential id and a
//!   stop matches the most recent open entry with the same XML number.
//! - Slurs and ties: stacks matched the same way (ties carry no XML
//!   number, so their stack is purely LIFO).
//! - Tuplets: a nesting depth counter, since only one bracket may be
//!   visually open at a time; a second start while open is ignored.
//! - Wedges: the stop marker does not say whether a crescendo or a
//!   diminuendo was open, so the entry remembers its direction.
//! - Octave shifts: one at a time, carrying size and direction.
//!
//! A terminator with no matching opener is logged and ignored; openers
//! still unmatched at part end are dropped with a warning.

use crate::xml::WedgeKind;

/// Tuplet ratio payload from `<time-modification>` or the bracket marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupletRatio {
    pub actual: i64,
    pub normal: i64,
}

#[derive(Debug, Clone, Copy)]
struct NumberedEntry {
    internal_id: u32,
    number: i32,
}

#[derive(Debug, Clone, Copy)]
struct WedgeEntry {
    number: i32,
    crescendo: bool,
}

#[derive(Debug, Clone, Copy)]
struct ShiftEntry {
    size: i32,
    up: bool,
}

/// Per-walk pairing state for every construct kind
#[derive(Debug, Default)]
pub struct PairingRegistry {
    next_id: u32,
    beams: Vec<NumberedEntry>,
    slurs: Vec<NumberedEntry>,
    ties: Vec<u32>,
    tuplet_depth: u32,
    tuplet_ratio: Option<TupletRatio>,
    wedges: Vec<WedgeEntry>,
    shift: Option<ShiftEntry>,
}

impl PairingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    // ─── Beams ───────────────────────────────────────────────────────

    /// Open a beam group; returns the engine-assigned id to tag the
    /// opening output node with
    pub fn begin_beam(&mut self, number: i32) -> u32 {
        let internal_id = self.assign_id();
        self.beams.push(NumberedEntry { internal_id, number });
        internal_id
    }

    /// Close the most recently opened beam group with this XML number.
    /// The match is by the entry's own id, never positional.
    pub fn end_beam(&mut self, number: i32) -> Option<u32> {
        match self.beams.iter().rposition(|e| e.number == number) {
            Some(index) => Some(self.beams.remove(index).internal_id),
            None => {
                log::warn!("beam end with number {number} has no open beam; ignored");
                None
            }
        }
    }

    // ─── Slurs ───────────────────────────────────────────────────────

    pub fn begin_slur(&mut self, number: i32) -> u32 {
        let internal_id = self.assign_id();
        self.slurs.push(NumberedEntry { internal_id, number });
        internal_id
    }

    pub fn end_slur(&mut self, number: i32) -> Option<u32> {
        match self.slurs.iter().rposition(|e| e.number == number) {
            Some(index) => Some(self.slurs.remove(index).internal_id),
            None => {
                log::warn!("slur stop with number {number} has no open slur; ignored");
                None
            }
        }
    }

    // ─── Ties ────────────────────────────────────────────────────────

    pub fn begin_tie(&mut self) -> u32 {
        let internal_id = self.assign_id();
        self.ties.push(internal_id);
        internal_id
    }

    /// Ties carry no XML number and chain in order, so stops match the
    /// oldest open tie: a note that both ends one tie and starts the
    /// next must not close the tie it just opened.
    pub fn end_tie(&mut self) -> Option<u32> {
        if self.ties.is_empty() {
            log::warn!("tie stop with no open tie; ignored");
            return None;
        }
        Some(self.ties.remove(0))
    }

    // ─── Tuplets ─────────────────────────────────────────────────────

    /// Returns `Some(ratio)` when this start actually opens the bracket;
    /// a nested start only bumps the depth and is not re-opened.
    pub fn begin_tuplet(&mut self, ratio: TupletRatio) -> Option<TupletRatio> {
        self.tuplet_depth += 1;
        if self.tuplet_depth == 1 {
            self.tuplet_ratio = Some(ratio);
            Some(ratio)
        } else {
            None
        }
    }

    /// Returns true when the bracket really closes (depth back to zero)
    pub fn end_tuplet(&mut self) -> bool {
        if self.tuplet_depth == 0 {
            log::warn!("tuplet stop with no open tuplet; ignored");
            return false;
        }
        self.tuplet_depth -= 1;
        if self.tuplet_depth == 0 {
            self.tuplet_ratio = None;
            true
        } else {
            false
        }
    }

    pub fn in_tuplet(&self) -> bool {
        self.tuplet_depth > 0
    }

    /// Ratio of the currently open bracket, if any
    pub fn tuplet_ratio(&self) -> Option<TupletRatio> {
        self.tuplet_ratio
    }

    // ─── Wedges ──────────────────────────────────────────────────────

    pub fn begin_wedge(&mut self, kind: WedgeKind, number: i32) {
        let crescendo = match kind {
            WedgeKind::Crescendo => true,
            WedgeKind::Diminuendo => false,
            WedgeKind::Stop => {
                log::warn!("wedge stop passed to begin_wedge; ignored");
                return;
            }
        };
        self.wedges.push(WedgeEntry { number, crescendo });
    }

    /// Close the matching wedge, reporting which direction was open so
    /// the caller can emit the right closing tag
    pub fn end_wedge(&mut self, number: i32) -> Option<WedgeKind> {
        match self.wedges.iter().rposition(|e| e.number == number) {
            Some(index) => {
                let entry = self.wedges.remove(index);
                Some(if entry.crescendo {
                    WedgeKind::Crescendo
                } else {
                    WedgeKind::Diminuendo
                })
            }
            None => {
                log::warn!("wedge stop with number {number} has no open wedge; ignored");
                None
            }
        }
    }

    // ─── Octave shifts ───────────────────────────────────────────────

    pub fn begin_shift(&mut self, size: i32, up: bool) {
        if self.shift.is_some() {
            log::warn!("octave shift started while one is open; replacing");
        }
        self.shift = Some(ShiftEntry { size, up });
    }

    pub fn end_shift(&mut self) -> Option<(i32, bool)> {
        match self.shift.take() {
            Some(entry) => Some((entry.size, entry.up)),
            None => {
                log::warn!("octave-shift stop with no open shift; ignored");
                None
            }
        }
    }

    // ─── Part boundary ───────────────────────────────────────────────

    /// Drop unmatched openers so nothing leaks across part boundaries
    pub fn finish_part(&mut self) {
        for entry in self.beams.drain(..) {
            log::warn!("beam {} (number {}) never closed; dropped", entry.internal_id, entry.number);
        }
        for entry in self.slurs.drain(..) {
            log::warn!("slur {} (number {}) never closed; dropped", entry.internal_id, entry.number);
        }
        for id in self.ties.drain(..) {
            log::warn!("tie {id} never closed; dropped");
        }
        if self.tuplet_depth > 0 {
            log::warn!("tuplet still open at part end; dropped");
            self.tuplet_depth = 0;
            self.tuplet_ratio = None;
        }
        if !self.wedges.is_empty() {
            log::warn!("{} wedge(s) still open at part end; dropped", self.wedges.len());
            self.wedges.clear();
        }
        if self.shift.take().is_some() {
            log::warn!("octave shift still open at part end; dropped");
        }
    }
}
