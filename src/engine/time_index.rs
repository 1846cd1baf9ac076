//! Horizontal position index
//!
//! MusicXML places one element with an absolute `default-x` coordinate
//! and the next with a time-delta offset; the target notation only
//! understands offsets relative to whatever else sits at the same
//! musical instant. This index records every explicit horizontal
//! reference seen during the walk, keyed by measure and exact rational
//! position, and answers "how far right of the leftmost element at this
//! instant am I".
//!
//! The index is shared by every voice of a part (position inference is
//! inherently cross-voice) and cleared between parts. BTreeMaps keep
//! iteration deterministic; the minimum query itself is order-free.

use std::collections::BTreeMap;

use crate::rational::Fraction;

/// Tenths-to-halfspaces conversion for emitted offsets
const TENTHS_PER_HALFSPACE: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
struct RefEntry {
    reference: f64,
    voice: i32,
    staff: i32,
}

/// Per-part record of horizontal reference coordinates
#[derive(Debug, Default)]
pub struct TimePositionIndex {
    entries: BTreeMap<u32, BTreeMap<Fraction, Vec<RefEntry>>>,
}

impl TimePositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; called when a new part begins
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record an explicit horizontal reference at (measure, position).
    /// Entries accumulate across voices and staves; nothing is removed.
    pub fn record(
        &mut self,
        measure: u32,
        position: Fraction,
        voice: i32,
        staff: i32,
        reference: f64,
    ) {
        self.entries
            .entry(measure)
            .or_default()
            .entry(position)
            .or_default()
            .push(RefEntry { reference, voice, staff });
    }

    /// Minimum reference among entries at exactly (measure, position)
    /// matching the filters. A filter of 0 means "any".
    pub fn query_min_reference(
        &self,
        measure: u32,
        position: Fraction,
        voice_filter: i32,
        staff_filter: i32,
    ) -> Option<f64> {
        let slot = self.entries.get(&measure)?.get(&position)?;
        slot.iter()
            .filter(|e| voice_filter == 0 || e.voice == voice_filter)
            .filter(|e| staff_filter == 0 || e.staff == staff_filter)
            .map(|e| e.reference)
            .fold(None, |min, r| match min {
                Some(m) if m <= r => Some(m),
                _ => Some(r),
            })
    }

    /// Offset of `explicit` (or, failing that, `fallback`) relative to
    /// the leftmost element already recorded at this instant, scaled to
    /// output halfspace units. `None` means no position is inferable and
    /// the caller should emit without a hint.
    pub fn relative_offset(
        &self,
        explicit: Option<f64>,
        measure: u32,
        position: Fraction,
        voice_filter: i32,
        staff_filter: i32,
        fallback: Option<f64>,
    ) -> Option<f64> {
        let reference = explicit.or(fallback)?;
        let min = self.query_min_reference(measure, position, voice_filter, staff_filter)?;
        Some((reference - min) / TENTHS_PER_HALFSPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d)
    }

    #[test]
    fn minimum_is_insertion_order_independent() {
        let mut a = TimePositionIndex::new();
        a.record(1, pos(1, 4), 1, 1, 25.0);
        a.record(1, pos(1, 4), 2, 1, 10.0);

        let mut b = TimePositionIndex::new();
        b.record(1, pos(1, 4), 2, 1, 10.0);
        b.record(1, pos(1, 4), 1, 1, 25.0);

        assert_eq!(a.query_min_reference(1, pos(1, 4), 0, 0), Some(10.0));
        assert_eq!(
            a.query_min_reference(1, pos(1, 4), 0, 0),
            b.query_min_reference(1, pos(1, 4), 0, 0)
        );
    }

    #[test]
    fn relative_offset_scales_tenths() {
        let mut index = TimePositionIndex::new();
        index.record(2, pos(0, 1), 1, 1, 10.0);
        index.record(2, pos(0, 1), 2, 1, 25.0);

        let dx = index.relative_offset(Some(25.0), 2, pos(0, 1), 0, 1, None);
        assert_eq!(dx, Some(1.5));
    }

    #[test]
    fn filters_narrow_the_candidates() {
        let mut index = TimePositionIndex::new();
        index.record(1, pos(0, 1), 1, 1, 30.0);
        index.record(1, pos(0, 1), 2, 2, 12.0);

        assert_eq!(index.query_min_reference(1, pos(0, 1), 0, 0), Some(12.0));
        assert_eq!(index.query_min_reference(1, pos(0, 1), 1, 0), Some(30.0));
        assert_eq!(index.query_min_reference(1, pos(0, 1), 0, 1), Some(30.0));
        assert_eq!(index.query_min_reference(1, pos(0, 1), 3, 0), None);
    }

    #[test]
    fn fallback_reference_used_when_no_explicit() {
        let mut index = TimePositionIndex::new();
        index.record(1, pos(1, 2), 1, 1, 40.0);

        assert_eq!(
            index.relative_offset(None, 1, pos(1, 2), 0, 0, Some(60.0)),
            Some(2.0)
        );
        // no explicit, no fallback: nothing inferable
        assert_eq!(index.relative_offset(None, 1, pos(1, 2), 0, 0, None), None);
        // instant not in the index: nothing inferable either
        assert_eq!(
            index.relative_offset(Some(50.0), 1, pos(3, 4), 0, 0, None),
            None
        );
    }

    #[test]
    fn exact_positions_do_not_collide_across_tuplets() {
        let mut index = TimePositionIndex::new();
        // 1/3 and 0.333...: distinct instants under exact arithmetic
        index.record(1, pos(1, 3), 1, 1, 15.0);
        assert_eq!(index.query_min_reference(1, pos(333, 1000), 0, 0), None);
        assert_eq!(index.query_min_reference(1, pos(1, 3), 0, 0), Some(15.0));
    }
}
