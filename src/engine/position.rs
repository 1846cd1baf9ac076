//! Measure and voice cursor tracking
//!
//! Two cursors advance during a walk: the measure cursor tracks the
//! furthest time reached by any voice sharing the measure, the voice
//! cursor only the target voice's own progress. The gap between them is
//! what the walker fills with rests. A third, beat-valued cursor feeds
//! the performance dialect's event timing.

use crate::errors::ParseError;
use crate::rational::{self, Fraction};

/// Identifies which (staff, voice) a walk is filtering for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceTarget {
    pub staff: i32,
    pub voice: i32,
    /// Suppress shared constructs (clefs, keys, meters, barlines,
    /// directions) because this staff was already walked for another
    /// voice
    pub notes_only: bool,
}

/// Per-walk mutable position state
#[derive(Debug, Clone)]
pub struct PositionTracker {
    division: i64,
    measure_position: Fraction,
    measure_length: Fraction,
    voice_position: Fraction,
    cursor_beat: Fraction,
}

impl PositionTracker {
    pub fn new() -> Self {
        PositionTracker {
            division: 1,
            measure_position: rational::zero(),
            measure_length: rational::zero(),
            voice_position: rational::zero(),
            cursor_beat: Fraction::new(1, 1),
        }
    }

    pub fn measure_position(&self) -> Fraction {
        self.measure_position
    }

    pub fn measure_length(&self) -> Fraction {
        self.measure_length
    }

    pub fn voice_position(&self) -> Fraction {
        self.voice_position
    }

    /// Beat cursor, 1-based within the measure
    pub fn cursor_beat(&self) -> Fraction {
        self.cursor_beat
    }

    pub fn division(&self) -> i64 {
        self.division
    }

    /// Scale change from a `<divisions>` element. Applies to subsequent
    /// tick conversions only; emitted positions are never rescaled.
    pub fn set_division(&mut self, division: i64) -> Result<(), ParseError> {
        if division <= 0 {
            return Err(ParseError::InvalidValue(format!(
                "divisions must be positive, got {division}"
            )));
        }
        self.division = division;
        Ok(())
    }

    /// Tick count at the current scale, as a fraction of a whole note
    pub fn from_ticks(&self, ticks: i64) -> Fraction {
        Fraction::new(ticks, self.division * 4)
    }

    pub fn on_measure_start(&mut self) {
        self.measure_position = rational::zero();
        self.measure_length = rational::zero();
        self.voice_position = rational::zero();
        self.cursor_beat = Fraction::new(1, 1);
    }

    /// Advance the measure cursor (and optionally the voice cursor, for
    /// notes belonging to the target voice). Negative durations rewind,
    /// which is how backup is expressed; the running maximum keeps
    /// `measure_length` correct across rewinds.
    pub fn advance_measure_cursor(&mut self, duration: Fraction, also_voice: bool) {
        self.measure_position += duration;
        if self.measure_position > self.measure_length {
            self.measure_length = self.measure_position;
        }
        if also_voice {
            self.voice_position += duration;
        }
    }

    pub fn advance_voice_cursor(&mut self, duration: Fraction) {
        self.voice_position += duration;
    }

    /// Chord continuation notes re-state the chord's start time; rewind
    /// the voice cursor by the previous member's duration before the new
    /// member advances it again.
    pub fn rollback_voice(&mut self, duration: Fraction) {
        self.voice_position -= duration;
    }

    /// Advance the beat cursor by a whole-note fraction (one beat = one
    /// quarter).
    pub fn advance_cursor_beat(&mut self, duration: Fraction) {
        self.cursor_beat += duration * Fraction::new(4, 1);
    }

    /// Catch the voice cursor up to `target`. A positive gap is returned
    /// for the caller to fill (the cursor advances here); a negative gap
    /// means the voice ran ahead of the measure, which is reported and
    /// left uncorrected.
    pub fn catch_up_voice(&mut self, target: Fraction) -> Option<Fraction> {
        let diff = target - self.voice_position;
        if diff > rational::zero() {
            self.voice_position = target;
            Some(diff)
        } else {
            if diff < rational::zero() {
                log::warn!(
                    "voice position {} ahead of target {} by {}",
                    self.voice_position,
                    target,
                    -diff
                );
            }
            None
        }
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_length_is_running_maximum() {
        let mut pos = PositionTracker::new();
        pos.set_division(2).unwrap();
        pos.advance_measure_cursor(pos.from_ticks(4), false); // half note
        pos.advance_measure_cursor(-pos.from_ticks(4), false); // backup
        pos.advance_measure_cursor(pos.from_ticks(2), false); // quarter
        assert_eq!(pos.measure_position(), Fraction::new(1, 4));
        assert_eq!(pos.measure_length(), Fraction::new(1, 2));
    }

    #[test]
    fn catch_up_fills_exact_gap_once() {
        let mut pos = PositionTracker::new();
        pos.set_division(2).unwrap();
        // voice emitted a half note; measure reached a whole
        pos.advance_measure_cursor(Fraction::new(1, 1), false);
        pos.advance_voice_cursor(Fraction::new(1, 2));

        let gap = pos.catch_up_voice(pos.measure_length()).unwrap();
        assert_eq!(gap, Fraction::new(1, 2));
        assert_eq!(pos.voice_position(), pos.measure_length());
        // a second catch-up finds nothing to fill
        assert_eq!(pos.catch_up_voice(pos.measure_length()), None);
    }

    #[test]
    fn negative_gap_is_not_corrected() {
        let mut pos = PositionTracker::new();
        pos.advance_voice_cursor(Fraction::new(1, 2));
        assert_eq!(pos.catch_up_voice(Fraction::new(1, 4)), None);
        assert_eq!(pos.voice_position(), Fraction::new(1, 2));
    }

    #[test]
    fn division_change_affects_only_later_ticks() {
        let mut pos = PositionTracker::new();
        pos.set_division(2).unwrap();
        let quarter = pos.from_ticks(2);
        pos.set_division(8).unwrap();
        assert_eq!(quarter, Fraction::new(1, 4));
        assert_eq!(pos.from_ticks(2), Fraction::new(1, 16));
        assert!(pos.set_division(0).is_err());
    }

    #[test]
    fn beat_cursor_counts_quarters_from_one() {
        let mut pos = PositionTracker::new();
        assert_eq!(pos.cursor_beat(), Fraction::new(1, 1));
        pos.advance_cursor_beat(Fraction::new(1, 4));
        assert_eq!(pos.cursor_beat(), Fraction::new(2, 1));
        pos.advance_cursor_beat(Fraction::new(1, 8));
        assert_eq!(pos.cursor_beat(), Fraction::new(5, 2));
        pos.on_measure_start();
        assert_eq!(pos.cursor_beat(), Fraction::new(1, 1));
    }
}
