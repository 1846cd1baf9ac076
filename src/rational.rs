//! Exact fraction arithmetic for musical time
//!
//! Every duration and cursor position in the engine is a `Fraction` of a
//! whole note, kept in lowest terms by `num-rational`. All control-flow
//! decisions (is the voice behind? is this a whole measure?) compare
//! fractions exactly; `to_f64` exists for display and logging only.
//! Tuplet factors like 2/3 have no finite binary representation, which is
//! why floats are never used for positions.

use num_rational::Rational64;

use crate::errors::ParseError;

/// Exact musical time value, in fractions of a whole note
pub type Fraction = Rational64;

/// Zero duration / measure origin
pub fn zero() -> Fraction {
    Fraction::new(0, 1)
}

/// Build a fraction, rejecting a zero denominator
pub fn checked(num: i64, den: i64) -> Result<Fraction, ParseError> {
    if den == 0 {
        return Err(ParseError::InvalidValue(format!(
            "fraction {num}/0 has zero denominator"
        )));
    }
    Ok(Fraction::new(num, den))
}

/// Convert a tick count at the given division scale to a fraction of a
/// whole note. `divisions` is ticks per quarter, so a whole is 4·divisions.
pub fn from_ticks(ticks: i64, divisions: i64) -> Result<Fraction, ParseError> {
    if divisions <= 0 {
        return Err(ParseError::InvalidValue(format!(
            "divisions must be positive, got {divisions}"
        )));
    }
    Ok(Fraction::new(ticks, divisions * 4))
}

/// Duration of a MusicXML graphic note type as a fraction of a whole note.
///
/// Returns `None` for unknown type names; the caller decides whether the
/// element is skipped or the tick count is trusted on its own.
pub fn graphic_duration(type_name: &str) -> Option<Fraction> {
    let f = match type_name {
        "long" => Fraction::new(4, 1),
        "breve" => Fraction::new(2, 1),
        "whole" => Fraction::new(1, 1),
        "half" => Fraction::new(1, 2),
        "quarter" => Fraction::new(1, 4),
        "eighth" => Fraction::new(1, 8),
        "16th" => Fraction::new(1, 16),
        "32nd" => Fraction::new(1, 32),
        "64th" => Fraction::new(1, 64),
        "128th" => Fraction::new(1, 128),
        "256th" => Fraction::new(1, 256),
        _ => return None,
    };
    Some(f)
}

/// Apply augmentation dots: each dot adds half of the previous increment,
/// so one dot is ×3/2, two dots ×7/4, three ×15/8.
pub fn with_dots(base: Fraction, dots: u8) -> Fraction {
    let mut total = base;
    let mut increment = base;
    for _ in 0..dots {
        increment = increment / 2;
        total += increment;
    }
    total
}

/// Lossy float view, for logs and rendering hints only
pub fn to_f64(f: Fraction) -> f64 {
    *f.numer() as f64 / *f.denom() as f64
}
