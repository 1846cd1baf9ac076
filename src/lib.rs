//! MusicXML streaming notation converter
//!
//! Converts `score-partwise` MusicXML documents into tag/parameter
//! syntax trees for two target notations: a graphical score language
//! (the default) and a real-time performance-following language.
//!
//! The conversion is a single left-to-right walk of each part per
//! (staff, voice) pair. During the walk the engine reconstructs musical
//! time with exact rational arithmetic, balances nested output scopes,
//! pairs split constructs (beams, slurs, ties, tuplets, wedges, octave
//! shifts), and infers horizontal positions from the sparse coordinate
//! hints MusicXML provides.
//!
//! # Basic usage
//!
//! ```
//! use mxlconv::{convert_score, Settings};
//!
//! let musicxml = r#"<?xml version="1.0"?>
//! <score-partwise>
//!   <part id="P1">
//!     <measure number="1">
//!       <attributes><divisions>1</divisions></attributes>
//!       <note>
//!         <pitch><step>C</step><octave>4</octave></pitch>
//!         <duration>1</duration>
//!         <type>quarter</type>
//!       </note>
//!     </measure>
//!   </part>
//! </score-partwise>"#;
//!
//! let conversion = convert_score(musicxml, &Settings::default()).unwrap();
//! assert!(conversion.render().contains("c1*1/4"));
//! ```

pub mod engine;
pub mod errors;
pub mod rational;
pub mod settings;
pub mod tree;
pub mod xml;

pub use engine::{convert_score, Conversion, PartOutput};
pub use errors::{ConversionError, EngineError, ParseError, SkippedElement};
pub use settings::{BarPolicy, Dialect, MeasureRange, Settings};
pub use tree::{Param, Sink, TagTree};

/// Convenience wrapper: convert straight to the textual form
pub fn convert_to_text(xml: &str, settings: &Settings) -> Result<String, ConversionError> {
    convert_score(xml, settings).map(|c| c.render())
}
