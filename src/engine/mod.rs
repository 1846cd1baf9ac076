//! Conversion engine
//!
//! The part orchestrator discovers a part's (staff, voice) pairs with a
//! pre-scan, then drives one fresh `VoiceWalker` per voice, in ascending
//! staff order, over the same measure sequence. Voices sharing a staff
//! after the first are walked with shared constructs suppressed. The
//! time-position index is the one piece of state shared between walks,
//! and it is reset at every part boundary; the fixed walk order keeps
//! its contents deterministic.

pub mod pairing;
pub mod position;
pub mod scopes;
pub mod time_index;
pub mod walker;

use std::collections::BTreeMap;

use crate::errors::{ConversionError, SkippedElement};
use crate::settings::Settings;
use crate::tree::TagTree;
use crate::xml::{self, PartNode, ScoreDocument};

use position::VoiceTarget;
use time_index::TimePositionIndex;
use walker::VoiceWalker;

/// One part's converted output
#[derive(Debug)]
pub struct PartOutput {
    pub id: String,
    pub name: Option<String>,
    pub tree: TagTree,
    /// True when a walker invariant aborted this part; the tree holds
    /// whatever had been emitted up to that point
    pub failed: bool,
}

/// Result of converting a whole document
#[derive(Debug)]
pub struct Conversion {
    pub parts: Vec<PartOutput>,
    pub skipped: Vec<SkippedElement>,
}

impl Conversion {
    /// Textual form of every successfully converted part
    pub fn render(&self) -> String {
        self.parts
            .iter()
            .filter(|p| !p.failed)
            .map(|p| p.tree.render())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn failed_parts(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|p| p.failed)
            .map(|p| p.id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VoiceLayout {
    staff: i32,
    voice: i32,
    notes_only: bool,
}

/// Pre-scan a part's notes to find its (staff, voice) pairs.
///
/// Each voice is assigned to the staff holding most of its notes; voices
/// are then grouped per staff, ascending, and every voice after the
/// first on a staff is walked notes-only. Returns the staff count and
/// the walk order.
fn scan_voices(part: &PartNode) -> (usize, Vec<VoiceLayout>) {
    // voice -> staff -> note count
    let mut histogram: BTreeMap<i32, BTreeMap<i32, u32>> = BTreeMap::new();
    let mut staff_count = 1usize;

    for measure in part.measures() {
        for child in measure.children() {
            match child.tag_name().name() {
                "note" => {
                    let voice = xml::child_i64(child, "voice").map(|v| v as i32).unwrap_or(1);
                    let staff = xml::child_i64(child, "staff").map(|s| s as i32).unwrap_or(1);
                    staff_count = staff_count.max(staff.max(1) as usize);
                    *histogram.entry(voice).or_default().entry(staff).or_default() += 1;
                }
                "attributes" => {
                    if let Some(staves) = xml::child_i64(child, "staves") {
                        staff_count = staff_count.max(staves.max(1) as usize);
                    }
                }
                _ => {}
            }
        }
    }

    if histogram.is_empty() {
        // attribute-only parts still get one walk so clefs and meters
        // convert
        return (staff_count, vec![VoiceLayout { staff: 1, voice: 1, notes_only: false }]);
    }

    // main staff of each voice: most notes, ties to the lower staff
    let mut by_staff: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
    for (voice, staves) in &histogram {
        let main_staff = staves
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(staff, _)| *staff)
            .unwrap_or(1);
        by_staff.entry(main_staff).or_default().push(*voice);
    }

    let mut layouts = Vec::new();
    for (staff, voices) in by_staff {
        for (position, voice) in voices.into_iter().enumerate() {
            layouts.push(VoiceLayout {
                staff,
                voice,
                notes_only: position > 0,
            });
        }
    }
    (staff_count, layouts)
}

/// Convert a MusicXML document into per-part output trees.
///
/// Parsing failures are fatal; a part whose walk hits an engine
/// invariant is marked failed while the remaining parts still convert.
pub fn convert_score(xml: &str, settings: &Settings) -> Result<Conversion, ConversionError> {
    let doc = ScoreDocument::parse(xml)?;
    let mut conversion = Conversion { parts: Vec::new(), skipped: Vec::new() };
    let mut index = TimePositionIndex::new();

    for part in doc.parts() {
        let id = part.id();
        if !settings.wants_part(id) {
            continue;
        }
        index.clear();

        let (staff_count, layouts) = scan_voices(&part);
        let mut tree = TagTree::new();
        let mut failed = false;

        for layout in layouts {
            if !settings.wants_voice(layout.voice) || !settings.wants_staff(layout.staff) {
                continue;
            }
            let target = VoiceTarget {
                staff: layout.staff,
                voice: layout.voice,
                notes_only: layout.notes_only,
            };
            let mut walker = VoiceWalker::new(
                settings,
                id,
                target,
                staff_count,
                &mut tree,
                &mut index,
                &mut conversion.skipped,
            );
            if let Err(e) = walker.walk(part) {
                log::error!("part {id}: conversion aborted: {e}");
                failed = true;
                break;
            }
        }

        conversion.parts.push(PartOutput {
            id: id.to_string(),
            name: doc.part_name(id),
            tree,
            failed,
        });
    }

    Ok(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn scan(xml: &str) -> (usize, Vec<VoiceLayout>) {
        let doc = Document::parse(xml).unwrap();
        scan_voices(&PartNode::new(doc.root_element()))
    }

    #[test]
    fn single_voice_part() {
        let (staves, layouts) = scan(
            r#"<part id="P1"><measure number="1">
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
               </measure></part>"#,
        );
        assert_eq!(staves, 1);
        assert_eq!(layouts, vec![VoiceLayout { staff: 1, voice: 1, notes_only: false }]);
    }

    #[test]
    fn two_voices_sharing_a_staff() {
        let (_, layouts) = scan(
            r#"<part id="P1"><measure number="1">
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><voice>1</voice></note>
                 <backup><duration>1</duration></backup>
                 <note><pitch><step>E</step><octave>3</octave></pitch><duration>1</duration><voice>2</voice></note>
               </measure></part>"#,
        );
        assert_eq!(
            layouts,
            vec![
                VoiceLayout { staff: 1, voice: 1, notes_only: false },
                VoiceLayout { staff: 1, voice: 2, notes_only: true },
            ]
        );
    }

    #[test]
    fn voices_grouped_by_main_staff_in_staff_order() {
        let (staves, layouts) = scan(
            r#"<part id="P1"><measure number="1">
                 <attributes><staves>2</staves></attributes>
                 <note><pitch><step>C</step><octave>3</octave></pitch><duration>1</duration><voice>5</voice><staff>2</staff></note>
                 <backup><duration>1</duration></backup>
                 <note><pitch><step>C</step><octave>5</octave></pitch><duration>1</duration><voice>1</voice><staff>1</staff></note>
               </measure></part>"#,
        );
        assert_eq!(staves, 2);
        assert_eq!(
            layouts,
            vec![
                VoiceLayout { staff: 1, voice: 1, notes_only: false },
                VoiceLayout { staff: 2, voice: 5, notes_only: false },
            ]
        );
    }

    #[test]
    fn attribute_only_part_still_walks_once() {
        let (_, layouts) = scan(
            r#"<part id="P1"><measure number="1">
                 <attributes><divisions>1</divisions></attributes>
               </measure></part>"#,
        );
        assert_eq!(layouts.len(), 1);
        assert!(!layouts[0].notes_only);
    }

    #[test]
    fn voice_straddling_staves_uses_its_main_staff() {
        let (_, layouts) = scan(
            r#"<part id="P1"><measure number="1">
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration><voice>1</voice><staff>1</staff></note>
                 <note><pitch><step>D</step><octave>4</octave></pitch><duration>1</duration><voice>1</voice><staff>2</staff></note>
                 <note><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration><voice>1</voice><staff>1</staff></note>
               </measure></part>"#,
        );
        assert_eq!(layouts, vec![VoiceLayout { staff: 1, voice: 1, notes_only: false }]);
    }
}
