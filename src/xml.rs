//! XML input layer for MusicXML documents
//!
//! Thin wrappers around roxmltree that give the engine typed access to
//! the source tree: document/part/measure handles, child lookup helpers,
//! and per-element data extraction (`NoteData`, `DirectionData`). The
//! walker never touches raw XML beyond what this module exposes.

use roxmltree::{Document, Node};

use crate::errors::ParseError;

/// Wrapper around a parsed `score-partwise` document
pub struct ScoreDocument<'a> {
    doc: Document<'a>,
}

impl<'a> ScoreDocument<'a> {
    /// Parse a MusicXML string. DOCTYPE declarations are common in
    /// MusicXML exports, so DTDs are allowed (but not processed).
    pub fn parse(xml: &'a str) -> Result<Self, ParseError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = Document::parse_with_options(xml, options)
            .map_err(|e| ParseError::InvalidXml(format!("XML parse error: {e}")))?;

        let root = doc.root_element();
        if root.tag_name().name() != "score-partwise" {
            return Err(ParseError::UnsupportedFormat(format!(
                "expected score-partwise, found {}",
                root.tag_name().name()
            )));
        }

        Ok(Self { doc })
    }

    fn root(&self) -> Node<'_, 'a> {
        self.doc.root_element()
    }

    /// All `<part>` elements, in document order
    pub fn parts(&self) -> Vec<PartNode<'_>> {
        self.root()
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "part")
            .map(PartNode::new)
            .collect()
    }

    /// Part display name from `<part-list>`, by part ID
    pub fn part_name(&self, id: &str) -> Option<String> {
        let part_list = child(self.root(), "part-list")?;
        for sp in part_list.children().filter(|n| n.is_element()) {
            if sp.tag_name().name() == "score-part" && sp.attribute("id") == Some(id) {
                return child_text(sp, "part-name").map(|s| s.trim().to_string());
            }
        }
        None
    }
}

/// Wrapper around a `<part>` element
#[derive(Clone, Copy)]
pub struct PartNode<'a> {
    node: Node<'a, 'a>,
}

impl<'a> PartNode<'a> {
    pub fn new(node: Node<'a, 'a>) -> Self {
        Self { node }
    }

    pub fn id(&self) -> &'a str {
        self.node.attribute("id").unwrap_or("unknown")
    }

    pub fn measures(&self) -> Vec<MeasureNode<'a>> {
        self.node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "measure")
            .map(MeasureNode::new)
            .collect()
    }
}

/// Wrapper around a `<measure>` element
#[derive(Clone, Copy)]
pub struct MeasureNode<'a> {
    node: Node<'a, 'a>,
}

impl<'a> MeasureNode<'a> {
    pub fn new(node: Node<'a, 'a>) -> Self {
        Self { node }
    }

    /// Measure number attribute; implicit/pickup measures without a
    /// parseable number come back as 0
    pub fn number(&self) -> u32 {
        self.node
            .attribute("number")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// All element children, in document order
    pub fn children(&self) -> impl Iterator<Item = Node<'a, 'a>> {
        self.node.children().filter(|n| n.is_element())
    }

    /// First `<note>` following `node` in this measure. Used for chord
    /// and tuplet lookahead; the measure handle is passed explicitly so
    /// the lookup needs no stored back-reference.
    pub fn next_note_after(&self, node: Node<'a, 'a>) -> Option<Node<'a, 'a>> {
        let mut seen = false;
        for child in self.children() {
            if seen && child.tag_name().name() == "note" {
                return Some(child);
            }
            if child == node {
                seen = true;
            }
        }
        None
    }
}

// ─── Child lookup helpers ────────────────────────────────────────────

/// First child element with the given tag name
pub fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// Trimmed text content of the first child with the given tag
pub fn child_text<'a>(node: Node<'a, 'a>, tag: &str) -> Option<&'a str> {
    child(node, tag).and_then(|n| n.text()).map(str::trim)
}

/// Integer text content of the first child with the given tag
pub fn child_i64(node: Node, tag: &str) -> Option<i64> {
    child_text(node, tag).and_then(|s| s.parse().ok())
}

/// Float attribute value on `node`
pub fn attr_f64(node: Node, name: &str) -> Option<f64> {
    node.attribute(name).and_then(|s| s.parse().ok())
}

/// Integer attribute value on `node`, with a default
pub fn attr_i32_or(node: Node, name: &str, default: i32) -> i32 {
    node.attribute(name)
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

// ─── Shared element vocabularies ─────────────────────────────────────

/// A start/stop marker pair, as MusicXML spells paired constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStop {
    Start,
    Stop,
    Continue,
}

impl StartStop {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "start" | "begin" => Some(StartStop::Start),
            "stop" | "end" => Some(StartStop::Stop),
            "continue" => Some(StartStop::Continue),
            _ => None,
        }
    }
}

/// Stem orientation from `<stem>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemDirection {
    Up,
    Down,
    None,
}

/// Diatonic pitch with chromatic alteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pitch {
    /// Scale step (0=C .. 6=B)
    pub step: u8,
    /// Chromatic alteration (-2 double flat .. +2 double sharp)
    pub alter: i8,
    /// Octave number, 4 = the middle-C octave
    pub octave: i8,
}

/// Parse a `<pitch>` element
pub fn parse_pitch(pitch_node: Node) -> Result<Pitch, ParseError> {
    let step_str = child_text(pitch_node, "step")
        .ok_or_else(|| ParseError::MissingElement("pitch missing step".into()))?;
    let step = match step_str {
        "C" => 0,
        "D" => 1,
        "E" => 2,
        "F" => 3,
        "G" => 4,
        "A" => 5,
        "B" => 6,
        other => {
            return Err(ParseError::InvalidValue(format!("invalid step: {other}")));
        }
    };

    let octave_str = child_text(pitch_node, "octave")
        .ok_or_else(|| ParseError::MissingElement("pitch missing octave".into()))?;
    let octave: i8 = octave_str
        .parse()
        .map_err(|_| ParseError::InvalidValue(format!("invalid octave: {octave_str}")))?;

    // <alter> may be fractional for microtonal scores; this engine rounds
    // to the nearest semitone
    let alter = child_text(pitch_node, "alter")
        .and_then(|s| s.parse::<f32>().ok())
        .map(|a| a.round() as i8)
        .unwrap_or(0);

    Ok(Pitch { step, alter, octave })
}

/// Parse `<divisions>` out of an `<attributes>` element
pub fn parse_divisions(attributes_node: Node) -> Option<i64> {
    child_i64(attributes_node, "divisions")
}

/// Key signature: circle-of-fifths position and mode string
pub fn parse_key(key_node: Node) -> Option<(i8, String)> {
    let fifths = child_text(key_node, "fifths").and_then(|s| s.parse().ok())?;
    let mode = child_text(key_node, "mode").unwrap_or("major").to_string();
    Some((fifths, mode))
}

/// Time signature numerator/denominator
pub fn parse_time(time_node: Node) -> Option<(u32, u32)> {
    let beats = child_text(time_node, "beats").and_then(|s| s.parse().ok())?;
    let beat_type = child_text(time_node, "beat-type").and_then(|s| s.parse().ok())?;
    Some((beats, beat_type))
}

/// Clef sign and staff line
pub fn parse_clef(clef_node: Node) -> Option<(String, Option<u8>, i32)> {
    let sign = child_text(clef_node, "sign")?.to_string();
    let line = child_text(clef_node, "line").and_then(|s| s.parse().ok());
    let staff = attr_i32_or(clef_node, "number", 1);
    Some((sign, line, staff))
}

// ─── Note extraction ─────────────────────────────────────────────────

/// Everything the walker needs from one `<note>` element
#[derive(Debug, Clone, Default)]
pub struct NoteData {
    pub is_rest: bool,
    /// `<rest measure="yes">`: duration is the full measure regardless of
    /// the tick count
    pub whole_measure_rest: bool,
    /// `<chord/>` present: this note re-states the chord's start time
    pub is_chord_member: bool,
    pub is_grace: bool,
    pub grace_slash: bool,
    pub is_cue: bool,
    pub pitch: Option<Pitch>,
    /// Tick count; absent for grace notes
    pub duration_ticks: Option<i64>,
    pub type_name: Option<String>,
    pub dots: u8,
    /// `<time-modification>` (actual-notes, normal-notes)
    pub time_modification: Option<(i64, i64)>,
    pub voice: i32,
    pub staff: i32,
    pub stem: Option<StemDirection>,
    /// Absolute horizontal reference, in tenths
    pub default_x: Option<f64>,
    pub ties: Vec<StartStop>,
    /// Beam markers as (xml number, action)
    pub beams: Vec<(i32, StartStop)>,
    /// Slur markers as (xml number, action)
    pub slurs: Vec<(i32, StartStop)>,
    /// Tuplet bracket markers as (xml number, action)
    pub tuplets: Vec<(i32, StartStop)>,
    /// Articulation tag names (staccato, accent, tenuto, ...)
    pub articulations: Vec<String>,
    /// Ornament tag names (trill-mark, mordent, turn, ...)
    pub ornaments: Vec<String>,
    pub fermata: bool,
    /// Explicit `<accidental>` text, forcing the glyph in the output
    pub accidental: Option<String>,
    pub lyric: Option<Lyric>,
}

/// One lyric syllable attached to a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lyric {
    pub text: String,
    /// begin/middle syllables carry a continuation hyphen
    pub hyphenated: bool,
}

impl NoteData {
    /// Extract the typed fields of a `<note>` element.
    ///
    /// Only a malformed mandatory value is an error; everything optional
    /// that fails to parse is simply absent.
    pub fn from_node(note: Node) -> Result<Self, ParseError> {
        let mut data = NoteData {
            voice: 1,
            staff: 1,
            ..NoteData::default()
        };

        if let Some(rest) = child(note, "rest") {
            data.is_rest = true;
            data.whole_measure_rest = rest.attribute("measure") == Some("yes");
        }
        data.is_chord_member = child(note, "chord").is_some();
        data.is_cue = child(note, "cue").is_some();
        if let Some(grace) = child(note, "grace") {
            data.is_grace = true;
            data.grace_slash = grace.attribute("slash") == Some("yes");
        }

        if !data.is_rest {
            if let Some(pitch_node) = child(note, "pitch") {
                data.pitch = Some(parse_pitch(pitch_node)?);
            }
        }

        if let Some(text) = child_text(note, "duration") {
            let ticks: i64 = text
                .parse()
                .map_err(|_| ParseError::InvalidValue(format!("invalid duration: {text}")))?;
            data.duration_ticks = Some(ticks);
        } else if !data.is_grace {
            return Err(ParseError::MissingElement("note missing duration".into()));
        }

        data.type_name = child_text(note, "type").map(str::to_string);
        data.dots = note
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "dot")
            .count() as u8;

        if let Some(tm) = child(note, "time-modification") {
            let actual = child_i64(tm, "actual-notes")
                .ok_or_else(|| ParseError::MissingElement("time-modification missing actual-notes".into()))?;
            let normal = child_i64(tm, "normal-notes")
                .ok_or_else(|| ParseError::MissingElement("time-modification missing normal-notes".into()))?;
            data.time_modification = Some((actual, normal));
        }

        data.voice = child_i64(note, "voice").map(|v| v as i32).unwrap_or(1);
        data.staff = child_i64(note, "staff").map(|s| s as i32).unwrap_or(1);
        data.stem = child_text(note, "stem").map(|s| match s {
            "up" => StemDirection::Up,
            "down" => StemDirection::Down,
            _ => StemDirection::None,
        });
        data.default_x = attr_f64(note, "default-x");
        data.accidental = child_text(note, "accidental").map(str::to_string);

        for tie in note
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "tie")
        {
            if let Some(kind) = tie.attribute("type").and_then(StartStop::parse) {
                data.ties.push(kind);
            }
        }

        for beam in note
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "beam")
        {
            let number = attr_i32_or(beam, "number", 1);
            if let Some(action) = beam.text().map(str::trim).and_then(StartStop::parse) {
                data.beams.push((number, action));
            }
        }

        if let Some(notations) = child(note, "notations") {
            for n in notations.children().filter(|n| n.is_element()) {
                match n.tag_name().name() {
                    "slur" => {
                        if let Some(kind) = n.attribute("type").and_then(StartStop::parse) {
                            data.slurs.push((attr_i32_or(n, "number", 1), kind));
                        }
                    }
                    "tuplet" => {
                        if let Some(kind) = n.attribute("type").and_then(StartStop::parse) {
                            data.tuplets.push((attr_i32_or(n, "number", 1), kind));
                        }
                    }
                    "tied" => {
                        // <tied> is the notation twin of <tie>; only used
                        // when the sound-level <tie> is absent
                        if data.ties.is_empty() {
                            if let Some(kind) = n.attribute("type").and_then(StartStop::parse) {
                                data.ties.push(kind);
                            }
                        }
                    }
                    "articulations" => {
                        for a in n.children().filter(|n| n.is_element()) {
                            data.articulations.push(a.tag_name().name().to_string());
                        }
                    }
                    "ornaments" => {
                        for o in n.children().filter(|n| n.is_element()) {
                            data.ornaments.push(o.tag_name().name().to_string());
                        }
                    }
                    "fermata" => data.fermata = true,
                    _ => {}
                }
            }
        }

        data.lyric = parse_lyric(note);

        Ok(data)
    }
}

/// First-verse lyric syllable, if any
fn parse_lyric(note: Node) -> Option<Lyric> {
    for lyric in note
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "lyric")
    {
        if lyric.attribute("number").unwrap_or("1") != "1" {
            continue;
        }
        let text = child_text(lyric, "text")?.to_string();
        if text.is_empty() {
            continue;
        }
        let hyphenated = matches!(child_text(lyric, "syllabic"), Some("begin") | Some("middle"));
        return Some(Lyric { text, hyphenated });
    }
    None
}

// ─── Direction extraction ────────────────────────────────────────────

/// Wedge variants carried by a `<wedge>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WedgeKind {
    Crescendo,
    Diminuendo,
    Stop,
}

/// Octave-shift variants carried by an `<octave-shift>` element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Up,
    Down,
    Stop,
}

/// One `<direction-type>` payload
#[derive(Debug, Clone, PartialEq)]
pub enum DirectionKind {
    /// Dynamic mark name (p, f, sfz, ...)
    Dynamics(String),
    Wedge { kind: WedgeKind, number: i32 },
    Words(String),
    OctaveShift { kind: ShiftKind, size: i32 },
    /// Metronome mark: beat unit and per-minute text
    Metronome(String, String),
    Segno,
    Coda,
}

/// Everything the walker needs from one `<direction>` element
#[derive(Debug, Clone, Default)]
pub struct DirectionData {
    pub kinds: Vec<DirectionKind>,
    pub staff: Option<i32>,
    pub placement_below: bool,
    /// Time delta from the current position, in ticks
    pub offset_ticks: Option<i64>,
    /// Absolute horizontal reference of the first payload, in tenths
    pub default_x: Option<f64>,
    /// Literal relative offset of the first payload, in tenths
    pub relative_x: Option<f64>,
}

impl DirectionData {
    pub fn from_node(direction: Node) -> Self {
        let mut data = DirectionData {
            placement_below: direction.attribute("placement") == Some("below"),
            staff: child_i64(direction, "staff").map(|s| s as i32),
            offset_ticks: child_i64(direction, "offset"),
            ..DirectionData::default()
        };

        for dt in direction
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "direction-type")
        {
            for payload in dt.children().filter(|n| n.is_element()) {
                if data.default_x.is_none() {
                    data.default_x = attr_f64(payload, "default-x");
                }
                if data.relative_x.is_none() {
                    data.relative_x = attr_f64(payload, "relative-x");
                }
                match payload.tag_name().name() {
                    "dynamics" => {
                        if let Some(mark) = payload.children().find(|n| n.is_element()) {
                            data.kinds
                                .push(DirectionKind::Dynamics(mark.tag_name().name().to_string()));
                        }
                    }
                    "wedge" => {
                        let kind = match payload.attribute("type") {
                            Some("crescendo") => Some(WedgeKind::Crescendo),
                            Some("diminuendo") => Some(WedgeKind::Diminuendo),
                            Some("stop") => Some(WedgeKind::Stop),
                            _ => None,
                        };
                        if let Some(kind) = kind {
                            data.kinds.push(DirectionKind::Wedge {
                                kind,
                                number: attr_i32_or(payload, "number", 1),
                            });
                        }
                    }
                    "words" => {
                        if let Some(text) = payload.text().map(str::trim) {
                            if !text.is_empty() {
                                data.kinds.push(DirectionKind::Words(text.to_string()));
                            }
                        }
                    }
                    "octave-shift" => {
                        let kind = match payload.attribute("type") {
                            Some("up") => Some(ShiftKind::Up),
                            Some("down") => Some(ShiftKind::Down),
                            Some("stop") => Some(ShiftKind::Stop),
                            _ => None,
                        };
                        if let Some(kind) = kind {
                            data.kinds.push(DirectionKind::OctaveShift {
                                kind,
                                size: attr_i32_or(payload, "size", 8),
                            });
                        }
                    }
                    "metronome" => {
                        let unit = child_text(payload, "beat-unit").unwrap_or("quarter");
                        if let Some(pm) = child_text(payload, "per-minute") {
                            data.kinds
                                .push(DirectionKind::Metronome(unit.to_string(), pm.to_string()));
                        }
                    }
                    "segno" => data.kinds.push(DirectionKind::Segno),
                    "coda" => data.kinds.push(DirectionKind::Coda),
                    _ => {}
                }
            }
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_fragment(xml: &str) -> Document<'_> {
        Document::parse(xml).unwrap()
    }

    #[test]
    fn document_requires_partwise_root() {
        match ScoreDocument::parse("<score-timewise/>") {
            Err(ParseError::UnsupportedFormat(_)) => {}
            other => panic!("expected UnsupportedFormat, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn pitch_parsing() {
        let doc = parse_fragment("<pitch><step>G</step><alter>-1</alter><octave>3</octave></pitch>");
        let p = parse_pitch(doc.root_element()).unwrap();
        assert_eq!(p.step, 4);
        assert_eq!(p.alter, -1);
        assert_eq!(p.octave, 3);
    }

    #[test]
    fn pitch_rejects_bad_step() {
        let doc = parse_fragment("<pitch><step>H</step><octave>4</octave></pitch>");
        assert!(parse_pitch(doc.root_element()).is_err());
    }

    #[test]
    fn note_extraction_covers_pairing_markers() {
        let doc = parse_fragment(
            r#"<note default-x="37.5">
                 <pitch><step>C</step><octave>4</octave></pitch>
                 <duration>2</duration>
                 <voice>1</voice>
                 <type>eighth</type>
                 <stem>up</stem>
                 <beam number="1">begin</beam>
                 <notations>
                   <slur type="start" number="2"/>
                   <tuplet type="start" number="1"/>
                   <articulations><staccato/></articulations>
                 </notations>
               </note>"#,
        );
        let data = NoteData::from_node(doc.root_element()).unwrap();
        assert_eq!(data.duration_ticks, Some(2));
        assert_eq!(data.beams, vec![(1, StartStop::Start)]);
        assert_eq!(data.slurs, vec![(2, StartStop::Start)]);
        assert_eq!(data.tuplets, vec![(1, StartStop::Start)]);
        assert_eq!(data.articulations, vec!["staccato".to_string()]);
        assert_eq!(data.stem, Some(StemDirection::Up));
        assert_eq!(data.default_x, Some(37.5));
    }

    #[test]
    fn grace_note_has_no_duration() {
        let doc = parse_fragment(
            r#"<note><grace slash="yes"/><pitch><step>D</step><octave>5</octave></pitch><voice>1</voice></note>"#,
        );
        let data = NoteData::from_node(doc.root_element()).unwrap();
        assert!(data.is_grace);
        assert!(data.grace_slash);
        assert_eq!(data.duration_ticks, None);
    }

    #[test]
    fn note_without_duration_is_rejected() {
        let doc = parse_fragment(
            r#"<note><pitch><step>C</step><octave>4</octave></pitch></note>"#,
        );
        assert!(NoteData::from_node(doc.root_element()).is_err());
    }

    #[test]
    fn direction_extraction() {
        let doc = parse_fragment(
            r#"<direction placement="below">
                 <direction-type><dynamics default-x="12"><ff/></dynamics></direction-type>
                 <direction-type><wedge type="crescendo" number="1"/></direction-type>
                 <offset>4</offset>
                 <staff>2</staff>
               </direction>"#,
        );
        let data = DirectionData::from_node(doc.root_element());
        assert!(data.placement_below);
        assert_eq!(data.staff, Some(2));
        assert_eq!(data.offset_ticks, Some(4));
        assert_eq!(data.default_x, Some(12.0));
        assert_eq!(data.kinds.len(), 2);
        assert_eq!(data.kinds[0], DirectionKind::Dynamics("ff".into()));
    }

    #[test]
    fn next_note_lookahead() {
        let doc = parse_fragment(
            r#"<measure number="1">
                 <note><pitch><step>C</step><octave>4</octave></pitch><duration>1</duration></note>
                 <backup><duration>1</duration></backup>
                 <note><chord/><pitch><step>E</step><octave>4</octave></pitch><duration>1</duration></note>
               </measure>"#,
        );
        let measure = MeasureNode::new(doc.root_element());
        let first = child(doc.root_element(), "note").unwrap();
        let next = measure.next_note_after(first).unwrap();
        assert!(child(next, "chord").is_some());
        assert!(measure.next_note_after(next).is_none());
    }
}
