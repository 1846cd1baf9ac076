//! Per-(staff, voice) walker
//!
//! One `VoiceWalker` is constructed per (staff, voice) pair and driven
//! once, left to right, over the part's measures. It owns its position
//! tracker, scope stack and pairing registry; the time-position index is
//! shared across the voices of a part. Dispatch is a single exhaustive
//! match on the closed set of measure-level event kinds.

use roxmltree::Node;

use crate::errors::{EngineError, SkippedElement};
use crate::rational::{self, Fraction};
use crate::settings::{BarPolicy, Dialect, Settings};
use crate::tree::{Param, Sink};
use crate::xml::{
    self, DirectionData, DirectionKind, MeasureNode, NoteData, PartNode, Pitch, ShiftKind,
    StartStop, StemDirection, WedgeKind,
};

use super::pairing::{PairingRegistry, TupletRatio};
use super::position::{PositionTracker, VoiceTarget};
use super::scopes::{ScopeKind, ScopeStack};
use super::time_index::TimePositionIndex;

/// Closed set of measure-level source events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MeasureEvent {
    Attributes,
    Note,
    Backup,
    Forward,
    Direction,
    Barline,
    Harmony,
    FiguredBass,
    Print,
    Sound,
    Other,
}

fn classify(tag: &str) -> MeasureEvent {
    match tag {
        "attributes" => MeasureEvent::Attributes,
        "note" => MeasureEvent::Note,
        "backup" => MeasureEvent::Backup,
        "forward" => MeasureEvent::Forward,
        "direction" => MeasureEvent::Direction,
        "barline" => MeasureEvent::Barline,
        "harmony" => MeasureEvent::Harmony,
        "figured-bass" => MeasureEvent::FiguredBass,
        "print" => MeasureEvent::Print,
        "sound" => MeasureEvent::Sound,
        _ => MeasureEvent::Other,
    }
}

/// Streaming converter for one (staff, voice) of one part
pub struct VoiceWalker<'a, S: Sink> {
    settings: &'a Settings,
    part_id: &'a str,
    target: VoiceTarget,
    /// Number of staves in the part; staff-assignment tags are only
    /// meaningful past one
    staff_count: usize,
    sink: &'a mut S,
    index: &'a mut TimePositionIndex,
    skipped: &'a mut Vec<SkippedElement>,

    pos: PositionTracker,
    scopes: ScopeStack,
    pairing: PairingRegistry,

    measure_number: u32,
    /// Length of a full measure per the current time signature
    time_length: Fraction,
    pending_bar: bool,
    suppress_next_bar: bool,
    double_next_bar: bool,
    measure_empty: bool,
    in_chord: bool,
    /// Duration of the previous emitted note, for chord rollback
    last_note_duration: Option<Fraction>,
    current_stem: Option<StemDirection>,
    current_staff: i32,
}

impl<'a, S: Sink> VoiceWalker<'a, S> {
    pub fn new(
        settings: &'a Settings,
        part_id: &'a str,
        target: VoiceTarget,
        staff_count: usize,
        sink: &'a mut S,
        index: &'a mut TimePositionIndex,
        skipped: &'a mut Vec<SkippedElement>,
    ) -> Self {
        VoiceWalker {
            settings,
            part_id,
            target,
            staff_count,
            sink,
            index,
            skipped,
            pos: PositionTracker::new(),
            scopes: ScopeStack::new(),
            pairing: PairingRegistry::new(),
            measure_number: 0,
            time_length: Fraction::new(1, 1),
            pending_bar: false,
            suppress_next_bar: false,
            double_next_bar: false,
            measure_empty: true,
            in_chord: false,
            last_note_duration: None,
            current_stem: None,
            current_staff: target.staff,
        }
    }

    /// Drive the walk over every measure of `part`
    pub fn walk(&mut self, part: PartNode) -> Result<(), EngineError> {
        self.scopes
            .push(&mut *self.sink, ScopeKind::Voice, "seq", Vec::new(), true);
        if self.staff_count > 1 {
            self.leaf(true, "\\staff", vec![Param::raw(self.target.staff.to_string())]);
        }

        for measure in part.measures() {
            self.walk_measure(measure)?;
        }

        self.pairing.finish_part();
        self.scopes.unwind_all(&mut *self.sink)
    }

    fn walk_measure(&mut self, measure: MeasureNode) -> Result<(), EngineError> {
        self.measure_number = measure.number();
        let emit = self.settings.in_measure_range(self.measure_number);
        let shared = emit && !self.target.notes_only;

        self.pos.on_measure_start();
        self.last_note_duration = None;

        // a repeat-start barline in this measure collides with (and
        // replaces) a pending bar from the previous measure's end
        let repeat_start = measure.children().any(|c| {
            classify(c.tag_name().name()) == MeasureEvent::Barline
                && xml::child(c, "repeat")
                    .and_then(|r| r.attribute("direction"))
                    == Some("forward")
        });
        if self.pending_bar && !self.suppress_next_bar && !repeat_start {
            self.emit_bar(shared);
        }
        self.pending_bar = false;
        self.suppress_next_bar = false;
        self.double_next_bar = false;

        if self.settings.generate_comments && emit {
            self.sink
                .append_comment(&format!("measure {}", self.measure_number));
        }
        self.measure_empty = true;

        for child in measure.children() {
            match classify(child.tag_name().name()) {
                MeasureEvent::Attributes => self.on_attributes(child, shared),
                MeasureEvent::Note => self.on_note(child, measure, emit)?,
                MeasureEvent::Backup => self.on_backup(child),
                MeasureEvent::Forward => self.on_forward(child, emit),
                MeasureEvent::Direction => self.on_direction(child, shared),
                MeasureEvent::Barline => self.on_barline(child, shared),
                MeasureEvent::Harmony => {
                    self.record_skip("harmony", "chord symbols are not converted")
                }
                MeasureEvent::FiguredBass => {
                    self.record_skip("figured-bass", "figured bass is not converted")
                }
                MeasureEvent::Print | MeasureEvent::Sound | MeasureEvent::Other => {}
            }
        }

        // measure boundary checkpoints
        self.scopes.close_text_scopes(&mut *self.sink)?;
        if self.in_chord {
            self.scopes.pop(&mut *self.sink, ScopeKind::Chord)?;
            self.in_chord = false;
        }
        self.scopes.close_cue_and_grace(&mut *self.sink)?;

        let target_length = self.pos.measure_length();
        let underfull = match self.pos.catch_up_voice(target_length) {
            Some(gap) => {
                self.emit_filler(gap, emit);
                true
            }
            None => false,
        };

        // an empty measure still gets delimited, otherwise it would fuse
        // with its neighbour in the output
        self.pending_bar = match self.settings.generate_bars {
            BarPolicy::Always => true,
            BarPolicy::WhenUnderfull => underfull || self.measure_empty,
        };
        Ok(())
    }

    // ─── Attributes ──────────────────────────────────────────────────

    fn on_attributes(&mut self, node: Node, shared: bool) {
        if let Some(div) = xml::parse_divisions(node) {
            if let Err(e) = self.pos.set_division(div) {
                self.record_skip("divisions", &e.to_string());
            }
        }

        if let Some(key_node) = xml::child(node, "key") {
            if let Some((fifths, _mode)) = xml::parse_key(key_node) {
                self.leaf(shared, "\\key", vec![Param::raw(fifths.to_string())]);
            }
        }

        if let Some(time_node) = xml::child(node, "time") {
            if let Some((beats, beat_type)) = xml::parse_time(time_node) {
                if beat_type > 0 {
                    self.time_length = Fraction::new(beats as i64, beat_type as i64);
                    self.leaf(
                        shared,
                        "\\meter",
                        vec![Param::text(format!("{beats}/{beat_type}"))],
                    );
                }
            }
        }

        for clef_node in node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "clef")
        {
            let Some((sign, line, staff)) = xml::parse_clef(clef_node) else {
                self.record_skip("clef", "clef missing sign");
                continue;
            };
            if staff != self.target.staff {
                continue;
            }
            let name = match sign.as_str() {
                "G" => format!("g{}", line.unwrap_or(2)),
                "F" => format!("f{}", line.unwrap_or(4)),
                "C" => format!("c{}", line.unwrap_or(3)),
                "percussion" => "perc".to_string(),
                other => {
                    self.record_skip("clef", &format!("unknown clef sign: {other}"));
                    continue;
                }
            };
            self.leaf(shared, "\\clef", vec![Param::text(name)]);
        }
    }

    // ─── Notes ───────────────────────────────────────────────────────

    fn on_note(&mut self, node: Node, measure: MeasureNode, emit: bool) -> Result<(), EngineError> {
        let data = match NoteData::from_node(node) {
            Ok(data) => data,
            Err(e) => {
                self.record_skip("note", &e.to_string());
                return Ok(());
            }
        };
        let duration = self.note_duration(&data);

        // every explicit horizontal reference feeds the index, whatever
        // voice it belongs to: other voices query against it
        if self.settings.generate_positions {
            if let Some(x) = data.default_x {
                self.index.record(
                    self.measure_number,
                    self.pos.measure_position(),
                    data.voice,
                    data.staff,
                    x,
                );
            }
        }

        if data.voice != self.target.voice {
            if !data.is_chord_member && !data.is_grace {
                self.pos.advance_measure_cursor(duration, false);
            }
            return Ok(());
        }

        self.scopes.close_text_scopes(&mut *self.sink)?;
        self.check_cue(&data, emit)?;
        self.check_grace(&data, emit)?;

        if data.staff != self.current_staff {
            self.current_staff = data.staff;
            self.leaf(emit, "\\staff", vec![Param::raw(data.staff.to_string())]);
        }

        if data.is_chord_member {
            // a chord member re-states the chord's start time
            if let Some(previous) = self.last_note_duration {
                self.pos.rollback_voice(previous);
            }
        } else {
            if self.in_chord {
                self.scopes.pop(&mut *self.sink, ScopeKind::Chord)?;
                self.in_chord = false;
            }
            if !data.is_grace {
                if let Some(gap) = self.pos.catch_up_voice(self.pos.measure_position()) {
                    self.emit_filler(gap, emit);
                }
            }
            if self.next_note_opens_chord(measure, node) {
                self.scopes
                    .push(&mut *self.sink, ScopeKind::Chord, "chord", Vec::new(), emit);
                self.in_chord = true;
            }
        }

        self.begin_pairings(&data, emit)?;
        self.track_stem(&data, emit);

        let short_scopes = self.push_note_scopes(&data, emit);
        self.emit_note(&data, duration, emit);
        for kind in short_scopes.into_iter().rev() {
            self.scopes.pop(&mut *self.sink, kind)?;
        }

        if let Some(lyric) = &data.lyric {
            let text = if lyric.hyphenated {
                format!("{}-", lyric.text)
            } else {
                lyric.text.clone()
            };
            self.leaf(emit, "\\lyric", vec![Param::text(text)]);
        }

        if !data.is_grace {
            if data.is_chord_member {
                self.pos.advance_voice_cursor(duration);
            } else {
                self.pos.advance_measure_cursor(duration, true);
                self.pos.advance_cursor_beat(duration);
            }
            self.last_note_duration = Some(duration);
        }

        self.end_pairings(&data, emit)?;
        self.measure_empty = false;
        Ok(())
    }

    /// Does the note after `node` in this measure continue a chord in
    /// the target voice?
    fn next_note_opens_chord(&self, measure: MeasureNode, node: Node) -> bool {
        let Some(next) = measure.next_note_after(node) else {
            return false;
        };
        if xml::child(next, "chord").is_none() {
            return false;
        }
        let voice = xml::child_i64(next, "voice").map(|v| v as i32).unwrap_or(1);
        voice == self.target.voice
    }

    fn check_cue(&mut self, data: &NoteData, emit: bool) -> Result<(), EngineError> {
        if data.is_cue && !self.scopes.is_open(ScopeKind::Cue) {
            self.scopes
                .push(&mut *self.sink, ScopeKind::Cue, "\\cue", Vec::new(), emit);
        } else if !data.is_cue && self.scopes.is_open(ScopeKind::Cue) {
            self.scopes.pop(&mut *self.sink, ScopeKind::Cue)?;
        }
        Ok(())
    }

    fn check_grace(&mut self, data: &NoteData, emit: bool) -> Result<(), EngineError> {
        if data.is_grace && !self.scopes.is_open(ScopeKind::Grace) {
            self.scopes
                .push(&mut *self.sink, ScopeKind::Grace, "\\grace", Vec::new(), emit);
        } else if !data.is_grace && self.scopes.is_open(ScopeKind::Grace) {
            self.scopes.pop(&mut *self.sink, ScopeKind::Grace)?;
        }
        Ok(())
    }

    /// Begin-markers emitted before the note token
    fn begin_pairings(&mut self, data: &NoteData, emit: bool) -> Result<(), EngineError> {
        for (number, action) in &data.tuplets {
            if *action == StartStop::Start {
                let ratio = data
                    .time_modification
                    .map(|(actual, normal)| TupletRatio { actual, normal })
                    .unwrap_or(TupletRatio { actual: 3, normal: 2 });
                if let Some(ratio) = self.pairing.begin_tuplet(ratio) {
                    self.scopes.push(
                        &mut *self.sink,
                        ScopeKind::Tuplet,
                        "\\tuplet",
                        vec![Param::text(format!("{}:{}", ratio.actual, ratio.normal))],
                        emit,
                    );
                } else {
                    log::warn!(
                        "measure {}: tuplet {number} starts inside an open tuplet; absorbed",
                        self.measure_number
                    );
                }
            }
        }
        for (number, action) in &data.beams {
            if *action == StartStop::Start {
                let id = self.pairing.begin_beam(*number);
                self.leaf(emit, &format!("\\beamBegin:{id}"), Vec::new());
            }
        }
        for (number, action) in &data.slurs {
            if *action == StartStop::Start {
                let id = self.pairing.begin_slur(*number);
                self.leaf(emit, &format!("\\slurBegin:{id}"), Vec::new());
            }
        }
        for tie in &data.ties {
            if *tie == StartStop::Start {
                let id = self.pairing.begin_tie();
                self.leaf(emit, &format!("\\tieBegin:{id}"), Vec::new());
            }
        }
        Ok(())
    }

    /// End-markers emitted after the note token
    fn end_pairings(&mut self, data: &NoteData, emit: bool) -> Result<(), EngineError> {
        for tie in &data.ties {
            if *tie == StartStop::Stop {
                if let Some(id) = self.pairing.end_tie() {
                    self.leaf(emit, &format!("\\tieEnd:{id}"), Vec::new());
                }
            }
        }
        for (number, action) in &data.slurs {
            if *action == StartStop::Stop {
                if let Some(id) = self.pairing.end_slur(*number) {
                    self.leaf(emit, &format!("\\slurEnd:{id}"), Vec::new());
                }
            }
        }
        for (number, action) in &data.beams {
            if *action == StartStop::Stop {
                if let Some(id) = self.pairing.end_beam(*number) {
                    self.leaf(emit, &format!("\\beamEnd:{id}"), Vec::new());
                }
            }
        }
        for (_, action) in &data.tuplets {
            if *action == StartStop::Stop && self.pairing.end_tuplet() {
                self.scopes.pop(&mut *self.sink, ScopeKind::Tuplet)?;
            }
        }
        Ok(())
    }

    fn track_stem(&mut self, data: &NoteData, emit: bool) {
        if !self.settings.generate_stems {
            return;
        }
        let Some(stem) = data.stem else { return };
        if self.current_stem == Some(stem) {
            return;
        }
        self.current_stem = Some(stem);
        let tag = match stem {
            StemDirection::Up => "\\stemsUp",
            StemDirection::Down => "\\stemsDown",
            StemDirection::None => "\\stemsAuto",
        };
        self.leaf(emit, tag, Vec::new());
    }

    /// Open the short-lived scopes wrapping one note: forced accidental,
    /// then articulations/ornaments/fermata. Returns the kinds pushed,
    /// in order, for the caller to pop in reverse.
    fn push_note_scopes(&mut self, data: &NoteData, emit: bool) -> Vec<ScopeKind> {
        let mut pushed = Vec::new();

        if data.accidental.is_some() {
            self.scopes.push(
                &mut *self.sink,
                ScopeKind::Accidental,
                "\\acc",
                Vec::new(),
                emit,
            );
            pushed.push(ScopeKind::Accidental);
        }

        let marks = data
            .articulations
            .iter()
            .chain(data.ornaments.iter())
            .filter_map(|name| ornament_tag(name))
            .chain(data.fermata.then_some("\\fermata"));
        for tag in marks {
            self.scopes
                .push(&mut *self.sink, ScopeKind::Ornament, tag, Vec::new(), emit);
            pushed.push(ScopeKind::Ornament);
        }
        pushed
    }

    // ─── Time anchors and cursor moves ───────────────────────────────

    fn on_backup(&mut self, node: Node) {
        let Some(ticks) = xml::child_i64(node, "duration") else {
            self.record_skip("backup", "backup missing duration");
            return;
        };
        // backup rewinds only the measure cursor: it re-opens the
        // measure for another voice, the target voice loses no progress
        let duration = self.pos.from_ticks(ticks);
        self.pos.advance_measure_cursor(-duration, false);
    }

    fn on_forward(&mut self, node: Node, emit: bool) {
        let Some(ticks) = xml::child_i64(node, "duration") else {
            self.record_skip("forward", "forward missing duration");
            return;
        };
        let duration = self.pos.from_ticks(ticks);
        self.pos.advance_measure_cursor(duration, false);

        let voice = xml::child_i64(node, "voice").map(|v| v as i32);
        let staff = xml::child_i64(node, "staff").map(|s| s as i32);
        let in_target = voice.map_or(true, |v| v == self.target.voice)
            && staff.map_or(true, |s| s == self.target.staff);
        if in_target {
            if let Some(gap) = self.pos.catch_up_voice(self.pos.measure_position()) {
                self.emit_filler(gap, emit);
            }
        }
    }

    // ─── Directions ──────────────────────────────────────────────────

    fn on_direction(&mut self, node: Node, shared: bool) {
        let data = DirectionData::from_node(node);
        if let Some(staff) = data.staff {
            if staff != self.target.staff {
                return;
            }
        }

        let hint = self.position_hint(&data);
        for kind in &data.kinds {
            match kind {
                DirectionKind::Dynamics(name) => {
                    let mut params = vec![Param::text(name.clone())];
                    if let Some(dx) = hint {
                        params.push(Param::raw(format!("dx={dx}hs")));
                    }
                    self.leaf(shared, "\\intens", params);
                }
                DirectionKind::Wedge { kind: WedgeKind::Stop, number } => {
                    if let Some(open) = self.pairing.end_wedge(*number) {
                        let tag = match open {
                            WedgeKind::Crescendo => "\\crescEnd",
                            WedgeKind::Diminuendo => "\\dimEnd",
                            WedgeKind::Stop => unreachable!("end_wedge never returns Stop"),
                        };
                        self.leaf(shared, tag, Vec::new());
                    }
                }
                DirectionKind::Wedge { kind, number } => {
                    self.pairing.begin_wedge(*kind, *number);
                    let tag = match kind {
                        WedgeKind::Crescendo => "\\crescBegin",
                        WedgeKind::Diminuendo => "\\dimBegin",
                        WedgeKind::Stop => unreachable!("stop handled above"),
                    };
                    let mut params = Vec::new();
                    if let Some(dx) = hint {
                        params.push(Param::raw(format!("dx={dx}hs")));
                    }
                    self.leaf(shared, tag, params);
                }
                DirectionKind::Words(text) => {
                    let mut params = vec![Param::text(text.clone())];
                    if data.placement_below {
                        params.push(Param::raw("dy=-7hs".to_string()));
                    }
                    self.scopes
                        .push(&mut *self.sink, ScopeKind::Text, "\\text", params, shared);
                }
                DirectionKind::OctaveShift { kind: ShiftKind::Stop, .. } => {
                    if self.pairing.end_shift().is_some() {
                        self.leaf(shared, "\\oct", vec![Param::raw("0".to_string())]);
                    }
                }
                DirectionKind::OctaveShift { kind, size } => {
                    let octaves = if *size >= 15 { 2 } else { 1 };
                    // an "up" shift writes the passage an octave above
                    // sounding pitch, so the output shifts down
                    let signed = match kind {
                        ShiftKind::Up => -octaves,
                        ShiftKind::Down => octaves,
                        ShiftKind::Stop => unreachable!("stop handled above"),
                    };
                    self.pairing.begin_shift(*size, *kind == ShiftKind::Up);
                    self.leaf(shared, "\\oct", vec![Param::raw(signed.to_string())]);
                }
                DirectionKind::Metronome(unit, per_minute) => {
                    self.leaf(
                        shared,
                        "\\tempo",
                        vec![Param::text(format!("{unit}={per_minute}"))],
                    );
                }
                DirectionKind::Segno => self.leaf(shared, "\\segno", Vec::new()),
                DirectionKind::Coda => self.leaf(shared, "\\coda", Vec::new()),
            }
        }
    }

    /// Horizontal hint for a direction, in halfspaces.
    ///
    /// With position inference on, the direction's absolute reference is
    /// normalized against the leftmost element recorded at its musical
    /// instant. A delayed direction whose offset lands on an instant the
    /// index has not seen resolves to nothing and is emitted unhinted.
    fn position_hint(&self, data: &DirectionData) -> Option<f64> {
        if !self.settings.generate_positions {
            return data.relative_x.map(|x| x / 10.0);
        }
        let mut position = self.pos.measure_position();
        if let Some(offset) = data.offset_ticks {
            position += self.pos.from_ticks(offset);
        }
        self.index.relative_offset(
            data.default_x,
            self.measure_number,
            position,
            0,
            self.target.staff,
            data.relative_x,
        )
    }

    // ─── Barlines ────────────────────────────────────────────────────

    fn on_barline(&mut self, node: Node, shared: bool) {
        match xml::child_text(node, "bar-style") {
            Some("none") => self.suppress_next_bar = true,
            Some("light-light") => self.double_next_bar = true,
            _ => {}
        }
        if let Some(repeat) = xml::child(node, "repeat") {
            match repeat.attribute("direction") {
                Some("forward") => self.leaf(shared, "\\repeatBegin", Vec::new()),
                Some("backward") => self.leaf(shared, "\\repeatEnd", Vec::new()),
                _ => {}
            }
        }
    }

    fn emit_bar(&mut self, shared: bool) {
        match self.settings.dialect {
            Dialect::Score => {
                let tag = if self.double_next_bar { "\\doubleBar" } else { "\\bar" };
                self.leaf(shared, tag, Vec::new());
            }
            Dialect::Performance => {
                self.leaf(
                    shared,
                    "measure",
                    vec![Param::raw(self.measure_number.to_string())],
                );
            }
        }
    }

    // ─── Emission helpers ────────────────────────────────────────────

    fn leaf(&mut self, emit: bool, tag: &str, params: Vec<Param>) {
        if emit {
            self.sink.append_leaf(tag, params);
        }
    }

    fn emit_filler(&mut self, gap: Fraction, emit: bool) {
        match self.settings.dialect {
            Dialect::Score => {
                self.leaf(emit, &format!("_{}", duration_suffix(gap)), Vec::new());
            }
            Dialect::Performance => {
                let beat = self.pos.cursor_beat();
                self.leaf(
                    emit,
                    "rest",
                    vec![
                        Param::raw(beat.to_string()),
                        Param::raw((gap * Fraction::new(4, 1)).to_string()),
                    ],
                );
            }
        }
        self.pos.advance_cursor_beat(gap);
    }

    fn emit_note(&mut self, data: &NoteData, duration: Fraction, emit: bool) {
        let display = if data.is_grace {
            self.grace_display_duration(data)
        } else {
            duration
        };

        match self.settings.dialect {
            Dialect::Score => {
                let token = match (&data.pitch, data.is_rest) {
                    (_, true) => format!("_{}", duration_suffix(display)),
                    (Some(pitch), _) => {
                        format!("{}{}", score_pitch(pitch), duration_suffix(display))
                    }
                    (None, _) => {
                        self.record_skip("note", "unpitched note without rest marker");
                        return;
                    }
                };
                self.leaf(emit, &token, Vec::new());
            }
            Dialect::Performance => {
                // chord members share the instant of the member that
                // advanced the beat cursor
                let mut beat = self.pos.cursor_beat();
                if data.is_chord_member {
                    if let Some(previous) = self.last_note_duration {
                        beat -= previous * Fraction::new(4, 1);
                    }
                }
                let beats = display * Fraction::new(4, 1);
                let name = match (&data.pitch, data.is_rest) {
                    (_, true) => "rest".to_string(),
                    (Some(pitch), _) => performance_pitch(pitch),
                    (None, _) => {
                        self.record_skip("note", "unpitched note without rest marker");
                        return;
                    }
                };
                self.leaf(
                    emit,
                    "note",
                    vec![
                        Param::raw(name),
                        Param::raw(beat.to_string()),
                        Param::raw(beats.to_string()),
                    ],
                );
            }
        }
    }

    /// Advance-duration of a note: zero for grace notes, the measure
    /// length for whole-measure rests, otherwise the tick count at the
    /// current division scale, cross-checked against the graphic type.
    fn note_duration(&mut self, data: &NoteData) -> Fraction {
        if data.is_grace {
            return rational::zero();
        }
        if data.whole_measure_rest {
            return self.time_length;
        }
        let ticks = data.duration_ticks.unwrap_or(0);
        let tick_duration = self.pos.from_ticks(ticks);

        if let Some(name) = &data.type_name {
            if let Some(base) = rational::graphic_duration(name) {
                let mut graphic = rational::with_dots(base, data.dots);
                if let Some((actual, normal)) = data.time_modification {
                    if actual != 0 {
                        graphic *= Fraction::new(normal, actual);
                    }
                }
                if graphic != tick_duration {
                    log::debug!(
                        "measure {}: tick duration {} disagrees with graphic duration {}",
                        self.measure_number,
                        tick_duration,
                        graphic
                    );
                }
            }
        }
        tick_duration
    }

    /// Grace notes carry no tick duration; display them at their graphic
    /// type, defaulting to a sixteenth
    fn grace_display_duration(&self, data: &NoteData) -> Fraction {
        data.type_name
            .as_deref()
            .and_then(rational::graphic_duration)
            .map(|base| rational::with_dots(base, data.dots))
            .unwrap_or(Fraction::new(1, 16))
    }

    fn record_skip(&mut self, element: &str, reason: &str) {
        log::debug!(
            "part {} measure {}: skipping {element}: {reason}",
            self.part_id,
            self.measure_number
        );
        self.skipped.push(SkippedElement {
            element: element.to_string(),
            measure: (self.measure_number > 0).then_some(self.measure_number),
            part: Some(self.part_id.to_string()),
            reason: reason.to_string(),
        });
    }
}

/// Map a MusicXML articulation/ornament tag name to the output tag
fn ornament_tag(name: &str) -> Option<&'static str> {
    match name {
        "staccato" | "staccatissimo" => Some("\\stacc"),
        "accent" => Some("\\accent"),
        "strong-accent" => Some("\\marcato"),
        "tenuto" => Some("\\ten"),
        "trill-mark" => Some("\\trill"),
        "mordent" => Some("\\mord"),
        "inverted-mordent" => Some("\\mord"),
        "turn" => Some("\\turn"),
        _ => None,
    }
}

/// Score-dialect pitch token: lowercase step, `#`/`&` accidentals, and
/// an octave where 1 is the middle-C octave
fn score_pitch(pitch: &Pitch) -> String {
    let step = ["c", "d", "e", "f", "g", "a", "b"][pitch.step as usize];
    let accidental = match pitch.alter {
        a if a > 0 => "#".repeat(a as usize),
        a if a < 0 => "&".repeat((-a) as usize),
        _ => String::new(),
    };
    format!("{}{}{}", step, accidental, pitch.octave - 3)
}

/// Performance-dialect pitch name: uppercase step, `#`/`b`, XML octave
fn performance_pitch(pitch: &Pitch) -> String {
    let step = ["C", "D", "E", "F", "G", "A", "B"][pitch.step as usize];
    let accidental = match pitch.alter {
        a if a > 0 => "#".repeat(a as usize),
        a if a < 0 => "b".repeat((-a) as usize),
        _ => String::new(),
    };
    format!("{}{}{}", step, accidental, pitch.octave)
}

/// `*num/den` duration suffix on note and rest tokens
fn duration_suffix(duration: Fraction) -> String {
    format!("*{}/{}", duration.numer(), duration.denom())
}
