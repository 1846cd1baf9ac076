// Document-level conversions: parts, filters, barline styles, chords,
// comments, dialects, and the skip report.

use pretty_assertions::assert_eq;

use mxlconv::{convert_score, BarPolicy, Dialect, Settings};

fn two_part_score() -> &'static str {
    r#"<?xml version="1.0"?>
<score-partwise>
  <part-list>
    <score-part id="P1"><part-name>Flute</part-name></score-part>
    <score-part id="P2"><part-name>Oboe</part-name></score-part>
  </part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>1</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>5</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
    </measure>
  </part>
  <part id="P2">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>1</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>A</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
    </measure>
  </part>
</score-partwise>"#
}

#[test]
fn every_part_converts_with_its_name() {
    let conversion = convert_score(two_part_score(), &Settings::default()).unwrap();
    assert_eq!(conversion.parts.len(), 2);
    assert_eq!(conversion.parts[0].id, "P1");
    assert_eq!(conversion.parts[0].name.as_deref(), Some("Flute"));
    assert_eq!(conversion.parts[1].name.as_deref(), Some("Oboe"));
    assert!(conversion.failed_parts().is_empty());

    let rendered = conversion.render();
    assert!(rendered.contains("c2*1/4"), "{rendered}");
    assert!(rendered.contains("a1*1/4"), "{rendered}");
}

#[test]
fn part_filter_restricts_conversion() {
    let mut settings = Settings::default();
    settings.parts = Some(vec!["P2".to_string()]);
    let conversion = convert_score(two_part_score(), &settings).unwrap();
    assert_eq!(conversion.parts.len(), 1);
    assert_eq!(conversion.parts[0].id, "P2");
}

#[test]
fn malformed_xml_is_a_fatal_parse_error() {
    assert!(convert_score("<score-partwise><part>", &Settings::default()).is_err());
    assert!(convert_score("<opus/>", &Settings::default()).is_err());
}

#[test]
fn barline_styles_shape_the_following_bar() {
    let xml = r#"<?xml version="1.0"?>
<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>1</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
      <barline location="right"><bar-style>light-light</bar-style></barline>
    </measure>
    <measure number="2">
      <note><pitch><step>D</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
      <barline location="right"><bar-style>none</bar-style></barline>
    </measure>
    <measure number="3">
      <note><pitch><step>E</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
    </measure>
  </part>
</score-partwise>"#;
    let conversion = convert_score(xml, &Settings::default()).unwrap();
    let rendered = conversion.render();
    // light-light promotes the next bar to a double bar; none suppresses
    assert_eq!(rendered.matches("\\doubleBar").count(), 1, "{rendered}");
    assert_eq!(rendered.matches("\\bar").count(), 0, "{rendered}");
}

#[test]
fn repeat_barline_replaces_the_pending_bar() {
    let xml = r#"<?xml version="1.0"?>
<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>1</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
    </measure>
    <measure number="2">
      <barline location="left"><bar-style>heavy-light</bar-style>
        <repeat direction="forward"/></barline>
      <note><pitch><step>D</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
      <barline location="right"><bar-style>light-heavy</bar-style>
        <repeat direction="backward"/></barline>
    </measure>
  </part>
</score-partwise>"#;
    let conversion = convert_score(xml, &Settings::default()).unwrap();
    let rendered = conversion.render();
    assert!(rendered.contains("\\repeatBegin"), "{rendered}");
    assert!(rendered.contains("\\repeatEnd"), "{rendered}");
    // the pending bar collided with the repeat start and was dropped
    assert!(!rendered.contains("\\bar"), "{rendered}");
}

#[test]
fn comments_mark_measures_when_enabled() {
    let mut settings = Settings::default();
    settings.generate_comments = true;
    let conversion = convert_score(two_part_score(), &settings).unwrap();
    let rendered = conversion.render();
    assert!(rendered.contains("(* measure 1 *)"), "{rendered}");
}

#[test]
fn stem_tracking_can_be_disabled() {
    let xml = r#"<?xml version="1.0"?>
<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>2</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type><stem>up</stem></note>
      <note><pitch><step>D</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type><stem>down</stem></note>
    </measure>
  </part>
</score-partwise>"#;
    let with_stems = convert_score(xml, &Settings::default()).unwrap().render();
    assert!(with_stems.contains("\\stemsUp"), "{with_stems}");
    assert!(with_stems.contains("\\stemsDown"), "{with_stems}");

    let mut settings = Settings::default();
    settings.generate_stems = false;
    let without = convert_score(xml, &settings).unwrap().render();
    assert!(!without.contains("\\stems"), "{without}");
}

#[test]
fn unsupported_elements_land_in_the_skip_report() {
    let xml = r#"<?xml version="1.0"?>
<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>1</beats><beat-type>4</beat-type></time></attributes>
      <harmony><root><root-step>C</root-step></root></harmony>
      <note><pitch><step>C</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
    </measure>
  </part>
</score-partwise>"#;
    let conversion = convert_score(xml, &Settings::default()).unwrap();
    assert_eq!(conversion.skipped.len(), 1);
    assert_eq!(conversion.skipped[0].element, "harmony");
    assert_eq!(conversion.skipped[0].measure, Some(1));
    assert_eq!(conversion.skipped[0].part.as_deref(), Some("P1"));
}

#[test]
fn performance_dialect_converts_the_same_document() {
    let mut settings = Settings::default();
    settings.dialect = Dialect::Performance;
    settings.generate_bars = BarPolicy::Always;
    let xml = r#"<?xml version="1.0"?>
<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>1</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>F</step><octave>3</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
    </measure>
    <measure number="2">
      <note><pitch><step>B</step><octave>3</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type></note>
    </measure>
  </part>
</score-partwise>"#;
    let conversion = convert_score(xml, &settings).unwrap();
    let rendered = conversion.render();
    assert!(rendered.contains("note<F3, 1, 1>"), "{rendered}");
    // measure marker instead of a barline glyph
    assert!(rendered.contains("measure<2>"), "{rendered}");
    assert!(rendered.contains("note<B3, 1, 1>"), "{rendered}");
}

#[test]
fn lyrics_follow_their_notes() {
    let xml = r#"<?xml version="1.0"?>
<score-partwise>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions>
        <time><beats>2</beats><beat-type>4</beat-type></time></attributes>
      <note><pitch><step>C</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type>
        <lyric number="1"><syllabic>begin</syllabic><text>hel</text></lyric></note>
      <note><pitch><step>D</step><octave>4</octave></pitch>
        <duration>1</duration><voice>1</voice><type>quarter</type>
        <lyric number="1"><syllabic>end</syllabic><text>lo</text></lyric></note>
    </measure>
  </part>
</score-partwise>"#;
    let conversion = convert_score(xml, &Settings::default()).unwrap();
    let rendered = conversion.render();
    assert!(rendered.contains("\\lyric<\"hel-\">"), "{rendered}");
    assert!(rendered.contains("\\lyric<\"lo\">"), "{rendered}");
}
