//! Top-level integration tests: the literal I/O scenarios from the wire
//! format's scenario list, authored as hand-built byte arrays the way the
//! unit-level tag/parser tests are, plus a couple of frame-layout
//! snapshots so an accidental wire-format change doesn't slip by quietly.

use std::collections::BTreeMap;

use rstest::rstest;

use crate::catalog::EmptyCatalog;
use crate::decode::parse;
use crate::encode::{print, EncoderConfig};
use crate::protocol::{END_MARKER, MAX_NESTING_DEPTH, START_MARKER};
use crate::tag::{
    pack_fmt_string, pack_range, pack_trivial, ExtendedTypeIdentifier, FmtStringType, RangeLayout,
    RangeSize, RangeType, TrivialType, TypeSize,
};
use crate::value::Encodable;

fn render(template: &'static str, args: &[&dyn Encodable]) -> String {
    let mut buf = Vec::new();
    print(&mut buf, EncoderConfig::default(), None, template, args).unwrap();
    let mut errors = Vec::new();
    let (out, rest, discarded) = parse(&buf, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
    assert!(rest.is_empty(), "trailing bytes after parse: {errors:?}");
    assert_eq!(discarded, 0, "unexpected noise discarded: {errors:?}");
    out.unwrap_or_else(|| panic!("parse failed: {errors:?}"))
}

// Scenario 1: a hand-built frame, the same shape `print("Test {}"_sc, 123)`
// would emit, decoded byte-by-byte rather than through the encoder.
#[test]
fn scenario_1_integer_by_hand() {
    let template = b"Test {}";
    let mut frame = vec![START_MARKER];
    frame.push(pack_fmt_string(FmtStringType::Normal, RangeSize::_1)); // fmt_string, normal, 1-byte length
    frame.push(template.len() as u8);
    frame.extend_from_slice(template);
    frame.push(pack_trivial(TrivialType::Unsigned, TypeSize::_1)); // 123 fits in one byte
    frame.push(123);
    frame.push(END_MARKER);

    let mut errors = Vec::new();
    let (out, rest, discarded) = parse(&frame, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
    assert_eq!(out.as_deref(), Some("Test 123"), "errors: {errors:?}");
    assert!(rest.is_empty());
    assert_eq!(discarded, 0);
}

#[test]
fn scenario_1_integer_via_encoder() {
    assert_eq!(render("Test {}", &[&123u32]), "Test 123");
}

#[test]
fn scenario_2_list() {
    let items = vec![1u32, 2, 3];
    assert_eq!(render("{}", &[&items]), "[1, 2, 3]");
}

#[test]
fn scenario_3_map_preserves_insertion_order() {
    let mut map = indexmap::IndexMap::new();
    map.insert("a".to_string(), 1u32);
    map.insert("b".to_string(), 2u32);
    assert_eq!(render("{}", &[&map]), "{\"a\": 1, \"b\": 2}");

    // insertion order, not key order, drives the rendering
    let mut reordered = indexmap::IndexMap::new();
    reordered.insert("b".to_string(), 2u32);
    reordered.insert("a".to_string(), 1u32);
    assert_eq!(render("{}", &[&reordered]), "{\"b\": 2, \"a\": 1}");
}

#[test]
fn scenario_4_tuple() {
    let t = (1u32, "x".to_string(), true);
    assert_eq!(render("{}", &[&t]), "(1, \"x\", true)");
}

#[test]
fn scenario_5_optional_empty() {
    let v: Option<u32> = None;
    assert_eq!(render("{}", &[&v]), "()");
}

#[test]
fn scenario_6_duration() {
    assert_eq!(render("{}", &[&std::time::Duration::from_millis(5)]), "5ms");
}

#[test]
fn duration_strftime_style_specifiers() {
    let d = std::time::Duration::from_millis(5);
    assert_eq!(render("{:%Q}", &[&d]), "5");
    assert_eq!(render("{:%q}", &[&d]), "ms");
}

#[test]
fn duration_with_arbitrary_spec_renders_as_seconds() {
    // No strftime-style specifier applies, so it falls back to a
    // double-valued number of seconds rendered through that spec.
    let d = std::time::Duration::from_millis(250);
    assert_eq!(render("{:.3}", &[&d]), "0.250");
}

#[test]
fn catalog_substitutability() {
    let mut catalog = BTreeMap::new();
    catalog.insert(3u16, "Test {}".to_string());

    let mut inline = Vec::new();
    print(&mut inline, EncoderConfig::default(), None, "Test {}", &[&123u32]).unwrap();

    let mut cataloged = vec![START_MARKER];
    cataloged.push(pack_fmt_string(FmtStringType::CatalogedNormal, RangeSize::_2));
    cataloged.extend_from_slice(&3u16.to_le_bytes());
    cataloged.push(pack_trivial(TrivialType::Unsigned, TypeSize::_1));
    cataloged.push(123);
    cataloged.push(END_MARKER);

    let mut errors = Vec::new();
    let (inline_out, _, _) = parse(&inline, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
    let (cataloged_out, rest, discarded) = parse(&cataloged, &catalog, &mut |e| errors.push(e.to_string()));
    assert_eq!(inline_out, cataloged_out, "errors: {errors:?}");
    assert!(rest.is_empty());
    assert_eq!(discarded, 0);
}

#[test]
fn styled_value_wraps_with_ansi_codes_and_round_trips_text() {
    use crate::value::{Color, Emphasis, Style, Styled};
    let styled = Styled(
        42u32,
        Style {
            foreground: Some(Color::Rgb(255, 0, 0)),
            background: None,
            emphasis: Emphasis::BOLD,
        },
    );
    let out = render("{}", &[&styled]);
    assert!(out.contains("42"));
    assert!(out.starts_with("\x1b["));
    assert!(out.ends_with("\x1b[0m"));
}

#[test]
fn list_of_tuples_with_explicit_m_flag_renders_as_map_pairs() {
    // A list/set element isn't itself a map, so `in_map` would normally be
    // false here; an explicit `m` flag on the *outer* field must still
    // force each 2-tuple element to render as `k: v` rather than `(k, v)`.
    let items = vec![(1u32, "a".to_string()), (2u32, "b".to_string())];
    assert_eq!(render("{:m}", &[&items]), "[1: \"a\", 2: \"b\"]");
}

#[test]
fn cataloged_string_consumes_no_body_bytes() {
    // The catalog id lives in the size slot itself; parsing it must not
    // advance the cursor past that slot (there is no separate body).
    let mut body = vec![pack_range(RangeType::CatalogedString, RangeSize::_2, RangeLayout::Compact)];
    body.extend_from_slice(&7u16.to_le_bytes());

    let trailing = [0xFFu8, 0xFE];

    let mut full = vec![START_MARKER, pack_fmt_string(FmtStringType::Normal, RangeSize::_1), 2];
    full.extend_from_slice(b"{}");
    full.extend_from_slice(&body);
    full.push(END_MARKER);
    full.extend_from_slice(&trailing);

    let mut catalog = BTreeMap::new();
    catalog.insert(7u16, "hi".to_string());

    let mut errors = Vec::new();
    let (out, rest, discarded) = parse(&full, &catalog, &mut |e| errors.push(e.to_string()));
    assert_eq!(out.as_deref(), Some("hi"), "errors: {errors:?}");
    assert_eq!(rest, &trailing, "parser must stop exactly at the end marker");
    assert_eq!(discarded, 0);
}

#[rstest]
#[case(0u64, 1)]
#[case(255, 1)]
#[case(256, 2)]
#[case(65_535, 2)]
#[case(65_536, 4)]
#[case(u32::MAX as u64, 4)]
#[case(u32::MAX as u64 + 1, 8)]
fn width_minimality_holds_for_unsigned_integers(#[case] value: u64, #[case] expected_payload_bytes: usize) {
    let mut buf = Vec::new();
    print(&mut buf, EncoderConfig::default(), None, "{}", &[&value]).unwrap();
    // Start marker, fmt tag, length byte, two-char template ("{}"), trivial
    // tag, then the payload and the end marker.
    let header_len = 1 + 1 + 1 + 2 + 1;
    let payload_and_end = &buf[header_len..];
    assert_eq!(payload_and_end.len(), expected_payload_bytes + 1);
}

// Exact frame layouts, so an accidental wire-format change shows up as a
// byte-for-byte diff rather than a passing-but-wrong render.
#[test]
fn integer_scenario_frame_layout() {
    let mut buf = Vec::new();
    print(&mut buf, EncoderConfig::default(), None, "Test {}", &[&123u32]).unwrap();

    let mut expected = vec![START_MARKER, pack_fmt_string(FmtStringType::Normal, RangeSize::_1), 7];
    expected.extend_from_slice(b"Test {}");
    expected.push(pack_trivial(TrivialType::Unsigned, TypeSize::_1));
    expected.push(123);
    expected.push(END_MARKER);
    assert_eq!(buf, expected);
}

/// Hand-builds `depth` nested `Optional::Some` wrappers around a trivial
/// `u8` leaf: `{}` applied to `Some(Some(...Some(7)...))`.
fn nested_optional_body(depth: u32) -> Vec<u8> {
    let mut body = Vec::new();
    for _ in 0..depth {
        body.push(pack_range(
            RangeType::ExtendedTypeIdentifier,
            RangeSize::_1,
            RangeLayout::OnTiEach,
        ));
        body.push(ExtendedTypeIdentifier::Optional as u8);
        body.push(1); // present
    }
    body.push(pack_trivial(TrivialType::Unsigned, TypeSize::_1));
    body.push(7);
    body
}

fn nested_optional_frame(depth: u32) -> Vec<u8> {
    let mut frame = vec![START_MARKER, pack_fmt_string(FmtStringType::Normal, RangeSize::_1), 2];
    frame.extend_from_slice(b"{}");
    frame.extend_from_slice(&nested_optional_body(depth));
    frame.push(END_MARKER);
    frame
}

#[test]
fn nesting_within_the_depth_bound_parses() {
    let frame = nested_optional_frame(MAX_NESTING_DEPTH);
    let mut errors = Vec::new();
    let (out, rest, discarded) = parse(&frame, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
    assert_eq!(out.as_deref(), Some("7"), "errors: {errors:?}");
    assert!(rest.is_empty());
    assert_eq!(discarded, 0);
}

#[test]
fn nesting_beyond_the_depth_bound_fails_the_frame() {
    let frame = nested_optional_frame(MAX_NESTING_DEPTH + 1000);
    let mut errors = Vec::new();
    let (out, rest, _discarded) = parse(&frame, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
    assert_eq!(out, None);
    assert!(!errors.is_empty(), "expected a nesting-depth diagnostic");
    assert_eq!(rest, &frame[..], "a failed parse must preserve the frame for retry");
}

#[test]
fn list_frame_layout() {
    let mut buf = Vec::new();
    let items = vec![1u32, 2, 3];
    print(&mut buf, EncoderConfig::default(), None, "{}", &[&items]).unwrap();

    let mut expected = vec![START_MARKER, pack_fmt_string(FmtStringType::Normal, RangeSize::_1), 2];
    expected.extend_from_slice(b"{}");
    expected.push(pack_range(RangeType::List, RangeSize::_1, RangeLayout::OnTiEach));
    expected.push(3); // length
    for item in [1u8, 2, 3] {
        expected.push(pack_trivial(TrivialType::Unsigned, TypeSize::_1));
        expected.push(item);
    }
    expected.push(END_MARKER);
    assert_eq!(buf, expected);
}
