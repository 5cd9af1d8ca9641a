//! Locates the next well-formed frame in a byte stream, skipping noise and
//! reporting how many bytes were discarded along the way.

use crate::catalog::Catalog;
use crate::io::ByteCursor;
use crate::protocol::{END_MARKER, START_MARKER};
use crate::tag::{self, FmtStringType};

use super::parser::{self, ParseEnv};

/// Scans `buffer` for one complete frame.
///
/// Returns `(rendered message, remaining buffer, bytes discarded as
/// noise)`. A `None` message means no complete, valid frame was found;
/// `remaining` is always a suffix of `buffer` the caller can retry once
/// more bytes arrive.
pub fn parse<'a, C: Catalog>(
    buffer: &'a [u8],
    catalog: &C,
    on_error: &mut dyn FnMut(&str),
) -> (Option<String>, &'a [u8], usize) {
    let mut pos = 0usize;
    let mut discarded = 0usize;

    loop {
        let Some(offset) = buffer[pos..].iter().position(|&b| b == START_MARKER) else {
            return (None, &buffer[pos..], discarded);
        };
        pos += offset;

        let Some(&tag_byte) = buffer.get(pos + 1) else {
            return (None, &buffer[pos..], discarded);
        };

        let is_top_level_fmt = matches!(
            tag::parse_fmt_string(tag_byte),
            Some((FmtStringType::Normal | FmtStringType::CatalogedNormal, _))
        );
        if !is_top_level_fmt {
            discarded += 1;
            pos += 1;
            continue;
        }

        let frame_body = &buffer[pos + 1..];
        if !frame_body.contains(&END_MARKER) {
            return (None, &buffer[pos..], discarded);
        }

        let mut cursor = ByteCursor::new(frame_body);
        let env = ParseEnv::new(catalog, on_error);
        match parser::parse_fmt(&mut cursor, &env, 0) {
            Some(rendered) if cursor.peek_u8() == Some(END_MARKER) => {
                let mut remaining = cursor.remaining();
                remaining = &remaining[1..];
                return (Some(rendered), remaining, discarded);
            }
            Some(_) | None => return (None, &buffer[pos..], discarded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EmptyCatalog;
    use crate::encode::{print, EncoderConfig};

    fn encode_frame(template: &'static str, args: &[&dyn crate::value::Encodable]) -> Vec<u8> {
        let mut buf = Vec::new();
        print(&mut buf, EncoderConfig::default(), None, template, args).unwrap();
        buf
    }

    #[test]
    fn resynchronizes_past_arbitrary_noise_prefix() {
        let frame = encode_frame("Test {}", &[&123u32]);
        let mut noisy = vec![0x01, 0x02, 0x03];
        noisy.extend_from_slice(&frame);
        let mut errors = Vec::new();
        let (out, rest, discarded) = parse(&noisy, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
        assert_eq!(out.as_deref(), Some("Test 123"));
        assert!(rest.is_empty());
        assert_eq!(discarded, 3);
    }

    #[test]
    fn skips_spurious_start_markers_not_followed_by_a_valid_tag() {
        let frame = encode_frame("Test {}", &[&123u32]);
        let mut noisy = vec![START_MARKER, 0xFF];
        noisy.extend_from_slice(&frame);
        let mut errors = Vec::new();
        let (out, rest, discarded) = parse(&noisy, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
        assert_eq!(out.as_deref(), Some("Test 123"));
        assert!(rest.is_empty());
        assert_eq!(discarded, 1);
    }

    #[test]
    fn empty_buffer_parses_to_nothing() {
        let mut errors = Vec::new();
        let (out, rest, discarded) = parse(&[], &EmptyCatalog, &mut |e| errors.push(e.to_string()));
        assert_eq!(out, None);
        assert!(rest.is_empty());
        assert_eq!(discarded, 0);
    }

    #[test]
    fn incomplete_frame_is_preserved_for_retry() {
        let frame = encode_frame("Test {}", &[&123u32]);
        let partial = &frame[..frame.len() - 1];
        let mut errors = Vec::new();
        let (out, rest, discarded) = parse(partial, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
        assert_eq!(out, None);
        assert_eq!(rest, partial);
        assert_eq!(discarded, 0);
    }
}
