//! The recursive-descent parser: consumes one tagged value at a time and
//! renders it, interleaving results into a template's literal text.

use std::cell::RefCell;
use std::str;

use num_enum::TryFromPrimitive;

use crate::brace;
use crate::catalog::Catalog;
use crate::duration;
use crate::io::ByteCursor;
use crate::protocol::MAX_NESTING_DEPTH;
use crate::tag::{
    self, ExtendedTypeIdentifier, FmtStringType, RangeLayout, RangeType, TimeType, TrivialType,
};
use crate::template::{all_chars_valid, check_replacement_field_count, fix_range_replacement_field, split_template};
use crate::value::{Color, Emphasis, Style};

/// Shared, read-only parse state: the catalog and the best-effort
/// diagnostic sink. Wrapped so it can be passed by shared reference while
/// `on_error` is still invoked mutably.
pub struct ParseEnv<'c, C: Catalog> {
    catalog: &'c C,
    on_error: RefCell<&'c mut dyn FnMut(&str)>,
}

impl<'c, C: Catalog> ParseEnv<'c, C> {
    pub fn new(catalog: &'c C, on_error: &'c mut dyn FnMut(&str)) -> Self {
        Self {
            catalog,
            on_error: RefCell::new(on_error),
        }
    }

    fn report(&self, msg: impl AsRef<str>) {
        (self.on_error.borrow_mut())(msg.as_ref());
    }
}

/// Top-level entry: reads one `fmt_string` tag, its template, and every
/// replacement field's argument, in order.
pub fn parse_fmt<C: Catalog>(cursor: &mut ByteCursor, env: &ParseEnv<'_, C>, depth: u32) -> Option<String> {
    let tag = cursor.read_u8().or_else(|| {
        env.report("truncated: expected a fmt_string tag");
        None
    })?;
    let (fmt_ty, size) = tag::parse_fmt_string(tag).or_else(|| {
        env.report(format!("invalid fmt_string tag {tag:#04x}"));
        None
    })?;
    parse_fmt_body(cursor, env, fmt_ty, size, depth)
}

fn parse_fmt_body<C: Catalog>(
    cursor: &mut ByteCursor,
    env: &ParseEnv<'_, C>,
    fmt_ty: FmtStringType,
    size: tag::RangeSize,
    depth: u32,
) -> Option<String> {
    let slot = cursor.read_uint(size.bytes())?;
    let template: String = match fmt_ty {
        FmtStringType::Normal | FmtStringType::Sub => {
            let bytes = cursor.read_bytes(slot as usize).or_else(|| {
                env.report("truncated: template body shorter than its length prefix");
                None
            })?;
            str::from_utf8(bytes)
                .ok()
                .or_else(|| {
                    env.report("template body is not valid UTF-8");
                    None
                })?
                .to_string()
        }
        FmtStringType::CatalogedNormal | FmtStringType::CatalogedSub => {
            let id = slot as u16;
            env.catalog
                .lookup(id)
                .or_else(|| {
                    env.report(format!("catalog miss for id {id}"));
                    None
                })?
                .to_string()
        }
    };

    if !all_chars_valid(&template) {
        env.report("template contains a character outside printable ASCII/newline");
        return None;
    }
    if check_replacement_field_count(&template).is_none() {
        env.report("template has unbalanced braces");
        return None;
    }

    let mut out = String::new();
    for piece in split_template(&template) {
        out.push_str(&piece.literal);
        if let Some(field) = piece.field {
            out.push_str(&parse_from_type_id(cursor, env, field, false, false, depth)?);
        }
    }
    Some(out)
}

/// Reads one tagged argument and renders it against `field` (a full
/// `"{...}"` replacement field). `in_list`/`in_map` say whether this value
/// sits inside an enclosing container (so strings self-quote and arity-2
/// tuples default to `k: v`).
fn parse_from_type_id<C: Catalog>(
    cursor: &mut ByteCursor,
    env: &ParseEnv<'_, C>,
    field: &str,
    in_list: bool,
    in_map: bool,
    depth: u32,
) -> Option<String> {
    if depth > MAX_NESTING_DEPTH {
        env.report("nesting depth exceeded");
        return None;
    }
    let tag = cursor.read_u8().or_else(|| {
        env.report("truncated: expected a value tag");
        None
    })?;
    match tag::type_identifier(tag) {
        Some(tag::TypeIdentifier::Trivial) => parse_trivial(cursor, env, tag, field),
        Some(tag::TypeIdentifier::Range) => parse_range(cursor, env, tag, field, in_list, in_map, depth),
        Some(tag::TypeIdentifier::Time) => parse_time(cursor, env, tag, field),
        Some(tag::TypeIdentifier::FmtString) => {
            if field != "{}" {
                env.report("a nested template's replacement field must be exactly \"{}\"");
                return None;
            }
            let (fmt_ty, size) = tag::parse_fmt_string(tag).or_else(|| {
                env.report(format!("invalid fmt_string tag {tag:#04x}"));
                None
            })?;
            parse_fmt_body(cursor, env, fmt_ty, size, depth + 1)
        }
        None => {
            env.report(format!("byte {tag:#04x} is not a valid type identifier"));
            None
        }
    }
}

fn parse_trivial<C: Catalog>(
    cursor: &mut ByteCursor,
    env: &ParseEnv<'_, C>,
    tag: u8,
    field: &str,
) -> Option<String> {
    let (ty, size) = tag::parse_trivial(tag).or_else(|| {
        env.report(format!("invalid trivial tag {tag:#04x}"));
        None
    })?;
    let value = trivial_value(cursor, env, ty, size)?;
    brace::format(field, value)
        .map_err(|e| env.report(e.0))
        .ok()
}

fn trivial_value<'a, C: Catalog>(
    cursor: &mut ByteCursor,
    env: &ParseEnv<'_, C>,
    ty: TrivialType,
    size: tag::TypeSize,
) -> Option<brace::Value<'a>> {
    let fail = || {
        env.report("truncated: value shorter than its tag's width");
    };
    Some(match ty {
        TrivialType::Unsigned => brace::Value::UInt(cursor.read_uint(size.bytes()).or_else(|| {
            fail();
            None
        })?),
        TrivialType::Signed => brace::Value::Int(cursor.read_int(size.bytes()).or_else(|| {
            fail();
            None
        })?),
        TrivialType::Boolean => {
            let raw = cursor.read_u8().or_else(|| {
                fail();
                None
            })?;
            brace::Value::Bool(raw != 0)
        }
        TrivialType::Character => {
            let raw = cursor.read_u8().or_else(|| {
                fail();
                None
            })?;
            brace::Value::Char(raw as char)
        }
        TrivialType::Pointer => brace::Value::Pointer(cursor.read_uint(size.bytes()).or_else(|| {
            fail();
            None
        })?),
        TrivialType::FloatingPoint => match size {
            tag::TypeSize::_4 => brace::Value::Float(cursor.read_f32().or_else(|| {
                fail();
                None
            })? as f64),
            tag::TypeSize::_8 => brace::Value::Float(cursor.read_f64().or_else(|| {
                fail();
                None
            })?),
            _ => {
                env.report("floating point trivial tag must use a 4 or 8 byte width");
                return None;
            }
        },
    })
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[allow(clippy::too_many_arguments)]
fn parse_range<C: Catalog>(
    cursor: &mut ByteCursor,
    env: &ParseEnv<'_, C>,
    tag: u8,
    field: &str,
    in_list: bool,
    in_map: bool,
    depth: u32,
) -> Option<String> {
    let (range_ty, size, layout) = tag::parse_range(tag).or_else(|| {
        env.report(format!("invalid range tag {tag:#04x}"));
        None
    })?;

    match range_ty {
        RangeType::String => {
            let len = cursor.read_uint(size.bytes())? as usize;
            let bytes = cursor.read_bytes(len).or_else(|| {
                env.report("truncated: string body shorter than its length prefix");
                None
            })?;
            let s = str::from_utf8(bytes).ok().or_else(|| {
                env.report("string body is not valid UTF-8");
                None
            })?;
            let text = if in_list { quote(s) } else { s.to_string() };
            brace::format(field, brace::Value::Str(&text))
                .map_err(|e| env.report(e.0))
                .ok()
        }
        RangeType::CatalogedString => {
            let id = cursor.read_uint(size.bytes())? as u16;
            let s = env.catalog.lookup(id).or_else(|| {
                env.report(format!("catalog miss for id {id}"));
                None
            })?;
            let text = if in_list { quote(s) } else { s.to_string() };
            brace::format(field, brace::Value::Str(&text))
                .map_err(|e| env.report(e.0))
                .ok()
        }
        RangeType::Tuple => {
            if layout != RangeLayout::OnTiEach {
                env.report("tuple must use the on_ti_each layout");
                return None;
            }
            let len = cursor.read_uint(size.bytes())? as usize;
            let (range_spec, child_spec) = fix_range_replacement_field(field);
            let as_map = in_map || range_spec.contains('m');
            if as_map && len != 2 {
                env.report("tuple rendered as a map pair must have exactly 2 elements");
                return None;
            }
            let mut elems = Vec::with_capacity(len);
            for _ in 0..len {
                elems.push(parse_from_type_id(cursor, env, &child_spec, true, false, depth + 1)?);
            }
            Some(if as_map {
                format!("{}: {}", elems[0], elems[1])
            } else if range_spec.contains('n') {
                elems.join(", ")
            } else {
                format!("({})", elems.join(", "))
            })
        }
        RangeType::List | RangeType::Map | RangeType::Set => {
            let len = cursor.read_uint(size.bytes())? as usize;
            let (range_spec, child_spec) = fix_range_replacement_field(field);
            let elems = match layout {
                RangeLayout::Compact => {
                    let leaf_tag = cursor.read_u8().or_else(|| {
                        env.report("truncated: expected a leaf element tag");
                        None
                    })?;
                    let (leaf_ty, leaf_size) = tag::parse_trivial(leaf_tag).or_else(|| {
                        env.report(format!("invalid compact leaf tag {leaf_tag:#04x}"));
                        None
                    })?;
                    let mut elems = Vec::with_capacity(len);
                    for _ in 0..len {
                        let value = trivial_value(cursor, env, leaf_ty, leaf_size)?;
                        elems.push(brace::format(&child_spec, value).map_err(|e| env.report(e.0)).ok()?);
                    }
                    elems
                }
                RangeLayout::OnTiEach => {
                    let in_map = range_ty == RangeType::Map || range_spec.contains('m');
                    let mut elems = Vec::with_capacity(len);
                    for _ in 0..len {
                        elems.push(parse_from_type_id(cursor, env, &child_spec, true, in_map, depth + 1)?);
                    }
                    elems
                }
            };
            let joined = elems.join(", ");
            Some(match range_ty {
                RangeType::List => format!("[{joined}]"),
                _ if range_spec.contains('n') => joined,
                _ => format!("{{{joined}}}"),
            })
        }
        RangeType::ExtendedTypeIdentifier => {
            let code = cursor.read_uint(size.bytes())? as u8;
            let ext = ExtendedTypeIdentifier::try_from_primitive(code).ok().or_else(|| {
                env.report(format!("invalid extended type identifier code {code}"));
                None
            })?;
            match ext {
                ExtendedTypeIdentifier::Optional => {
                    let flag = cursor.read_u8().or_else(|| {
                        env.report("truncated: expected an optional presence flag");
                        None
                    })?;
                    match flag {
                        0 => Some("()".to_string()),
                        1 => parse_from_type_id(cursor, env, field, in_list, in_map, depth + 1),
                        _ => {
                            env.report(format!("optional presence flag must be 0 or 1, got {flag}"));
                            None
                        }
                    }
                }
                ExtendedTypeIdentifier::Styled => parse_styled(cursor, env, field, in_list, in_map, depth),
            }
        }
    }
}

fn parse_styled<C: Catalog>(
    cursor: &mut ByteCursor,
    env: &ParseEnv<'_, C>,
    field: &str,
    in_list: bool,
    in_map: bool,
    depth: u32,
) -> Option<String> {
    let set_byte = cursor.read_u8().or_else(|| {
        env.report("truncated: expected a style-set byte");
        None
    })?;
    if set_byte & 0xC0 != 0 {
        env.report("style-set byte has reserved bits 6-7 set");
        return None;
    }
    let fg_rgb = set_byte & 0x01 != 0;
    let fg_term = set_byte & 0x02 != 0;
    let bg_rgb = set_byte & 0x04 != 0;
    let bg_term = set_byte & 0x08 != 0;
    let has_emphasis = set_byte & 0x10 != 0;
    if fg_rgb && fg_term {
        env.report("style-set byte claims both rgb and terminal foreground");
        return None;
    }
    if bg_rgb && bg_term {
        env.report("style-set byte claims both rgb and terminal background");
        return None;
    }

    let read_color = |cursor: &mut ByteCursor, rgb: bool, term: bool| -> Option<Option<Color>> {
        if rgb {
            let bytes = cursor.read_bytes(4)?;
            Some(Some(Color::Rgb(bytes[0], bytes[1], bytes[2])))
        } else if term {
            Some(Some(Color::Term(cursor.read_u8()?)))
        } else {
            Some(None)
        }
    };

    let foreground = read_color(cursor, fg_rgb, fg_term).or_else(|| {
        env.report("truncated: expected a foreground color payload");
        None
    })?;
    let background = read_color(cursor, bg_rgb, bg_term).or_else(|| {
        env.report("truncated: expected a background color payload");
        None
    })?;
    let emphasis = if has_emphasis {
        Emphasis::from_bits(cursor.read_u8().or_else(|| {
            env.report("truncated: expected an emphasis byte");
            None
        })?)
    } else {
        Emphasis::empty()
    };

    let inner = parse_from_type_id(cursor, env, field, in_list, in_map, depth + 1)?;
    let style = Style {
        foreground,
        background,
        emphasis,
    };
    Some(style.paint(&inner))
}

fn parse_time<C: Catalog>(cursor: &mut ByteCursor, env: &ParseEnv<'_, C>, tag: u8, field: &str) -> Option<String> {
    let (ty, num_size, den_size, count_size) = tag::parse_time(tag).or_else(|| {
        env.report(format!("invalid time tag {tag:#04x}"));
        None
    })?;
    let num = cursor.read_uint(num_size.bytes())?;
    let den = cursor.read_uint(den_size.bytes())?;
    let count = cursor.read_int(count_size.bytes())?;
    if num == 0 || den == 0 {
        env.report("time numerator/denominator must be non-zero");
        return None;
    }
    let _ = ty; // duration vs. time_point only changes semantics upstream, not this rendering.
    let suffix = duration::suffix_for_ratio(num, den);
    match field {
        "{}" | "{:%Q%q}" => Some(match suffix {
            Some(suffix) => format!("{count}{suffix}"),
            None if den == 1 => format!("{count}[{num}]s"),
            None => format!("{count}[{num}/{den}]s"),
        }),
        "{:%Q}" => Some(count.to_string()),
        "{:%q}" => Some(match suffix {
            Some(suffix) => suffix.to_string(),
            None if den == 1 => format!("[{num}]s"),
            None => format!("[{num}/{den}]s"),
        }),
        _ => {
            // An arbitrary brace spec (e.g. "{:.2}"): no strftime-style
            // specifier applies, so render the duration as a plain
            // double-valued number of seconds through that spec.
            let seconds = count as f64 * num as f64 / den as f64;
            brace::format(field, brace::Value::Float(seconds))
                .map_err(|e| env.report(e.0))
                .ok()
        }
    }
}
