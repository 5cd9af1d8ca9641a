//! A small, from-scratch runtime interpreter for the subset of the
//! `{[[fill]align][sign]['#']['0'][width]['.'precision][type]}`
//! replacement-field grammar this codec needs.
//!
//! Rust's `std::fmt` macros require the format string at compile time;
//! there is no equivalent of C++'s `fmt::runtime(replacementField)` for a
//! string that only becomes known after parsing a byte stream. This
//! module is the concrete stand-in for that external formatter: it is
//! deliberately not a general `std::fmt` replacement, only the specifiers
//! meaningful for brace-style logging output over the value kinds this
//! wire format can carry.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Default,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeChar {
    Default,
    Hex,
    HexUpper,
    Octal,
    Binary,
    Debug,
}

#[derive(Debug, Clone)]
pub struct Spec {
    pub fill: char,
    pub align: Option<Align>,
    pub sign: Sign,
    pub alternate: bool,
    pub zero_pad: bool,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub ty: TypeChar,
}

impl Default for Spec {
    fn default() -> Self {
        Spec {
            fill: ' ',
            align: None,
            sign: Sign::Default,
            alternate: false,
            zero_pad: false,
            width: None,
            precision: None,
            ty: TypeChar::Default,
        }
    }
}

/// One argument value the formatter can render. Containers, durations,
/// cataloged/dynamic strings and styled values are rendered elsewhere and
/// passed in pre-rendered via `Str`.
#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    UInt(u64),
    Int(i64),
    Bool(bool),
    Char(char),
    Pointer(u64),
    Float(f64),
    /// Already-rendered text (quoting, if any, already applied).
    Str(&'a str),
}

#[derive(Debug, PartialEq, Eq)]
pub struct FormatterFailure(pub String);

/// Parses and renders `field` (a full `"{...}"` replacement field, or the
/// synthetic `"{:childspec}"` produced by [`crate::template::fix_range_replacement_field`])
/// against `value`.
pub fn format(field: &str, value: Value<'_>) -> Result<String, FormatterFailure> {
    let spec = parse_spec(field)?;
    render(&spec, value)
}

fn parse_spec(field: &str) -> Result<Spec, FormatterFailure> {
    if !field.starts_with('{') || !field.ends_with('}') {
        return Err(FormatterFailure(format!("malformed replacement field {field:?}")));
    }
    let inner = &field[1..field.len() - 1];
    let Some(inner) = inner.strip_prefix(':') else {
        if !inner.is_empty() {
            return Err(FormatterFailure(format!("unsupported replacement field {field:?}")));
        }
        return Ok(Spec::default());
    };

    let mut spec = Spec::default();
    let chars: Vec<char> = inner.chars().collect();
    let mut i = 0;

    // [[fill]align]
    if chars.len() >= 2 && is_align_char(chars[1]) {
        spec.fill = chars[0];
        spec.align = Some(align_of(chars[1]));
        i = 2;
    } else if !chars.is_empty() && is_align_char(chars[0]) {
        spec.align = Some(align_of(chars[0]));
        i = 1;
    }

    // [sign]
    if chars.get(i) == Some(&'+') {
        spec.sign = Sign::Plus;
        i += 1;
    }

    // ['#']
    if chars.get(i) == Some(&'#') {
        spec.alternate = true;
        i += 1;
    }

    // ['0']
    if chars.get(i) == Some(&'0') {
        spec.zero_pad = true;
        i += 1;
    }

    // [width]
    let width_start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    if i > width_start {
        let width: String = chars[width_start..i].iter().collect();
        spec.width = Some(width.parse().map_err(|_| {
            FormatterFailure(format!("invalid width in replacement field {field:?}"))
        })?);
    }

    // ['.' precision]
    if chars.get(i) == Some(&'.') {
        i += 1;
        let prec_start = i;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        let precision: String = chars[prec_start..i].iter().collect();
        spec.precision = Some(precision.parse().map_err(|_| {
            FormatterFailure(format!("invalid precision in replacement field {field:?}"))
        })?);
    }

    // [type]
    if let Some(&c) = chars.get(i) {
        spec.ty = match c {
            'x' => TypeChar::Hex,
            'X' => TypeChar::HexUpper,
            'o' => TypeChar::Octal,
            'b' => TypeChar::Binary,
            '?' => TypeChar::Debug,
            _ => {
                return Err(FormatterFailure(format!(
                    "unsupported type specifier {c:?} in {field:?}"
                )))
            }
        };
        i += 1;
    }

    if i != chars.len() {
        return Err(FormatterFailure(format!(
            "trailing characters in replacement field {field:?}"
        )));
    }

    Ok(spec)
}

fn is_align_char(c: char) -> bool {
    matches!(c, '<' | '>' | '^')
}

fn align_of(c: char) -> Align {
    match c {
        '<' => Align::Left,
        '>' => Align::Right,
        '^' => Align::Center,
        _ => unreachable!(),
    }
}

fn render(spec: &Spec, value: Value<'_>) -> Result<String, FormatterFailure> {
    let body = render_body(spec, value)?;
    Ok(pad(spec, &body))
}

fn render_body(spec: &Spec, value: Value<'_>) -> Result<String, FormatterFailure> {
    match value {
        Value::Str(s) => {
            if spec.ty != TypeChar::Default {
                return Err(FormatterFailure(format!(
                    "type specifier not valid for string values"
                )));
            }
            Ok(match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.to_string(),
            })
        }
        Value::Bool(b) => {
            if spec.ty != TypeChar::Default {
                return Err(FormatterFailure("type specifier not valid for bool".into()));
            }
            Ok(b.to_string())
        }
        Value::Char(c) => {
            if spec.ty == TypeChar::Debug {
                Ok(format!("{c:?}"))
            } else if spec.ty != TypeChar::Default {
                Err(FormatterFailure("type specifier not valid for char".into()))
            } else {
                Ok(c.to_string())
            }
        }
        Value::UInt(v) => render_uint(spec, v),
        Value::Pointer(v) => {
            let mut s = String::new();
            write!(s, "{v:#x}").unwrap();
            Ok(s)
        }
        Value::Int(v) => {
            let (sign, mag) = if v < 0 {
                ("-", v.unsigned_abs())
            } else if spec.sign == Sign::Plus {
                ("+", v as u64)
            } else {
                ("", v as u64)
            };
            let digits = render_uint(spec, mag)?;
            Ok(format!("{sign}{digits}"))
        }
        Value::Float(v) => {
            if spec.ty != TypeChar::Default {
                return Err(FormatterFailure("type specifier not valid for float".into()));
            }
            let sign = if v.is_sign_positive() && spec.sign == Sign::Plus {
                "+"
            } else {
                ""
            };
            let body = match spec.precision {
                Some(p) => format!("{v:.p$}"),
                None => format!("{v}"),
            };
            Ok(format!("{sign}{body}"))
        }
    }
}

fn render_uint(spec: &Spec, v: u64) -> Result<String, FormatterFailure> {
    let (digits, prefix) = match spec.ty {
        TypeChar::Default | TypeChar::Debug => (format!("{v}"), ""),
        TypeChar::Hex => (format!("{v:x}"), if spec.alternate { "0x" } else { "" }),
        TypeChar::HexUpper => (format!("{v:X}"), if spec.alternate { "0x" } else { "" }),
        TypeChar::Octal => (format!("{v:o}"), if spec.alternate { "0o" } else { "" }),
        TypeChar::Binary => (format!("{v:b}"), if spec.alternate { "0b" } else { "" }),
    };
    Ok(format!("{prefix}{digits}"))
}

fn pad(spec: &Spec, body: &str) -> String {
    let Some(width) = spec.width else {
        return body.to_string();
    };
    let len = body.chars().count();
    if len >= width {
        return body.to_string();
    }
    let missing = width - len;
    let fill = if spec.zero_pad && spec.align.is_none() {
        '0'
    } else {
        spec.fill
    };
    let align = spec
        .align
        .unwrap_or(if spec.zero_pad { Align::Right } else { Align::Left });
    match align {
        Align::Left => format!("{body}{}", fill.to_string().repeat(missing)),
        Align::Right => format!("{}{body}", fill.to_string().repeat(missing)),
        Align::Center => {
            let left = missing / 2;
            let right = missing - left;
            format!(
                "{}{body}{}",
                fill.to_string().repeat(left),
                fill.to_string().repeat(right)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_integer() {
        assert_eq!(format("{}", Value::UInt(123)).unwrap(), "123");
    }

    #[test]
    fn renders_signed_with_explicit_plus() {
        assert_eq!(format("{:+}", Value::Int(5)).unwrap(), "+5");
        assert_eq!(format("{:+}", Value::Int(-5)).unwrap(), "-5");
    }

    #[test]
    fn renders_hex_with_alternate_prefix() {
        assert_eq!(format("{:#x}", Value::UInt(255)).unwrap(), "0xff");
        assert_eq!(format("{:#X}", Value::UInt(255)).unwrap(), "0xFF");
    }

    #[test]
    fn renders_pointer_as_hex() {
        assert_eq!(format("{}", Value::Pointer(0x1000)).unwrap(), "0x1000");
    }

    #[test]
    fn pads_with_width_and_fill() {
        assert_eq!(format("{:5}", Value::UInt(7)).unwrap(), "7    ");
        assert_eq!(format("{:>5}", Value::UInt(7)).unwrap(), "    7");
        assert_eq!(format("{:05}", Value::UInt(7)).unwrap(), "00007");
        assert_eq!(format("{:*^7}", Value::UInt(7)).unwrap(), "***7***");
    }

    #[test]
    fn string_values_pass_through() {
        assert_eq!(format("{}", Value::Str("hi")).unwrap(), "hi");
    }

    #[test]
    fn rejects_unsupported_type_specifier_for_strings() {
        assert!(format("{:x}", Value::Str("hi")).is_err());
    }
}
