//! `Encodable`: the trait every producible value kind implements, and the
//! wrapper types (`Styled`, `TimePoint`, `CatalogedStr`) that round out the
//! value model the wire format can carry.
//!
//! Rust has no partial specialization, so dispatch happens through one
//! `impl Encodable for T` per supported type rather than a single
//! compile-time-polymorphic encoder function.

use std::borrow::Cow;
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};

use crate::encode::Encoder;
use crate::tag::RangeType;

pub trait Encodable {
    fn encode(&self, enc: &mut Encoder<'_>);
}

impl<T: Encodable + ?Sized> Encodable for &T {
    fn encode(&self, enc: &mut Encoder<'_>) {
        (**self).encode(enc)
    }
}

macro_rules! impl_encodable_unsigned {
    ($($t:ty),* $(,)?) => {
        $(impl Encodable for $t {
            fn encode(&self, enc: &mut Encoder<'_>) {
                enc.encode_unsigned(*self as u64);
            }
        })*
    };
}

macro_rules! impl_encodable_signed {
    ($($t:ty),* $(,)?) => {
        $(impl Encodable for $t {
            fn encode(&self, enc: &mut Encoder<'_>) {
                enc.encode_signed(*self as i64);
            }
        })*
    };
}

impl_encodable_unsigned!(u8, u16, u32, u64, usize);
impl_encodable_signed!(i8, i16, i32, i64, isize);

impl Encodable for bool {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_bool(*self);
    }
}

impl Encodable for char {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_char(*self);
    }
}

impl Encodable for f32 {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_f32(*self);
    }
}

impl Encodable for f64 {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_f64(*self);
    }
}

impl Encodable for str {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_string(self);
    }
}

impl Encodable for String {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_string(self);
    }
}

impl Encodable for Cow<'_, str> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_string(self);
    }
}

/// A `&'static str` the encoder should intern through the catalog rather
/// than writing inline: a string constant known at compile time.
#[derive(Clone, Copy, Debug)]
pub struct CatalogedStr(pub &'static str);

impl Encodable for CatalogedStr {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_cataloged_string(self.0);
    }
}

/// A raw pointer-sized address, encoded with `TrivialType::Pointer`.
#[derive(Clone, Copy, Debug)]
pub struct Pointer(pub usize);

impl Encodable for Pointer {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_pointer(self.0 as u64);
    }
}

/// An enum value that knows its variant's name, encoded as an interned
/// string literal rather than its discriminant when a name is available.
pub trait NamedEnum {
    fn variant_name(&self) -> Option<&'static str>;
    fn discriminant(&self) -> i64;
}

/// Wraps any [`NamedEnum`] for encoding: a named variant becomes a
/// cataloged string, an unnamed one falls back to its discriminant.
pub struct EnumValue<'a, E: NamedEnum>(pub &'a E);

impl<E: NamedEnum> Encodable for EnumValue<'_, E> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        match self.0.variant_name() {
            Some(name) => enc.encode_cataloged_string(name),
            None => enc.encode_signed(self.0.discriminant()),
        }
    }
}

/// An explicitly homogeneous slice, encoded with the *compact* range
/// layout (one leading trivial tag, then `N` untagged payloads). Rust has
/// no specialization to infer this automatically from `T`, so callers opt
/// in explicitly; a plain `&[T]`/`Vec<T>` always uses the general,
/// self-describing *on_ti_each* layout instead.
pub struct Compact<'a, T: crate::encode::Leaf>(pub &'a [T]);

impl<T: crate::encode::Leaf> Encodable for Compact<'_, T> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_compact(RangeType::List, self.0);
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.begin_each(RangeType::List, self.len());
        for item in self {
            item.encode(enc);
        }
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        self.as_slice().encode(enc)
    }
}

impl<K: Encodable, V: Encodable> Encodable for IndexMap<K, V> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.begin_each(RangeType::Map, self.len());
        for (k, v) in self {
            KeyValue(k, v).encode(enc);
        }
    }
}

impl<T: Encodable> Encodable for IndexSet<T> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.begin_each(RangeType::Set, self.len());
        for item in self {
            item.encode(enc);
        }
    }
}

/// A key/value pair, encoded as a 2-tuple; `IndexMap`'s entries are
/// rendered through this so the decoder's generic tuple-with-`m`-flag
/// machinery can special-case arity-2 tuples as `k: v`.
struct KeyValue<'a, K, V>(&'a K, &'a V);

impl<K: Encodable, V: Encodable> Encodable for KeyValue<'_, K, V> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_tuple(&[self.0 as &dyn Encodable, self.1 as &dyn Encodable]);
    }
}

impl<T: Encodable> Encodable for Option<T> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_optional(self.as_ref().map(|v| v as &dyn Encodable));
    }
}

macro_rules! impl_encodable_tuple {
    ($($idx:tt : $name:ident),+) => {
        impl<$($name: Encodable),+> Encodable for ($($name,)+) {
            fn encode(&self, enc: &mut Encoder<'_>) {
                enc.encode_tuple(&[$(&self.$idx as &dyn Encodable),+]);
            }
        }
    };
}

impl_encodable_tuple!(0: A);
impl_encodable_tuple!(0: A, 1: B);
impl_encodable_tuple!(0: A, 1: B, 2: C);
impl_encodable_tuple!(0: A, 1: B, 2: C, 3: D);
impl_encodable_tuple!(0: A, 1: B, 2: C, 3: D, 4: E);
impl_encodable_tuple!(0: A, 1: B, 2: C, 3: D, 4: E, 5: F);

/// An instant since the Unix epoch, distinct from a plain [`Duration`] so
/// the encoder can pick `TimeType::TimePoint` instead of
/// `TimeType::Duration`.
#[derive(Clone, Copy, Debug)]
pub struct TimePoint(pub Duration);

impl Encodable for Duration {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_duration_nanos(self.as_nanos().min(i64::MAX as u128) as i64);
    }
}

impl Encodable for TimePoint {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.encode_time_point_nanos_since_epoch(self.0.as_nanos().min(i64::MAX as u128) as i64);
    }
}

/// Either an RGB triplet or a 4-bit terminal color index, matching the
/// two mutually exclusive representations the style-set byte allows per
/// side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Rgb(u8, u8, u8),
    Term(u8),
}

/// A minimal hand-rolled stand-in for the `bitflags!` macro, scoped to
/// `Emphasis` alone rather than pulling in a dependency for one 5-bit set.
macro_rules! bitflags_emphasis {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $flag:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub struct $name($repr);

        impl $name {
            $(pub const $flag: $name = $name($value);)*

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn bits(self) -> $repr {
                self.0
            }

            pub const fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }
    };
}

bitflags_emphasis! {
    /// Emphasis bits packed into a single byte, mirrored 1:1 onto the ANSI
    /// SGR codes `paint` emits (bold=1, italic=3, underline=4,
    /// strikethrough=9, faint=2).
    pub struct Emphasis: u8 {
        const BOLD = 0x01;
        const ITALIC = 0x02;
        const UNDERLINE = 0x04;
        const STRIKETHROUGH = 0x08;
        const FAINT = 0x10;
    }
}

/// A foreground/background color pair plus emphasis, carried by
/// [`Styled`]. Encodes into the style-set byte plus per-side payloads
/// described in the tag-byte reference.
#[derive(Clone, Copy, Debug, Default)]
pub struct Style {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub emphasis: Emphasis,
}

impl Style {
    pub(crate) fn set_byte(&self) -> u8 {
        let mut b = 0u8;
        match self.foreground {
            Some(Color::Rgb(..)) => b |= 0x01,
            Some(Color::Term(_)) => b |= 0x02,
            None => {}
        }
        match self.background {
            Some(Color::Rgb(..)) => b |= 0x04,
            Some(Color::Term(_)) => b |= 0x08,
            None => {}
        }
        if !self.emphasis.is_empty() {
            b |= 0x10;
        }
        b
    }
}

impl Style {
    /// Wraps `text` in the ANSI SGR escapes this style implies, using
    /// 256-color codes (`38;5;n`/`48;5;n`) for [`Color::Term`] so any
    /// `u8` index is valid, and the 24-bit `38;2;r;g;b`/`48;2;r;g;b` form
    /// for [`Color::Rgb`].
    pub fn paint(&self, text: &str) -> String {
        let mut codes = Vec::new();
        if let Some(c) = self.foreground {
            codes.push(match c {
                Color::Rgb(r, g, b) => format!("38;2;{r};{g};{b}"),
                Color::Term(n) => format!("38;5;{n}"),
            });
        }
        if let Some(c) = self.background {
            codes.push(match c {
                Color::Rgb(r, g, b) => format!("48;2;{r};{g};{b}"),
                Color::Term(n) => format!("48;5;{n}"),
            });
        }
        if self.emphasis.contains(Emphasis::BOLD) {
            codes.push("1".to_string());
        }
        if self.emphasis.contains(Emphasis::FAINT) {
            codes.push("2".to_string());
        }
        if self.emphasis.contains(Emphasis::ITALIC) {
            codes.push("3".to_string());
        }
        if self.emphasis.contains(Emphasis::UNDERLINE) {
            codes.push("4".to_string());
        }
        if self.emphasis.contains(Emphasis::STRIKETHROUGH) {
            codes.push("9".to_string());
        }
        if codes.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{}m{text}\x1b[0m", codes.join(";"))
    }
}

/// A value rendered with ANSI styling, carried through the wire as
/// `ExtendedTypeIdentifier::Styled`.
pub struct Styled<T>(pub T, pub Style);

impl<T: Encodable> Encodable for Styled<T> {
    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.emit_extended_header(crate::tag::ExtendedTypeIdentifier::Styled);
        let style = &self.1;
        enc.emit_raw_u8(style.set_byte());
        if let Some(color) = style.foreground {
            encode_color(enc, color);
        }
        if let Some(color) = style.background {
            encode_color(enc, color);
        }
        if !style.emphasis.is_empty() {
            enc.emit_raw_u8(style.emphasis.bits());
        }
        self.0.encode(enc);
    }
}

fn encode_color(enc: &mut Encoder<'_>, color: Color) {
    match color {
        Color::Rgb(r, g, b) => enc.emit_raw_bytes(&[r, g, b, 0]),
        Color::Term(idx) => enc.emit_raw_u8(idx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EmptyCatalog;
    use crate::decode::parse;
    use crate::encode::{print, EncoderConfig};

    fn render(template: &'static str, args: &[&dyn Encodable]) -> String {
        let mut buf = Vec::new();
        print(&mut buf, EncoderConfig::default(), None, template, args).unwrap();
        let mut errors = Vec::new();
        let (out, rest, discarded) = parse(&buf, &EmptyCatalog, &mut |e| errors.push(e.to_string()));
        assert!(rest.is_empty(), "unexpected trailing bytes: {errors:?}");
        assert_eq!(discarded, 0);
        out.unwrap_or_else(|| panic!("parse failed: {errors:?}"))
    }

    #[test]
    fn integer_scenario() {
        assert_eq!(render("Test {}", &[&123u32]), "Test 123");
    }

    #[test]
    fn list_scenario() {
        let items = vec![1u32, 2, 3];
        assert_eq!(render("{}", &[&items]), "[1, 2, 3]");
    }

    #[test]
    fn tuple_scenario() {
        let t = (1u32, "x".to_string(), true);
        assert_eq!(render("{}", &[&t]), "(1, \"x\", true)");
    }

    #[test]
    fn optional_empty_scenario() {
        let v: Option<u32> = None;
        assert_eq!(render("{}", &[&v]), "()");
    }

    #[test]
    fn duration_scenario() {
        assert_eq!(render("{}", &[&Duration::from_millis(5)]), "5ms");
    }
}
