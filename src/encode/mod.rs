//! The producer side: tag-and-payload emission routines plus the
//! top-level `print` entry point.

use anyhow::{ensure, Result};

use crate::catalog::InternTable;
use crate::io::Sink;
use crate::tag::{
    pack_fmt_string, pack_range, pack_time, pack_trivial, ExtendedTypeIdentifier, FmtStringType,
    RangeLayout, RangeSize, RangeType, TimeSize, TimeType, TrivialType, TypeSize,
};
use crate::template::{all_chars_valid, check_replacement_field_count};
use crate::value::Encodable;

/// Whether templates/string literals should be interned through the
/// catalog rather than written inline.
#[derive(Clone, Copy, Debug, Default)]
pub struct EncoderConfig {
    pub use_catalog: bool,
}

/// Drives a [`Sink`] through one `print` call's worth of tag-and-payload
/// writes. Borrowed by every [`Encodable`] impl.
pub struct Encoder<'a> {
    sink: &'a mut dyn Sink,
    config: EncoderConfig,
    intern: Option<&'a InternTable>,
}

impl<'a> Encoder<'a> {
    fn emit_tag(&mut self, tag: u8) {
        self.sink.write_u8(tag);
    }

    /// Writes one byte with no tag of its own, for payloads that follow a
    /// header this encoder already wrote (style-set byte, flag bytes).
    pub fn emit_raw_u8(&mut self, v: u8) {
        self.sink.write_u8(v);
    }

    /// Writes raw bytes with no tag of their own.
    pub fn emit_raw_bytes(&mut self, bytes: &[u8]) {
        self.sink.write(bytes);
    }

    pub fn encode_unsigned(&mut self, v: u64) {
        let size = TypeSize::smallest_for_u64(v);
        self.emit_tag(pack_trivial(TrivialType::Unsigned, size));
        self.sink.write_uint(v, size.bytes());
    }

    pub fn encode_signed(&mut self, v: i64) {
        let size = TypeSize::smallest_for_i64(v);
        self.emit_tag(pack_trivial(TrivialType::Signed, size));
        self.sink.write_int(v, size.bytes());
    }

    pub fn encode_bool(&mut self, v: bool) {
        self.emit_tag(pack_trivial(TrivialType::Boolean, TypeSize::_1));
        self.sink.write_u8(v as u8);
    }

    /// Only the ASCII range round-trips faithfully: a character is a
    /// single encoded byte on the wire.
    pub fn encode_char(&mut self, v: char) {
        self.emit_tag(pack_trivial(TrivialType::Character, TypeSize::_1));
        self.sink.write_u8(v as u8);
    }

    pub fn encode_pointer(&mut self, v: u64) {
        let size = if std::mem::size_of::<usize>() <= 4 {
            TypeSize::_4
        } else {
            TypeSize::_8
        };
        self.emit_tag(pack_trivial(TrivialType::Pointer, size));
        self.sink.write_uint(v, size.bytes());
    }

    pub fn encode_f32(&mut self, v: f32) {
        self.emit_tag(pack_trivial(TrivialType::FloatingPoint, TypeSize::_4));
        self.sink.write_u32(v.to_bits());
    }

    pub fn encode_f64(&mut self, v: f64) {
        self.emit_tag(pack_trivial(TrivialType::FloatingPoint, TypeSize::_8));
        self.sink.write_u64(v.to_bits());
    }

    pub fn encode_string(&mut self, s: &str) {
        let size = RangeSize::smallest_for_len(s.len());
        self.emit_tag(pack_range(RangeType::String, size, RangeLayout::Compact));
        self.sink.write_uint(s.len() as u64, size.bytes());
        self.sink.write(s.as_bytes());
    }

    /// Falls back to [`Self::encode_string`] when no intern table is
    /// attached to this encoder.
    pub fn encode_cataloged_string(&mut self, s: &'static str) {
        let Some(intern) = self.intern else {
            return self.encode_string(s);
        };
        let id = intern.intern(s);
        self.emit_tag(pack_range(
            RangeType::CatalogedString,
            RangeSize::_2,
            RangeLayout::Compact,
        ));
        self.sink.write_u16(id);
    }

    fn emit_range_header(&mut self, ty: RangeType, layout: RangeLayout, len: usize) -> RangeSize {
        let size = RangeSize::smallest_for_len(len);
        self.emit_tag(pack_range(ty, size, layout));
        self.sink.write_uint(len as u64, size.bytes());
        size
    }

    /// A homogeneous, numeric/bool/char leaf sequence: one trivial tag
    /// precedes the length-many untagged payloads.
    pub fn encode_compact<T: Leaf>(&mut self, ty: RangeType, items: &[T]) {
        self.emit_range_header(ty, RangeLayout::Compact, items.len());
        self.emit_tag(T::leaf_tag());
        for item in items {
            item.write_payload(self);
        }
    }

    /// Writes a range header (`on_ti_each` layout) for `len` elements the
    /// caller will immediately encode one by one; every element carries
    /// its own tag.
    pub fn begin_each(&mut self, ty: RangeType, len: usize) {
        self.emit_range_header(ty, RangeLayout::OnTiEach, len);
    }

    pub fn encode_tuple(&mut self, items: &[&dyn Encodable]) {
        self.emit_range_header(RangeType::Tuple, RangeLayout::OnTiEach, items.len());
        for item in items {
            item.encode(self);
        }
    }

    pub fn encode_optional(&mut self, item: Option<&dyn Encodable>) {
        self.emit_extended_header(ExtendedTypeIdentifier::Optional);
        match item {
            None => self.sink.write_u8(0),
            Some(v) => {
                self.sink.write_u8(1);
                v.encode(self);
            }
        }
    }

    pub fn emit_extended_header(&mut self, ext: ExtendedTypeIdentifier) {
        self.emit_tag(pack_range(
            RangeType::ExtendedTypeIdentifier,
            RangeSize::_1,
            RangeLayout::OnTiEach,
        ));
        self.sink.write_u8(ext.into());
    }

    pub fn encode_duration_nanos(&mut self, total_nanos: i64) {
        let (num, den, count, _suffix) = crate::duration::canonical_ratio_for_nanos(total_nanos);
        self.encode_time(TimeType::Duration, num, den, count);
    }

    pub fn encode_time_point_nanos_since_epoch(&mut self, total_nanos: i64) {
        let (num, den, count, _suffix) = crate::duration::canonical_ratio_for_nanos(total_nanos);
        self.encode_time(TimeType::TimePoint, num, den, count);
    }

    fn encode_time(&mut self, ty: TimeType, num: u64, den: u64, count: i64) {
        let num_size = TypeSize::smallest_for_u64(num);
        let den_size = TypeSize::smallest_for_u64(den);
        let count_size = TimeSize::smallest_for_i64(count);
        self.emit_tag(pack_time(ty, num_size, den_size, count_size));
        self.sink.write_uint(num, num_size.bytes());
        self.sink.write_uint(den, den_size.bytes());
        self.sink.write_int(count, count_size.bytes());
    }

    /// Writes a nested `fmt_string` tag and its arguments in place, for a
    /// sub-template carried as one argument of the enclosing template.
    pub(crate) fn encode_nested_template(
        &mut self,
        template: &'static str,
        args: &[&dyn Encodable],
    ) -> Result<()> {
        ensure!(all_chars_valid(template), "template contains an invalid character");
        let field_count = check_replacement_field_count(template)
            .ok_or_else(|| anyhow::anyhow!("unbalanced braces in template"))?;
        ensure!(
            field_count == args.len(),
            "template expects {field_count} arguments, got {}",
            args.len()
        );
        match self.intern {
            Some(intern) if self.config.use_catalog => {
                let id = intern.intern(template);
                self.emit_tag(pack_fmt_string(FmtStringType::CatalogedSub, RangeSize::_2));
                self.sink.write_u16(id);
            }
            _ => {
                let size = RangeSize::smallest_for_len(template.len());
                self.emit_tag(pack_fmt_string(FmtStringType::Sub, size));
                self.sink.write_uint(template.len() as u64, size.bytes());
                self.sink.write(template.as_bytes());
            }
        }
        for arg in args {
            arg.encode(self);
        }
        Ok(())
    }
}

/// A homogeneous leaf value eligible for compact container encoding: its
/// tag depends only on its static Rust type, not its runtime value, so a
/// slice of `T` can share one leading trivial tag.
pub trait Leaf: Encodable {
    fn leaf_tag() -> u8;
    fn write_payload(&self, enc: &mut Encoder<'_>);
}

macro_rules! impl_leaf_uint {
    ($t:ty, $size:expr) => {
        impl Leaf for $t {
            fn leaf_tag() -> u8 {
                pack_trivial(TrivialType::Unsigned, $size)
            }
            fn write_payload(&self, enc: &mut Encoder<'_>) {
                enc.sink.write_uint(*self as u64, $size.bytes());
            }
        }
    };
}

macro_rules! impl_leaf_int {
    ($t:ty, $size:expr) => {
        impl Leaf for $t {
            fn leaf_tag() -> u8 {
                pack_trivial(TrivialType::Signed, $size)
            }
            fn write_payload(&self, enc: &mut Encoder<'_>) {
                enc.sink.write_int(*self as i64, $size.bytes());
            }
        }
    };
}

impl_leaf_uint!(u8, TypeSize::_1);
impl_leaf_uint!(u16, TypeSize::_2);
impl_leaf_uint!(u32, TypeSize::_4);
impl_leaf_uint!(u64, TypeSize::_8);
impl_leaf_int!(i8, TypeSize::_1);
impl_leaf_int!(i16, TypeSize::_2);
impl_leaf_int!(i32, TypeSize::_4);
impl_leaf_int!(i64, TypeSize::_8);

impl Leaf for bool {
    fn leaf_tag() -> u8 {
        pack_trivial(TrivialType::Boolean, TypeSize::_1)
    }
    fn write_payload(&self, enc: &mut Encoder<'_>) {
        enc.sink.write_u8(*self as u8);
    }
}

impl Leaf for f32 {
    fn leaf_tag() -> u8 {
        pack_trivial(TrivialType::FloatingPoint, TypeSize::_4)
    }
    fn write_payload(&self, enc: &mut Encoder<'_>) {
        enc.sink.write_u32(self.to_bits());
    }
}

impl Leaf for f64 {
    fn leaf_tag() -> u8 {
        pack_trivial(TrivialType::FloatingPoint, TypeSize::_8)
    }
    fn write_payload(&self, enc: &mut Encoder<'_>) {
        enc.sink.write_u64(self.to_bits());
    }
}

/// Validates and emits one complete frame: `Start`, the (possibly
/// cataloged) template, every argument in order, `End`.
pub fn print<S: Sink>(
    sink: &mut S,
    config: EncoderConfig,
    intern: Option<&InternTable>,
    template: &'static str,
    args: &[&dyn Encodable],
) -> Result<()> {
    ensure!(all_chars_valid(template), "template contains an invalid character");
    let field_count = check_replacement_field_count(template)
        .ok_or_else(|| anyhow::anyhow!("unbalanced braces in template"))?;
    ensure!(
        field_count == args.len(),
        "template expects {field_count} arguments, got {}",
        args.len()
    );

    sink.begin();
    sink.write(&[crate::protocol::START_MARKER]);

    let mut encoder = Encoder {
        sink,
        config,
        intern,
    };
    match (intern, config.use_catalog) {
        (Some(intern), true) => {
            let id = intern.intern(template);
            encoder.emit_tag(pack_fmt_string(FmtStringType::CatalogedNormal, RangeSize::_2));
            encoder.sink.write_u16(id);
        }
        _ => {
            let size = RangeSize::smallest_for_len(template.len());
            encoder.emit_tag(pack_fmt_string(FmtStringType::Normal, size));
            encoder.sink.write_uint(template.len() as u64, size.bytes());
            encoder.sink.write(template.as_bytes());
        }
    }
    for arg in args {
        arg.encode(&mut encoder);
    }
    encoder.sink.write(&[crate::protocol::END_MARKER]);
    encoder.sink.end();
    Ok(())
}
