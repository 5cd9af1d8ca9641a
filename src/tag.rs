//! The single tag byte that precedes every encoded value.
//!
//! Layout (bit 0 is the least significant bit):
//!
//! ```text
//! trivial:    b1 b0 = 00 | b3 b2 = TypeSize  | b6 b5 b4 = TrivialType | b7 = 0
//! range:      b1 b0 = 01 | b2    = RangeSize | b6 b5 b4 = RangeType   | b7 = RangeLayout
//! time:       b1 b0 = 10 | b3 b2 = num size  | b5 b4   = den size    | b6 = TimeSize | b7 = TimeType
//! fmt_string: b1 b0 = 11 | b2    = RangeSize | b5 b4   = FmtStringType| b7 = 0
//! ```
//!
//! Every `parse_*` function re-packs the subfields it extracted and rejects
//! the byte unless that repack matches exactly (fail-closed on reserved
//! bits and on out-of-range enum codes).

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TypeIdentifier {
    Trivial = 0b00,
    Range = 0b01,
    Time = 0b10,
    FmtString = 0b11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TrivialType {
    Unsigned = 0,
    Signed = 1,
    Boolean = 2,
    Character = 3,
    Pointer = 4,
    FloatingPoint = 5,
}

/// Width of a trivial/time-subfield payload: `1 << code` bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TypeSize {
    _1 = 0,
    _2 = 1,
    _4 = 2,
    _8 = 3,
}

impl TypeSize {
    pub const fn bytes(self) -> usize {
        1 << (self as u8)
    }

    /// Smallest width that losslessly represents `v`.
    pub fn smallest_for_u64(v: u64) -> Self {
        if v <= u8::MAX as u64 {
            TypeSize::_1
        } else if v <= u16::MAX as u64 {
            TypeSize::_2
        } else if v <= u32::MAX as u64 {
            TypeSize::_4
        } else {
            TypeSize::_8
        }
    }

    /// Smallest width that losslessly represents a signed `v` (two's
    /// complement range check).
    pub fn smallest_for_i64(v: i64) -> Self {
        if v >= i8::MIN as i64 && v <= i8::MAX as i64 {
            TypeSize::_1
        } else if v >= i16::MIN as i64 && v <= i16::MAX as i64 {
            TypeSize::_2
        } else if v >= i32::MIN as i64 && v <= i32::MAX as i64 {
            TypeSize::_4
        } else {
            TypeSize::_8
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RangeType {
    List = 0,
    Map = 1,
    Set = 2,
    String = 3,
    CatalogedString = 4,
    Tuple = 5,
    ExtendedTypeIdentifier = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RangeLayout {
    Compact = 0,
    OnTiEach = 1,
}

/// Width of a range's element/length-prefix: `_1` is a `u8`, `_2` a `u16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RangeSize {
    _1 = 0,
    _2 = 1,
}

impl RangeSize {
    pub const fn bytes(self) -> usize {
        match self {
            RangeSize::_1 => 1,
            RangeSize::_2 => 2,
        }
    }

    pub fn smallest_for_len(len: usize) -> Self {
        if len <= u8::MAX as usize {
            RangeSize::_1
        } else {
            RangeSize::_2
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TimeType {
    Duration = 0,
    TimePoint = 1,
}

/// Width of the signed count field of a time value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TimeSize {
    _4 = 0,
    _8 = 1,
}

impl TimeSize {
    pub const fn bytes(self) -> usize {
        match self {
            TimeSize::_4 => 4,
            TimeSize::_8 => 8,
        }
    }

    pub fn smallest_for_i64(v: i64) -> Self {
        if v >= i32::MIN as i64 && v <= i32::MAX as i64 {
            TimeSize::_4
        } else {
            TimeSize::_8
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FmtStringType {
    Sub = 0,
    Normal = 1,
    CatalogedSub = 2,
    CatalogedNormal = 3,
}

/// Extension code carried inside a range's size slot when
/// `RangeType::ExtendedTypeIdentifier` is used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ExtendedTypeIdentifier {
    Styled = 0,
    Optional = 1,
}

const TI_MASK: u8 = 0b0000_0011;

pub fn type_identifier(tag: u8) -> Option<TypeIdentifier> {
    TypeIdentifier::try_from_primitive(tag & TI_MASK).ok()
}

// ---- trivial -----------------------------------------------------------

pub const fn pack_trivial(ty: TrivialType, size: TypeSize) -> u8 {
    (TypeIdentifier::Trivial as u8)
        | (cast2_const(size as u8) << 2)
        | (cast3_const(ty as u8) << 4)
}

const fn cast2_const(v: u8) -> u8 {
    v & 0b11
}

const fn cast3_const(v: u8) -> u8 {
    v & 0b111
}

pub fn parse_trivial(tag: u8) -> Option<(TrivialType, TypeSize)> {
    if type_identifier(tag)? != TypeIdentifier::Trivial {
        return None;
    }
    let size = TypeSize::try_from_primitive((tag >> 2) & 0b11).ok()?;
    let ty = TrivialType::try_from_primitive((tag >> 4) & 0b111).ok()?;
    (pack_trivial(ty, size) == tag).then_some((ty, size))
}

// ---- range --------------------------------------------------------------

pub const fn pack_range(ty: RangeType, size: RangeSize, layout: RangeLayout) -> u8 {
    (TypeIdentifier::Range as u8)
        | (cast1_const(size as u8) << 2)
        | (cast3_const(ty as u8) << 4)
        | (cast1_const(layout as u8) << 7)
}

const fn cast1_const(v: u8) -> u8 {
    v & 0b1
}

pub fn parse_range(tag: u8) -> Option<(RangeType, RangeSize, RangeLayout)> {
    if type_identifier(tag)? != TypeIdentifier::Range {
        return None;
    }
    let size = RangeSize::try_from_primitive((tag >> 2) & 0b1).ok()?;
    let ty = RangeType::try_from_primitive((tag >> 4) & 0b111).ok()?;
    let layout = RangeLayout::try_from_primitive((tag >> 7) & 0b1).ok()?;
    (pack_range(ty, size, layout) == tag).then_some((ty, size, layout))
}

// ---- time -----------------------------------------------------------------

pub const fn pack_time(
    ty: TimeType,
    num_size: TypeSize,
    den_size: TypeSize,
    count_size: TimeSize,
) -> u8 {
    (TypeIdentifier::Time as u8)
        | (cast2_const(num_size as u8) << 2)
        | (cast2_const(den_size as u8) << 4)
        | (cast1_const(count_size as u8) << 6)
        | (cast1_const(ty as u8) << 7)
}

pub fn parse_time(tag: u8) -> Option<(TimeType, TypeSize, TypeSize, TimeSize)> {
    if type_identifier(tag)? != TypeIdentifier::Time {
        return None;
    }
    let num_size = TypeSize::try_from_primitive((tag >> 2) & 0b11).ok()?;
    let den_size = TypeSize::try_from_primitive((tag >> 4) & 0b11).ok()?;
    let count_size = TimeSize::try_from_primitive((tag >> 6) & 0b1).ok()?;
    let ty = TimeType::try_from_primitive((tag >> 7) & 0b1).ok()?;
    (pack_time(ty, num_size, den_size, count_size) == tag)
        .then_some((ty, num_size, den_size, count_size))
}

// ---- fmt_string -------------------------------------------------------------

pub const fn pack_fmt_string(ty: FmtStringType, size: RangeSize) -> u8 {
    (TypeIdentifier::FmtString as u8) | (cast1_const(size as u8) << 2) | (cast2_const(ty as u8) << 4)
}

pub fn parse_fmt_string(tag: u8) -> Option<(FmtStringType, RangeSize)> {
    if type_identifier(tag)? != TypeIdentifier::FmtString {
        return None;
    }
    let size = RangeSize::try_from_primitive((tag >> 2) & 0b1).ok()?;
    let ty = FmtStringType::try_from_primitive((tag >> 4) & 0b11).ok()?;
    (pack_fmt_string(ty, size) == tag).then_some((ty, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TrivialType::Unsigned, TypeSize::_1)]
    #[case(TrivialType::Signed, TypeSize::_8)]
    #[case(TrivialType::Boolean, TypeSize::_1)]
    #[case(TrivialType::Character, TypeSize::_1)]
    #[case(TrivialType::Pointer, TypeSize::_8)]
    #[case(TrivialType::FloatingPoint, TypeSize::_4)]
    fn trivial_round_trips(#[case] ty: TrivialType, #[case] size: TypeSize) {
        let tag = pack_trivial(ty, size);
        assert_eq!(parse_trivial(tag), Some((ty, size)));
    }

    #[test]
    fn trivial_rejects_reserved_bit7() {
        let tag = pack_trivial(TrivialType::Unsigned, TypeSize::_1) | 0x80;
        assert_eq!(parse_trivial(tag), None);
    }

    #[test]
    fn range_round_trips_and_rejects_reserved_bit3() {
        let tag = pack_range(RangeType::Tuple, RangeSize::_2, RangeLayout::OnTiEach);
        assert_eq!(
            parse_range(tag),
            Some((RangeType::Tuple, RangeSize::_2, RangeLayout::OnTiEach))
        );
        assert_eq!(parse_range(tag | 0x08), None);
    }

    #[test]
    fn time_round_trips() {
        let tag = pack_time(TimeType::Duration, TypeSize::_4, TypeSize::_8, TimeSize::_8);
        assert_eq!(
            parse_time(tag),
            Some((TimeType::Duration, TypeSize::_4, TypeSize::_8, TimeSize::_8))
        );
    }

    #[test]
    fn fmt_string_round_trips_and_rejects_reserved_bits() {
        let tag = pack_fmt_string(FmtStringType::CatalogedNormal, RangeSize::_2);
        assert_eq!(
            parse_fmt_string(tag),
            Some((FmtStringType::CatalogedNormal, RangeSize::_2))
        );
        assert_eq!(parse_fmt_string(tag | 0x08), None);
        assert_eq!(parse_fmt_string(tag | 0x40), None);
    }

    #[test]
    fn type_size_smallest_widths() {
        assert_eq!(TypeSize::smallest_for_u64(0), TypeSize::_1);
        assert_eq!(TypeSize::smallest_for_u64(255), TypeSize::_1);
        assert_eq!(TypeSize::smallest_for_u64(256), TypeSize::_2);
        assert_eq!(TypeSize::smallest_for_u64(u32::MAX as u64), TypeSize::_4);
        assert_eq!(TypeSize::smallest_for_u64(u32::MAX as u64 + 1), TypeSize::_8);
    }
}
