//! The fixed table of "standard" numerator/denominator ratios the wire
//! format recognizes for duration/time-point rendering (atto .. exa plus
//! the chrono-style calendar periods).
//!
//! Entries are ordered coarsest-to-finest so the encoder can greedily pick
//! the most natural unit that represents a duration exactly.

pub struct Ratio {
    pub num: u64,
    pub den: u64,
    pub suffix: &'static str,
}

pub const RATIOS: &[Ratio] = &[
    Ratio { num: 31_556_952, den: 1, suffix: "y" },
    Ratio { num: 2_629_746, den: 1, suffix: "month" },
    Ratio { num: 604_800, den: 1, suffix: "w" },
    Ratio { num: 86_400, den: 1, suffix: "d" },
    Ratio { num: 3_600, den: 1, suffix: "h" },
    Ratio { num: 60, den: 1, suffix: "min" },
    Ratio { num: 1_000_000_000_000_000_000, den: 1, suffix: "Es" },
    Ratio { num: 1_000_000_000_000_000, den: 1, suffix: "Ps" },
    Ratio { num: 1_000_000_000_000, den: 1, suffix: "Ts" },
    Ratio { num: 1_000_000_000, den: 1, suffix: "Gs" },
    Ratio { num: 1_000_000, den: 1, suffix: "Ms" },
    Ratio { num: 1_000, den: 1, suffix: "ks" },
    Ratio { num: 100, den: 1, suffix: "hs" },
    Ratio { num: 10, den: 1, suffix: "das" },
    Ratio { num: 1, den: 1, suffix: "s" },
    Ratio { num: 1, den: 10, suffix: "ds" },
    Ratio { num: 1, den: 100, suffix: "cs" },
    Ratio { num: 1, den: 1_000, suffix: "ms" },
    Ratio { num: 1, den: 1_000_000, suffix: "us" },
    Ratio { num: 1, den: 1_000_000_000, suffix: "ns" },
    Ratio { num: 1, den: 1_000_000_000_000, suffix: "ps" },
    Ratio { num: 1, den: 1_000_000_000_000_000, suffix: "fs" },
    Ratio { num: 1, den: 1_000_000_000_000_000_000, suffix: "as" },
];

/// Nanoseconds represented by one unit of this ratio, or `None` if it
/// can't be expressed exactly as an integer (never the case for any entry
/// in [`RATIOS`], but guards against a badly hand-built custom ratio).
fn ratio_nanos(num: u64, den: u64) -> Option<u64> {
    (num as u128).checked_mul(1_000_000_000)?.checked_div(den as u128)?.try_into().ok()
}

/// Greedily picks the coarsest ratio in [`RATIOS`] that represents
/// `total_nanos` as an exact integer count, returning `(num, den, count,
/// suffix)`. The `nano` entry always matches, so this never fails.
pub fn canonical_ratio_for_nanos(total_nanos: i64) -> (u64, u64, i64, &'static str) {
    for ratio in RATIOS {
        if let Some(unit_nanos) = ratio_nanos(ratio.num, ratio.den) {
            if unit_nanos != 0 && total_nanos % unit_nanos as i64 == 0 {
                return (ratio.num, ratio.den, total_nanos / unit_nanos as i64, ratio.suffix);
            }
        }
    }
    unreachable!("the nano entry (den = 1_000_000_000) always matches")
}

/// Looks up the suffix for an arbitrary `(num, den)` pair read off the
/// wire, if it matches one of the recognized standard ratios exactly.
pub fn suffix_for_ratio(num: u64, den: u64) -> Option<&'static str> {
    RATIOS
        .iter()
        .find(|r| r.num == num && r.den == den)
        .map(|r| r.suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_milliseconds_canonicalizes_to_milli() {
        let (num, den, count, suffix) = canonical_ratio_for_nanos(5_000_000);
        assert_eq!((num, den, count, suffix), (1, 1_000, 5, "ms"));
    }

    #[test]
    fn whole_seconds_canonicalize_to_seconds() {
        let (num, den, count, suffix) = canonical_ratio_for_nanos(3_000_000_000);
        assert_eq!((num, den, count, suffix), (1, 1, 3, "s"));
    }

    #[test]
    fn odd_nanosecond_count_falls_back_to_nanoseconds() {
        let (num, den, count, suffix) = canonical_ratio_for_nanos(1_234);
        assert_eq!((num, den, count, suffix), (1, 1_000_000_000, 1_234, "ns"));
    }

    #[test]
    fn suffix_lookup_matches_canonical_entries() {
        assert_eq!(suffix_for_ratio(1, 1_000), Some("ms"));
        assert_eq!(suffix_for_ratio(7, 13), None);
    }
}
