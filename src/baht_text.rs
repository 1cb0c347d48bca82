//! Thai reading of monetary amounts, e.g. `21.50` → `ยี่สิบหนึ่งบาทห้าสิบสตางค์`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

const DIGITS: [&str; 10] = [
    "ศูนย์", "หนึ่ง", "สอง", "สาม", "สี่", "ห้า", "หก", "เจ็ด", "แปด", "เก้า",
];

// units, tens, hundreds, thousands, ten-thousands, hundred-thousands, millions
const POSITIONS: [&str; 7] = ["", "สิบ", "ร้อย", "พัน", "หมื่น", "แสน", "ล้าน"];

const TWENTY: &str = "ยี่สิบ";
const BAHT: &str = "บาท";
const EVEN: &str = "ถ้วน";
const SATANG: &str = "สตางค์";
const ZERO_BAHT_EVEN: &str = "ศูนย์บาทถ้วน";

/// First baht value the position table cannot read.
pub const MAX_BAHT_EXCLUSIVE: u64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BahtTextError {
    #[error("amount out of range: {0} (must be >= 0 and < 10,000,000)")]
    OutOfRangeAmount(String),
}

/// Rounds to whole satang (half away from zero) and reads the amount in Thai.
pub fn baht_text(amount: Decimal) -> Result<String, BahtTextError> {
    let out_of_range = || BahtTextError::OutOfRangeAmount(amount.to_string());

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(out_of_range());
    }
    let satang = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|s| s.to_u64())
        .ok_or_else(out_of_range)?;

    satang_text(satang)
}

/// Reads an amount already expressed in satang.
pub fn satang_text(total_satang: u64) -> Result<String, BahtTextError> {
    let baht = total_satang / 100;
    let satang = total_satang % 100;

    if baht >= MAX_BAHT_EXCLUSIVE {
        return Err(BahtTextError::OutOfRangeAmount(format!(
            "{baht}.{satang:02}"
        )));
    }
    if total_satang == 0 {
        return Ok(ZERO_BAHT_EVEN.to_string());
    }

    let mut out = String::new();
    if baht > 0 {
        push_digits(baht, &mut out);
        out.push_str(BAHT);
    }
    if satang == 0 {
        out.push_str(EVEN);
    } else {
        push_digits(satang, &mut out);
        out.push_str(SATANG);
    }
    Ok(out)
}

/// Appends digit + position names for `n`, skipping zero digits.
/// `n` must be below 10,000,000.
fn push_digits(n: u64, out: &mut String) {
    let digits = n.to_string();
    let len = digits.len();

    for (i, b) in digits.bytes().enumerate() {
        let digit = usize::from(b - b'0');
        let position = len - 1 - i;
        if digit == 0 {
            continue;
        }
        match (position, digit) {
            (1, 1) => out.push_str(POSITIONS[1]),
            (1, 2) => out.push_str(TWENTY),
            _ => {
                out.push_str(DIGITS[digit]);
                out.push_str(POSITIONS[position]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn zero_is_the_fixed_phrase() {
        assert_eq!(baht_text(Decimal::ZERO).unwrap(), "ศูนย์บาทถ้วน");
        assert_eq!(baht_text(dec("0.00")).unwrap(), "ศูนย์บาทถ้วน");
        assert_eq!(baht_text(dec("0.001")).unwrap(), "ศูนย์บาทถ้วน");
    }

    #[test]
    fn whole_baht_ends_with_baht_even() {
        assert_eq!(baht_text(dec("1")).unwrap(), "หนึ่งบาทถ้วน");
        assert!(baht_text(dec("1")).unwrap().ends_with("บาทถ้วน"));
    }

    #[test]
    fn satang_clause() {
        let text = baht_text(dec("1.50")).unwrap();
        assert_eq!(text, "หนึ่งบาทห้าสิบสตางค์");
        assert!(text.contains("ห้าสิบสตางค์"));
        assert!(!text.contains(EVEN));
    }

    #[test]
    fn tens_overrides() {
        assert_eq!(baht_text(dec("21")).unwrap(), "ยี่สิบหนึ่งบาทถ้วน");
        assert!(!baht_text(dec("21")).unwrap().contains("สองสิบ"));
        assert_eq!(baht_text(dec("11")).unwrap(), "สิบหนึ่งบาทถ้วน");
        assert!(!baht_text(dec("11")).unwrap().contains("หนึ่งสิบ"));
        assert_eq!(baht_text(dec("10")).unwrap(), "สิบบาทถ้วน");
        assert_eq!(baht_text(dec("35")).unwrap(), "สามสิบห้าบาทถ้วน");
    }

    #[test]
    fn satang_tens_overrides() {
        assert_eq!(baht_text(dec("5.10")).unwrap(), "ห้าบาทสิบสตางค์");
        assert_eq!(baht_text(dec("5.25")).unwrap(), "ห้าบาทยี่สิบห้าสตางค์");
        assert_eq!(baht_text(dec("5.07")).unwrap(), "ห้าบาทเจ็ดสตางค์");
    }

    #[test]
    fn satang_only_amount_has_no_baht_clause() {
        assert_eq!(baht_text(dec("0.75")).unwrap(), "เจ็ดสิบห้าสตางค์");
    }

    #[test]
    fn zero_digits_are_skipped() {
        assert_eq!(baht_text(dec("1005")).unwrap(), "หนึ่งพันห้าบาทถ้วน");
        assert_eq!(baht_text(dec("120000")).unwrap(), "หนึ่งแสนสองหมื่นบาทถ้วน");
    }

    #[test]
    fn full_position_table() {
        assert_eq!(
            baht_text(dec("9999999.99")).unwrap(),
            "เก้าล้านเก้าแสนเก้าหมื่นเก้าพันเก้าร้อยเก้าสิบเก้าบาทเก้าสิบเก้าสตางค์"
        );
        assert_eq!(baht_text(dec("1000000")).unwrap(), "หนึ่งล้านบาทถ้วน");
    }

    #[test]
    fn rounds_to_whole_satang() {
        assert_eq!(baht_text(dec("1.005")).unwrap(), "หนึ่งบาทหนึ่งสตางค์");
        assert_eq!(baht_text(dec("1.004")).unwrap(), "หนึ่งบาทถ้วน");
        assert_eq!(baht_text(dec("1.999")).unwrap(), "สองบาทถ้วน");
    }

    #[test]
    fn out_of_range_amounts_fail() {
        assert!(matches!(
            baht_text(dec("-1")),
            Err(BahtTextError::OutOfRangeAmount(_))
        ));
        assert!(baht_text(dec("10000000")).is_err());
        assert!(baht_text(dec("9999999.995")).is_err());
        assert!(satang_text(1_000_000_000).is_err());
        assert!(baht_text(Decimal::MAX).is_err());
    }

    #[test]
    fn satang_text_matches_decimal_reading() {
        assert_eq!(satang_text(2150).unwrap(), baht_text(dec("21.50")).unwrap());
        assert_eq!(satang_text(0).unwrap(), ZERO_BAHT_EVEN);
    }

    proptest! {
        #[test]
        fn in_range_amounts_always_read(satang in 1u64..1_000_000_000) {
            let text = satang_text(satang).unwrap();
            if satang % 100 == 0 {
                prop_assert!(text.ends_with("บาทถ้วน"));
            } else {
                prop_assert!(text.ends_with(SATANG));
            }
            prop_assert!(!text.contains("หนึ่งสิบ"));
            prop_assert!(!text.contains("สองสิบ"));
        }
    }
}
