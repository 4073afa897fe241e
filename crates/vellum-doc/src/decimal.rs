//! Decimal literal validation and normalisation.
//!
//! Decimals are stored as text, so precision is unbounded. The accepted
//! grammar is `[+-]? digits? ('.' digits?)? ([eE] [+-]? digits)?` with at
//! least one mantissa digit. Normalisation drops a leading `+`, leading
//! integer zeros, trailing fraction zeros, a bare `.` and a zero exponent;
//! every zero normalises to `0`.

/// Normalise `text`, or `None` if it is not a decimal literal.
pub(crate) fn normalize(text: &str) -> Option<String> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(at) => (&rest[..at], Some(&rest[at + 1..])),
        None => (rest, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let exponent: i64 = match exponent {
        Some(e) => {
            let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
            if digits.is_empty() || !all_digits(digits) {
                return None;
            }
            e.strip_prefix('+').unwrap_or(e).parse().ok()?
        }
        None => 0,
    };

    let int_part = int_part.trim_start_matches('0');
    let frac_part = frac_part.trim_end_matches('0');
    if int_part.is_empty() && frac_part.is_empty() {
        return Some("0".to_string());
    }

    let mut out = String::with_capacity(text.len());
    if negative {
        out.push('-');
    }
    out.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    if exponent != 0 {
        out.push('e');
        out.push_str(&exponent.to_string());
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> Option<String> {
        normalize(s)
    }

    #[test]
    fn plain_numbers() {
        assert_eq!(norm("42").as_deref(), Some("42"));
        assert_eq!(norm("-3.25").as_deref(), Some("-3.25"));
        assert_eq!(norm("+7").as_deref(), Some("7"));
    }

    #[test]
    fn redundant_zeros_are_dropped() {
        assert_eq!(norm("007.500").as_deref(), Some("7.5"));
        assert_eq!(norm("1.").as_deref(), Some("1"));
        assert_eq!(norm(".5").as_deref(), Some("0.5"));
    }

    #[test]
    fn every_zero_is_zero() {
        assert_eq!(norm("-0.000").as_deref(), Some("0"));
        assert_eq!(norm("0e10").as_deref(), Some("0"));
    }

    #[test]
    fn exponents() {
        assert_eq!(norm("1.5E+03").as_deref(), Some("1.5e3"));
        assert_eq!(norm("2e-7").as_deref(), Some("2e-7"));
        assert_eq!(norm("2e0").as_deref(), Some("2"));
    }

    #[test]
    fn long_precision_survives() {
        let text = "3.14159265358979323846264338327950288419716939937510";
        assert_eq!(norm(text).as_deref(), Some(text));
    }

    #[test]
    fn garbage_is_rejected() {
        for bad in ["", "-", ".", "1.2.3", "abc", "1e", "1e+", "--1", " 1", "1_000", "0x10"] {
            assert_eq!(norm(bad), None, "{bad:?} should be rejected");
        }
    }
}
