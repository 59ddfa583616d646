const FLOAT_TO_INT_MAX: f64 = 9007199254740991_f64;

/// Converting float to int has undefined behaviour for huge floats: https://stackoverflow.com/a/41139453.
/// To avoid this, refuse to convert floats with magnitude greater than 2**53 - 1, after which 64-bit floats no longer
/// retain integer precision. We could go a few orders of magnitude higher without triggering the UB, but this seems like
/// the least surprising place to put a breakpoint.
pub(crate) fn f64_to_i64_safe(f: f64) -> Option<i64> {
    if f.abs() <= FLOAT_TO_INT_MAX {
        Some(f as i64)
    } else {
        None
    }
}

/// Returns the integer value of `f` if it has no fractional part and fits in the safe range.
#[allow(clippy::float_cmp)]
pub(crate) fn f64_as_exact_i64(f: f64) -> Option<i64> {
    f64_to_i64_safe(f).filter(|i| *i as f64 == f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral::prelude::*;

    #[test]
    fn float_bounds() {
        let test_cases = vec![
            (1.99, Some(1)),
            (9007199254740991.0, Some(9007199254740991)),
            (9007199254740992.0, None),
            (-1.99, Some(-1)),
            (-9007199254740991.0, Some(-9007199254740991)),
            (-9007199254740992.0, None),
        ];
        for (have, expect) in test_cases {
            assert_that!(f64_to_i64_safe(have)).is_equal_to(expect);
        }
    }

    #[test]
    fn exact_integers_only() {
        assert_that!(f64_as_exact_i64(3.0)).is_equal_to(Some(3));
        assert_that!(f64_as_exact_i64(-0.0)).is_equal_to(Some(0));
        assert_that!(f64_as_exact_i64(3.5)).is_none();
        assert_that!(f64_as_exact_i64(f64::NAN)).is_none();
        assert_that!(f64_as_exact_i64(f64::INFINITY)).is_none();
    }
}
