//! Fixed-precision-flavored arithmetic helpers matching JavaScript's
//! `Math.round` semantics rather than Rust's native `f64::round`.
//!
//! There is no dedicated decimal type in this crate: the corpus this was
//! adapted from never reaches for `rust_decimal`/`bigdecimal` for this kind
//! of site-specific rounding, it reaches for small scale-multiply-divide
//! helpers (see `utils::round`). `js_round` follows that idiom but uses the
//! exact formula the reference algorithm depends on, because naive
//! `f64::round()` disagrees with it for negative half-way values:
//! `(-0.5).round() == -1.0` in Rust (away from zero), while
//! `floor(-0.5 + 0.5) == 0` is JavaScript's `Math.round(-0.5)`.

/// `floor(x * 10^scale + 0.5) / 10^scale` — half-away-from-zero for
/// non-negatives, half-toward-zero for negatives, reproducing JS
/// `Math.round`. Every algorithmic rounding site in this crate that must
/// stay byte-identical with the reference goes through this function.
pub fn js_round(x: f64, scale: i32) -> f64 {
    let factor = 10f64.powi(scale);
    (x * factor + 0.5).floor() / factor
}

/// `Math.round` itself (scale 0), kept separate since it is the most
/// common call site and reads better without a stray `0`.
pub fn js_math_round(x: f64) -> f64 {
    (x + 0.5).floor()
}

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi {
        return clamp(x, hi, lo);
    }
    x.max(lo).min(hi)
}

/// JS-style `Math.log` — natural log, NaN in JS for negative inputs but
/// `f64::ln` already returns NaN there too, so this is a direct passthrough
/// documented for discoverability next to `log10`/`exp`.
pub fn log(x: f64) -> f64 {
    x.ln()
}

pub fn log10(x: f64) -> f64 {
    x.log10()
}

pub fn exp(x: f64) -> f64 {
    x.exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_round_half_away_from_zero_positive() {
        assert_eq!(js_round(0.5, 0), 1.0);
        assert_eq!(js_round(2.5, 0), 3.0);
        assert_eq!(js_round(1.005, 2), 1.01);
    }

    #[test]
    fn js_round_half_toward_zero_negative() {
        // JS: Math.round(-0.5) === -0, Math.round(-1.5) === -1
        assert_eq!(js_round(-0.5, 0), -0.0);
        assert_eq!(js_round(-1.5, 0), -1.0);
    }

    #[test]
    fn js_round_differs_from_native_round_for_negative_half() {
        assert_ne!(js_round(-0.5, 0), (-0.5f64).round());
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(5.0, 0.0, 3.0), 3.0);
        assert_eq!(clamp(-5.0, 0.0, 3.0), 0.0);
        assert_eq!(clamp(1.0, 0.0, 3.0), 1.0);
    }
}
