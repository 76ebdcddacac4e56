//! Pump-granularity rounding (spec §4.11). All rounding here goes through
//! [`crate::numeric::js_round`], never `f64::round`, since the increment
//! boundaries are exactly the kind of half-way case where the two diverge.

use crate::numeric::js_round;

/// Newer Medtronic pumps (model strings ending `54` or `23`, e.g. 754/554,
/// 723/523) support a finer 1/40 U/hr increment below 1 U/hr; everything
/// else uses 1/20.
fn is_newer_medtronic(model: &str) -> bool {
    model.ends_with("54") || model.ends_with("23")
}

fn pump_increment(rate: f64, model: &str) -> f64 {
    if rate < 1.0 {
        if is_newer_medtronic(model) { 1.0 / 40.0 } else { 1.0 / 20.0 }
    } else if rate < 10.0 {
        1.0 / 20.0
    } else {
        1.0 / 10.0
    }
}

/// `roundBasal`: quantize a suggested rate to the pump's actual step size.
pub fn round_basal(rate: f64, model: &str) -> f64 {
    let increment = pump_increment(rate, model);
    round_to_increment(rate, increment)
}

fn round_to_increment(value: f64, increment: f64) -> f64 {
    js_round(value / increment, 0) * increment
}

pub fn round_value(value: f64, digits: i32) -> f64 {
    js_round(value, digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_sub_one_to_twentieth_by_default() {
        assert!((round_basal(0.37, "515") - 0.35).abs() < 1e-9);
    }

    #[test]
    fn rounds_sub_one_to_fortieth_on_newer_medtronic() {
        assert!((round_basal(0.37, "754") - 0.375).abs() < 1e-9);
    }

    #[test]
    fn rounds_mid_range_to_twentieth() {
        assert!((round_basal(2.37, "515") - 2.35).abs() < 1e-9);
    }

    #[test]
    fn rounds_high_range_to_tenth() {
        assert!((round_basal(12.37, "515") - 12.4).abs() < 1e-9);
    }
}
