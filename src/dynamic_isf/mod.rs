//! Dynamic ISF (spec §4.7): derives a sensitivity ratio from total daily
//! dose rather than (or in addition to) the deviation-based autosens
//! estimate, via either a logarithmic or a sigmoid curve.

use crate::insulin::InsulinCurve;
use crate::numeric::{clamp, log, log10};
use crate::types::Profile;
use crate::utils::round;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicIsfResult {
    pub ratio: f64,
    pub tdd_ratio: f64,
    pub insulin_factor: f64,
    pub uncapped_ratio: f64,
    pub limit_value: f64,
}

fn default_peak_time(curve: InsulinCurve) -> f64 {
    match curve {
        InsulinCurve::UltraRapid => 50.0,
        _ => 65.0,
    }
}

pub struct DynamicIsfInputs {
    pub tdd: f64,
    pub weighted_average_tdd: f64,
    pub average_total_tdd: f64,
    pub bg: f64,
    pub profile_target: f64,
}

/// Returns `None` when dynamic ISF is not applicable: `useNewFormula` is
/// off, TDD data is unavailable, the autosens bounds are degenerate, or
/// the profile target is high enough (≥118) with
/// `highTemptargetRaisesSensitivity` set that the feature should defer to
/// the plain autosens ratio instead.
pub fn dynamic_isf(profile: &Profile, inputs: &DynamicIsfInputs) -> Option<DynamicIsfResult> {
    if !profile.use_new_formula || inputs.tdd <= 0.0 {
        return None;
    }
    let min = profile.autosens_min;
    let max = profile.autosens_max;
    if !(min < max && min <= 1.0 && max >= 1.0) {
        return None;
    }
    if inputs.profile_target >= 118.0 && profile.high_temptarget_raises_sensitivity {
        return None;
    }

    let tdd_ratio = round(
        clamp(
            inputs.weighted_average_tdd / inputs.average_total_tdd.max(1e-9),
            min,
            max,
        ),
        2,
    );

    let peak_time = if profile.use_custom_peak_time { profile.insulin_peak_time } else { default_peak_time(profile.curve) };
    let insulin_factor = 120.0 - peak_time;

    let uncapped_ratio = if profile.sigmoid {
        let bg_dev = (inputs.bg - inputs.profile_target) * 0.0555;
        let exponent = bg_dev * profile.adjustment_factor_sigmoid * tdd_ratio
            + log10(1.0 / (max - 1.0) - min / (max - 1.0)) / log10(std::f64::consts::E);
        (max - min) / (1.0 + (-exponent).exp()) + min
    } else {
        profile.sens * profile.adjustment_factor * inputs.tdd * log(inputs.bg / insulin_factor + 1.0) / 1800.0
    };

    let ratio = clamp(uncapped_ratio, min, max);

    Some(DynamicIsfResult {
        ratio,
        tdd_ratio,
        insulin_factor,
        uncapped_ratio,
        limit_value: max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> Profile {
        Profile {
            use_new_formula: true,
            autosens_min: 0.7,
            autosens_max: 1.2,
            sens: 50.0,
            adjustment_factor: 0.4,
            ..Default::default()
        }
    }

    #[test]
    fn disabled_without_tdd() {
        let p = profile();
        let inputs = DynamicIsfInputs { tdd: 0.0, weighted_average_tdd: 1.0, average_total_tdd: 1.0, bg: 120.0, profile_target: 100.0 };
        assert!(dynamic_isf(&p, &inputs).is_none());
    }

    #[test]
    fn disabled_when_flag_off() {
        let mut p = profile();
        p.use_new_formula = false;
        let inputs = DynamicIsfInputs { tdd: 40.0, weighted_average_tdd: 1.0, average_total_tdd: 1.0, bg: 120.0, profile_target: 100.0 };
        assert!(dynamic_isf(&p, &inputs).is_none());
    }

    #[test]
    fn logarithmic_ratio_stays_in_bounds() {
        let p = profile();
        let inputs = DynamicIsfInputs { tdd: 40.0, weighted_average_tdd: 1.0, average_total_tdd: 1.0, bg: 180.0, profile_target: 100.0 };
        let result = dynamic_isf(&p, &inputs).unwrap();
        assert!(result.ratio >= p.autosens_min && result.ratio <= p.autosens_max);
    }

    #[test]
    fn sigmoid_ratio_stays_in_bounds() {
        let mut p = profile();
        p.sigmoid = true;
        let inputs = DynamicIsfInputs { tdd: 40.0, weighted_average_tdd: 1.0, average_total_tdd: 1.0, bg: 220.0, profile_target: 100.0 };
        let result = dynamic_isf(&p, &inputs).unwrap();
        assert!(result.ratio >= p.autosens_min && result.ratio <= p.autosens_max);
    }
}
