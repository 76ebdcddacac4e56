//! Dosing cascade (spec §4.9/§4.10) — the heart of the engine. Consumes
//! the outputs of every other subsystem and walks an ordered decision
//! ladder; the first matching rule sets `rate`/`duration`/`units` and
//! returns.

use chrono::{DateTime, Timelike, Utc};

use crate::dynamic_isf::DynamicIsfResult;
use crate::error::OrefError;
use crate::forecast::ForecastResult;
use crate::numeric::clamp;
use crate::profile::{bg_targets_lookup, carb_ratio_lookup, isf_lookup};
use crate::reason::{build_prefix, ReasonContext};
use crate::types::{CurrentTemp, Determination, GlucoseStatus, IOBData, MealData, Profile};
use crate::utils::round::round_basal;
use crate::utils::round as round_fn;

pub struct DeterminationInputs<'a> {
    pub profile: &'a Profile,
    pub current_temp: CurrentTemp,
    pub iob: &'a IOBData,
    pub forecast: &'a ForecastResult,
    pub meal: &'a MealData,
    pub autosens_ratio: f64,
    pub dynamic_isf: Option<DynamicIsfResult>,
    pub glucose_status: &'a GlucoseStatus,
    pub clock: DateTime<Utc>,
}

fn smb_enabled(profile: &Profile, meal: &MealData, iob: &IOBData, bg: f64, target: f64, min_guard_bg: f64, threshold: f64) -> bool {
    let cascade = profile.enable_smb_always
        || (profile.enable_smb_with_cob && meal.meal_cob > 0.0)
        || (profile.enable_smb_after_carbs && meal.last_carb_time.is_some())
        || (profile.enable_smb_with_temptarget)
        || (profile.enable_smb_high_bg && bg >= profile.enable_smb_high_bg_target.max(target));

    if !cascade {
        return false;
    }
    if min_guard_bg < threshold {
        return false;
    }
    let _ = iob;
    true
}

fn clamp_to_30_step(value: f64, min: f64, max: f64) -> f64 {
    let stepped = (value / 30.0).ceil() * 30.0;
    stepped.clamp(min, max)
}

/// Round to the nearest multiple of 30 within `[0, 60]` (companion low-temp
/// duration for SMB, spec §4.10).
fn round_duration_to_30(value: f64) -> f64 {
    ((value / 30.0).round() * 30.0).clamp(0.0, 60.0)
}

pub fn determine_basal(inputs: &DeterminationInputs) -> Result<Determination, OrefError> {
    let profile = inputs.profile;
    let clock = inputs.clock;
    let glucose_status = inputs.glucose_status;
    let bg = glucose_status.glucose;
    let iob = inputs.iob;

    let basal = crate::profile::basal_lookup(profile, clock);
    let ratio = inputs.dynamic_isf.map(|d| d.ratio).unwrap_or(inputs.autosens_ratio);

    let profile_isf = isf_lookup(profile, clock);
    let isf = profile_isf / ratio;
    let carb_ratio = carb_ratio_lookup(profile, clock);
    let adjusted_cr = carb_ratio / ratio;

    let targets = bg_targets_lookup(profile, clock);
    let mut target = (targets.min_bg + targets.max_bg) / 2.0;
    if !targets.temptarget_set && (profile.sensitivity_raises_target || profile.resistance_lowers_target) {
        target = (target - 60.0) / ratio + 60.0;
    }
    if let Some(noise) = glucose_status.noise {
        if noise >= 2.0 {
            target *= profile.noisy_cgm_target_multiplier;
        }
    }

    let threshold_lower = (profile.min_bg - 0.5 * (profile.min_bg - 40.0)).max(60.0);
    let threshold = clamp(profile.threshold_setting, threshold_lower, 120.0);

    let bgi = round_fn::round_value(-iob.activity * isf * 5.0, 1);
    let min_delta = glucose_status.short_avgdelta.min(glucose_status.long_avgdelta);

    let mut deviation = 6.0 * (min_delta - bgi);
    if deviation < 0.0 {
        deviation = 6.0 * (glucose_status.short_avgdelta - bgi);
        if deviation < 0.0 {
            deviation = 6.0 * (glucose_status.long_avgdelta - bgi);
        }
    }

    let naive_eventual_bg = if iob.iob > 0.0 {
        bg - iob.iob * isf
    } else {
        bg - iob.iob * profile_isf.min(isf)
    };
    let eventual_bg = naive_eventual_bg + deviation;

    // Standard 12h-in-5-minute-blocks expected-delta formula: a target BG
    // reached smoothly over the insulin's duration of action.
    let expected_delta = round_fn::round_value((target - eventual_bg) / 144.0, 1);

    let max_safe_basal = profile.max_safe_basal();

    let reason_ctx = ReasonContext {
        autosens_ratio: ratio,
        isf_from: profile_isf,
        isf_to: isf,
        cob: inputs.meal.meal_cob,
        current_deviation: inputs.meal.current_deviation,
        bgi,
        carb_ratio: adjusted_cr,
        target,
        min_pred_bg: inputs.forecast.min_pred_bg,
        min_guard_bg: inputs.forecast.min_guard_bg,
        iob_pred_bg: inputs.forecast.pred_bgs.iob.last().copied().unwrap_or(bg),
        cob_pred_bg: inputs.forecast.pred_bgs.cob.as_ref().and_then(|c| c.last().copied()),
        uam_pred_bg: inputs.forecast.pred_bgs.uam.as_ref().and_then(|c| c.last().copied()),
        dynamic_isf: inputs.dynamic_isf,
    };
    let reason_prefix = build_prefix(&reason_ctx);

    let mut determination = Determination::no_action(String::new(), clock);
    determination.eventual_bg = eventual_bg;
    determination.sensitivity_ratio = ratio;
    determination.iob = iob.iob;
    determination.cob = inputs.meal.meal_cob;
    determination.pred_bgs = inputs.forecast.pred_bgs.clone();
    determination.bg = bg;
    determination.isf = isf;
    determination.timestamp = clock;
    determination.current_target = target;
    determination.min_delta = min_delta;
    determination.expected_delta = expected_delta;
    determination.min_guard_bg = inputs.forecast.min_guard_bg;
    determination.min_pred_bg = inputs.forecast.min_pred_bg;
    determination.threshold = threshold;
    determination.carb_ratio = adjusted_cr;

    // Stage 0: error/temp cancellation on unreliable glucose.
    let age_min = (clock - glucose_status.date).num_seconds() as f64 / 60.0;
    let noise_high = glucose_status.noise.map(|n| n >= 3.0).unwrap_or(false);
    let flat_cgm = glucose_status.delta == 0.0 && glucose_status.short_avgdelta == 0.0 && glucose_status.long_avgdelta == 0.0;
    if bg <= 10.0 || bg == 38.0 || noise_high || age_min > 12.0 || age_min < -5.0 || flat_cgm {
        determination.reason = format!("{reason_prefix}, CGM is calibrating, in ??? state, or noise is high");
        if inputs.current_temp.rate >= basal {
            determination.rate = Some(basal);
            determination.duration = Some(30.0);
        } else if inputs.current_temp.rate == 0.0 && inputs.current_temp.duration > 30.0 {
            determination.rate = Some(0.0);
            determination.duration = Some(30.0);
        }
        return Ok(determination);
    }

    let smb_allowed = smb_enabled(profile, inputs.meal, iob, bg, target, inputs.forecast.min_guard_bg, threshold) && bg > threshold;

    // Stage 5.1: low-glucose-suspend.
    let override_factor = ratio;
    if bg < threshold
        && iob.iob < -basal * override_factor * 20.0 / 60.0
        && expected_delta > 0.0
        && min_delta > expected_delta
    {
        determination.reason = format!("{reason_prefix}, IOB<{:.2} and minDelta {:.1}>expectedDelta {:.1}", iob.iob, min_delta, expected_delta);
    } else if bg < threshold || inputs.forecast.min_guard_bg < threshold {
        let duration = clamp_to_30_step((target - inputs.forecast.min_guard_bg) / isf * 60.0 / basal.max(0.01), 30.0, 120.0);
        determination.rate = Some(0.0);
        determination.duration = Some(duration);
        determination.reason = format!("{reason_prefix}, BG {:.0} or minGuardBG {:.0} < threshold {:.0}: setting 0 temp for {:.0}m", bg, inputs.forecast.min_guard_bg, threshold, duration);
        return Ok(determination);
    }

    // Stage 5.2: skip-neutral-temp near the top of the hour.
    if !smb_allowed && clock.minute() >= 55 {
        determination.rate = Some(0.0);
        determination.duration = Some(0.0);
        determination.reason = format!("{reason_prefix}, skipping neutral temp near top of hour");
        return Ok(determination);
    }

    // Stage 5.3: low eventual glucose.
    if eventual_bg < targets.min_bg {
        if expected_delta > 0.0 && min_delta > expected_delta && naive_eventual_bg < 40.0 {
            determination.rate = Some(0.0);
            determination.duration = Some(30.0);
            determination.reason = format!("{reason_prefix}, naive eventualBG {:.0} < 40, setting 0 temp", naive_eventual_bg);
            return Ok(determination);
        }
        let mut insulin_required = 2.0 * (0.0_f64).min((eventual_bg - target) / isf);
        if expected_delta != 0.0 {
            insulin_required *= min_delta / expected_delta;
        }
        let rate = round_basal((basal + 2.0 * insulin_required).clamp(0.0, max_safe_basal), &profile.model);
        determination.rate = Some(rate);
        determination.duration = Some(30.0);
        determination.reason = format!("{reason_prefix}, Eventual BG {:.0} < {:.0}", eventual_bg, targets.min_bg);
        return Ok(determination);
    }

    // Stage 5.4: falling faster than expected.
    if min_delta < expected_delta && !smb_allowed {
        determination.rate = Some(basal);
        determination.duration = Some(30.0);
        determination.reason = format!("{reason_prefix}, falling faster than expected");
        return Ok(determination);
    }

    // Stage 5.5: in range.
    if eventual_bg.min(inputs.forecast.min_pred_bg) < targets.max_bg {
        if !smb_allowed {
            determination.rate = Some(basal);
            determination.duration = Some(30.0);
            determination.reason = format!("{reason_prefix}, in range: no temp required");
            return Ok(determination);
        }
    }

    // Stage 5.6: max IOB exceeded.
    if profile.max_iob > 0.0 && iob.iob > profile.max_iob {
        determination.rate = Some(basal);
        determination.duration = Some(30.0);
        determination.reason = format!("{reason_prefix}, IOB {:.2} > max_iob {:.2}", iob.iob, profile.max_iob);
        return Ok(determination);
    }

    // Stage 5.7: SMB delivery.
    if smb_allowed {
        let meal_insulin_req = inputs.meal.meal_cob / adjusted_cr.max(0.01);
        let smb_minutes = if iob.iob > meal_insulin_req { profile.max_uam_smb_basal_minutes } else { profile.max_smb_basal_minutes };
        let max_bolus = round_fn::round_value(basal * ratio * smb_minutes / 60.0, 1);

        let insulin_required = ((eventual_bg - target) / isf).max(0.0);
        let round_to = 1.0 / profile.bolus_increment;
        let mut micro_bolus = (insulin_required * profile.smb_delivery_ratio).min(max_bolus);
        micro_bolus = (micro_bolus * round_to).floor() / round_to;

        let mut rate_limited_reason = String::new();
        if let Some(last_bolus) = iob.last_bolus_time {
            let minutes_since = (clock - last_bolus).num_seconds() as f64 / 60.0;
            let interval = profile.smb_interval.clamp(1.0, 10.0);
            if minutes_since < interval {
                let remaining = interval - minutes_since;
                let whole_minutes = remaining.floor();
                let seconds = ((remaining - whole_minutes) * 60.0).round();
                rate_limited_reason = format!(", waiting {:.0}m {:.0}s", whole_minutes, seconds);
                micro_bolus = 0.0;
            }
        }

        let worst_case_insulin = (target - (naive_eventual_bg + inputs.forecast.min_pred_bg) / 2.0) / isf;
        let mut duration_required = round_duration_to_30(60.0 * worst_case_insulin / basal.max(0.01) * ratio);
        if insulin_required > 0.0 && micro_bolus < profile.bolus_increment {
            duration_required = 0.0;
        }
        let temp_rate = round_basal(basal * duration_required / 30.0, &profile.model);

        if micro_bolus >= profile.bolus_increment {
            determination.units = Some(micro_bolus);
            determination.rate = Some(temp_rate);
            determination.duration = Some(duration_required);
            determination.reason = format!("{reason_prefix}, Microbolusing {:.2}U{rate_limited_reason}");
            return Ok(determination);
        }
        if !rate_limited_reason.is_empty() {
            determination.reason = format!("{reason_prefix}{rate_limited_reason}");
            return Ok(determination);
        }
    }

    // Stage 5.8: high-temp fallback.
    let uncapped_insulin_required = (inputs.forecast.min_pred_bg.min(eventual_bg) - target) / isf;
    let insulin_required = uncapped_insulin_required.max(0.0).min((profile.max_iob - iob.iob).max(0.0));
    let rate = round_basal((basal + 2.0 * insulin_required).clamp(0.0, max_safe_basal), &profile.model);
    determination.rate = Some(rate);
    determination.duration = Some(30.0);
    determination.reason = format!("{reason_prefix}, setting {:.2}U/hr", rate);
    Ok(determination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MealData, PredBgs};
    use chrono::TimeZone;

    fn base_inputs() -> (Profile, IOBData, ForecastResult, MealData, GlucoseStatus) {
        let profile = Profile {
            max_basal: 5.0,
            max_daily_basal: 1.0,
            current_basal: 1.0,
            sens: 50.0,
            carb_ratio: 10.0,
            min_bg: 100.0,
            max_bg: 120.0,
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let iob = IOBData { iob: 0.0, activity: 0.0, basal_iob: 0.0, bolus_iob: 0.0, net_basal_insulin: 0.0, bolus_insulin: 0.0, time: now, iob_with_zero_temp: None, last_bolus_time: None, last_temp: None };
        let forecast = ForecastResult {
            pred_bgs: PredBgs { iob: vec![110.0], zt: vec![110.0], cob: None, uam: None },
            min_pred_bg: 110.0,
            min_guard_bg: 110.0,
            avg_pred_bg: 110.0,
            min_zt_uam: 110.0,
        };
        let meal = MealData::default();
        let glucose_status = GlucoseStatus { glucose: 110.0, delta: 1.0, short_avgdelta: 0.5, long_avgdelta: 0.3, date: now, noise: None };
        (profile, iob, forecast, meal, glucose_status)
    }

    #[test]
    fn in_range_emits_neutral_temp() {
        let (profile, iob, forecast, meal, glucose_status) = base_inputs();
        let inputs = DeterminationInputs {
            profile: &profile,
            current_temp: CurrentTemp::none(),
            iob: &iob,
            forecast: &forecast,
            meal: &meal,
            autosens_ratio: 1.0,
            dynamic_isf: None,
            glucose_status: &glucose_status,
            clock: glucose_status.date,
        };
        let result = determine_basal(&inputs).unwrap();
        assert!(result.reason.contains("in range"));
        assert_eq!(result.rate, Some(1.0));
    }

    #[test]
    fn high_noise_forces_safe_side_action() {
        let (profile, iob, forecast, meal, mut glucose_status) = base_inputs();
        glucose_status.noise = Some(3.0);
        let inputs = DeterminationInputs {
            profile: &profile,
            current_temp: CurrentTemp::absolute(2.0, 30.0),
            iob: &iob,
            forecast: &forecast,
            meal: &meal,
            autosens_ratio: 1.0,
            dynamic_isf: None,
            glucose_status: &glucose_status,
            clock: glucose_status.date,
        };
        let result = determine_basal(&inputs).unwrap();
        assert!(result.rate.unwrap() <= profile.current_basal);
    }
}
