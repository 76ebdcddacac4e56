//! Forecast engine (spec §4.8): four parallel 48-step, 5-minute-cadence
//! glucose curves — IOB, COB, UAM, and Zero-Temp — plus the blending
//! rules that reduce them to the public `minPredBG`/`minGuardBG`/
//! `avgPredBG` numbers the dosing cascade consumes.

use crate::numeric::{clamp, js_round};
use crate::types::{GlucoseStatus, IOBData, MealData, PredBgs, Profile};

const STEPS: usize = 48;
const IOB_COB_UAM_LOOKBACK: usize = 13;
const ZT_LOOKBACK: usize = 7;

#[derive(Debug, Clone, Default)]
pub struct ForecastResult {
    pub pred_bgs: PredBgs,
    pub min_pred_bg: f64,
    pub min_guard_bg: f64,
    pub avg_pred_bg: f64,
    pub min_zt_uam: f64,
}

struct SharedParams {
    adjusted_isf: f64,
    adjusted_cr: f64,
    csf: f64,
    ci: f64,
    uci: f64,
}

fn shared_params(profile: &Profile, isf: f64, ratio: f64, glucose_status: &GlucoseStatus, current_activity: f64) -> SharedParams {
    let adjusted_isf = isf / ratio;
    let adjusted_cr = profile.carb_ratio / ratio;
    let csf = adjusted_isf / adjusted_cr;

    let min_delta = glucose_status.short_avgdelta.min(glucose_status.long_avgdelta);
    let current_gi = -current_activity * adjusted_isf * 5.0;
    let uci = min_delta - current_gi;
    let max_ci = 30.0 * csf * 5.0 / 60.0;
    let ci = clamp(uci, -max_ci, max_ci);

    SharedParams { adjusted_isf, adjusted_cr, csf, ci, uci }
}

fn run_iob_like_curve(start_bg: f64, iob_series: &[IOBData], use_zero_temp: bool, ci: f64, isf: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(STEPS);
    let mut bg = start_bg;
    out.push(clamp(js_round(bg, 0), 39.0, 401.0));
    for (n, point) in iob_series.iter().enumerate().skip(1).take(STEPS - 1) {
        let activity = if use_zero_temp {
            point.iob_with_zero_temp.as_ref().map(|z| z.activity).unwrap_or(point.activity)
        } else {
            point.activity
        };
        let gi = -activity * isf * 5.0;
        let residual_dev = ci * (1.0 - (n as f64 / 12.0).min(1.0));
        bg += gi + residual_dev;
        out.push(clamp(js_round(bg, 0), 39.0, 401.0));
    }
    out
}

fn run_cob_curve(
    start_bg: f64,
    iob_series: &[IOBData],
    meal: &MealData,
    profile: &Profile,
    shared: &SharedParams,
) -> Vec<f64> {
    let mut out = Vec::with_capacity(STEPS);
    let mut bg = start_bg;
    out.push(clamp(js_round(bg, 0), 39.0, 1500.0));

    let absorption_time_min = (profile.max_meal_absorption_time * 60.0)
        .max(3.0 * 60.0 / (1.0_f64).max(0.01));
    let absorption_steps = ((profile.max_meal_absorption_time * 12.0) as usize).max(1).min(STEPS);
    let remaining_ci_peak = meal.meal_cob * shared.csf * 5.0 / 60.0 / (absorption_time_min / 2.0 / 5.0).max(1.0);

    for n in 1..STEPS.min(iob_series.len()) {
        let activity = iob_series[n].activity;
        let gi = -activity * shared.adjusted_isf * 5.0;
        let observed_ci = shared.ci * (1.0 - (n as f64 / 12.0).min(1.0));
        let carb_pulse = if n <= absorption_steps {
            let half = absorption_steps as f64 / 2.0;
            let triangular = if (n as f64) <= half { n as f64 / half } else { (absorption_steps as f64 - n as f64) / half };
            remaining_ci_peak * triangular.max(0.0)
        } else {
            0.0
        };
        bg += gi + observed_ci + carb_pulse;
        out.push(clamp(js_round(bg, 0), 39.0, 1500.0));
    }
    out
}

fn run_uam_curve(start_bg: f64, iob_series: &[IOBData], shared: &SharedParams, isf: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(STEPS);
    let mut bg = start_bg;
    out.push(clamp(js_round(bg, 0), 39.0, 401.0));
    let slope = if shared.uci.abs() > 1e-9 { shared.uci / 36.0 } else { 0.0 };

    for n in 1..STEPS.min(iob_series.len()) {
        let activity = iob_series[n].activity;
        let gi = -activity * isf * 5.0;
        let pred_uci = (0.0_f64.max(shared.uci + n as f64 * slope)).min(0.0_f64.max(shared.uci * (1.0 - n as f64 / 36.0)));
        bg += gi + pred_uci;
        out.push(clamp(js_round(bg, 0), 39.0, 401.0));
    }
    out
}

/// Trim trailing flat-line ties beyond `lookback` samples — the reference
/// stops extending a curve once consecutive values stop moving, rather
/// than padding a dead forecast out to 48 points.
fn trim_flat_tail(series: Vec<f64>, lookback: usize) -> Vec<f64> {
    if series.len() <= lookback {
        return series;
    }
    let mut end = series.len();
    while end > lookback && (series[end - 1] - series[end - 2]).abs() < 1e-9 {
        end -= 1;
    }
    series[..end].to_vec()
}

/// ZT-specific trim: cut a trailing run that keeps rising above target.
fn trim_rising_tail(series: Vec<f64>, lookback: usize, target: f64) -> Vec<f64> {
    if series.len() <= lookback {
        return series;
    }
    let mut end = series.len();
    while end > lookback && series[end - 1] > target && series[end - 1] >= series[end - 2] {
        end -= 1;
    }
    series[..end].to_vec()
}

#[allow(clippy::too_many_arguments)]
pub fn run_forecast(
    profile: &Profile,
    iob_series: &[IOBData],
    glucose_status: &GlucoseStatus,
    meal: &MealData,
    isf: f64,
    ratio: f64,
    target: f64,
) -> ForecastResult {
    let current_bg = glucose_status.glucose;
    let current_activity = iob_series.first().map(|p| p.activity).unwrap_or(0.0);
    let shared = shared_params(profile, isf, ratio, glucose_status, current_activity);
    let adjusted_isf = shared.adjusted_isf;

    let iob_curve = trim_flat_tail(run_iob_like_curve(current_bg, iob_series, false, shared.ci, adjusted_isf), IOB_COB_UAM_LOOKBACK);
    let zt_curve = trim_rising_tail(run_iob_like_curve(current_bg, iob_series, true, 0.0, adjusted_isf), ZT_LOOKBACK, target);

    let cob_curve = if meal.meal_cob > 0.0 {
        Some(trim_flat_tail(run_cob_curve(current_bg, iob_series, meal, profile, &shared), IOB_COB_UAM_LOOKBACK))
    } else {
        None
    };

    let uam_curve = if profile.enable_uam {
        Some(trim_flat_tail(run_uam_curve(current_bg, iob_series, &shared, adjusted_isf), IOB_COB_UAM_LOOKBACK))
    } else {
        None
    };

    let iob_last = *iob_curve.last().unwrap_or(&current_bg);
    let zt_last = *zt_curve.last().unwrap_or(&current_bg);
    let cob_last = cob_curve.as_ref().and_then(|c| c.last()).copied();
    let uam_last = uam_curve.as_ref().and_then(|c| c.last()).copied();

    let iob_min = iob_curve.iter().cloned().fold(f64::INFINITY, f64::min);
    let cob_min = cob_curve.as_ref().map(|c| c.iter().cloned().fold(f64::INFINITY, f64::min));
    let uam_min = uam_curve.as_ref().map(|c| c.iter().cloned().fold(f64::INFINITY, f64::min));

    // minZTUAM blends UAM's minimum with the ZT guard when the guard runs
    // below threshold-ish territory or below target.
    let min_zt_uam = match uam_min {
        Some(u) if zt_last < target => u.min(zt_last),
        Some(u) => u,
        None => zt_last,
    };

    let fraction_carbs_left = if meal.carbs > 0.0 { (meal.meal_cob / meal.carbs).clamp(0.0, 1.0) } else { 0.0 };
    let avg_pred_bg = match cob_last {
        Some(cob) => {
            let blended = iob_last * (1.0 - fraction_carbs_left) + cob * fraction_carbs_left;
            match uam_last {
                Some(u) => (blended + u) / 2.0,
                None => blended,
            }
        }
        None => match uam_last {
            Some(u) => (iob_last + u) / 2.0,
            None => iob_last,
        },
    };

    let min_guard_bg = {
        let mut candidates = vec![iob_min];
        if let Some(c) = cob_min { candidates.push(c); }
        if profile.enable_uam {
            candidates.push(min_zt_uam);
        }
        candidates.into_iter().fold(f64::INFINITY, f64::min)
    };

    // If configured max COB exceeds the current BG reading, UAM is not
    // trusted beyond that ceiling — fold it out of the min calculation.
    let trust_uam = !(profile.max_cob > current_bg);

    let mut min_pred_bg_candidates = vec![iob_min];
    if let Some(c) = cob_min {
        min_pred_bg_candidates.push(c);
    }
    if trust_uam {
        min_pred_bg_candidates.push(min_zt_uam);
    }
    let min_pred_bg = min_pred_bg_candidates
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max)
        .min(avg_pred_bg);

    ForecastResult {
        pred_bgs: PredBgs { iob: iob_curve, zt: zt_curve, cob: cob_curve, uam: uam_curve },
        min_pred_bg,
        min_guard_bg,
        avg_pred_bg,
        min_zt_uam,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn iob_series(n: usize) -> Vec<IOBData> {
        (0..n)
            .map(|i| IOBData {
                iob: (1.0 - i as f64 / n as f64).max(0.0),
                activity: 0.01,
                basal_iob: 0.0,
                bolus_iob: 0.0,
                net_basal_insulin: 0.0,
                bolus_insulin: 0.0,
                time: Utc::now(),
                iob_with_zero_temp: None,
                last_bolus_time: None,
                last_temp: None,
            })
            .collect()
    }

    #[test]
    fn first_iob_point_matches_current_bg_rounded() {
        let profile = Profile::default();
        let glucose_status = GlucoseStatus {
            glucose: 150.0,
            delta: 0.0,
            short_avgdelta: 0.0,
            long_avgdelta: 0.0,
            date: Utc::now(),
            noise: None,
        };
        let meal = MealData::default();
        let result = run_forecast(&profile, &iob_series(48), &glucose_status, &meal, 50.0, 1.0, 100.0);
        assert_eq!(result.pred_bgs.iob[0], 150.0);
        assert!(result.pred_bgs.iob.len() <= 48);
    }

    #[test]
    fn cob_curve_absent_without_meal() {
        let profile = Profile::default();
        let glucose_status = GlucoseStatus { glucose: 120.0, delta: 0.0, short_avgdelta: 0.0, long_avgdelta: 0.0, date: Utc::now(), noise: None };
        let meal = MealData::default();
        let result = run_forecast(&profile, &iob_series(48), &glucose_status, &meal, 50.0, 1.0, 100.0);
        assert!(result.pred_bgs.cob.is_none());
    }
}
