//! Autosens (spec §4.6): two replay windows (8h/96 samples, 24h/288
//! samples) over the deviation series, each advancing a small state
//! machine that excludes meal-driven deviations from the sensitivity
//! estimate. The engine returns whichever window's ratio is lower.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::cob::{bucket_glucose_data, BucketedGlucose};
use crate::error::OrefError;
use crate::iob::calculate_total_iob;
use crate::profile::isf_lookup;
use crate::types::{CarbEntry, GlucoseReading, Profile, TempTarget, Treatment};
use crate::utils::{percentile, round};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviationState {
    Initial,
    Csf,
    Uam,
    NonMeal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutosensWindowResult {
    pub ratio: f64,
    pub new_isf: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutosensResult {
    pub ratio: f64,
    pub new_isf: f64,
}

struct WindowConfig {
    samples: usize,
}

const SHORT_WINDOW: WindowConfig = WindowConfig { samples: 96 };
const LONG_WINDOW: WindowConfig = WindowConfig { samples: 288 };

fn active_meal_cob_at(carbs: &[CarbEntry], t: DateTime<Utc>, max_absorption_hours: f64) -> f64 {
    carbs
        .iter()
        .filter(|c| c.timestamp <= t && (t - c.timestamp) <= Duration::minutes((max_absorption_hours * 60.0) as i64))
        .map(|c| c.carbs)
        .sum()
}

fn minutes_since_last_meal_start(carbs: &[CarbEntry], t: DateTime<Utc>) -> f64 {
    carbs
        .iter()
        .filter(|c| c.timestamp <= t && c.carbs >= 1.0)
        .map(|c| (t - c.timestamp).num_seconds() as f64 / 60.0)
        .fold(f64::INFINITY, f64::min)
}

/// Walk the bucket series (most-recent-first, per [`bucket_glucose_data`])
/// and produce the "non-meal" deviation window used for the sensitivity
/// ratio, zero-padded to `window.samples` when the history is shorter.
#[allow(clippy::too_many_arguments)]
fn calculate_deviations(
    buckets: &[BucketedGlucose],
    treatments: &[Treatment],
    carbs: &[CarbEntry],
    profile: &Profile,
    temp_target: Option<&TempTarget>,
    window: &WindowConfig,
) -> Result<Vec<f64>, OrefError> {
    let mut deviations = Vec::new();
    let mut state = DeviationState::Initial;

    let limit = buckets.len().saturating_sub(3).min(window.samples);
    for i in 0..limit {
        let bucket = buckets[i];
        let avg_delta = (buckets[i].glucose - buckets[i + 3].glucose) / 3.0;
        let delta = buckets[i].glucose - buckets[i + 1].glucose;
        let isf = isf_lookup(profile, bucket.date);
        let activity = calculate_total_iob(treatments, profile, bucket.date)?.activity;
        let iob = calculate_total_iob(treatments, profile, bucket.date)?.iob;
        let bgi = round(-activity * isf * 5.0, 2);
        let mut deviation = delta - bgi;

        if bucket.glucose < 80.0 && deviation > 0.0 {
            deviation = 0.0;
        }

        let meal_cob = active_meal_cob_at(carbs, bucket.date, profile.max_meal_absorption_time);
        let meal_age_min = minutes_since_last_meal_start(carbs, bucket.date);

        state = if meal_cob > 0.0 {
            DeviationState::Csf
        } else if iob > 2.0 * profile.current_basal || state == DeviationState::Uam || meal_age_min < 45.0 {
            DeviationState::Uam
        } else {
            DeviationState::NonMeal
        };

        if state == DeviationState::NonMeal {
            deviations.push(deviation);
        }

        // Inject a zero every other even hour's first 5 minutes.
        if bucket.date.hour() % 4 == 0 && bucket.date.minute() < 5 {
            deviations.push(0.0);
        }

        if let Some(tt) = temp_target {
            if tt.midpoint() > 100.0 && profile.high_temptarget_raises_sensitivity {
                deviations.push(-(tt.midpoint() - 100.0) / 20.0);
            }
        }
    }

    // Faithful port: window clamping drops only one element per iteration
    // even though multiple may have been appended this pass (spec §9 open
    // question (b) — the drift is intentional, not a bug to fix here).
    while deviations.len() > window.samples {
        deviations.remove(0);
    }

    if deviations.len() < window.samples {
        let pad = round((1.0 - deviations.len() as f64 / window.samples as f64) * 18.0, 0) as usize;
        let mut padded = vec![0.0; pad];
        padded.extend(deviations);
        deviations = padded;
    }

    Ok(deviations)
}

fn calculate_ratio_from_deviations(deviations: &[f64], profile: &Profile) -> AutosensWindowResult {
    if deviations.is_empty() {
        return AutosensWindowResult { ratio: 1.0, new_isf: profile.sens };
    }
    let median = percentile(deviations, 50.0);
    let basal_off = median * (60.0 / 5.0) / profile.sens;
    let raw_ratio = 1.0 + (basal_off / profile.max_daily_basal.max(0.01));
    let ratio = round(crate::numeric::clamp(raw_ratio, profile.autosens_min, profile.autosens_max), 2);
    let new_isf = round(profile.sens / ratio, 0);
    AutosensWindowResult { ratio, new_isf }
}

pub fn detect_sensitivity(
    readings: &[GlucoseReading],
    carbs: &[CarbEntry],
    treatments: &[Treatment],
    profile: &Profile,
    temp_target: Option<&TempTarget>,
) -> Result<AutosensResult, OrefError> {
    let buckets = bucket_glucose_data(readings);

    let short = calculate_deviations(&buckets, treatments, carbs, profile, temp_target, &SHORT_WINDOW)?;
    let long = calculate_deviations(&buckets, treatments, carbs, profile, temp_target, &LONG_WINDOW)?;

    let short_ratio = calculate_ratio_from_deviations(&short, profile);
    let long_ratio = calculate_ratio_from_deviations(&long, profile);

    Ok(if short_ratio.ratio <= long_ratio.ratio { AutosensResult { ratio: short_ratio.ratio, new_isf: short_ratio.new_isf } } else {
        AutosensResult { ratio: long_ratio.ratio, new_isf: long_ratio.new_isf }
    })
}
