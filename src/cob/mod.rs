//! Meal/COB detector (spec §4.5): buckets CGM into 5-minute samples,
//! compares observed vs. expected (BGI-driven) glucose movement, and
//! accumulates absorbed carbs from the resulting deviation series.

use chrono::{DateTime, Duration, Utc};

use crate::error::OrefError;
use crate::iob::calculate_total_iob;
use crate::profile::isf_lookup;
use crate::types::{CarbEntry, COBResult, GlucoseReading, Profile, Treatment};
use crate::utils::round;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketedGlucose {
    pub date: DateTime<Utc>,
    pub glucose: f64,
}

/// Gaps >8 min are linearly interpolated (capped at 240 min of backfill);
/// gaps in `[2,8]` min start a new bucket; ≤2 min averages into the
/// current bucket. Readings below 39 mg/dL are skipped.
pub fn bucket_glucose_data(readings: &[GlucoseReading]) -> Vec<BucketedGlucose> {
    let mut sorted: Vec<&GlucoseReading> = readings.iter().filter(|r| r.is_valid()).collect();
    sorted.sort_by_key(|r| r.date);

    let mut buckets: Vec<BucketedGlucose> = Vec::new();
    for r in sorted {
        match buckets.last_mut() {
            None => buckets.push(BucketedGlucose { date: r.date, glucose: r.glucose }),
            Some(last) => {
                let gap_min = (r.date - last.date).num_seconds() as f64 / 60.0;
                if gap_min <= 2.0 {
                    last.glucose = (last.glucose + r.glucose) / 2.0;
                } else if gap_min <= 8.0 {
                    buckets.push(BucketedGlucose { date: r.date, glucose: r.glucose });
                } else {
                    let capped_gap = gap_min.min(240.0);
                    let steps = (capped_gap / 5.0).round().max(1.0) as i64;
                    let start_glucose = last.glucose;
                    let start_date = last.date;
                    for step in 1..=steps {
                        let frac = step as f64 / steps as f64;
                        buckets.push(BucketedGlucose {
                            date: start_date + Duration::seconds((gap_min * 60.0 * frac) as i64),
                            glucose: start_glucose + (r.glucose - start_glucose) * frac,
                        });
                    }
                }
            }
        }
    }
    buckets.sort_by_key(|b| b.date);
    buckets.reverse(); // most-recent-first, matching the reference's bucket indexing
    buckets
}

/// Most recent carb entry ≥1g within `max_absorption_hours` of `now`.
pub fn find_meal_time(carbs: &[CarbEntry], now: DateTime<Utc>, max_absorption_hours: f64) -> Option<DateTime<Utc>> {
    carbs
        .iter()
        .filter(|c| c.carbs >= 1.0 && (now - c.timestamp) <= Duration::minutes((max_absorption_hours * 60.0) as i64))
        .map(|c| c.timestamp)
        .max()
}

pub fn calculate_total_carbs(carbs: &[CarbEntry], meal_time: DateTime<Utc>) -> f64 {
    carbs.iter().filter(|c| c.timestamp >= meal_time).map(|c| c.carbs).sum()
}

#[derive(Debug, Clone, Default)]
pub struct CarbAbsorptionResult {
    pub absorbed: f64,
    pub current_deviation: f64,
    pub max_deviation: f64,
    pub min_deviation: f64,
    pub slope_from_max: f64,
    pub slope_from_min: f64,
    pub all_deviations: Vec<f64>,
}

fn iob_activity_at(
    treatments: &[Treatment],
    profile: &Profile,
    t: DateTime<Utc>,
) -> Result<f64, OrefError> {
    Ok(calculate_total_iob(treatments, profile, t)?.activity)
}

/// Core deviation loop (spec §4.5). `buckets` is most-recent-first.
pub fn detect_carb_absorption_internal(
    buckets: &[BucketedGlucose],
    treatments: &[Treatment],
    profile: &Profile,
    meal_time: DateTime<Utc>,
) -> Result<CarbAbsorptionResult, OrefError> {
    let mut result = CarbAbsorptionResult::default();
    if buckets.len() < 4 {
        return Ok(result);
    }

    let mut max_dev = 0.0_f64;
    let mut min_dev = 0.0_f64;
    let mut max_dev_idx = 0usize;
    let mut min_dev_idx = 0usize;

    for i in 0..buckets.len().saturating_sub(3) {
        let avg_delta = (buckets[i].glucose - buckets[i + 3].glucose) / 3.0;
        let delta = buckets[i].glucose - buckets[i + 1].glucose;
        let isf = isf_lookup(profile, buckets[i].date);
        let carb_ratio = profile.carb_ratio;
        let activity = iob_activity_at(treatments, profile, buckets[i].date)?;
        let bgi = round(-activity * isf * 5.0, 2);
        let deviation = delta - bgi;

        if i == 0 {
            result.current_deviation = round(avg_delta - bgi, 3);
        }

        result.all_deviations.push(deviation);

        if deviation > max_dev {
            max_dev = deviation;
            max_dev_idx = i;
        }
        if deviation < min_dev {
            min_dev = deviation;
            min_dev_idx = i;
        }

        if buckets[i].date > meal_time {
            let min_5m_ci = profile.min_5m_carbimpact;
            let ci = deviation.max(result.current_deviation / 2.0).max(min_5m_ci);
            result.absorbed += ci * carb_ratio / isf;
        }
    }

    result.max_deviation = max_dev;
    result.min_deviation = min_dev;
    result.slope_from_max = if max_dev_idx > 0 { (result.current_deviation - max_dev) / max_dev_idx as f64 } else { 0.0 };
    result.slope_from_min = if min_dev_idx > 0 { (result.current_deviation - min_dev) / min_dev_idx as f64 } else { 0.0 };

    Ok(result)
}

pub fn detect_carb_absorption(
    carbs: &[CarbEntry],
    readings: &[GlucoseReading],
    treatments: &[Treatment],
    profile: &Profile,
    now: DateTime<Utc>,
) -> Result<CarbAbsorptionResult, OrefError> {
    let buckets = bucket_glucose_data(readings);
    let meal_time = match find_meal_time(carbs, now, profile.max_meal_absorption_time) {
        Some(t) => t,
        None => return Ok(CarbAbsorptionResult::default()),
    };
    detect_carb_absorption_internal(&buckets, treatments, profile, meal_time)
}

/// Top-level entry: `COB = max(0, totalCarbs - absorbed)`, capped at
/// `maxCOB`. Empty deviation history forces COB=0 (zombie-carb safety).
pub fn calculate(
    carbs: &[CarbEntry],
    readings: &[GlucoseReading],
    treatments: &[Treatment],
    profile: &Profile,
    now: DateTime<Utc>,
) -> Result<COBResult, OrefError> {
    let meal_time = match find_meal_time(carbs, now, profile.max_meal_absorption_time) {
        Some(t) => t,
        None => return Ok(COBResult::default()),
    };

    let total_carbs = calculate_total_carbs(carbs, meal_time);
    let buckets = bucket_glucose_data(readings);
    let absorption = detect_carb_absorption_internal(&buckets, treatments, profile, meal_time)?;

    let meal_cob = if absorption.all_deviations.is_empty() {
        0.0
    } else {
        (total_carbs - absorption.absorbed).max(0.0).min(profile.max_cob)
    };

    Ok(COBResult {
        meal_cob,
        carbs_absorbed: absorption.absorbed,
        current_deviation: absorption.current_deviation,
        max_deviation: absorption.max_deviation,
        min_deviation: absorption.min_deviation,
        slope_from_max: absorption.slope_from_max,
        slope_from_min: absorption.slope_from_min,
    })
}
