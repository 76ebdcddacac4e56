//! Meal history assembly: dedups carb/bolus pairs logged within ±2s of
//! each other (a single wizard-entry UI action often produces both) and
//! folds in the COB detector's result (spec §4.5/§2 "Meal total").

use chrono::{DateTime, Duration, Utc};

use crate::cob;
use crate::error::OrefError;
use crate::types::{CarbEntry, GlucoseReading, MealData, Profile, Treatment};

/// Drop carb entries that land within 2 seconds of a bolus timestamp —
/// these are almost always the same wizard action logged twice.
pub fn dedup_carb_bolus_events(carbs: &[CarbEntry], treatments: &[Treatment]) -> Vec<CarbEntry> {
    let bolus_times: Vec<DateTime<Utc>> = treatments.iter().filter(|t| t.is_bolus()).map(|t| t.date).collect();
    carbs
        .iter()
        .copied()
        .filter(|c| {
            !bolus_times
                .iter()
                .any(|bt| (c.timestamp - *bt).num_milliseconds().abs() <= 2000 && c.carbs <= 0.001)
        })
        .collect()
}

pub fn find_meals(treatments: &[Treatment]) -> Vec<&Treatment> {
    treatments.iter().filter(|t| t.has_carbs()).collect()
}

pub fn generate(
    carbs: &[CarbEntry],
    readings: &[GlucoseReading],
    treatments: &[Treatment],
    profile: &Profile,
    now: DateTime<Utc>,
) -> Result<MealData, OrefError> {
    let deduped = dedup_carb_bolus_events(carbs, treatments);

    let ns_carbs: f64 = deduped.iter().map(|c| c.carbs).sum();
    let bw_carbs: f64 = treatments.iter().filter(|t| t.bw_carbs > 0.0).map(|t| t.bw_carbs).sum();
    let journal_carbs: f64 = treatments.iter().filter(|t| t.journal_carbs > 0.0).map(|t| t.journal_carbs).sum();
    let total_carbs = ns_carbs + bw_carbs + journal_carbs;

    let cob_result = cob::calculate(&deduped, readings, treatments, profile, now)?;

    let last_carb_time = deduped.iter().map(|c| c.timestamp).max();
    let bw_found = treatments.iter().any(|t| t.bw_carbs > 0.0);

    // Remaining-carbs safety cap: never report more unabsorbed carbs than
    // `remainingCarbsCap`, scaled by `remainingCarbsFraction`.
    let capped_cob = cob_result
        .meal_cob
        .min(profile.remaining_carbs_cap * profile.remaining_carbs_fraction);

    Ok(MealData {
        carbs: total_carbs,
        ns_carbs,
        bw_carbs,
        journal_carbs,
        meal_cob: capped_cob,
        current_deviation: cob_result.current_deviation,
        max_deviation: cob_result.max_deviation,
        min_deviation: cob_result.min_deviation,
        slope_from_max_deviation: cob_result.slope_from_max,
        slope_from_min_deviation: cob_result.slope_from_min,
        all_deviations: Vec::new(),
        last_carb_time,
        bw_found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_carb_entry_logged_alongside_bolus() {
        let now = Utc::now();
        let carbs = vec![CarbEntry { timestamp: now, carbs: 0.0, fat: None, protein: None }];
        let treatments = vec![Treatment::bolus(now, 1.0)];
        let result = dedup_carb_bolus_events(&carbs, &treatments);
        assert!(result.is_empty());
    }

    #[test]
    fn keeps_real_carb_entries() {
        let now = Utc::now();
        let carbs = vec![CarbEntry { timestamp: now, carbs: 40.0, fat: None, protein: None }];
        let result = dedup_carb_bolus_events(&carbs, &[]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn generate_caps_cob_at_remaining_carbs_cap() {
        let now = Utc::now();
        let carbs = vec![CarbEntry {
            timestamp: now - Duration::minutes(10),
            carbs: 200.0,
            fat: None,
            protein: None,
        }];
        let profile = Profile { remaining_carbs_cap: 50.0, remaining_carbs_fraction: 1.0, ..Default::default() };
        let readings = vec![GlucoseReading::new(140.0, now)];
        let meal = generate(&carbs, &readings, &[], &profile, now).unwrap();
        assert!(meal.meal_cob <= 50.0);
    }
}
