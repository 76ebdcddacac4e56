//! Top-level orchestrator (spec §2/§5): wires IOB → Meal/COB → Autosens →
//! Dynamic ISF → Forecast → Dosing cascade into the single pure entry
//! point collaborators call once per tick. No I/O, no state held across
//! calls — everything the engine needs arrives in [`EngineInputs`].

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::autosens;
use crate::determine_basal::{self, DeterminationInputs};
use crate::dynamic_isf::{self, DynamicIsfInputs, DynamicIsfResult};
use crate::error::OrefError;
use crate::forecast;
use crate::iob;
use crate::meal;
use crate::profile::isf_lookup;
use crate::types::{CarbEntry, CurrentTemp, Determination, GlucoseReading, GlucoseStatus, Profile, PumpEvent, TempTarget};

/// Everything one tick of the engine needs. Collaborators own persistence;
/// this struct is assembled fresh from storage on every call.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EngineInputs {
    pub profile: Profile,
    pub current_temp: CurrentTemp,
    pub glucose: Vec<GlucoseReading>,
    pub pump_history: Vec<PumpEvent>,
    pub carbs: Vec<CarbEntry>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub temp_targets: Vec<TempTarget>,
    pub clock: DateTime<Utc>,
    /// The sensitivity ratio applied to the previous tick's pump-history
    /// normalization (spec §4.3 step 7's `netRate` calc is itself a
    /// function of autosens, so the very first normalization pass needs a
    /// prior value). Orchestrators feeding this from storage should pass
    /// the last computed [`AutosensResult::ratio`]; `1.0` is a safe default
    /// on cold start.
    #[cfg_attr(feature = "serde", serde(default = "default_previous_autosens_ratio"))]
    pub previous_autosens_ratio: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tdd: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub weighted_average_tdd: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub average_total_tdd: Option<f64>,
}

#[cfg(feature = "serde")]
fn default_previous_autosens_ratio() -> f64 {
    1.0
}

#[instrument(skip_all, fields(clock = %inputs.clock))]
pub fn determine(inputs: &EngineInputs) -> Result<Determination, OrefError> {
    let profile = &inputs.profile;
    let clock = inputs.clock;

    let mut readings = inputs.glucose.clone();
    readings.sort_by(|a, b| b.date.cmp(&a.date));

    let glucose_status = GlucoseStatus::from_readings(&readings).ok_or(OrefError::MissingGlucoseStatus)?;
    debug!(bg = glucose_status.glucose, delta = glucose_status.delta, "glucose status");

    let active_temp_target = inputs.temp_targets.iter().find(|t| !t.is_cancelled(clock));

    let iob_series = iob::calculate(&inputs.pump_history, profile, clock, inputs.previous_autosens_ratio, false)?;
    let current_iob = iob_series.first().ok_or(OrefError::MissingIob)?.clone();
    debug!(iob = current_iob.iob, activity = current_iob.activity, "iob");

    let treatments = iob::find_insulin_treatments(&inputs.pump_history, profile, clock, inputs.previous_autosens_ratio, 0)?;

    let meal = meal::generate(&inputs.carbs, &readings, &treatments, profile, clock)?;
    debug!(cob = meal.meal_cob, carbs = meal.carbs, "meal");

    let autosens = autosens::detect_sensitivity(&readings, &inputs.carbs, &treatments, profile, active_temp_target)?;
    debug!(ratio = autosens.ratio, "autosens");

    let dynamic_isf_result = dynamic_isf_for(inputs, profile, &glucose_status);
    if let Some(d) = dynamic_isf_result {
        debug!(ratio = d.ratio, "dynamic isf");
    }

    let effective_ratio = dynamic_isf_result.map(|d| d.ratio).unwrap_or(autosens.ratio);
    let isf = isf_lookup(profile, clock);
    let target = (profile.min_bg + profile.max_bg) / 2.0;

    let forecast = forecast::run_forecast(profile, &iob_series, &glucose_status, &meal, isf, effective_ratio, target);

    let det_inputs = DeterminationInputs {
        profile,
        current_temp: inputs.current_temp,
        iob: &current_iob,
        forecast: &forecast,
        meal: &meal,
        autosens_ratio: autosens.ratio,
        dynamic_isf: dynamic_isf_result,
        glucose_status: &glucose_status,
        clock,
    };

    determine_basal::determine_basal(&det_inputs)
}

fn dynamic_isf_for(inputs: &EngineInputs, profile: &Profile, glucose_status: &GlucoseStatus) -> Option<DynamicIsfResult> {
    let tdd = inputs.tdd?;
    let dynamic_inputs = DynamicIsfInputs {
        tdd,
        weighted_average_tdd: inputs.weighted_average_tdd.unwrap_or(tdd),
        average_total_tdd: inputs.average_total_tdd.unwrap_or(tdd),
        bg: glucose_status.glucose,
        profile_target: (profile.min_bg + profile.max_bg) / 2.0,
    };
    dynamic_isf::dynamic_isf(profile, &dynamic_inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_glucose_is_reported() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let inputs = EngineInputs {
            profile: Profile::default(),
            current_temp: CurrentTemp::none(),
            glucose: Vec::new(),
            pump_history: Vec::new(),
            carbs: Vec::new(),
            temp_targets: Vec::new(),
            clock: now,
            previous_autosens_ratio: 1.0,
            tdd: None,
            weighted_average_tdd: None,
            average_total_tdd: None,
        };
        let result = determine(&inputs);
        assert!(matches!(result, Err(OrefError::MissingGlucoseStatus)));
    }

    #[test]
    fn stable_glucose_produces_a_determination() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let glucose = vec![
            GlucoseReading::new(110.0, now),
            GlucoseReading::new(108.0, now - chrono::Duration::minutes(5)),
            GlucoseReading::new(109.0, now - chrono::Duration::minutes(10)),
            GlucoseReading::new(110.0, now - chrono::Duration::minutes(15)),
        ];
        let profile = Profile { max_basal: 5.0, max_daily_basal: 1.0, current_basal: 1.0, sens: 50.0, carb_ratio: 10.0, min_bg: 100.0, max_bg: 120.0, ..Default::default() };
        let inputs = EngineInputs {
            profile,
            current_temp: CurrentTemp::none(),
            glucose,
            pump_history: Vec::new(),
            carbs: Vec::new(),
            temp_targets: Vec::new(),
            clock: now,
            previous_autosens_ratio: 1.0,
            tdd: None,
            weighted_average_tdd: None,
            average_total_tdd: None,
        };
        let result = determine(&inputs).unwrap();
        assert!(result.rate.is_some() || result.units.is_some());
    }
}
