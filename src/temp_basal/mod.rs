//! Temp-basal helper (spec §4.11): pump-granularity rounding, the
//! `maxSafeBasal` cap, and the close-enough / cancel / neutral-temp
//! decision `setTempBasal` wraps around a suggested rate.

use crate::types::{CurrentTemp, Profile, TempBasalRecommendation};
use crate::utils::round::round_basal;

pub fn max_safe_basal(profile: &Profile) -> f64 {
    profile.max_safe_basal()
}

/// Wraps a suggested `(rate, duration)` with the pump-side bookkeeping the
/// reference applies before it ever reaches the driver: clamp to
/// `maxSafeBasal`, quantize to pump granularity, leave an already-close
/// current temp alone, and collapse a basal-equal suggestion into either a
/// cancellation or a neutral temp depending on `skipNeutralTemps`.
pub fn set_temp_basal(
    suggested_rate: f64,
    suggested_duration: f64,
    profile: &Profile,
    current_temp: &CurrentTemp,
    basal: f64,
) -> TempBasalRecommendation {
    let max_safe = max_safe_basal(profile);
    let clamped_rate = suggested_rate.clamp(0.0, max_safe);
    let rounded_rate = round_basal(clamped_rate, &profile.model);

    if current_temp.is_active() {
        let duration_left = current_temp.duration;
        let close_enough = duration_left > suggested_duration - 10.0
            && (current_temp.rate - rounded_rate).abs() <= 0.2 * current_temp.rate.max(0.01);
        if close_enough {
            return TempBasalRecommendation::new(current_temp.rate, current_temp.duration);
        }
    }

    if (rounded_rate - basal).abs() < 1e-9 {
        return if profile.skip_neutral_temps && !current_temp.is_active() {
            TempBasalRecommendation::zero()
        } else {
            TempBasalRecommendation::new(rounded_rate, suggested_duration)
        };
    }

    TempBasalRecommendation::new(rounded_rate, suggested_duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_close_enough_temp_unchanged() {
        let profile = Profile { max_basal: 5.0, max_daily_basal: 1.0, current_basal: 1.0, ..Default::default() };
        let current = CurrentTemp::absolute(1.0, 25.0);
        let rec = set_temp_basal(1.02, 30.0, &profile, &current, 1.0);
        assert_eq!(rec.rate, 1.0);
        assert_eq!(rec.duration, 25.0);
    }

    #[test]
    fn cancels_neutral_temp_when_skip_neutral_temps() {
        let profile = Profile { max_basal: 5.0, max_daily_basal: 1.0, current_basal: 1.0, skip_neutral_temps: true, ..Default::default() };
        let current = CurrentTemp::none();
        let rec = set_temp_basal(1.0, 30.0, &profile, &current, 1.0);
        assert_eq!(rec.rate, 0.0);
        assert_eq!(rec.duration, 0.0);
    }

    #[test]
    fn clamps_to_max_safe_basal() {
        let profile = Profile { max_basal: 2.0, max_daily_basal: 1.0, current_basal: 1.0, ..Default::default() };
        let current = CurrentTemp::none();
        let rec = set_temp_basal(10.0, 30.0, &profile, &current, 1.0);
        assert!(rec.rate <= max_safe_basal(&profile));
    }
}
