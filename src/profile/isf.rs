//! Insulin Sensitivity Factor schedule lookups (spec §4.2).

use chrono::{DateTime, Timelike, Utc};

use crate::types::{ISFEntry, ISFProfile, Profile};

const FALLBACK_SENS: f64 = 200.0;

pub fn isf_lookup(profile: &Profile, time: DateTime<Utc>) -> f64 {
    if let Some(sens) = isf_lookup_from_schedule(&profile.isf_profile, time) {
        return sens;
    }
    if profile.sens.is_finite() && profile.sens > 0.0 {
        return profile.sens;
    }
    FALLBACK_SENS
}

pub fn isf_lookup_from_schedule(isf_profile: &ISFProfile, time: DateTime<Utc>) -> Option<f64> {
    if isf_profile.sensitivities.is_empty() {
        return None;
    }
    let now_minutes = time.hour() * 60 + time.minute();
    let mut schedule: Vec<&ISFEntry> = isf_profile.sensitivities.iter().collect();
    schedule.sort_by_key(|e| e.offset);
    if schedule[0].offset != 0 {
        return None;
    }
    let mut isf_entry = schedule.last().unwrap();
    for i in 0..schedule.len() {
        let entry = schedule[i];
        let next_offset = if i + 1 < schedule.len() { schedule[i + 1].offset } else { 1440 };
        if now_minutes >= entry.offset && now_minutes < next_offset {
            isf_entry = entry;
            break;
        }
    }
    Some(isf_entry.sensitivity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile_with_schedule() -> Profile {
        Profile {
            sens: 50.0,
            isf_profile: ISFProfile {
                sensitivities: vec![
                    ISFEntry { offset: 0, sensitivity: 45.0, end_offset: None },
                    ISFEntry { offset: 360, sensitivity: 50.0, end_offset: None },
                    ISFEntry { offset: 1080, sensitivity: 55.0, end_offset: None },
                ],
            },
            ..Default::default()
        }
    }

    #[test]
    fn looks_up_by_time_of_day() {
        let profile = profile_with_schedule();
        let night = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        assert_eq!(isf_lookup(&profile, night), 45.0);
        assert_eq!(isf_lookup(&profile, evening), 55.0);
    }

    #[test]
    fn empty_schedule_uses_current_sens() {
        let profile = Profile { sens: 42.0, ..Default::default() };
        assert_eq!(isf_lookup(&profile, Utc::now()), 42.0);
    }
}
