//! Basal-rate schedule lookups (spec §4.2).

use chrono::{DateTime, Timelike, Utc};

use crate::types::{BasalScheduleEntry, Profile};

const FALLBACK_BASAL: f64 = 0.1;

/// Segment whose `offset <= minutes_since_midnight < next.offset`; the
/// last segment extends to 1440. Falls back to `profile.current_basal`
/// when the schedule is empty, and further to the spec's hard-coded 0.1
/// U/hr when even that is unset (<=0 or non-finite) — the schedule-empty
/// case described in spec §4.2 is a profile that was never configured at
/// all, not merely one running off a single flat rate.
pub fn basal_lookup(profile: &Profile, time: DateTime<Utc>) -> f64 {
    if let Some(rate) = lookup_schedule(&profile.basal_profile, time) {
        return (rate * 1000.0).round() / 1000.0;
    }
    if profile.current_basal.is_finite() && profile.current_basal > 0.0 {
        return profile.current_basal;
    }
    FALLBACK_BASAL
}

fn lookup_schedule(schedule: &[BasalScheduleEntry], time: DateTime<Utc>) -> Option<f64> {
    if schedule.is_empty() {
        return None;
    }
    let now_minutes = time.hour() * 60 + time.minute();
    let mut sorted: Vec<_> = schedule.iter().collect();
    sorted.sort_by_key(|e| e.offset);
    if sorted[0].offset != 0 {
        return None;
    }
    let mut entry = sorted.last().unwrap();
    for i in 0..sorted.len() {
        let next_offset = if i + 1 < sorted.len() { sorted[i + 1].offset } else { 1440 };
        if now_minutes >= sorted[i].offset && now_minutes < next_offset {
            entry = sorted[i];
            break;
        }
    }
    Some(entry.rate)
}

/// Maximum rate across the 24h schedule; used as `maxDailyBasal` when the
/// profile doesn't carry an explicit override.
pub fn max_daily_basal(schedule: &[BasalScheduleEntry]) -> f64 {
    schedule.iter().fold(0.0_f64, |max, e| max.max(e.rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule() -> Vec<BasalScheduleEntry> {
        vec![
            BasalScheduleEntry { offset: 0, rate: 0.8 },
            BasalScheduleEntry { offset: 360, rate: 1.0 },
            BasalScheduleEntry { offset: 1080, rate: 1.2 },
        ]
    }

    #[test]
    fn looks_up_night_rate() {
        let profile = Profile { basal_profile: schedule(), ..Default::default() };
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        assert_eq!(basal_lookup(&profile, t), 0.8);
    }

    #[test]
    fn wraps_at_midnight() {
        let profile = Profile { basal_profile: schedule(), ..Default::default() };
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        assert_eq!(basal_lookup(&profile, t), 1.2);
    }

    #[test]
    fn empty_schedule_falls_back_to_current_basal() {
        let profile = Profile { current_basal: 0.65, ..Default::default() };
        assert_eq!(basal_lookup(&profile, Utc::now()), 0.65);
    }

    #[test]
    fn fully_unconfigured_profile_uses_spec_fallback() {
        let profile = Profile { current_basal: 0.0, ..Default::default() };
        assert_eq!(basal_lookup(&profile, Utc::now()), FALLBACK_BASAL);
    }

    #[test]
    fn max_daily_basal_is_schedule_max() {
        assert_eq!(max_daily_basal(&schedule()), 1.2);
    }
}
