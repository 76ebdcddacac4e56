//! Carb-ratio schedule lookups (spec §4.2).

use chrono::{DateTime, Timelike, Utc};

use crate::types::{CarbRatioScheduleEntry, Profile};

const FALLBACK_CARB_RATIO: f64 = 30.0;

pub fn carb_ratio_lookup(profile: &Profile, time: DateTime<Utc>) -> f64 {
    if let Some(ratio) = lookup_schedule(&profile.carb_ratio_profile, time) {
        return ratio;
    }
    if profile.carb_ratio.is_finite() && profile.carb_ratio > 0.0 {
        return profile.carb_ratio;
    }
    FALLBACK_CARB_RATIO
}

fn lookup_schedule(schedule: &[CarbRatioScheduleEntry], time: DateTime<Utc>) -> Option<f64> {
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
    Some(entry.ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule() -> Vec<CarbRatioScheduleEntry> {
        vec![
            CarbRatioScheduleEntry { offset: 0, ratio: 12.0 },
            CarbRatioScheduleEntry { offset: 420, ratio: 8.0 },
        ]
    }

    #[test]
    fn looks_up_morning_ratio() {
        let profile = Profile { carb_ratio_profile: schedule(), ..Default::default() };
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        assert_eq!(carb_ratio_lookup(&profile, t), 8.0);
    }

    #[test]
    fn unsorted_entries_still_resolve() {
        let mut s = schedule();
        s.reverse();
        let profile = Profile { carb_ratio_profile: s, ..Default::default() };
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        assert_eq!(carb_ratio_lookup(&profile, t), 12.0);
    }

    #[test]
    fn empty_schedule_falls_back() {
        let profile = Profile { carb_ratio: 0.0, ..Default::default() };
        assert_eq!(carb_ratio_lookup(&profile, Utc::now()), FALLBACK_CARB_RATIO);
    }
}
