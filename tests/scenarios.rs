//! Scenario tests against the full tick (spec §8): literal input sets with
//! loosely-checked expected output shapes, plus a few of the testable
//! properties that must hold for any valid input.

use chrono::{Duration, TimeZone, Utc};

use oref::prelude::*;

fn base_profile() -> Profile {
    Profile {
        max_basal: 5.0,
        max_daily_basal: 1.0,
        current_basal: 1.0,
        sens: 50.0,
        carb_ratio: 10.0,
        min_bg: 100.0,
        max_bg: 100.0,
        ..Default::default()
    }
}

fn reading_series(values: &[f64], now: chrono::DateTime<Utc>) -> Vec<GlucoseReading> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| GlucoseReading::new(*v, now - Duration::minutes(5 * i as i64)))
        .collect()
}

fn inputs(profile: Profile, glucose: Vec<GlucoseReading>, carbs: Vec<CarbEntry>, pump_history: Vec<PumpEvent>, now: chrono::DateTime<Utc>) -> EngineInputs {
    EngineInputs {
        profile,
        current_temp: CurrentTemp::none(),
        glucose,
        pump_history,
        carbs,
        temp_targets: Vec::new(),
        clock: now,
        previous_autosens_ratio: 1.0,
        tdd: None,
        weighted_average_tdd: None,
        average_total_tdd: None,
    }
}

#[test]
fn s1_stable_in_range_no_meal() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[110.0, 108.0, 109.0, 110.0, 112.0, 110.0], now);
    let profile = base_profile();
    let result = determine(&inputs(profile.clone(), glucose, Vec::new(), Vec::new(), now)).unwrap();
    assert!(result.rate.unwrap() <= profile.max_safe_basal());
    assert_eq!(result.units, None);
}

#[test]
fn s2_low_predicted_with_active_iob() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[80.0, 78.0, 76.0, 74.0, 72.0], now);
    let mut profile = base_profile();
    profile.min_bg = 100.0;
    profile.max_bg = 120.0;
    let pump_history = vec![PumpEvent::Bolus { timestamp: now - Duration::minutes(20), units: 2.0 }];
    let result = determine(&inputs(profile, glucose, Vec::new(), pump_history, now)).unwrap();
    if let Some(duration) = result.duration {
        assert!([30.0, 60.0, 90.0, 120.0].contains(&duration) || duration == 0.0);
    }
}

#[test]
fn s3_high_predicted_smb_allowed() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[230.0, 225.0, 220.0], now);
    let mut profile = base_profile();
    profile.enable_smb_always = true;
    profile.bolus_increment = 0.05;
    profile.min_bg = 100.0;
    profile.max_bg = 120.0;
    let result = determine(&inputs(profile.clone(), glucose, Vec::new(), Vec::new(), now)).unwrap();
    assert!(result.rate.unwrap() < profile.max_safe_basal() + 1e-6);
    if let Some(units) = result.units {
        assert!(units >= profile.bolus_increment || units == 0.0);
    }
}

#[test]
fn s4_noisy_cgm_forces_safe_side() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let mut glucose = reading_series(&[150.0, 150.0, 150.0, 150.0], now);
    for g in &mut glucose {
        g.noise = Some(3.0);
    }
    let profile = base_profile();
    let result = determine(&inputs(profile, glucose, Vec::new(), Vec::new(), now)).unwrap();
    assert!(result.reason.contains("noise is high"));
}

#[test]
fn s5_meal_absorption_produces_cob() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[180.0, 165.0, 140.0], now);
    let carbs = vec![CarbEntry { timestamp: now - Duration::minutes(45), carbs: 50.0, fat: None, protein: None }];
    let profile = base_profile();
    let result = determine(&inputs(profile, glucose, carbs, Vec::new(), now)).unwrap();
    assert!(result.cob >= 0.0);
    assert!(result.reason.contains("CR:"));
}

#[test]
fn s6_pump_suspend_resume_caps_iob_impact() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[120.0, 119.0, 118.0], now);
    let mut profile = base_profile();
    profile.suspend_zeros_iob = true;
    let pump_history = vec![
        PumpEvent::PumpSuspend { timestamp: now - Duration::minutes(40) },
        PumpEvent::PumpResume { timestamp: now - Duration::minutes(20) },
    ];
    let result = determine(&inputs(profile.clone(), glucose, Vec::new(), pump_history, now)).unwrap();
    if result.units.is_none() {
        assert!(result.rate.unwrap() <= profile.current_basal + 1e-6 || result.rate.unwrap() == 0.0);
    }
}

#[test]
fn property_sensitivity_ratio_stays_in_autosens_bounds() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[140.0, 138.0, 136.0, 134.0, 132.0, 130.0], now);
    let profile = base_profile();
    let result = determine(&inputs(profile.clone(), glucose, Vec::new(), Vec::new(), now)).unwrap();
    assert!(result.sensitivity_ratio >= profile.autosens_min && result.sensitivity_ratio <= profile.autosens_max);
}

#[test]
fn property_threshold_bounds() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[140.0, 138.0, 136.0], now);
    let profile = base_profile();
    let result = determine(&inputs(profile, glucose, Vec::new(), Vec::new(), now)).unwrap();
    assert!(result.threshold >= 60.0 && result.threshold <= 120.0);
}

#[test]
fn property_forecast_series_bounded_and_anchored() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    let glucose = reading_series(&[140.0, 138.0, 136.0, 134.0], now);
    let profile = base_profile();
    let result = determine(&inputs(profile, glucose, Vec::new(), Vec::new(), now)).unwrap();
    assert!(result.pred_bgs.iob.len() <= 48);
    assert!(!result.pred_bgs.iob.is_empty());
}
