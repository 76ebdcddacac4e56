//! IOB series generator (spec §4.4): a 4h, 5-minute-cadence series, each
//! step carrying both the plain IOB and the "with zero temp" overlay used
//! by the Zero-Temp forecast branch.

pub mod total;
pub mod history;

use chrono::{DateTime, Duration, Utc};

use crate::error::OrefError;
use crate::types::{IOBData, Profile, PumpEvent, TempBasalState};

pub use history::find_insulin_treatments;
pub use total::calculate_total_iob;

const STEP_MINUTES: i64 = 5;
const STEPS: usize = 48;

pub fn calculate(
    events: &[PumpEvent],
    profile: &Profile,
    clock: DateTime<Utc>,
    autosens_ratio: f64,
    current_iob_only: bool,
) -> Result<Vec<IOBData>, OrefError> {
    let treatments = find_insulin_treatments(events, profile, clock, autosens_ratio, 0)?;
    let zero_temp_treatments = find_insulin_treatments(events, profile, clock, autosens_ratio, 240)?;

    let last_bolus_time = treatments.iter().filter(|t| t.is_bolus()).map(|t| t.date).max();
    let last_temp = last_temp_state(events, clock);

    let steps = if current_iob_only { 1 } else { STEPS };
    let mut out = Vec::with_capacity(steps);

    for i in 0..steps {
        let t = clock + Duration::minutes(STEP_MINUTES * i as i64);
        let mut point = calculate_total_iob(&treatments, profile, t)?.rounded();
        let zero_temp_point = calculate_total_iob(&zero_temp_treatments, profile, t)?.rounded();
        point.iob_with_zero_temp = Some(Box::new(zero_temp_point));
        if i == 0 {
            point.last_bolus_time = last_bolus_time;
            point.last_temp = last_temp.clone();
        }
        out.push(point);
    }

    Ok(out)
}

pub fn calculate_current(
    events: &[PumpEvent],
    profile: &Profile,
    clock: DateTime<Utc>,
    autosens_ratio: f64,
) -> Result<IOBData, OrefError> {
    let series = calculate(events, profile, clock, autosens_ratio, true)?;
    series.into_iter().next().ok_or_else(|| OrefError::CalculationError("empty IOB series".into()))
}

fn last_temp_state(events: &[PumpEvent], clock: DateTime<Utc>) -> Option<TempBasalState> {
    let mut rates: Vec<(DateTime<Utc>, f64)> = Vec::new();
    let mut durations: Vec<(DateTime<Utc>, f64)> = Vec::new();
    for e in events {
        match e {
            PumpEvent::TempBasal { timestamp, rate } => rates.push((*timestamp, *rate)),
            PumpEvent::TempBasalDuration { timestamp, minutes } => durations.push((*timestamp, *minutes)),
            _ => {}
        }
    }
    let (ts, rate) = rates.into_iter().filter(|(ts, _)| *ts <= clock).max_by_key(|(ts, _)| *ts)?;
    let duration = durations.into_iter().find(|(dts, _)| *dts == ts).map(|(_, m)| m)?;
    Some(TempBasalState { date: ts, duration, rate })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_yields_zero_iob_series() {
        let profile = Profile::default();
        let now = Utc::now();
        let series = calculate(&[], &profile, now, 1.0, false).unwrap();
        assert_eq!(series.len(), STEPS);
        assert_eq!(series[0].iob, 0.0);
    }

    #[test]
    fn current_iob_only_returns_single_point() {
        let profile = Profile::default();
        let now = Utc::now();
        let point = calculate_current(&[], &profile, now, 1.0).unwrap();
        assert_eq!(point.iob, 0.0);
    }
}
