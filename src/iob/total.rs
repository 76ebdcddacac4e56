//! Sum individual treatment contributions into one `IOBData` snapshot
//! (spec §4.4).

use chrono::{DateTime, Utc};

use crate::error::OrefError;
use crate::insulin::calculate_iob_contrib;
use crate::types::{IOBData, Profile, Treatment};

pub fn calculate_total_iob(
    treatments: &[Treatment],
    profile: &Profile,
    time: DateTime<Utc>,
) -> Result<IOBData, OrefError> {
    let dia = profile.effective_dia();
    let peak = profile.curve.effective_peak(Some(profile.insulin_peak_time), profile.use_custom_peak_time);

    let mut iob = 0.0;
    let mut activity = 0.0;
    let mut basal_iob = 0.0;
    let mut bolus_iob = 0.0;
    let mut net_basal_insulin = 0.0;
    let mut bolus_insulin = 0.0;

    for treatment in treatments {
        if treatment.insulin == 0.0 {
            continue;
        }
        if treatment.date > time {
            continue;
        }
        let mins = (time - treatment.date).num_seconds() as f64 / 60.0;
        let mins = (mins + 0.5).floor();
        if mins < 0.0 || mins >= dia * 60.0 {
            continue;
        }

        let contrib = calculate_iob_contrib(profile.curve, treatment.insulin.abs(), mins, dia, peak)?;
        let sign = treatment.insulin.signum();

        iob += contrib.iob_contrib * sign;
        activity += contrib.activity_contrib * sign;

        if treatment.insulin.abs() < 0.1 {
            basal_iob += contrib.iob_contrib * sign;
            net_basal_insulin += treatment.insulin;
        } else {
            bolus_iob += contrib.iob_contrib * sign;
            bolus_insulin += treatment.insulin;
        }
    }

    Ok(IOBData {
        iob,
        activity,
        basal_iob,
        bolus_iob,
        net_basal_insulin,
        bolus_insulin,
        time,
        iob_with_zero_temp: None,
        last_bolus_time: None,
        last_temp: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn single_bolus_decays_to_zero_iob_after_dia() {
        let profile = Profile { dia: 5.0, ..Default::default() };
        let now = Utc::now();
        let treatments = vec![Treatment::bolus(now - Duration::hours(6), 1.0)];
        let result = calculate_total_iob(&treatments, &profile, now).unwrap();
        assert_eq!(result.iob, 0.0);
    }

    #[test]
    fn fresh_bolus_contributes_full_iob() {
        let profile = Profile { dia: 5.0, ..Default::default() };
        let now = Utc::now();
        let treatments = vec![Treatment::bolus(now, 1.0)];
        let result = calculate_total_iob(&treatments, &profile, now).unwrap();
        assert!((result.iob - 1.0).abs() < 0.01);
        assert!(result.bolus_iob > 0.0);
        assert_eq!(result.basal_iob, 0.0);
    }
}
