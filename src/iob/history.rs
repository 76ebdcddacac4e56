//! Bridges the pump-history normalizer into the treatment list the IOB
//! generator walks.

use chrono::{DateTime, Duration, Utc};

use crate::error::OrefError;
use crate::pump_history::{normalize, NormalizeOptions};
use crate::types::{Profile, PumpEvent, Treatment};

pub fn find_insulin_treatments(
    events: &[PumpEvent],
    profile: &Profile,
    clock: DateTime<Utc>,
    autosens_ratio: f64,
    zero_temp_duration: i64,
) -> Result<Vec<Treatment>, OrefError> {
    let opts = NormalizeOptions {
        clock,
        autosens_ratio,
        suspend_zeros_iob: profile.suspend_zeros_iob,
        zero_temp_extend_minutes: if zero_temp_duration > 0 { zero_temp_duration } else { 1 },
        history_window: Duration::hours(24),
    };
    normalize(events, profile, &opts)
}
