//! Per-tick and series IOB records.

use chrono::{DateTime, Utc};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct IOBData {
    pub iob: f64,
    pub activity: f64,
    pub basal_iob: f64,
    pub bolus_iob: f64,
    pub net_basal_insulin: f64,
    pub bolus_insulin: f64,
    pub time: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub iob_with_zero_temp: Option<Box<IOBData>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_bolus_time: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub last_temp: Option<TempBasalState>,
}

impl IOBData {
    pub fn zero(time: DateTime<Utc>) -> Self {
        Self {
            iob: 0.0,
            activity: 0.0,
            basal_iob: 0.0,
            bolus_iob: 0.0,
            net_basal_insulin: 0.0,
            bolus_insulin: 0.0,
            time,
            iob_with_zero_temp: None,
            last_bolus_time: None,
            last_temp: None,
        }
    }

    /// `iob`/`basalIob`/`bolusIob`/`netBasalInsulin`/`bolusInsulin` round to
    /// 3 dp, `activity` to 4 dp (spec §4.4 / §8 property 7).
    pub fn rounded(&self) -> Self {
        Self {
            iob: crate::numeric::js_round(self.iob, 3),
            activity: crate::numeric::js_round(self.activity, 4),
            basal_iob: crate::numeric::js_round(self.basal_iob, 3),
            bolus_iob: crate::numeric::js_round(self.bolus_iob, 3),
            net_basal_insulin: crate::numeric::js_round(self.net_basal_insulin, 3),
            bolus_insulin: crate::numeric::js_round(self.bolus_insulin, 3),
            time: self.time,
            iob_with_zero_temp: self.iob_with_zero_temp.as_ref().map(|b| Box::new(b.rounded())),
            last_bolus_time: self.last_bolus_time,
            last_temp: self.last_temp.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IOBContrib {
    pub iob_contrib: f64,
    pub activity_contrib: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct TempBasalState {
    pub date: DateTime<Utc>,
    pub duration: f64,
    pub rate: f64,
}
