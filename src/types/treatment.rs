//! Raw pump/treatment history types. `PumpEvent` is the tagged union the
//! normalizer in [`crate::pump_history`] consumes; `Treatment` is the
//! flattened, IOB-ready record the normalizer produces (merged real boluses
//! plus synthetic micro-boluses).

use chrono::{DateTime, Utc};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", tag = "type"))]
#[derive(Debug, Clone, PartialEq)]
pub enum PumpEvent {
    Bolus { timestamp: DateTime<Utc>, units: f64 },
    TempBasal { timestamp: DateTime<Utc>, rate: f64 },
    TempBasalDuration { timestamp: DateTime<Utc>, minutes: f64 },
    PumpSuspend { timestamp: DateTime<Utc> },
    PumpResume { timestamp: DateTime<Utc> },
    Rewind { timestamp: DateTime<Utc> },
}

impl PumpEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PumpEvent::Bolus { timestamp, .. }
            | PumpEvent::TempBasal { timestamp, .. }
            | PumpEvent::TempBasalDuration { timestamp, .. }
            | PumpEvent::PumpSuspend { timestamp }
            | PumpEvent::PumpResume { timestamp }
            | PumpEvent::Rewind { timestamp } => *timestamp,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarbEntry {
    pub timestamp: DateTime<Utc>,
    pub carbs: f64,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fat: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub protein: Option<f64>,
}

/// Flattened treatment record consumed by the IOB generator: a real bolus,
/// a synthetic micro-bolus produced by the pump-history normalizer, or a
/// basal-equivalent chunk tagged via `rate`/`duration`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Treatment {
    pub date: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub insulin: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub carbs: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ns_carbs: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bw_carbs: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub journal_carbs: f64,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub rate: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub duration: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_temp_bolus: bool,
    #[cfg_attr(feature = "serde", serde(rename = "eventType", default))]
    pub event_type: String,
}

impl Treatment {
    pub fn bolus(date: DateTime<Utc>, insulin: f64) -> Self {
        Self {
            date,
            insulin,
            carbs: 0.0,
            ns_carbs: 0.0,
            bw_carbs: 0.0,
            journal_carbs: 0.0,
            rate: None,
            duration: None,
            is_temp_bolus: false,
            event_type: "Bolus".to_string(),
        }
    }

    pub fn synthetic_micro_bolus(date: DateTime<Utc>, insulin: f64) -> Self {
        Self {
            date,
            insulin,
            carbs: 0.0,
            ns_carbs: 0.0,
            bw_carbs: 0.0,
            journal_carbs: 0.0,
            rate: None,
            duration: None,
            is_temp_bolus: true,
            event_type: "Temp Basal".to_string(),
        }
    }

    pub fn carbs(date: DateTime<Utc>, carbs: f64) -> Self {
        Self {
            date,
            insulin: 0.0,
            carbs,
            ns_carbs: carbs,
            bw_carbs: 0.0,
            journal_carbs: 0.0,
            rate: None,
            duration: None,
            is_temp_bolus: false,
            event_type: "Carb Correction".to_string(),
        }
    }

    pub fn is_bolus(&self) -> bool {
        self.insulin > 0.0 && !self.is_temp_bolus
    }

    pub fn has_carbs(&self) -> bool {
        self.carbs > 0.0
    }

    pub fn effective_date(&self) -> DateTime<Utc> {
        self.date
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentTemp {
    pub duration: f64,
    pub rate: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub temp: TempKind,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempKind {
    #[default]
    Absolute,
    Percent,
}

impl CurrentTemp {
    pub fn absolute(rate: f64, duration: f64) -> Self {
        Self { duration, rate, temp: TempKind::Absolute }
    }

    pub fn none() -> Self {
        Self { duration: 0.0, rate: 0.0, temp: TempKind::Absolute }
    }

    pub fn is_active(&self) -> bool {
        self.duration > 0.0
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct TempTarget {
    pub created_at: DateTime<Utc>,
    pub duration: f64,
    pub target_bottom: f64,
    pub target_top: f64,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub reason: Option<String>,
}

impl TempTarget {
    pub fn midpoint(&self) -> f64 {
        (self.target_bottom + self.target_top) / 2.0
    }

    pub fn is_high(&self) -> bool {
        self.midpoint() > 100.0
    }

    pub fn is_low(&self) -> bool {
        self.midpoint() < 100.0
    }

    pub fn is_cancelled(&self, now: DateTime<Utc>) -> bool {
        now > self.created_at + chrono::Duration::minutes(self.duration as i64)
    }
}
