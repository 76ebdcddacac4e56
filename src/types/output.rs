//! The engine's output type and the stable wire shape from spec.md §6.

use chrono::{DateTime, Utc};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredBgs {
    #[cfg_attr(feature = "serde", serde(rename = "IOB"))]
    pub iob: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "ZT"))]
    pub zt: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "COB", skip_serializing_if = "Option::is_none"))]
    pub cob: Option<Vec<f64>>,
    #[cfg_attr(feature = "serde", serde(rename = "UAM", skip_serializing_if = "Option::is_none"))]
    pub uam: Option<Vec<f64>>,
}

/// One tick's dosing decision. Every path — error, temp basal, SMB, or
/// no-action — goes through one of the constructors below so `reason` and
/// the safety-relevant fields are always populated together.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Determination {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub rate: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub duration: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub units: Option<f64>,

    pub eventual_bg: f64,
    pub sensitivity_ratio: f64,
    pub iob: f64,
    pub cob: f64,
    pub pred_bgs: PredBgs,
    pub reason: String,
    pub deliver_at: DateTime<Utc>,
    pub carbs_req: f64,
    pub bg: f64,
    pub isf: f64,
    pub timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub tdd: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "current_target"))]
    pub current_target: f64,
    pub min_delta: f64,
    pub expected_delta: f64,
    pub min_guard_bg: f64,
    pub min_pred_bg: f64,
    pub threshold: f64,
    pub carb_ratio: f64,
    pub received: bool,

    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
}

impl Determination {
    pub fn error(reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            rate: None,
            duration: None,
            units: None,
            eventual_bg: 0.0,
            sensitivity_ratio: 1.0,
            iob: 0.0,
            cob: 0.0,
            pred_bgs: PredBgs::default(),
            reason: reason.into(),
            deliver_at: now,
            carbs_req: 0.0,
            bg: 0.0,
            isf: 0.0,
            timestamp: now,
            tdd: None,
            current_target: 0.0,
            min_delta: 0.0,
            expected_delta: 0.0,
            min_guard_bg: 0.0,
            min_pred_bg: 0.0,
            threshold: 0.0,
            carb_ratio: 0.0,
            received: false,
            error: Some("determination error".to_string()),
        }
    }

    pub fn temp_basal(rate: f64, duration: f64, reason: String, now: DateTime<Utc>) -> Self {
        Self {
            rate: Some(rate),
            duration: Some(duration),
            units: None,
            reason,
            deliver_at: now,
            timestamp: now,
            ..Self::blank(now)
        }
    }

    pub fn smb(units: f64, rate: Option<f64>, duration: Option<f64>, reason: String, now: DateTime<Utc>) -> Self {
        Self {
            rate,
            duration,
            units: Some(units),
            reason,
            deliver_at: now,
            timestamp: now,
            ..Self::blank(now)
        }
    }

    pub fn no_action(reason: String, now: DateTime<Utc>) -> Self {
        Self {
            reason,
            deliver_at: now,
            timestamp: now,
            ..Self::blank(now)
        }
    }

    fn blank(now: DateTime<Utc>) -> Self {
        Self {
            rate: None,
            duration: None,
            units: None,
            eventual_bg: 0.0,
            sensitivity_ratio: 1.0,
            iob: 0.0,
            cob: 0.0,
            pred_bgs: PredBgs::default(),
            reason: String::new(),
            deliver_at: now,
            carbs_req: 0.0,
            bg: 0.0,
            isf: 0.0,
            timestamp: now,
            tdd: None,
            current_target: 0.0,
            min_delta: 0.0,
            expected_delta: 0.0,
            min_guard_bg: 0.0,
            min_pred_bg: 0.0,
            threshold: 0.0,
            carb_ratio: 0.0,
            received: false,
            error: None,
        }
    }

    pub fn has_smb(&self) -> bool {
        self.units.map(|u| u > 0.0).unwrap_or(false)
    }

    pub fn has_temp(&self) -> bool {
        self.rate.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Companion temp-basal recommendation shape used by the temp-basal helper
/// and SMB's companion low-temp calculation before it is folded into a
/// `Determination`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempBasalRecommendation {
    pub rate: f64,
    pub duration: f64,
}

impl TempBasalRecommendation {
    pub fn new(rate: f64, duration: f64) -> Self {
        Self { rate, duration }
    }

    pub fn zero() -> Self {
        Self { rate: 0.0, duration: 0.0 }
    }
}
