//! Error taxonomy for the engine, grouped the way the orchestrator funnels
//! them: missing inputs abort before any determination is produced,
//! out-of-range inputs are handled inside Stage 0 as a safe-side
//! determination, and malformed history/calendar/internal errors are fatal
//! to the tick but never panic.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrefError {
    // --- Input-missing: surfaced immediately, no determination produced ---
    #[error("missing glucose status")]
    MissingGlucoseStatus,
    #[error("missing profile")]
    MissingProfile,
    #[error("missing IOB data")]
    MissingIob,
    #[error("missing required inputs: {0}")]
    MissingInputs(String),
    #[error("invalid profile target")]
    InvalidProfileTarget,

    // --- Input-out-of-range: handled in Stage 0, not necessarily fatal ---
    #[error("glucose out of range: {0}")]
    GlucoseOutOfRange(f64),
    #[error("CGM noise too high: {0}")]
    CgmNoiseTooHigh(f64),
    #[error("no delta available for glucose status")]
    NoDelta,

    // --- History-malformed: fatal to this tick, carries the offending timestamp ---
    #[error("temp basal duration mismatch at {0}")]
    TempBasalDurationMismatch(DateTime<Utc>),
    #[error("temp basal missing duration at {0}")]
    TempBasalMissingDuration(DateTime<Utc>),
    #[error("pump suspend/resume mismatch at {0}")]
    PumpSuspendResumeMismatch(DateTime<Utc>),
    #[error("basal rate not set")]
    BasalRateNotSet,
    #[error("rate not set on temp basal at {0}")]
    RateNotSetOnTempBasal(DateTime<Utc>),
    #[error("DIA not set on profile")]
    DiaNotSet,
    #[error("bilinear curve not supported in this context")]
    BilinearCurveNotSupported,

    // --- Calendar: fatal ---
    #[error("invalid calendar computation")]
    InvalidCalendar,
    #[error("invalid calendar: hour-only computation failed")]
    InvalidCalendarHourOnly,

    // --- Internal: fatal ---
    #[error("eventual glucose calculation error: {0}")]
    EventualGlucoseCalculationError(String),
    #[error("determination error: {0}")]
    DeterminationError(String),

    // --- Legacy/general-purpose variants kept for accessor-level failures ---
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error("invalid treatment: {0}")]
    InvalidTreatment(String),
    #[error("invalid glucose reading: {0}")]
    InvalidGlucose(String),
    #[error("calculation error: {0}")]
    CalculationError(String),
    #[error("missing data: {0}")]
    MissingData(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("value for {field} out of range: {value} (expected [{min}, {max}])")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OrefError {
    pub fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::OutOfRange { field, value, min, max }
    }

    /// True for the Input-missing / Calendar / Internal / History-malformed
    /// groups, which abort the tick with no `Determination` at all.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            OrefError::GlucoseOutOfRange(_) | OrefError::CgmNoiseTooHigh(_) | OrefError::NoDelta
        )
    }
}
