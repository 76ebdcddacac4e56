//! IOB/activity contribution per treatment (spec §4.4).
//!
//! The reference exponential model is the only supported curve at runtime;
//! the legacy bilinear model is recognized (for profile round-tripping) but
//! rejected with [`OrefError::BilinearCurveNotSupported`] rather than
//! computed, matching the error taxonomy in spec §7 — this engine never
//! silently falls back to an approximate triangular curve.

use crate::error::OrefError;
use crate::insulin::InsulinCurve;
use crate::types::IOBContrib;

pub struct BilinearCurve;

pub struct ExponentialCurve;

impl ExponentialCurve {
    /// `insulin` at time `b`, evaluated `mins` minutes later. `dia_hours`
    /// has already had the 5h floor applied by the caller.
    pub fn calculate(insulin: f64, mins: f64, dia_hours: f64, peak: f64) -> IOBContrib {
        let end = dia_hours * 60.0;
        if mins >= end || mins < 0.0 {
            return IOBContrib::default();
        }
        let tau = peak * (1.0 - peak / end) / (1.0 - 2.0 * peak / end);
        let a = 2.0 * tau / end;
        let s = 1.0 / (1.0 - a + (1.0 + a) * (-end / tau).exp());

        let activity_contrib = insulin * (s / tau.powi(2)) * mins * (1.0 - mins / end) * (-mins / tau).exp();
        let iob_contrib = insulin
            * (1.0
                - s * (1.0 - a)
                    * ((mins.powi(2) / (tau * end * (1.0 - a)) - mins / tau - 1.0) * (-mins / tau).exp() + 1.0));

        IOBContrib { iob_contrib, activity_contrib }
    }
}

/// Dispatch on the configured curve. `dia_hours` should already be the
/// profile's effective (≥5h) DIA.
pub fn calculate_iob_contrib(
    curve: InsulinCurve,
    insulin: f64,
    mins: f64,
    dia_hours: f64,
    peak: f64,
) -> Result<IOBContrib, OrefError> {
    match curve {
        InsulinCurve::Bilinear => Err(OrefError::BilinearCurveNotSupported),
        InsulinCurve::RapidActing | InsulinCurve::UltraRapid => {
            Ok(ExponentialCurve::calculate(insulin, mins, dia_hours, peak))
        }
    }
}
