//! Supported insulin activity curve models.

use std::fmt;
use std::str::FromStr;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsulinCurve {
    /// Legacy triangular model; does not accept a custom peak time.
    Bilinear,
    #[default]
    RapidActing,
    UltraRapid,
}

impl InsulinCurve {
    pub fn default_peak(&self) -> f64 {
        match self {
            InsulinCurve::Bilinear => 75.0,
            InsulinCurve::RapidActing => 75.0,
            InsulinCurve::UltraRapid => 55.0,
        }
    }

    pub fn min_dia(&self) -> f64 {
        5.0
    }

    pub fn min_peak(&self) -> f64 {
        match self {
            InsulinCurve::UltraRapid => 50.0,
            _ => 65.0,
        }
    }

    pub fn max_peak(&self) -> f64 {
        match self {
            InsulinCurve::UltraRapid => 75.0,
            _ => 120.0,
        }
    }

    pub fn requires_long_dia(&self) -> bool {
        matches!(self, InsulinCurve::Bilinear)
    }

    pub fn effective_dia(&self, dia: f64) -> f64 {
        dia.max(self.min_dia())
    }

    pub fn effective_peak(&self, custom_peak: Option<f64>, use_custom: bool) -> f64 {
        if use_custom {
            if let Some(p) = custom_peak {
                return p.clamp(self.min_peak(), self.max_peak());
            }
        }
        self.default_peak()
    }
}

impl fmt::Display for InsulinCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InsulinCurve::Bilinear => "bilinear",
            InsulinCurve::RapidActing => "rapid-acting",
            InsulinCurve::UltraRapid => "ultra-rapid",
        };
        write!(f, "{s}")
    }
}

impl FromStr for InsulinCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', ' '], "-").as_str() {
            "bilinear" => Ok(InsulinCurve::Bilinear),
            "rapid-acting" | "rapidacting" | "rapid" => Ok(InsulinCurve::RapidActing),
            "ultra-rapid" | "ultrarapid" | "ultra" => Ok(InsulinCurve::UltraRapid),
            other => Err(format!("unknown insulin curve: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_variants() {
        assert_eq!("rapid-acting".parse::<InsulinCurve>().unwrap(), InsulinCurve::RapidActing);
        assert_eq!("ultra_rapid".parse::<InsulinCurve>().unwrap(), InsulinCurve::UltraRapid);
        assert_eq!("Bilinear".parse::<InsulinCurve>().unwrap(), InsulinCurve::Bilinear);
    }

    #[test]
    fn rejects_unknown() {
        assert!("made-up".parse::<InsulinCurve>().is_err());
    }

    #[test]
    fn default_peaks_match_spec() {
        assert_eq!(InsulinCurve::RapidActing.default_peak(), 75.0);
        assert_eq!(InsulinCurve::UltraRapid.default_peak(), 55.0);
    }
}
