//! Continuous-glucose-monitor readings and the derived `GlucoseStatus`
//! (delta/short/long average delta) fed to every downstream engine.

use chrono::{DateTime, Utc};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct GlucoseReading {
    pub glucose: f64,
    pub date: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub date_string: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub display_time: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub noise: Option<f64>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub direction: Option<String>,
}

impl GlucoseReading {
    pub fn new(glucose: f64, date: DateTime<Utc>) -> Self {
        Self {
            glucose,
            date,
            date_string: None,
            display_time: None,
            noise: None,
            direction: None,
        }
    }

    /// Readings below 39 mg/dL are sensor-failure floor values, not real BG;
    /// bucketing and deviation math both skip them.
    pub fn is_valid(&self) -> bool {
        self.glucose >= 39.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseTrend {
    RisingFast,
    Rising,
    Flat,
    Falling,
    FallingFast,
}

impl GlucoseTrend {
    pub fn arrow(self) -> &'static str {
        match self {
            GlucoseTrend::RisingFast => "⇈",
            GlucoseTrend::Rising => "↑",
            GlucoseTrend::Flat => "→",
            GlucoseTrend::Falling => "↓",
            GlucoseTrend::FallingFast => "⇊",
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct GlucoseStatus {
    pub glucose: f64,
    pub delta: f64,
    pub short_avgdelta: f64,
    pub long_avgdelta: f64,
    pub date: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub noise: Option<f64>,
}

impl GlucoseStatus {
    /// `readings` must be sorted most-recent-first. Delta uses the most
    /// recent 5-minute pair; short/long averages span the next 15 and 45
    /// minutes respectively, matching the reference's fixed-index windows.
    pub fn from_readings(readings: &[GlucoseReading]) -> Option<Self> {
        let first = readings.first()?;
        if readings.len() < 2 {
            return Some(Self {
                glucose: first.glucose,
                delta: 0.0,
                short_avgdelta: 0.0,
                long_avgdelta: 0.0,
                date: first.date,
                noise: first.noise,
            });
        }
        let delta = first.glucose - readings[1].glucose;
        let short_avgdelta = avg_delta(readings, 3);
        let long_avgdelta = avg_delta(readings, 10);
        Some(Self {
            glucose: first.glucose,
            delta,
            short_avgdelta,
            long_avgdelta,
            date: first.date,
            noise: first.noise,
        })
    }

    pub fn trend(&self) -> GlucoseTrend {
        match self.delta {
            d if d >= 10.0 => GlucoseTrend::RisingFast,
            d if d >= 3.0 => GlucoseTrend::Rising,
            d if d <= -10.0 => GlucoseTrend::FallingFast,
            d if d <= -3.0 => GlucoseTrend::Falling,
            _ => GlucoseTrend::Flat,
        }
    }
}

fn avg_delta(readings: &[GlucoseReading], span: usize) -> f64 {
    if readings.len() <= span {
        return 0.0;
    }
    (readings[0].glucose - readings[span].glucose) / span as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(g: f64, mins_ago: i64) -> GlucoseReading {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        GlucoseReading::new(g, base - chrono::Duration::minutes(mins_ago))
    }

    #[test]
    fn status_from_readings_computes_deltas() {
        let readings = vec![
            reading(110.0, 0),
            reading(108.0, 5),
            reading(106.0, 10),
            reading(104.0, 15),
        ];
        let status = GlucoseStatus::from_readings(&readings).unwrap();
        assert_eq!(status.delta, 2.0);
    }

    #[test]
    fn valid_floor() {
        assert!(!reading(38.0, 0).is_valid());
        assert!(reading(39.0, 0).is_valid());
    }
}
