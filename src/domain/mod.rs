/// Domain models for the application
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::utils::grid_longitude;

/// A configured viewing site. Loaded once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Minimum Kp for any visibility overhead or on the horizon
    pub kp_visible: f64,
    /// Kp for a strong display
    pub kp_good: f64,
    pub tips: String,
}

/// One row of the 3-hour planetary Kp table
#[derive(Debug, Clone, PartialEq)]
pub struct KpForecastPoint {
    pub time: DateTime<Utc>,
    pub kp: f64,
    pub observed: bool,
    pub noaa_scale: Option<String>,
}

/// Latest 1-minute planetary Kp sample
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeKp {
    pub time: DateTime<Utc>,
    pub kp: Option<f64>,
    pub estimated_kp: Option<f64>,
}

impl RealtimeKp {
    /// Estimated Kp is continuous, the raw index is integral
    pub fn value(&self) -> Option<f64> {
        self.estimated_kp.or(self.kp)
    }
}

/// Everything known about geomagnetic activity for one run
#[derive(Debug, Clone, Default)]
pub struct GeomagneticSnapshot {
    pub current: Option<RealtimeKp>,
    pub forecast: Vec<KpForecastPoint>,
}

impl GeomagneticSnapshot {
    /// Current index, 0 when the real-time feed is absent
    pub fn current_index(&self) -> f64 {
        self.current.as_ref().and_then(RealtimeKp::value).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarWindReading {
    pub time: DateTime<Utc>,
    /// Bz (GSM), nT. Negative is southward.
    pub bz: f64,
    pub bt: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvationPoint {
    pub lon: i32,
    pub lat: i32,
    pub probability: f64,
}

/// Nearest-sample result of an OVATION lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvationMatch {
    pub probability: f64,
    /// Manhattan distance in grid degrees
    pub distance: i32,
}

#[derive(Debug, Clone, Default)]
pub struct OvationGrid {
    pub observation_time: Option<DateTime<Utc>>,
    pub forecast_time: Option<DateTime<Utc>>,
    pub coordinates: Vec<OvationPoint>,
}

impl OvationGrid {
    /// Nearest grid sample to (lat, lon); longitude is normalized to [0, 360).
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<OvationMatch> {
        let norm_lon = grid_longitude(lon);
        let norm_lat = lat.round() as i32;

        let mut best: Option<OvationMatch> = None;
        for point in &self.coordinates {
            let distance = (point.lon - norm_lon).abs() + (point.lat - norm_lat).abs();
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(OvationMatch {
                    probability: point.probability,
                    distance,
                });
                if distance == 0 {
                    break;
                }
            }
        }
        best
    }

    /// Probability at the nearest grid sample, 0 for an empty grid
    pub fn probability_at(&self, lat: f64, lon: f64) -> f64 {
        self.nearest(lat, lon).map_or(0.0, |m| m.probability)
    }
}

/// NWS forecast office grid cell for a coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub office: String,
    pub grid_x: i64,
    pub grid_y: i64,
}

/// One hourly period of an NWS forecast
#[derive(Debug, Clone, PartialEq)]
pub struct CloudSample {
    pub start_time: DateTime<FixedOffset>,
    /// Local hour at the forecast site, e.g. "6 PM"
    pub hour_label: String,
    pub sky_cover: Option<f64>,
    pub short_forecast: String,
    pub temperature: Option<f64>,
    pub wind_speed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub hour: String,
    pub cover: f64,
    pub temperature: Option<f64>,
    pub wind_speed: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAnalysis {
    pub current: Option<f64>,
    #[serde(rename = "min6h")]
    pub min_6h: Option<f64>,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DarknessWindow {
    pub is_dark: bool,
    pub darkness_start: Option<DateTime<Utc>>,
    pub darkness_end: Option<DateTime<Utc>>,
    pub hours_of_darkness: f64,
    pub sun_altitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoonPhase {
    #[serde(rename = "New Moon")]
    New,
    #[serde(rename = "Waxing Crescent")]
    WaxingCrescent,
    #[serde(rename = "First Quarter")]
    FirstQuarter,
    #[serde(rename = "Waxing Gibbous")]
    WaxingGibbous,
    #[serde(rename = "Full Moon")]
    Full,
    #[serde(rename = "Waning Gibbous")]
    WaningGibbous,
    #[serde(rename = "Last Quarter")]
    LastQuarter,
    #[serde(rename = "Waning Crescent")]
    WaningCrescent,
}

impl MoonPhase {
    pub fn name(self) -> &'static str {
        match self {
            MoonPhase::New => "New Moon",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::Full => "Full Moon",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoonState {
    /// 0 new, 0.25 first quarter, 0.5 full, 0.75 last quarter
    pub phase: f64,
    pub phase_name: MoonPhase,
    pub illumination: f64,
    pub above_horizon: bool,
    pub altitude: f64,
    pub rise: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubScore {
    pub score: u8,
    pub weight: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub kp: SubScore,
    pub cloud: SubScore,
    pub darkness: SubScore,
    pub moon: SubScore,
    pub bz: SubScore,
    pub ovation: SubScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Great,
    Possible,
    ActiveButCloudy,
    Unlikely,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::Great => "Great",
            Rating::Possible => "Possible",
            Rating::ActiveButCloudy => "Active but Cloudy",
            Rating::Unlikely => "Unlikely",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Rating::Great => "#22c55e",
            Rating::Possible => "#eab308",
            Rating::ActiveButCloudy => "#f97316",
            Rating::Unlikely => "#ef4444",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Rating::Great => "🟢",
            Rating::Possible => "🟡",
            Rating::ActiveButCloudy => "🟠",
            Rating::Unlikely => "🔴",
        }
    }
}

/// Output of the scoring engine for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub composite: u8,
    pub breakdown: ScoreBreakdown,
    pub rating: Rating,
    pub reason: &'static str,
}

/// Per-location output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResult {
    pub location: Location,
    pub score: u8,
    pub rating: Rating,
    pub label: &'static str,
    pub color: &'static str,
    pub emoji: &'static str,
    pub reason: &'static str,
    pub summary: String,
    pub breakdown: ScoreBreakdown,
    pub current_index: f64,
    pub clouds: CloudAnalysis,
    pub darkness: DarknessWindow,
    pub moon: MoonState,
    pub bz: Option<f64>,
    pub ovation_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KpPointKind {
    Observed,
    Forecast,
}

/// Kp chart entry in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpChartPoint {
    pub time: DateTime<Utc>,
    pub kp: f64,
    #[serde(rename = "type")]
    pub kind: KpPointKind,
    pub noaa_scale: Option<String>,
}

impl From<&KpForecastPoint> for KpChartPoint {
    fn from(p: &KpForecastPoint) -> Self {
        Self {
            time: p.time,
            kp: p.kp,
            kind: if p.observed {
                KpPointKind::Observed
            } else {
                KpPointKind::Forecast
            },
            noaa_scale: p.noaa_scale.clone(),
        }
    }
}

/// Full result of one orchestration run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuroraSnapshot {
    pub generated_at: DateTime<Utc>,
    pub current_index: f64,
    pub index_time: Option<DateTime<Utc>>,
    pub current_bz: Option<f64>,
    /// Total IMF magnitude from the same sample as `current_bz`
    pub current_bt: Option<f64>,
    pub bz_time: Option<DateTime<Utc>>,
    pub ovation_time: Option<DateTime<Utc>>,
    pub per_location: BTreeMap<String, LocationResult>,
    pub index_forecast: Vec<KpChartPoint>,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(points: &[(i32, i32, f64)]) -> OvationGrid {
        OvationGrid {
            coordinates: points
                .iter()
                .map(|&(lon, lat, probability)| OvationPoint {
                    lon,
                    lat,
                    probability,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ovation_exact_match_has_zero_distance() {
        let g = grid(&[(211, 64, 5.0), (212, 65, 9.0), (212, 64, 27.0)]);
        let m = g.nearest(64.2, -147.7).unwrap();
        assert_eq!(m.distance, 0);
        assert_eq!(m.probability, 27.0);
    }

    #[test]
    fn test_ovation_nearest_when_no_exact_match() {
        let g = grid(&[(200, 60, 3.0), (212, 66, 14.0)]);
        let m = g.nearest(64.8, -147.7).unwrap();
        assert_eq!(m.probability, 14.0);
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn test_ovation_empty_grid_returns_zero() {
        let g = OvationGrid::default();
        assert!(g.nearest(64.8, -147.7).is_none());
        assert_eq!(g.probability_at(64.8, -147.7), 0.0);
    }

    #[test]
    fn test_realtime_kp_prefers_estimate() {
        let sample = RealtimeKp {
            time: Utc::now(),
            kp: Some(3.0),
            estimated_kp: Some(3.33),
        };
        assert_eq!(sample.value(), Some(3.33));

        let raw_only = RealtimeKp {
            estimated_kp: None,
            ..sample
        };
        assert_eq!(raw_only.value(), Some(3.0));
    }

    #[test]
    fn test_absent_geomagnetic_snapshot_reads_zero() {
        assert_eq!(GeomagneticSnapshot::default().current_index(), 0.0);
    }

    #[test]
    fn test_rating_serializes_snake_case() {
        let json = serde_json::to_value(Rating::ActiveButCloudy).unwrap();
        assert_eq!(json, serde_json::json!("active_but_cloudy"));
        assert_eq!(Rating::ActiveButCloudy.label(), "Active but Cloudy");
    }
}
