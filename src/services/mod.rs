/// Business logic services layer
///
/// `AuroraService::compute_snapshot` runs the two fetch tiers and assembles
/// the result. Every upstream failure is logged here and replaced by its
/// absent value, so a snapshot is always complete.
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::astronomy;
use crate::clients::{NoaaClient, NwsClient};
use crate::clouds;
use crate::domain::{
    AuroraSnapshot, CloudSample, GeomagneticSnapshot, KpChartPoint, Location, LocationResult,
    OvationGrid, SolarWindReading,
};
use crate::errors::SourceResult;
use crate::scoring::{self, Signals};
use crate::summary;
use crate::utils::round1;

/// Forecast points kept in the snapshot
pub const INDEX_FORECAST_POINTS: usize = 24;

/// Location-independent signals, fetched once per run
#[derive(Debug, Clone, Default)]
pub struct SharedSignals {
    pub geomagnetic: GeomagneticSnapshot,
    pub solar_wind: Option<SolarWindReading>,
    pub ovation: Option<OvationGrid>,
}

fn or_absent<T>(result: SourceResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(feed = %e.feed(), error = %e, "source unavailable");
            None
        }
    }
}

/// Aurora snapshot orchestration service
pub struct AuroraService {
    noaa: NoaaClient,
    nws: NwsClient,
}

impl AuroraService {
    pub fn new(noaa: NoaaClient, nws: NwsClient) -> Self {
        Self { noaa, nws }
    }

    /// Tier 1: the four NOAA feeds, fetched concurrently
    pub async fn fetch_shared(&self) -> SharedSignals {
        let (forecast, current, ovation, solar_wind) = tokio::join!(
            self.noaa.fetch_kp_forecast(),
            self.noaa.fetch_current_kp(),
            self.noaa.fetch_ovation(),
            self.noaa.fetch_solar_wind(),
        );

        SharedSignals {
            geomagnetic: GeomagneticSnapshot {
                current: or_absent(current),
                forecast: or_absent(forecast).unwrap_or_default(),
            },
            solar_wind: or_absent(solar_wind),
            ovation: or_absent(ovation),
        }
    }

    /// Tier 2 for one location: its cloud forecast plus local computation
    async fn evaluate_location(
        &self,
        location: &Location,
        shared: &SharedSignals,
        now: DateTime<Utc>,
    ) -> LocationResult {
        let forecast = match self.nws.fetch_cloud_forecast(location.lat, location.lon).await {
            Ok(samples) => Some(samples),
            Err(e) => {
                warn!(
                    location = %location.id,
                    feed = %e.feed(),
                    error = %e,
                    "cloud forecast unavailable"
                );
                None
            }
        };
        assess_location(location, shared, forecast.as_deref(), now)
    }

    /// Full snapshot for `locations` at `now`
    pub async fn compute_snapshot(
        &self,
        locations: &[Location],
        now: DateTime<Utc>,
    ) -> AuroraSnapshot {
        let shared = self.fetch_shared().await;

        let results = join_all(
            locations
                .iter()
                .map(|location| self.evaluate_location(location, &shared, now)),
        )
        .await;

        let snapshot = assemble_snapshot(&shared, results, now);
        info!(
            locations = snapshot.per_location.len(),
            current_index = snapshot.current_index,
            forecast_points = snapshot.index_forecast.len(),
            ovation = shared.ovation.is_some(),
            solar_wind = shared.solar_wind.is_some(),
            "aurora snapshot computed"
        );
        snapshot
    }
}

/// Score one location from already fetched data. `forecast` is `None` when
/// the cloud feed was unavailable.
pub fn assess_location(
    location: &Location,
    shared: &SharedSignals,
    forecast: Option<&[CloudSample]>,
    now: DateTime<Utc>,
) -> LocationResult {
    let darkness = astronomy::darkness(location.lat, location.lon, now);
    let moon = astronomy::moon(location.lat, location.lon, now);
    let clouds = clouds::analyze(forecast);
    let current_kp = shared.geomagnetic.current_index();
    let bz = shared.solar_wind.as_ref().map(|w| w.bz);
    let ovation_probability = shared
        .ovation
        .as_ref()
        .map(|grid| grid.probability_at(location.lat, location.lon));

    let signals = Signals {
        location_name: &location.name,
        current_kp,
        kp_visible: location.kp_visible,
        kp_good: location.kp_good,
        cloud_cover_now: clouds.current,
        cloud_cover_min_6h: clouds.min_6h,
        is_dark: darkness.is_dark,
        sun_altitude: darkness.sun_altitude,
        moon: Some(&moon),
        bz,
        ovation_probability,
    };
    let result = scoring::score(&signals);
    let summary = summary::summarize(&signals, result.rating);

    LocationResult {
        location: location.clone(),
        score: result.composite,
        rating: result.rating,
        label: result.rating.label(),
        color: result.rating.color(),
        emoji: result.rating.emoji(),
        reason: result.reason,
        summary,
        breakdown: result.breakdown,
        current_index: round1(current_kp),
        clouds,
        darkness,
        moon,
        bz: bz.map(round1),
        ovation_probability: ovation_probability.unwrap_or(0.0),
    }
}

pub fn assemble_snapshot(
    shared: &SharedSignals,
    results: Vec<LocationResult>,
    now: DateTime<Utc>,
) -> AuroraSnapshot {
    let forecast = &shared.geomagnetic.forecast;
    let tail = forecast.len().saturating_sub(INDEX_FORECAST_POINTS);

    AuroraSnapshot {
        generated_at: now,
        current_index: round1(shared.geomagnetic.current_index()),
        index_time: shared.geomagnetic.current.as_ref().map(|k| k.time),
        current_bz: shared.solar_wind.as_ref().map(|w| round1(w.bz)),
        current_bt: shared
            .solar_wind
            .as_ref()
            .and_then(|w| w.bt)
            .map(round1),
        bz_time: shared.solar_wind.as_ref().map(|w| w.time),
        ovation_time: shared
            .ovation
            .as_ref()
            .and_then(|g| g.forecast_time.or(g.observation_time)),
        per_location: results
            .into_iter()
            .map(|r| (r.location.id.clone(), r))
            .collect::<BTreeMap<_, _>>(),
        index_forecast: forecast[tail..].iter().map(KpChartPoint::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{KpForecastPoint, OvationPoint, Rating, RealtimeKp};
    use crate::locations::builtin_locations;
    use chrono::{Duration, TimeZone};

    fn winter_midnight() -> DateTime<Utc> {
        // 00:00 AKST
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn fairbanks() -> Location {
        builtin_locations()
            .into_iter()
            .find(|l| l.id == "fairbanks")
            .unwrap()
    }

    #[test]
    fn test_absent_shared_signals_use_neutral_defaults() {
        let result = assess_location(
            &fairbanks(),
            &SharedSignals::default(),
            None,
            winter_midnight(),
        );
        assert_eq!(result.current_index, 0.0);
        assert_eq!(result.bz, None);
        assert_eq!(result.ovation_probability, 0.0);
        assert_eq!(result.clouds.current, None);
        assert_eq!(result.breakdown.bz.score, 30);
        assert_eq!(result.breakdown.cloud.score, 50);
        assert_eq!(result.breakdown.kp.score, 0);
        // dark and neutral everywhere else lands in the 30-49 band
        assert_eq!(result.rating, Rating::ActiveButCloudy);
        assert!((30..50).contains(&result.score));
        assert!(result.darkness.is_dark);
    }

    #[test]
    fn test_active_clear_night_rates_great() {
        let now = winter_midnight();
        let shared = SharedSignals {
            geomagnetic: GeomagneticSnapshot {
                current: Some(RealtimeKp {
                    time: now,
                    kp: Some(5.0),
                    estimated_kp: Some(5.33),
                }),
                forecast: Vec::new(),
            },
            solar_wind: Some(SolarWindReading {
                time: now,
                bz: -12.04,
                bt: Some(14.0),
            }),
            ovation: Some(OvationGrid {
                observation_time: None,
                forecast_time: Some(now),
                coordinates: vec![OvationPoint {
                    lon: 212,
                    lat: 65,
                    probability: 60.0,
                }],
            }),
        };
        let clear: Vec<_> = (0..8)
            .map(|h| CloudSample {
                start_time: (now + Duration::hours(h)).fixed_offset(),
                hour_label: String::new(),
                sky_cover: Some(5.0),
                short_forecast: "Clear".to_string(),
                temperature: None,
                wind_speed: None,
            })
            .collect();

        let result = assess_location(&fairbanks(), &shared, Some(clear.as_slice()), now);
        assert_eq!(result.current_index, 5.3);
        assert_eq!(result.bz, Some(-12.0));
        assert_eq!(result.ovation_probability, 60.0);
        assert_eq!(result.breakdown.kp.score, 100);
        assert_eq!(result.breakdown.cloud.score, 100);
        assert_eq!(result.rating, Rating::Great);
        assert!(result.summary.starts_with("Excellent conditions tonight."));
    }

    #[test]
    fn test_snapshot_keeps_last_24_forecast_points() {
        let now = winter_midnight();
        let forecast: Vec<_> = (0..30)
            .map(|i| KpForecastPoint {
                time: now + Duration::hours(3 * i),
                kp: i as f64 / 10.0,
                observed: i < 10,
                noaa_scale: None,
            })
            .collect();
        let shared = SharedSignals {
            geomagnetic: GeomagneticSnapshot {
                current: None,
                forecast,
            },
            ..Default::default()
        };

        let snapshot = assemble_snapshot(&shared, Vec::new(), now);
        assert_eq!(snapshot.index_forecast.len(), INDEX_FORECAST_POINTS);
        assert_eq!(snapshot.index_forecast[0].kp, 0.6);
        assert_eq!(snapshot.index_time, None);
        assert_eq!(snapshot.current_bz, None);
        assert_eq!(snapshot.current_bt, None);
        assert_eq!(snapshot.ovation_time, None);
    }

    #[test]
    fn test_snapshot_indexes_results_by_location_id() {
        let now = winter_midnight();
        let shared = SharedSignals::default();
        let results = builtin_locations()
            .iter()
            .map(|l| assess_location(l, &shared, None, now))
            .collect();

        let snapshot = assemble_snapshot(&shared, results, now);
        assert_eq!(snapshot.per_location.len(), 6);
        assert_eq!(snapshot.per_location["juneau"].location.name, "Juneau");
        assert!(snapshot.index_forecast.is_empty());
    }

    #[test]
    fn test_snapshot_keys_use_index_vocabulary() {
        let now = winter_midnight();
        let shared = SharedSignals {
            solar_wind: Some(SolarWindReading {
                time: now,
                bz: -3.46,
                bt: Some(5.04),
            }),
            ..Default::default()
        };
        let results = vec![assess_location(&fairbanks(), &shared, None, now)];
        let json = serde_json::to_value(assemble_snapshot(&shared, results, now)).unwrap();

        for key in [
            "generatedAt",
            "currentIndex",
            "indexTime",
            "currentBz",
            "currentBt",
            "bzTime",
            "ovationTime",
            "perLocation",
            "indexForecast",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("currentKp").is_none());
        assert!(json.get("kpForecast").is_none());
        assert_eq!(json["currentBz"], -3.5);
        assert_eq!(json["currentBt"], 5.0);
        assert_eq!(json["perLocation"]["fairbanks"]["currentIndex"], 0.0);
    }
}
