/// External API clients module
///
/// `NoaaClient` covers the SWPC space weather products, `NwsClient` the
/// National Weather Service hourly forecast. Each fetch returns a typed value
/// or a `SourceError`; nothing here decides what an absent feed means.
use chrono::DateTime;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::domain::{
    CloudSample, GridPoint, KpForecastPoint, OvationGrid, OvationPoint, RealtimeKp,
    SolarWindReading,
};
use crate::errors::{Feed, MalformedSample, SourceError, SourceResult};
use crate::utils::{num, parse_timestamp, t_pick};

/// Solar wind table columns: time_tag, bx_gsm, by_gsm, bz_gsm, lon_gsm, lat_gsm, bt
const BZ_COLUMN: usize = 3;
const BT_COLUMN: usize = 6;
/// Hourly periods kept from an NWS forecast
const FORECAST_PERIODS: usize = 12;

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// GET a URL and decode its JSON body
    pub async fn get_json(&self, feed: Feed, url: &str, accept: &str) -> SourceResult<Value> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|error| SourceError::Transport { feed, error })?;

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                feed,
                status: resp.status().as_u16(),
            });
        }

        resp.json().await.map_err(|e| SourceError::Decode {
            feed,
            reason: e.to_string(),
        })
    }
}

/// NOAA Space Weather Prediction Center client
pub struct NoaaClient {
    http_client: HttpClient,
    base_url: String,
}

impl NoaaClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            base_url: config.noaa_base_url.clone(),
        })
    }

    async fn get(&self, feed: Feed, path: &str) -> SourceResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        self.http_client
            .get_json(feed, &url, "application/json")
            .await
    }

    /// 3-hour Kp, observed and predicted
    pub async fn fetch_kp_forecast(&self) -> SourceResult<Vec<KpForecastPoint>> {
        let json = self
            .get(
                Feed::KpForecast,
                "/products/noaa-planetary-k-index-forecast.json",
            )
            .await?;
        parse_kp_forecast(&json)
    }

    /// Latest 1-minute Kp
    pub async fn fetch_current_kp(&self) -> SourceResult<RealtimeKp> {
        let json = self
            .get(Feed::KpRealtime, "/json/planetary_k_index_1m.json")
            .await?;
        parse_current_kp(&json)
    }

    /// OVATION aurora probability grid
    pub async fn fetch_ovation(&self) -> SourceResult<OvationGrid> {
        let json = self
            .get(Feed::Ovation, "/json/ovation_aurora_latest.json")
            .await?;
        parse_ovation(&json)
    }

    /// Most recent valid IMF reading from the 2-hour magnetometer table
    pub async fn fetch_solar_wind(&self) -> SourceResult<SolarWindReading> {
        let json = self
            .get(Feed::SolarWind, "/products/solar-wind/mag-2-hour.json")
            .await?;
        parse_solar_wind(&json)
    }
}

struct CachedForecast {
    fetched_at: Instant,
    samples: Vec<CloudSample>,
}

/// National Weather Service client.
///
/// Grid lookups never change for a coordinate and are kept for the life of
/// the process. Hourly forecasts are reused until `forecast_ttl` passes.
pub struct NwsClient {
    http_client: HttpClient,
    base_url: String,
    forecast_ttl: std::time::Duration,
    grid_cache: RwLock<HashMap<String, GridPoint>>,
    forecast_cache: RwLock<HashMap<GridPoint, CachedForecast>>,
}

impl NwsClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            base_url: config.nws_base_url.clone(),
            forecast_ttl: config.forecast_ttl,
            grid_cache: RwLock::new(HashMap::new()),
            forecast_cache: RwLock::new(HashMap::new()),
        })
    }

    async fn get(&self, feed: Feed, path: &str) -> SourceResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        self.http_client
            .get_json(feed, &url, "application/geo+json")
            .await
    }

    /// Forecast office grid cell for a coordinate
    pub async fn lookup_grid(&self, lat: f64, lon: f64) -> SourceResult<GridPoint> {
        let key = format!("{lat},{lon}");
        if let Some(grid) = self.grid_cache.read().await.get(&key) {
            return Ok(grid.clone());
        }

        let json = self
            .get(Feed::NwsPoints, &format!("/points/{key}"))
            .await?;
        let grid = parse_grid_point(&json)?;

        // a racing lookup for the same key writes the same value
        self.grid_cache.write().await.insert(key, grid.clone());
        Ok(grid)
    }

    /// Hourly forecast for a grid cell
    pub async fn fetch_hourly(&self, grid: &GridPoint) -> SourceResult<Vec<CloudSample>> {
        if let Some(cached) = self.forecast_cache.read().await.get(grid) {
            if cached.fetched_at.elapsed() < self.forecast_ttl {
                return Ok(cached.samples.clone());
            }
        }

        let path = format!(
            "/gridpoints/{}/{},{}/forecast/hourly",
            grid.office, grid.grid_x, grid.grid_y
        );
        let json = self.get(Feed::NwsForecast, &path).await?;
        let samples = parse_hourly_periods(&json)?;

        self.forecast_cache.write().await.insert(
            grid.clone(),
            CachedForecast {
                fetched_at: Instant::now(),
                samples: samples.clone(),
            },
        );
        Ok(samples)
    }

    /// Grid lookup followed by the hourly forecast
    pub async fn fetch_cloud_forecast(&self, lat: f64, lon: f64) -> SourceResult<Vec<CloudSample>> {
        let grid = self.lookup_grid(lat, lon).await?;
        self.fetch_hourly(&grid).await
    }
}

fn malformed(feed: Feed, row: usize, reason: &str) -> MalformedSample {
    MalformedSample {
        feed,
        row,
        reason: reason.to_string(),
    }
}

fn rows(feed: Feed, json: &Value) -> SourceResult<&Vec<Value>> {
    json.as_array().ok_or_else(|| SourceError::Decode {
        feed,
        reason: "expected a JSON array".to_string(),
    })
}

fn parse_kp_row(row: &Value, idx: usize) -> Result<KpForecastPoint, MalformedSample> {
    let feed = Feed::KpForecast;
    let cells = row
        .as_array()
        .ok_or_else(|| malformed(feed, idx, "row is not an array"))?;
    let time = cells
        .first()
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .ok_or_else(|| malformed(feed, idx, "unreadable timestamp"))?;
    let kp = cells
        .get(1)
        .and_then(num)
        .ok_or_else(|| malformed(feed, idx, "kp is not numeric"))?;

    Ok(KpForecastPoint {
        time,
        kp,
        observed: cells.get(2).and_then(Value::as_str) == Some("observed"),
        noaa_scale: cells
            .get(3)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

/// Tabular Kp forecast; the first row is a header
pub fn parse_kp_forecast(json: &Value) -> SourceResult<Vec<KpForecastPoint>> {
    let points = rows(Feed::KpForecast, json)?
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(idx, row)| match parse_kp_row(row, idx) {
            Ok(point) => Some(point),
            Err(error) => {
                debug!(%error, "skipping sample");
                None
            }
        })
        .collect();
    Ok(points)
}

/// Latest usable 1-minute sample, scanning back past unusable ones
pub fn parse_current_kp(json: &Value) -> SourceResult<RealtimeKp> {
    let feed = Feed::KpRealtime;
    let samples = rows(feed, json)?;

    for (idx, sample) in samples.iter().enumerate().rev() {
        let Some(time) = t_pick(sample, &["time_tag"]) else {
            debug!(error = %malformed(feed, idx, "unreadable time_tag"), "skipping sample");
            continue;
        };
        let reading = RealtimeKp {
            time,
            kp: sample.get("kp_index").and_then(num),
            estimated_kp: sample.get("estimated_kp").and_then(num),
        };
        if reading.value().is_some() {
            return Ok(reading);
        }
        debug!(error = %malformed(feed, idx, "no kp value"), "skipping sample");
    }
    Err(SourceError::Empty { feed })
}

/// Most recent row with a numeric Bz; the first row is a header
pub fn parse_solar_wind(json: &Value) -> SourceResult<SolarWindReading> {
    let feed = Feed::SolarWind;
    let table = rows(feed, json)?;

    for (idx, row) in table.iter().enumerate().skip(1).rev() {
        let cells = row.as_array();
        let bz = cells.and_then(|c| c.get(BZ_COLUMN)).and_then(num);
        let time = cells
            .and_then(|c| c.first())
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        match (bz, time) {
            (Some(bz), Some(time)) => {
                return Ok(SolarWindReading {
                    time,
                    bz,
                    bt: cells.and_then(|c| c.get(BT_COLUMN)).and_then(num),
                })
            }
            (None, _) => debug!(error = %malformed(feed, idx, "bz is not numeric"), "skipping sample"),
            (_, None) => debug!(error = %malformed(feed, idx, "unreadable timestamp"), "skipping sample"),
        }
    }
    Err(SourceError::Empty { feed })
}

/// OVATION grid: timestamps plus [lon, lat, probability] triples
pub fn parse_ovation(json: &Value) -> SourceResult<OvationGrid> {
    let feed = Feed::Ovation;
    let coordinates = json
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Decode {
            feed,
            reason: "missing coordinates".to_string(),
        })?;

    let points = coordinates
        .iter()
        .enumerate()
        .filter_map(|(idx, triple)| {
            let cell = |i: usize| triple.get(i).and_then(num);
            match (cell(0), cell(1), cell(2)) {
                (Some(lon), Some(lat), Some(probability)) => Some(OvationPoint {
                    lon: lon.round() as i32,
                    lat: lat.round() as i32,
                    probability,
                }),
                _ => {
                    debug!(error = %malformed(feed, idx, "incomplete triple"), "skipping sample");
                    None
                }
            }
        })
        .collect();

    Ok(OvationGrid {
        observation_time: t_pick(json, &["Observation Time"]),
        forecast_time: t_pick(json, &["Forecast Time"]),
        coordinates: points,
    })
}

/// `properties.gridId/gridX/gridY` from a /points response
pub fn parse_grid_point(json: &Value) -> SourceResult<GridPoint> {
    let props = &json["properties"];
    match (
        props["gridId"].as_str(),
        props["gridX"].as_i64(),
        props["gridY"].as_i64(),
    ) {
        (Some(office), Some(grid_x), Some(grid_y)) => Ok(GridPoint {
            office: office.to_string(),
            grid_x,
            grid_y,
        }),
        _ => Err(SourceError::Decode {
            feed: Feed::NwsPoints,
            reason: "missing gridId/gridX/gridY".to_string(),
        }),
    }
}

fn parse_period(period: &Value, idx: usize) -> Result<CloudSample, MalformedSample> {
    let start_time = period["startTime"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .ok_or_else(|| malformed(Feed::NwsForecast, idx, "unreadable startTime"))?;

    Ok(CloudSample {
        start_time,
        hour_label: start_time.format("%-I %p").to_string(),
        sky_cover: num(&period["skyCover"]["value"]),
        short_forecast: period["shortForecast"].as_str().unwrap_or_default().to_string(),
        temperature: num(&period["temperature"]),
        wind_speed: period["windSpeed"].as_str().map(str::to_string),
    })
}

/// First hourly periods of a /forecast/hourly response
pub fn parse_hourly_periods(json: &Value) -> SourceResult<Vec<CloudSample>> {
    let periods = json["properties"]["periods"]
        .as_array()
        .ok_or_else(|| SourceError::Decode {
            feed: Feed::NwsForecast,
            reason: "missing properties.periods".to_string(),
        })?;

    let samples = periods
        .iter()
        .take(FORECAST_PERIODS)
        .enumerate()
        .filter_map(|(idx, period)| match parse_period(period, idx) {
            Ok(sample) => Some(sample),
            Err(error) => {
                debug!(%error, "skipping sample");
                None
            }
        })
        .collect();
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};
    use serde_json::json;

    #[test]
    fn test_kp_forecast_skips_header_and_bad_rows() {
        let raw = json!([
            ["time_tag", "kp", "observed", "noaa_scale"],
            ["2024-01-15 00:00:00", "2.33", "observed", null],
            ["2024-01-15 03:00:00", "n/a", "observed", null],
            ["2024-01-15 06:00:00", "5.67", "predicted", "G2"],
            "garbage"
        ]);
        let points = parse_kp_forecast(&raw).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].kp, 2.33);
        assert!(points[0].observed);
        assert_eq!(points[0].noaa_scale, None);
        assert!(!points[1].observed);
        assert_eq!(points[1].noaa_scale.as_deref(), Some("G2"));
        assert_eq!(points[1].time.hour(), 6);
    }

    #[test]
    fn test_kp_forecast_rejects_non_array() {
        let err = parse_kp_forecast(&json!({"error": "down"})).unwrap_err();
        assert!(matches!(err, SourceError::Decode { feed: Feed::KpForecast, .. }));
    }

    #[test]
    fn test_current_kp_uses_latest_sample() {
        let raw = json!([
            {"time_tag": "2024-01-15T12:00:00", "kp_index": 2, "estimated_kp": 2.33},
            {"time_tag": "2024-01-15T12:01:00", "kp_index": 3, "estimated_kp": 3.67}
        ]);
        let kp = parse_current_kp(&raw).unwrap();
        assert_eq!(kp.value(), Some(3.67));
        assert_eq!(kp.time.minute(), 1);
    }

    #[test]
    fn test_current_kp_falls_back_to_raw_index() {
        let raw = json!([{"time_tag": "2024-01-15T12:01:00", "kp_index": 4}]);
        assert_eq!(parse_current_kp(&raw).unwrap().value(), Some(4.0));
    }

    #[test]
    fn test_current_kp_empty_feed() {
        let err = parse_current_kp(&json!([])).unwrap_err();
        assert!(matches!(err, SourceError::Empty { feed: Feed::KpRealtime }));
    }

    #[test]
    fn test_solar_wind_scans_back_for_valid_bz() {
        let raw = json!([
            ["time_tag", "bx_gsm", "by_gsm", "bz_gsm", "lon_gsm", "lat_gsm", "bt"],
            ["2024-01-15 12:00:00.000", "1.0", "2.0", "-4.50", "100", "10", "6.10"],
            ["2024-01-15 12:01:00.000", "1.0", "2.0", "-6.25", "100", "10", null],
            ["2024-01-15 12:02:00.000", null, null, null, null, null, null]
        ]);
        let reading = parse_solar_wind(&raw).unwrap();
        assert_eq!(reading.bz, -6.25);
        assert_eq!(reading.bt, None);
        assert_eq!(reading.time.minute(), 1);
    }

    #[test]
    fn test_solar_wind_header_only_is_empty() {
        let raw = json!([["time_tag", "bx_gsm", "by_gsm", "bz_gsm"]]);
        let err = parse_solar_wind(&raw).unwrap_err();
        assert!(matches!(err, SourceError::Empty { feed: Feed::SolarWind }));
    }

    #[test]
    fn test_ovation_parses_triples() {
        let raw = json!({
            "Observation Time": "2024-01-15T12:00:00Z",
            "Forecast Time": "2024-01-15T12:40:00Z",
            "coordinates": [[212, 65, 18], [213, 65, 22], [0, "x", 4]]
        });
        let grid = parse_ovation(&raw).unwrap();
        assert_eq!(grid.coordinates.len(), 2);
        assert_eq!(grid.probability_at(64.8, -147.7), 18.0);
        assert!(grid.forecast_time.is_some());
    }

    #[test]
    fn test_ovation_without_coordinates_fails() {
        assert!(parse_ovation(&json!({"Forecast Time": "x"})).is_err());
    }

    #[test]
    fn test_grid_point() {
        let raw = json!({"properties": {"gridId": "AFG", "gridX": 215, "gridY": 110}});
        let grid = parse_grid_point(&raw).unwrap();
        assert_eq!(
            grid,
            GridPoint {
                office: "AFG".to_string(),
                grid_x: 215,
                grid_y: 110
            }
        );
        assert!(parse_grid_point(&json!({"properties": {}})).is_err());
    }

    #[test]
    fn test_hourly_periods() {
        let raw = json!({"properties": {"periods": [
            {
                "startTime": "2024-01-15T18:00:00-09:00",
                "temperature": -12,
                "windSpeed": "5 mph",
                "shortForecast": "Mostly Cloudy",
                "skyCover": {"unitCode": "wmoUnit:percent", "value": 72}
            },
            {
                "startTime": "2024-01-15T19:00:00-09:00",
                "temperature": -13,
                "windSpeed": "5 mph",
                "shortForecast": "Partly Cloudy"
            },
            {"shortForecast": "no start"}
        ]}});
        let samples = parse_hourly_periods(&raw).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].hour_label, "6 PM");
        assert_eq!(samples[0].sky_cover, Some(72.0));
        assert_eq!(samples[1].sky_cover, None);
        assert_eq!(samples[1].short_forecast, "Partly Cloudy");
        assert_eq!(samples[1].start_time.with_timezone(&Utc).hour(), 4);
    }

    #[test]
    fn test_hourly_periods_truncated_to_twelve() {
        let periods: Vec<_> = (0..30)
            .map(|h| json!({"startTime": format!("2024-01-16T{:02}:00:00-09:00", h % 24), "shortForecast": "Clear"}))
            .collect();
        let raw = json!({"properties": {"periods": periods}});
        assert_eq!(parse_hourly_periods(&raw).unwrap().len(), 12);
    }
}
