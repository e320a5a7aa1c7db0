/// Cloud forecast reduction: current cover, best cover over the next hours,
/// and a short timeline for display.
use crate::domain::{CloudAnalysis, CloudSample, TimelineEntry};

/// Hours considered when looking for a break in the clouds
pub const LOOKAHEAD_HOURS: usize = 6;
/// Hours exposed in the timeline
pub const TIMELINE_HOURS: usize = 12;

/// Sky cover for an hour without an explicit percentage.
/// Checked in order; first keyword hit wins.
pub fn estimate_cover(short_forecast: &str) -> f64 {
    let fc = short_forecast.to_lowercase();
    if fc.contains("clear") || fc.contains("sunny") {
        10.0
    } else if fc.contains("partly") {
        40.0
    } else if fc.contains("mostly cloudy") {
        75.0
    } else if fc.contains("cloudy") || fc.contains("overcast") {
        90.0
    } else {
        50.0
    }
}

/// Explicit sky cover when present, otherwise the text estimate
pub fn hourly_cover(sample: &CloudSample) -> f64 {
    sample
        .sky_cover
        .unwrap_or_else(|| estimate_cover(&sample.short_forecast))
}

pub fn analyze(forecast: Option<&[CloudSample]>) -> CloudAnalysis {
    let samples = match forecast {
        Some(s) if !s.is_empty() => s,
        _ => return CloudAnalysis::default(),
    };

    let covers: Vec<f64> = samples.iter().map(hourly_cover).collect();

    let min_6h = covers
        .iter()
        .take(LOOKAHEAD_HOURS)
        .copied()
        .reduce(f64::min);

    let timeline = samples
        .iter()
        .zip(&covers)
        .take(TIMELINE_HOURS)
        .map(|(sample, &cover)| TimelineEntry {
            hour: sample.hour_label.clone(),
            cover,
            temperature: sample.temperature,
            wind_speed: sample.wind_speed.clone(),
        })
        .collect();

    CloudAnalysis {
        current: covers.first().copied(),
        min_6h,
        timeline,
    }
}
