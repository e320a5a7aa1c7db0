/// Template-based viewing summary. Output is fully determined by the inputs.
use crate::domain::{MoonState, Rating};
use crate::scoring::Signals;

fn cloud_phrase(cloud_cover: Option<f64>) -> &'static str {
    match cloud_cover {
        None => "cloud data unavailable",
        Some(c) if c <= 15.0 => "skies are mostly clear",
        Some(c) if c <= 40.0 => "partly cloudy skies",
        Some(c) if c <= 70.0 => "mostly cloudy conditions",
        Some(_) => "overcast skies",
    }
}

fn moon_phrase(moon: Option<&MoonState>) -> Option<String> {
    let moon = moon?;
    let name = moon.phase_name.name().to_lowercase();
    let phrase = match moon.illumination {
        _ if !moon.above_horizon => "the moon is below the horizon".to_string(),
        i if i <= 15.0 => "a thin crescent moon won't interfere".to_string(),
        i if i <= 40.0 => format!("the {name} adds some brightness"),
        i if i <= 70.0 => format!("the bright {name} may wash out fainter displays"),
        _ => format!("the bright {name} will wash out fainter displays"),
    };
    Some(phrase)
}

fn kp_phrase(kp: f64, threshold: f64, location_name: &str) -> String {
    let diff = kp - threshold;
    let relation = if diff >= 3.0 {
        "is far above"
    } else if diff >= 1.0 {
        "is well above"
    } else if diff >= 0.0 {
        "is at"
    } else {
        "is below"
    };
    if (0.0..1.0).contains(&diff) {
        format!("Kp {kp:.1} {relation} {location_name}'s visibility threshold of {threshold}")
    } else {
        format!("Kp {kp:.1} {relation} {location_name}'s threshold of {threshold}")
    }
}

pub fn summarize(signals: &Signals<'_>, rating: Rating) -> String {
    let kp = signals.current_kp;
    let kp_str = kp_phrase(kp, signals.kp_visible, signals.location_name);
    let cloud_str = cloud_phrase(signals.cloud_cover_min_6h.or(signals.cloud_cover_now));
    let moon_str = moon_phrase(signals.moon);

    match rating {
        Rating::Great => match moon_str {
            Some(moon) => format!("Excellent conditions tonight. {kp_str}, {cloud_str}, and {moon}."),
            None => format!("Excellent conditions tonight. {kp_str}, {cloud_str}."),
        },
        Rating::Possible => {
            let mut factors = Vec::new();
            if kp < signals.kp_good {
                factors.push(format!("Kp is moderate at {kp:.1}"));
            }
            if signals.cloud_cover_now.is_some_and(|c| c > 40.0) {
                factors.push("partial cloud cover expected".to_string());
            }
            if let Some(moon) = signals.moon.filter(|m| m.above_horizon && m.illumination > 40.0) {
                factors.push(format!(
                    "the {} adds brightness",
                    moon.phase_name.name().to_lowercase()
                ));
            }
            let reason = if factors.is_empty() {
                "conditions are marginal".to_string()
            } else {
                factors.join(", ")
            };
            format!(
                "Moderate chance tonight: {reason}. Keep an eye on conditions as they can improve quickly."
            )
        }
        Rating::ActiveButCloudy => format!(
            "The aurora is active ({kp_str}) but {cloud_str}. Watch for breaks in the clouds, conditions can change fast."
        ),
        Rating::Unlikely => {
            if !signals.is_dark {
                "Not dark enough for aurora viewing right now. Check back after sunset.".to_string()
            } else if kp < signals.kp_visible {
                format!(
                    "Geomagnetic activity is low (Kp {kp:.1}). {} typically needs Kp {}+ for visible aurora.",
                    signals.location_name, signals.kp_visible
                )
            } else {
                format!(
                    "Conditions aren't favorable right now: {cloud_str} and {kp_str}. Check back later tonight."
                )
            }
        }
    }
}
