/// Composite aurora viewing score.
///
/// Six sub-scores, each 0-100, are combined with fixed weights:
///
/// | signal    | weight |
/// |-----------|--------|
/// | Kp        | 35     |
/// | cloud     | 25     |
/// | darkness  | 15     |
/// | moon      | 10     |
/// | Bz        | 10     |
/// | OVATION   | 5      |
///
/// Absent inputs map to fixed neutral values; scoring never fails.
use crate::domain::{MoonState, Rating, ScoreBreakdown, ScoreResult, SubScore};

pub const KP_WEIGHT: u8 = 35;
pub const CLOUD_WEIGHT: u8 = 25;
pub const DARKNESS_WEIGHT: u8 = 15;
pub const MOON_WEIGHT: u8 = 10;
pub const BZ_WEIGHT: u8 = 10;
pub const OVATION_WEIGHT: u8 = 5;

const CLOUD_UNKNOWN: f64 = 50.0;
const MOON_UNKNOWN: f64 = 50.0;
/// Unknown Bz must not look favorable
const BZ_UNKNOWN: f64 = 30.0;

/// Everything the scorer and the summary need for one location
#[derive(Debug, Clone, Copy)]
pub struct Signals<'a> {
    pub location_name: &'a str,
    pub current_kp: f64,
    pub kp_visible: f64,
    pub kp_good: f64,
    pub cloud_cover_now: Option<f64>,
    pub cloud_cover_min_6h: Option<f64>,
    pub is_dark: bool,
    pub sun_altitude: f64,
    pub moon: Option<&'a MoonState>,
    pub bz: Option<f64>,
    pub ovation_probability: Option<f64>,
}

pub fn kp_score(current_kp: f64, kp_visible: f64, kp_good: f64) -> f64 {
    if current_kp < kp_visible {
        return 0.0;
    }
    if current_kp >= kp_good + 2.0 {
        return 100.0;
    }
    if current_kp <= kp_visible {
        return 40.0;
    }
    if current_kp <= kp_good {
        // kp_good > kp_visible here, otherwise the branch above returned
        let ratio = (current_kp - kp_visible) / (kp_good - kp_visible);
        return 40.0 + ratio * 35.0;
    }
    let ratio = (current_kp - kp_good) / 2.0;
    75.0 + ratio * 25.0
}

pub fn cloud_score(cloud_cover_min_6h: Option<f64>) -> f64 {
    let Some(cover) = cloud_cover_min_6h else {
        return CLOUD_UNKNOWN;
    };
    match cover {
        c if c <= 10.0 => 100.0,
        c if c <= 25.0 => 85.0,
        c if c <= 50.0 => 60.0,
        c if c <= 75.0 => 30.0,
        c if c <= 90.0 => 10.0,
        _ => 0.0,
    }
}

pub fn darkness_score(is_dark: bool, sun_altitude: f64) -> f64 {
    if !is_dark {
        return 0.0;
    }
    match sun_altitude {
        a if a < -18.0 => 100.0,
        a if a < -12.0 => 85.0,
        a if a < -6.0 => 40.0,
        _ => 0.0,
    }
}

pub fn moon_score(moon: Option<&MoonState>) -> f64 {
    let Some(moon) = moon else {
        return MOON_UNKNOWN;
    };
    if !moon.above_horizon {
        return 100.0;
    }
    match moon.illumination {
        i if i <= 10.0 => 90.0,
        i if i <= 25.0 => 75.0,
        i if i <= 50.0 => 50.0,
        i if i <= 75.0 => 25.0,
        _ => 5.0,
    }
}

/// Only southward (negative) Bz earns points
pub fn bz_score(bz: Option<f64>) -> f64 {
    let Some(bz) = bz else {
        return BZ_UNKNOWN;
    };
    match bz {
        b if b >= 0.0 => 0.0,
        b if b > -3.0 => 20.0,
        b if b > -5.0 => 50.0,
        b if b > -10.0 => 80.0,
        _ => 100.0,
    }
}

pub fn ovation_score(probability: Option<f64>) -> f64 {
    probability
        .filter(|p| p.is_finite())
        .map_or(0.0, |p| p.clamp(0.0, 100.0))
}

/// One entry of the rating precedence list
struct RatingRule {
    applies: fn(&Signals<'_>, u8) -> bool,
    rating: Rating,
    reason: &'static str,
}

fn not_dark(s: &Signals<'_>, _: u8) -> bool {
    !s.is_dark
}

fn active_under_clouds(s: &Signals<'_>, _: u8) -> bool {
    s.current_kp >= s.kp_visible && s.cloud_cover_now.is_some_and(|c| c > 80.0)
}

fn score_at_least_75(_: &Signals<'_>, composite: u8) -> bool {
    composite >= 75
}

fn score_at_least_50(_: &Signals<'_>, composite: u8) -> bool {
    composite >= 50
}

fn score_at_least_30(_: &Signals<'_>, composite: u8) -> bool {
    composite >= 30
}

fn always(_: &Signals<'_>, _: u8) -> bool {
    true
}

/// Evaluated top to bottom, first match wins
const RATING_RULES: [RatingRule; 6] = [
    RatingRule {
        applies: not_dark,
        rating: Rating::Unlikely,
        reason: "Not dark enough for aurora viewing",
    },
    RatingRule {
        applies: active_under_clouds,
        rating: Rating::ActiveButCloudy,
        reason: "Aurora is active but cloud cover may block the view",
    },
    RatingRule {
        applies: score_at_least_75,
        rating: Rating::Great,
        reason: "Excellent conditions for aurora viewing",
    },
    RatingRule {
        applies: score_at_least_50,
        rating: Rating::Possible,
        reason: "Moderate chance of seeing aurora",
    },
    RatingRule {
        applies: score_at_least_30,
        rating: Rating::ActiveButCloudy,
        reason: "Some activity but conditions are marginal",
    },
    RatingRule {
        applies: always,
        rating: Rating::Unlikely,
        reason: "Low aurora activity or poor viewing conditions",
    },
];

/// Rating and its reason for a composite score
pub fn classify(signals: &Signals<'_>, composite: u8) -> (Rating, &'static str) {
    RATING_RULES
        .iter()
        .find(|rule| (rule.applies)(signals, composite))
        .map(|rule| (rule.rating, rule.reason))
        .unwrap_or((Rating::Unlikely, RATING_RULES[5].reason))
}

fn sub(score: f64, weight: u8) -> SubScore {
    SubScore {
        score: score.round().clamp(0.0, 100.0) as u8,
        weight,
    }
}

pub fn score(signals: &Signals<'_>) -> ScoreResult {
    let kp = kp_score(signals.current_kp, signals.kp_visible, signals.kp_good);
    let cloud = cloud_score(signals.cloud_cover_min_6h);
    let dark = darkness_score(signals.is_dark, signals.sun_altitude);
    let moon = moon_score(signals.moon);
    let bz = bz_score(signals.bz);
    let ovation = ovation_score(signals.ovation_probability);

    // integer weights keep the sum exact for integral sub-scores
    let weighted = kp * f64::from(KP_WEIGHT)
        + cloud * f64::from(CLOUD_WEIGHT)
        + dark * f64::from(DARKNESS_WEIGHT)
        + moon * f64::from(MOON_WEIGHT)
        + bz * f64::from(BZ_WEIGHT)
        + ovation * f64::from(OVATION_WEIGHT);
    let composite = (weighted / 100.0).round().clamp(0.0, 100.0) as u8;

    let (rating, reason) = classify(signals, composite);

    ScoreResult {
        composite,
        breakdown: ScoreBreakdown {
            kp: sub(kp, KP_WEIGHT),
            cloud: sub(cloud, CLOUD_WEIGHT),
            darkness: sub(dark, DARKNESS_WEIGHT),
            moon: sub(moon, MOON_WEIGHT),
            bz: sub(bz, BZ_WEIGHT),
            ovation: sub(ovation, OVATION_WEIGHT),
        },
        rating,
        reason,
    }
}
