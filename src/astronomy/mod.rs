/// Sun and moon positions, nautical twilight and lunar illumination.
///
/// Low-precision analytic formulae (a few arc-minutes for the sun, well under
/// a degree for the moon) which is plenty for deciding whether the sky is
/// dark and whether the moon is in the way. Everything here is a pure function
/// of coordinate and instant.
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::f64::consts::PI;

use crate::domain::{DarknessWindow, MoonPhase, MoonState};
use crate::utils::round1;

const RAD: f64 = PI / 180.0;
const DAY_MS: f64 = 86_400_000.0;
const J1970: f64 = 2_440_588.0;
const J2000: f64 = 2_451_545.0;
const J0: f64 = 0.0009;
/// Obliquity of the ecliptic at J2000
const OBLIQUITY: f64 = RAD * 23.4397;
const SUN_DISTANCE_KM: f64 = 149_598_000.0;

/// Sun 12 degrees below the horizon
const NAUTICAL_TWILIGHT_DEG: f64 = -12.0;
/// Below this the sky counts as dark even without a twilight crossing
const DARK_ALTITUDE_DEG: f64 = -12.0;
/// Above this the sky is never dark enough
const BRIGHT_ALTITUDE_DEG: f64 = -6.0;

#[derive(Debug, Clone, Copy)]
struct Equatorial {
    ra: f64,
    dec: f64,
}

#[derive(Debug, Clone, Copy)]
struct MoonCoords {
    eq: Equatorial,
    dist_km: f64,
}

/// Nautical twilight boundaries of the solar day nearest `at`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Twilight {
    pub dawn: Option<DateTime<Utc>>,
    pub dusk: Option<DateTime<Utc>>,
}

fn to_julian(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / DAY_MS - 0.5 + J1970
}

fn from_julian(j: f64) -> Option<DateTime<Utc>> {
    if !j.is_finite() {
        return None;
    }
    let ms = ((j + 0.5 - J1970) * DAY_MS).round() as i64;
    Utc.timestamp_millis_opt(ms).single()
}

fn to_days(at: DateTime<Utc>) -> f64 {
    to_julian(at) - J2000
}

fn right_ascension(l: f64, b: f64) -> f64 {
    (l.sin() * OBLIQUITY.cos() - b.tan() * OBLIQUITY.sin()).atan2(l.cos())
}

fn declination(l: f64, b: f64) -> f64 {
    (b.sin() * OBLIQUITY.cos() + b.cos() * OBLIQUITY.sin() * l.sin()).asin()
}

fn altitude(h: f64, phi: f64, dec: f64) -> f64 {
    (phi.sin() * dec.sin() + phi.cos() * dec.cos() * h.cos()).asin()
}

fn sidereal_time(d: f64, lw: f64) -> f64 {
    RAD * (280.16 + 360.985_623_5 * d) - lw
}

fn astro_refraction(h: f64) -> f64 {
    // formula only holds above the horizon
    let h = h.max(0.0);
    0.000_296_7 / (h + 0.003_125_36 / (h + 0.089_011_79)).tan()
}

fn solar_mean_anomaly(d: f64) -> f64 {
    RAD * (357.5291 + 0.985_600_28 * d)
}

fn ecliptic_longitude(m: f64) -> f64 {
    let center = RAD * (1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin());
    let perihelion = RAD * 102.9372;
    m + center + perihelion + PI
}

fn sun_coords(d: f64) -> Equatorial {
    let l = ecliptic_longitude(solar_mean_anomaly(d));
    Equatorial {
        ra: right_ascension(l, 0.0),
        dec: declination(l, 0.0),
    }
}

fn julian_cycle(d: f64, lw: f64) -> f64 {
    (d - J0 - lw / (2.0 * PI)).round()
}

fn approx_transit(ht: f64, lw: f64, n: f64) -> f64 {
    J0 + (ht + lw) / (2.0 * PI) + n
}

fn solar_transit_j(ds: f64, m: f64, l: f64) -> f64 {
    J2000 + ds + 0.0053 * m.sin() - 0.0069 * (2.0 * l).sin()
}

/// None when the sun never reaches altitude `h` that day
fn hour_angle(h: f64, phi: f64, dec: f64) -> Option<f64> {
    let x = (h.sin() - phi.sin() * dec.sin()) / (phi.cos() * dec.cos());
    (-1.0..=1.0).contains(&x).then(|| x.acos())
}

/// Sun altitude in degrees, unrounded
pub fn sun_altitude(lat: f64, lon: f64, at: DateTime<Utc>) -> f64 {
    let lw = RAD * -lon;
    let phi = RAD * lat;
    let d = to_days(at);
    let c = sun_coords(d);
    let h = sidereal_time(d, lw) - c.ra;
    altitude(h, phi, c.dec) / RAD
}

/// Nautical dawn and dusk for the solar day nearest `at`
pub fn nautical_twilight(lat: f64, lon: f64, at: DateTime<Utc>) -> Twilight {
    let lw = RAD * -lon;
    let phi = RAD * lat;
    let d = to_days(at);

    let n = julian_cycle(d, lw);
    let ds = approx_transit(0.0, lw, n);
    let m = solar_mean_anomaly(ds);
    let l = ecliptic_longitude(m);
    let dec = declination(l, 0.0);
    let j_noon = solar_transit_j(ds, m, l);

    match hour_angle(NAUTICAL_TWILIGHT_DEG * RAD, phi, dec) {
        Some(w) => {
            let j_set = solar_transit_j(approx_transit(w, lw, n), m, l);
            let j_rise = j_noon - (j_set - j_noon);
            Twilight {
                dawn: from_julian(j_rise),
                dusk: from_julian(j_set),
            }
        }
        None => Twilight {
            dawn: None,
            dusk: None,
        },
    }
}

/// Darkness state at `at` and tonight's window [today's dusk, tomorrow's dawn]
pub fn darkness(lat: f64, lon: f64, at: DateTime<Utc>) -> DarknessWindow {
    let today = nautical_twilight(lat, lon, at);
    let tomorrow = nautical_twilight(lat, lon, at + Duration::days(1));
    night_window(at, today, tomorrow, sun_altitude(lat, lon, at))
}

/// Combine twilight boundaries and the current sun altitude (degrees)
pub fn night_window(
    at: DateTime<Utc>,
    today: Twilight,
    tomorrow: Twilight,
    sun_alt: f64,
) -> DarknessWindow {
    let mut is_dark = match (today.dawn, today.dusk) {
        (Some(dawn), Some(dusk)) => at >= dusk || at <= dawn,
        _ => false,
    };

    // Direct altitude check wins outside the twilight band. At high latitude
    // in winter the twilight crossing may not exist at all.
    if sun_alt < DARK_ALTITUDE_DEG {
        is_dark = true;
    } else if sun_alt > BRIGHT_ALTITUDE_DEG {
        is_dark = false;
    }

    let darkness_start = today.dusk;
    let darkness_end = tomorrow.dawn;

    let mut hours_of_darkness = match (darkness_start, darkness_end) {
        (Some(start), Some(end)) => {
            let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
            if hours < 0.0 {
                hours + 24.0
            } else {
                hours
            }
        }
        _ => 0.0,
    };

    if (darkness_start.is_none() || darkness_end.is_none()) && sun_alt < DARK_ALTITUDE_DEG {
        is_dark = true;
        hours_of_darkness = 24.0;
    }

    DarknessWindow {
        is_dark,
        darkness_start,
        darkness_end,
        hours_of_darkness: round1(hours_of_darkness),
        sun_altitude: round1(sun_alt),
    }
}

fn moon_coords(d: f64) -> MoonCoords {
    let l = RAD * (218.316 + 13.176_396 * d);
    let m = RAD * (134.963 + 13.064_993 * d);
    let f = RAD * (93.272 + 13.229_350 * d);

    let lon = l + RAD * 6.289 * m.sin();
    let lat = RAD * 5.128 * f.sin();

    MoonCoords {
        eq: Equatorial {
            ra: right_ascension(lon, lat),
            dec: declination(lon, lat),
        },
        dist_km: 385_001.0 - 20_905.0 * m.cos(),
    }
}

/// Moon altitude in radians, corrected for refraction
fn moon_altitude_rad(lat: f64, lon: f64, at: DateTime<Utc>) -> f64 {
    let lw = RAD * -lon;
    let phi = RAD * lat;
    let d = to_days(at);
    let c = moon_coords(d);
    let h = altitude(sidereal_time(d, lw) - c.eq.ra, phi, c.eq.dec);
    h + astro_refraction(h)
}

/// (illuminated fraction 0..1, phase 0..1)
fn moon_illumination(at: DateTime<Utc>) -> (f64, f64) {
    let d = to_days(at);
    let s = sun_coords(d);
    let m = moon_coords(d);

    let elongation = (s.dec.sin() * m.eq.dec.sin()
        + s.dec.cos() * m.eq.dec.cos() * (s.ra - m.eq.ra).cos())
    .clamp(-1.0, 1.0)
    .acos();
    let inc = (SUN_DISTANCE_KM * elongation.sin())
        .atan2(m.dist_km - SUN_DISTANCE_KM * elongation.cos());
    let angle = (s.dec.cos() * (s.ra - m.eq.ra).sin()).atan2(
        s.dec.sin() * m.eq.dec.cos() - s.dec.cos() * m.eq.dec.sin() * (s.ra - m.eq.ra).cos(),
    );

    let fraction = (1.0 + inc.cos()) / 2.0;
    let sign = if angle < 0.0 { -1.0 } else { 1.0 };
    let phase = 0.5 + 0.5 * inc * sign / PI;
    (fraction, phase.rem_euclid(1.0))
}

/// Moonrise and moonset within the UTC day containing `at`
fn moon_rise_set(
    lat: f64,
    lon: f64,
    at: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let day_start = Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::default()));
    let hours_later = |h: f64| day_start + Duration::milliseconds((h * 3_600_000.0) as i64);
    // apparent radius plus parallax
    let hc = 0.133 * RAD;
    let alt = |h: f64| moon_altitude_rad(lat, lon, hours_later(h)) - hc;

    let mut rise: Option<f64> = None;
    let mut set: Option<f64> = None;
    let mut h0 = alt(0.0);

    // quadratic fit through three altitudes, two hours at a time
    let mut i = 1.0;
    while i <= 24.0 {
        let h1 = alt(i);
        let h2 = alt(i + 1.0);

        let a = (h0 + h2) / 2.0 - h1;
        let b = (h2 - h0) / 2.0;
        let xe = -b / (2.0 * a);
        let ye = (a * xe + b) * xe + h1;
        let disc = b * b - 4.0 * a * h1;

        let mut roots = 0;
        let mut x1 = 0.0;
        let mut x2 = 0.0;
        if disc >= 0.0 {
            let dx = disc.sqrt() / (a.abs() * 2.0);
            x1 = xe - dx;
            x2 = xe + dx;
            if x1.abs() <= 1.0 {
                roots += 1;
            }
            if x2.abs() <= 1.0 {
                roots += 1;
            }
            if x1 < -1.0 {
                x1 = x2;
            }
        }

        match roots {
            1 if h0 < 0.0 => rise = Some(i + x1),
            1 => set = Some(i + x1),
            2 => {
                rise = Some(i + if ye < 0.0 { x2 } else { x1 });
                set = Some(i + if ye < 0.0 { x1 } else { x2 });
            }
            _ => {}
        }

        if rise.is_some() && set.is_some() {
            break;
        }
        h0 = h2;
        i += 2.0;
    }

    (rise.map(hours_later), set.map(hours_later))
}

/// Eight named phases, inclusive upper bounds every 0.125
pub fn phase_bucket(phase: f64) -> MoonPhase {
    let p = phase.rem_euclid(1.0);
    if p <= 0.125 {
        MoonPhase::New
    } else if p <= 0.25 {
        MoonPhase::WaxingCrescent
    } else if p <= 0.375 {
        MoonPhase::FirstQuarter
    } else if p <= 0.5 {
        MoonPhase::WaxingGibbous
    } else if p <= 0.625 {
        MoonPhase::Full
    } else if p <= 0.75 {
        MoonPhase::WaningGibbous
    } else if p <= 0.875 {
        MoonPhase::LastQuarter
    } else {
        MoonPhase::WaningCrescent
    }
}

/// Moon phase, illumination and position for a coordinate
pub fn moon(lat: f64, lon: f64, at: DateTime<Utc>) -> MoonState {
    let (fraction, phase) = moon_illumination(at);
    let alt_deg = moon_altitude_rad(lat, lon, at) / RAD;
    let (rise, set) = moon_rise_set(lat, lon, at);

    MoonState {
        phase,
        phase_name: phase_bucket(phase),
        illumination: (fraction * 100.0).round(),
        above_horizon: alt_deg > 0.0,
        altitude: round1(alt_deg),
        rise,
        set,
    }
}
