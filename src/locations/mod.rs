/// Viewing site registry.
///
/// The built-in list covers six Alaska sites. A TOML file with
/// `[[locations]]` tables replaces it entirely when configured. Either way the
/// list is validated once at startup and a bad entry aborts the process.
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::error;

use crate::domain::Location;
use crate::errors::ConfigError;

pub fn builtin_locations() -> Vec<Location> {
    let site = |id: &str, name: &str, lat, lon, kp_visible, kp_good, tips: &str| Location {
        id: id.to_string(),
        name: name.to_string(),
        lat,
        lon,
        kp_visible,
        kp_good,
        tips: tips.to_string(),
    };

    vec![
        site(
            "fairbanks",
            "Fairbanks",
            64.8378,
            -147.7164,
            1.0,
            3.0,
            "Sits under the auroral oval. Head north of town toward Cleary Summit \
             or Murphy Dome to escape the city glow.",
        ),
        site(
            "anchorage",
            "Anchorage",
            61.2181,
            -149.9003,
            4.0,
            5.0,
            "Drive to Glen Alps or up the Knik Arm for a dark northern horizon. \
             City lights wash out weak displays.",
        ),
        site(
            "juneau",
            "Juneau",
            58.3019,
            -134.4197,
            5.0,
            6.0,
            "Needs a strong storm. Look north over the Mendenhall Wetlands, and \
             watch the forecast closely since clear nights are rare.",
        ),
        site(
            "coldfoot",
            "Coldfoot",
            67.2522,
            -150.1756,
            1.0,
            2.0,
            "Almost no light pollution along the Dalton Highway. The aurora is \
             often overhead, so look straight up as well as north.",
        ),
        site(
            "talkeetna",
            "Talkeetna",
            62.3209,
            -150.1066,
            3.0,
            4.0,
            "The riverfront looks north across the Susitna toward Denali. \
             Very little light pollution.",
        ),
        site(
            "utqiagvik",
            "Utqiagvik",
            71.2906,
            -156.7886,
            1.0,
            3.0,
            "North of the main oval, so displays often appear to the south. \
             Polar night brings weeks of round-the-clock darkness.",
        ),
    ]
}

/// One `[[locations]]` table. Every field is optional here so a missing one
/// is reported by name rather than as a generic parse error.
#[derive(Debug, Deserialize)]
struct LocationEntry {
    id: Option<String>,
    name: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    kp_visible: Option<f64>,
    kp_good: Option<f64>,
    #[serde(default)]
    tips: String,
}

#[derive(Debug, Deserialize)]
struct LocationsFile {
    #[serde(default)]
    locations: Vec<LocationEntry>,
}

impl LocationEntry {
    fn into_location(self, index: usize) -> Result<Location, ConfigError> {
        let missing = |field| ConfigError::MissingField { index, field };
        Ok(Location {
            id: self.id.ok_or_else(|| missing("id"))?,
            name: self.name.ok_or_else(|| missing("name"))?,
            lat: self.lat.ok_or_else(|| missing("lat"))?,
            lon: self.lon.ok_or_else(|| missing("lon"))?,
            kp_visible: self.kp_visible.ok_or_else(|| missing("kp_visible"))?,
            kp_good: self.kp_good.ok_or_else(|| missing("kp_good"))?,
            tips: self.tips,
        })
    }
}

/// Parse a TOML registry
pub fn parse_locations(toml_text: &str, origin: &str) -> Result<Vec<Location>, ConfigError> {
    let file: LocationsFile = toml::from_str(toml_text).map_err(|error| ConfigError::Parse {
        path: origin.to_string(),
        error,
    })?;

    file.locations
        .into_iter()
        .enumerate()
        .map(|(index, entry)| entry.into_location(index))
        .collect()
}

/// Built-in registry, or the file at `path` when given. Always validated.
pub fn load_locations(path: Option<&Path>) -> Result<Vec<Location>, ConfigError> {
    read_registry(path).map_err(|e| {
        error!(error = %e, "location registry rejected");
        e
    })
}

fn read_registry(path: Option<&Path>) -> Result<Vec<Location>, ConfigError> {
    let locations = match path {
        None => builtin_locations(),
        Some(path) => {
            let origin = path.display().to_string();
            let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Read {
                path: origin.clone(),
                error,
            })?;
            parse_locations(&text, &origin)?
        }
    };
    validate(&locations)?;
    Ok(locations)
}

pub fn validate(locations: &[Location]) -> Result<(), ConfigError> {
    if locations.is_empty() {
        return Err(ConfigError::NoLocations);
    }

    let mut seen = HashSet::new();
    for (index, loc) in locations.iter().enumerate() {
        if loc.id.trim().is_empty() {
            return Err(ConfigError::MissingField { index, field: "id" });
        }
        if loc.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                index,
                field: "name",
            });
        }
        let invalid = |field, reason: String| ConfigError::InvalidField {
            id: loc.id.clone(),
            field,
            reason,
        };
        if !(-90.0..=90.0).contains(&loc.lat) {
            return Err(invalid("lat", format!("{} is outside [-90, 90]", loc.lat)));
        }
        if !(-180.0..=180.0).contains(&loc.lon) {
            return Err(invalid("lon", format!("{} is outside [-180, 180]", loc.lon)));
        }
        if !(0.0..=9.0).contains(&loc.kp_visible) {
            return Err(invalid(
                "kp_visible",
                format!("{} is outside [0, 9]", loc.kp_visible),
            ));
        }
        if !(loc.kp_visible..=9.0).contains(&loc.kp_good) {
            return Err(invalid(
                "kp_good",
                format!("{} must be between kp_visible and 9", loc.kp_good),
            ));
        }
        if !seen.insert(loc.id.as_str()) {
            return Err(ConfigError::DuplicateId(loc.id.clone()));
        }
    }
    Ok(())
}
