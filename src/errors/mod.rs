/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Upstream feeds the snapshot is assembled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    KpForecast,
    KpRealtime,
    Ovation,
    SolarWind,
    NwsPoints,
    NwsForecast,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feed::KpForecast => "kp-forecast",
            Feed::KpRealtime => "kp-realtime",
            Feed::Ovation => "ovation",
            Feed::SolarWind => "solar-wind",
            Feed::NwsPoints => "nws-points",
            Feed::NwsForecast => "nws-forecast",
        };
        f.write_str(name)
    }
}

/// A feed could not be used at all. Always recovered by the caller.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{feed} request failed: {error}")]
    Transport {
        feed: Feed,
        #[source]
        error: reqwest::Error,
    },
    #[error("{feed} returned HTTP {status}")]
    Status { feed: Feed, status: u16 },
    #[error("{feed} payload could not be decoded: {reason}")]
    Decode { feed: Feed, reason: String },
    #[error("{feed} returned no usable samples")]
    Empty { feed: Feed },
}

impl SourceError {
    pub fn feed(&self) -> Feed {
        match self {
            SourceError::Transport { feed, .. }
            | SourceError::Status { feed, .. }
            | SourceError::Decode { feed, .. }
            | SourceError::Empty { feed } => *feed,
        }
    }
}

/// One record inside an otherwise healthy feed was rejected
#[derive(Debug, Error)]
#[error("malformed {feed} sample at row {row}: {reason}")]
pub struct MalformedSample {
    pub feed: Feed,
    pub row: usize,
    pub reason: String,
}

/// Invalid or missing static configuration; fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no locations configured")]
    NoLocations,
    #[error("location #{index} is missing {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("location '{id}' has invalid {field}: {reason}")]
    InvalidField {
        id: String,
        field: &'static str,
        reason: String,
    },
    #[error("location id '{0}' is defined more than once")]
    DuplicateId(String),
    #[error("cannot read locations file {path}: {error}")]
    Read {
        path: String,
        #[source]
        error: std::io::Error,
    },
    #[error("cannot parse locations file {path}: {error}")]
    Parse {
        path: String,
        #[source]
        error: toml::de::Error,
    },
    #[error("invalid {key}: {reason}")]
    InvalidEnv { key: &'static str, reason: String },
}

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            ApiError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
        };

        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        // errors travel in the body, clients branch on `ok`
        (StatusCode::OK, Json(error_response)).into_response()
    }
}

/// Type alias for adapter results
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_reports_feed() {
        let err = SourceError::Status {
            feed: Feed::Ovation,
            status: 502,
        };
        assert_eq!(err.feed(), Feed::Ovation);
        assert_eq!(err.to_string(), "ovation returned HTTP 502");
    }

    #[test]
    fn test_malformed_sample_message() {
        let err = MalformedSample {
            feed: Feed::SolarWind,
            row: 4,
            reason: "bz not numeric".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed solar-wind sample at row 4: bz not numeric"
        );
    }

    #[tokio::test]
    async fn test_not_found_answers_ok_false_in_body() {
        let response =
            ApiError::NotFound("unknown location 'nome'".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "unknown location 'nome'");
    }
}
