//! Error types.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::fmt::Display;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `compile_report` body was missing a metric or carried an invalid one.
    #[error("invalid client metrics: {0}")]
    InvalidMetrics(String),

    /// The OS entropy source could not seed the payload generator.
    #[error("failed to initialise payload generator: {0}")]
    PayloadGeneration(#[from] rand::Error),
}

/// JSON body returned for every [`ApiError`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidMetrics(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Reasons a geolocation lookup produced no location.
///
/// Never shown to clients; [`crate::geo::resolve_location`] turns every variant
/// into the "unknown" location.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("upstream reported an error: {0}")]
    Upstream(String),

    #[error("lookup timed out")]
    Timeout,
}

/// Rejected startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{var}={value} is out of range, expected {expected}")]
    OutOfRange {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn invalid(var: &'static str, value: impl Display) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
        }
    }
}

/// Failures of the client-side orchestrator.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("every ping failed, latency cannot be computed")]
    NoLatencySamples,

    #[error(transparent)]
    Payload(#[from] rand::Error),
}
