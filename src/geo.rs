//! IP geolocation.
//!
//! Location is cosmetic metadata for the report, so lookups are fail-soft:
//! [`resolve_location`] never returns an error and never waits longer than its
//! timeout.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time;

use crate::error::GeoError;
use crate::models::LocationInfo;

/// Trait to abstract the IP-to-location lookup.
///
/// Allows substituting the upstream service in tests.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Looks up the location of `ip`.
    async fn lookup(&self, ip: &str) -> Result<LocationInfo, GeoError>;
}

/// Resolves `ip` through `resolver`, bounded by `limit`.
///
/// Any failure, including the timeout, is logged and replaced with
/// [`LocationInfo::unknown`].
pub async fn resolve_location(resolver: &dyn GeoResolver, ip: &str, limit: Duration) -> LocationInfo {
    let outcome = match time::timeout(limit, resolver.lookup(ip)).await {
        Ok(result) => result,
        Err(_) => Err(GeoError::Timeout),
    };

    match outcome {
        Ok(location) => location,
        Err(e) => {
            log::warn!("Geolocation lookup for {} failed: {}", ip, e);
            LocationInfo::unknown()
        }
    }
}

/// Response from the ipapi.co JSON API.
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    org: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
}

impl IpApiResponse {
    fn into_location(self) -> Result<LocationInfo, GeoError> {
        let failed = match &self.error {
            None | Some(serde_json::Value::Bool(false)) => false,
            Some(_) => true,
        };
        if failed {
            let reason = self.reason.unwrap_or_else(|| "unspecified".to_string());
            return Err(GeoError::Upstream(reason));
        }

        Ok(LocationInfo::from_parts(
            self.city,
            self.region,
            self.country_name,
            self.org,
        ))
    }
}

/// [`GeoResolver`] backed by an ipapi.co compatible HTTP service.
pub struct IpApiResolver {
    client: reqwest::Client,
    base_url: String,
}

impl IpApiResolver {
    /// Creates a resolver querying `{base_url}/{ip}/json/`.
    ///
    /// `timeout` bounds each outbound request at the HTTP client level.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("speedscan/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoResolver for IpApiResolver {
    async fn lookup(&self, ip: &str) -> Result<LocationInfo, GeoError> {
        let url = format!("{}/{}/json/", self.base_url, ip);
        log::debug!("Querying location for IP: {}", ip);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeoError::Status(response.status().as_u16()));
        }

        let body: IpApiResponse = response.json().await?;
        body.into_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<LocationInfo, GeoError> {
        serde_json::from_str::<IpApiResponse>(raw).unwrap().into_location()
    }

    #[test]
    fn maps_ipapi_fields() {
        let loc = parse(
            r#"{"ip":"8.8.8.8","city":"Mountain View","region":"California",
                "country_name":"United States","org":"GOOGLE"}"#,
        )
        .unwrap();

        assert_eq!(loc.city, "Mountain View");
        assert_eq!(loc.region, "California");
        assert_eq!(loc.country, "United States");
        assert_eq!(loc.isp, "GOOGLE");
    }

    #[test]
    fn error_field_is_a_failure() {
        let err = parse(r#"{"ip":"127.0.0.1","error":true,"reason":"Reserved IP Address"}"#).unwrap_err();
        assert!(matches!(err, GeoError::Upstream(reason) if reason == "Reserved IP Address"));
    }

    #[test]
    fn explicit_false_error_is_not_a_failure() {
        let loc = parse(r#"{"city":"Oslo","error":false}"#).unwrap();
        assert_eq!(loc.city, "Oslo");
        assert_eq!(loc.country, "unknown");
    }
}
