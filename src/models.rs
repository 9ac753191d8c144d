//! Wire types.
//!
//! Shared by the server endpoints and the bundled Rust client in
//! [`crate::orchestrator`].

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::Config;

/// Placeholder used for any location field that could not be resolved.
pub const UNKNOWN: &str = "unknown";

/// Coarse location of a client IP address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LocationInfo {
    pub city: String,
    pub region: String,
    pub country: String,
    pub isp: String,
}

impl LocationInfo {
    /// The location reported whenever resolution fails.
    pub fn unknown() -> Self {
        Self {
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
        }
    }

    /// Builds a location from optional parts, filling the gaps with
    /// [`UNKNOWN`].
    pub fn from_parts(
        city: Option<String>,
        region: Option<String>,
        country: Option<String>,
        isp: Option<String>,
    ) -> Self {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            city: or_unknown(city),
            region: or_unknown(region),
            country: or_unknown(country),
            isp: or_unknown(isp),
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

/// Body of `GET /get_info`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub client_ip: String,
    pub location: LocationInfo,
}

#[derive(Debug, Clone, PartialEq)]
enum Repr {
    Integer(u64),
    Float,
    Text(String),
}

/// A single client-measured value.
///
/// Accepts a JSON number or a numeric string (browsers submit
/// `toFixed(2)` strings) and serializes back in the form it was received.
/// Negative, non-finite and non-numeric input is rejected during
/// deserialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    value: f64,
    repr: Repr,
}

impl Metric {
    /// A metric that serializes as a JSON number.
    pub fn new(value: f64) -> Self {
        Self {
            value,
            repr: Repr::Float,
        }
    }

    /// A metric that serializes as a string with two decimals, the way the
    /// browser client submits its results.
    ///
    /// ```
    /// # use speedscan::Metric;
    /// let m = Metric::fixed(93.4189);
    /// assert_eq!(serde_json::to_string(&m).unwrap(), "\"93.42\"");
    /// assert_eq!(m.value(), 93.4189);
    /// ```
    pub fn fixed(value: f64) -> Self {
        Self {
            value,
            repr: Repr::Text(format!("{value:.2}")),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    fn parse_text(text: &str) -> Result<Self, String> {
        let value = text
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{text:?} is not a number"))?;
        Self::check(value)?;
        Ok(Self {
            value,
            repr: Repr::Text(text.to_string()),
        })
    }

    fn check(value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err(format!("{value} is not finite"));
        }
        if value < 0.0 {
            return Err(format!("{value} is negative"));
        }
        Ok(())
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.repr {
            Repr::Integer(n) => serializer.serialize_u64(*n),
            Repr::Float => serializer.serialize_f64(self.value),
            Repr::Text(text) => serializer.serialize_str(text),
        }
    }
}

struct MetricVisitor;

impl<'de> Visitor<'de> for MetricVisitor {
    type Value = Metric;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative number or numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Metric, E> {
        Ok(Metric {
            value: v as f64,
            repr: Repr::Integer(v),
        })
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Metric, E> {
        match u64::try_from(v) {
            Ok(v) => self.visit_u64(v),
            Err(_) => Err(E::custom(format!("{v} is negative"))),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Metric, E> {
        Metric::check(v).map_err(E::custom)?;
        Ok(Metric::new(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Metric, E> {
        Metric::parse_text(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MetricVisitor)
    }
}

/// Results a client submits to `POST /compile_report`.
///
/// Every field is required: a missing value means the client never measured
/// it, which is different from a measured zero.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetrics {
    /// Mbps.
    pub dl_speed: Metric,
    /// Mbps.
    pub ul_speed: Metric,
    /// Milliseconds.
    pub avg_ping: Metric,
    /// Milliseconds.
    pub jitter: Metric,
    /// Percent of probes lost.
    pub packet_loss: Metric,
}

/// Body of `POST /compile_report`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub client_ip: String,
    pub location: LocationInfo,
    /// Server local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    pub dl_speed: Metric,
    pub ul_speed: Metric,
    pub avg_ping: Metric,
    pub jitter: Metric,
    pub packet_loss: Metric,
    pub user_agent: String,
}

/// Body of `GET /config`: the parameters a client needs to run the test.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TestPlan {
    pub ping_count: u32,
    pub packet_loss_probes: u32,
    pub packet_loss_timeout_ms: u64,
    pub download_bytes: u64,
    pub upload_chunk_bytes: usize,
    pub upload_duration_secs: u64,
}

impl From<&Config> for TestPlan {
    fn from(config: &Config) -> Self {
        Self {
            ping_count: config.ping_count,
            packet_loss_probes: config.packet_loss_probes,
            packet_loss_timeout_ms: config.packet_loss_timeout.as_millis() as u64,
            download_bytes: config.download_bytes,
            upload_chunk_bytes: config.chunk_size,
            upload_duration_secs: config.upload_duration.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metrics(body: serde_json::Value) -> Result<ClientMetrics, serde_json::Error> {
        serde_json::from_value(body)
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let m = metrics(json!({
            "dlSpeed": "93.42",
            "ulSpeed": 12.1,
            "avgPing": 14,
            "jitter": "2.01",
            "packetLoss": "0.00",
        }))
        .unwrap();

        assert_eq!(m.dl_speed.value(), 93.42);
        assert_eq!(m.ul_speed.value(), 12.1);
        assert_eq!(m.avg_ping.value(), 14.0);
        assert_eq!(m.packet_loss.value(), 0.0);
    }

    #[test]
    fn echoes_the_submitted_form() {
        let input = json!({
            "dlSpeed": "93.42",
            "ulSpeed": 12.5,
            "avgPing": 14,
            "jitter": "2.01",
            "packetLoss": "0.00",
        });
        let m = metrics(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&m).unwrap(), input);
    }

    #[test]
    fn rejects_missing_field() {
        let err = metrics(json!({
            "dlSpeed": "93.42",
            "ulSpeed": "12.10",
            "avgPing": "14.33",
            "jitter": "2.01",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("packetLoss"));
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [json!("fast"), json!(null), json!(-1), json!("-0.5"), json!("NaN"), json!(true)];
        for value in bad {
            let body = json!({
                "dlSpeed": value,
                "ulSpeed": "12.10",
                "avgPing": "14.33",
                "jitter": "2.01",
                "packetLoss": "0.00",
            });
            assert!(metrics(body).is_err(), "accepted {value}");
        }
    }

    #[test]
    fn partial_location_is_filled_with_unknown() {
        let loc = LocationInfo::from_parts(Some("Berlin".into()), None, Some("Germany".into()), None);
        assert_eq!(loc.city, "Berlin");
        assert_eq!(loc.region, UNKNOWN);
        assert_eq!(loc.isp, UNKNOWN);
        assert!(!loc.is_unknown());
        assert!(LocationInfo::unknown().is_unknown());
    }
}
