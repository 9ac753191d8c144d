//! Report compilation.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::geo::{GeoResolver, resolve_location};
use crate::models::{ClientMetrics, LocationInfo, Report, UNKNOWN};

/// `strftime` layout of [`Report::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Report {
    /// Assembles a report from already-resolved parts.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chrono::{Local, TimeZone};
    /// # use speedscan::{ClientMetrics, LocationInfo, Metric, Report};
    /// let metrics = ClientMetrics {
    ///     dl_speed: Metric::fixed(93.42),
    ///     ul_speed: Metric::fixed(12.1),
    ///     avg_ping: Metric::fixed(14.33),
    ///     jitter: Metric::fixed(2.01),
    ///     packet_loss: Metric::fixed(0.0),
    /// };
    /// let at = Local.with_ymd_and_hms(2025, 8, 7, 12, 34, 56).unwrap();
    /// let report = Report::assemble(
    ///     metrics,
    ///     "203.0.113.7".into(),
    ///     LocationInfo::unknown(),
    ///     "curl/8.0".into(),
    ///     at,
    /// );
    /// assert_eq!(report.timestamp, "2025-08-07 12:34:56");
    /// assert_eq!(report.packet_loss.value(), 0.0);
    /// ```
    pub fn assemble(
        metrics: ClientMetrics,
        client_ip: String,
        location: LocationInfo,
        user_agent: String,
        at: DateTime<Local>,
    ) -> Self {
        let ClientMetrics {
            dl_speed,
            ul_speed,
            avg_ping,
            jitter,
            packet_loss,
        } = metrics;

        Self {
            client_ip,
            location,
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            dl_speed,
            ul_speed,
            avg_ping,
            jitter,
            packet_loss,
            user_agent,
        }
    }
}

/// Resolves the client's location, stamps the current server time and
/// assembles the final report.
///
/// Never fails: a geolocation failure yields an "unknown" location. Without a
/// client IP no lookup is attempted and both the IP and the location are
/// reported as unknown.
pub async fn compile(
    metrics: ClientMetrics,
    client_ip: Option<String>,
    user_agent: String,
    resolver: &dyn GeoResolver,
    geo_timeout: Duration,
) -> Report {
    let (client_ip, location) = match client_ip {
        Some(ip) => {
            let location = resolve_location(resolver, &ip, geo_timeout).await;
            (ip, location)
        }
        None => (UNKNOWN.to_string(), LocationInfo::unknown()),
    };
    let report = Report::assemble(metrics, client_ip, location, user_agent, Local::now());

    log::info!(
        "Report for {}: down {} Mbps, up {} Mbps, ping {} ms, jitter {} ms, loss {}%",
        report.client_ip,
        report.dl_speed.value(),
        report.ul_speed.value(),
        report.avg_ping.value(),
        report.jitter.value(),
        report.packet_loss.value(),
    );

    report
}
