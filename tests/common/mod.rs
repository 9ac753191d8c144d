// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

//! Helpers shared by the integration test binaries.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{App, HttpServer, web};
use async_trait::async_trait;
use speedscan::{Config, GeoError, GeoResolver, LocationInfo, routes};

pub const MIB: u64 = 1024 * 1024;

/// Always answers with the same location.
pub struct FixedResolver(pub LocationInfo);

#[async_trait]
impl GeoResolver for FixedResolver {
    async fn lookup(&self, _ip: &str) -> Result<LocationInfo, GeoError> {
        Ok(self.0.clone())
    }
}

/// Simulates an upstream that reports an error.
pub struct FailingResolver;

#[async_trait]
impl GeoResolver for FailingResolver {
    async fn lookup(&self, _ip: &str) -> Result<LocationInfo, GeoError> {
        Err(GeoError::Upstream("simulated outage".to_string()))
    }
}

/// Simulates an upstream that never answers in time.
pub struct HangingResolver;

#[async_trait]
impl GeoResolver for HangingResolver {
    async fn lookup(&self, _ip: &str) -> Result<LocationInfo, GeoError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(sample_location())
    }
}

/// Answers with [`sample_location`] and remembers every IP it was asked about.
#[derive(Default)]
pub struct RecordingResolver {
    pub lookups: Mutex<Vec<String>>,
}

#[async_trait]
impl GeoResolver for RecordingResolver {
    async fn lookup(&self, ip: &str) -> Result<LocationInfo, GeoError> {
        self.lookups.lock().unwrap().push(ip.to_string());
        Ok(sample_location())
    }
}

pub fn sample_location() -> LocationInfo {
    LocationInfo {
        city: "Amsterdam".to_string(),
        region: "North Holland".to_string(),
        country: "Netherlands".to_string(),
        isp: "AS1136 KPN B.V.".to_string(),
    }
}

pub fn fixed() -> Arc<dyn GeoResolver> {
    Arc::new(FixedResolver(sample_location()))
}

/// A config suited to tests: small payloads, short geolocation timeout.
pub fn test_config(download_bytes: u64) -> Config {
    Config {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        download_bytes,
        geo_timeout: Duration::from_millis(200),
        ..Config::default()
    }
}

/// Shared app data for `App::app_data`.
pub fn app_data(
    config: Config,
    resolver: Arc<dyn GeoResolver>,
) -> (web::Data<Config>, web::Data<dyn GeoResolver>) {
    (web::Data::new(config), web::Data::from(resolver))
}

/// Starts a real server on an ephemeral loopback port and returns its base
/// URL. The server lives as long as the test's actix system.
pub fn spawn_server(config: Config, resolver: Arc<dyn GeoResolver>) -> String {
    let (config, resolver) = app_data(config, resolver);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(resolver.clone())
            .configure(routes)
    })
    .workers(2)
    .disable_signals()
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}
