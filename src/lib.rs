//! # speedscan
//!
//! A self-hosted link quality test server.
//!
//! The server exposes a handful of stateless measurement endpoints. A client
//! (the browser page, or the bundled `speedscan-probe`) times requests against
//! them to estimate latency, jitter, packet loss and throughput, then posts its
//! numbers back to `/compile_report` to get a report enriched with coarse
//! geolocation.
//!
//! | Method | Path              | Purpose                                 |
//! |--------|-------------------|-----------------------------------------|
//! | GET    | `/ping`           | empty 200, latency probe                |
//! | GET    | `/download`       | random payload of a fixed size          |
//! | POST   | `/upload`         | drains and discards the body            |
//! | GET    | `/get_info`       | caller IP and location                  |
//! | POST   | `/compile_report` | assembles the final report              |
//! | GET    | `/config`         | test parameters for clients             |

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

pub mod config;
pub mod error;
pub mod geo;
pub mod measurement;
pub mod models;
pub mod orchestrator;
pub mod payload;
pub mod report;

use std::convert::Infallible;

use actix_web::body::SizedStream;
use actix_web::http::header::{self, ContentType};
use actix_web::middleware::Logger;
use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use bytes::Bytes;
use futures::StreamExt;

pub use config::Config;
pub use error::{ApiError, ConfigError, GeoError, ProbeError};
pub use geo::{GeoResolver, IpApiResolver, resolve_location};
pub use models::*;
use payload::RandomPayload;

/// Response header carrying the number of bytes `/upload` drained.
pub const UPLOAD_BYTES_HEADER: &str = "x-upload-bytes";

/// Paths left out of the access log: every `/ping` is a timed round trip and
/// `/upload` is hit once per upload chunk.
pub const UNLOGGED_PATHS: &[&str] = &["/ping", "/upload"];

/// Access log middleware for the measurement endpoints.
pub fn access_logger() -> Logger {
    UNLOGGED_PATHS
        .iter()
        .fold(Logger::default(), |logger, path| logger.exclude(*path))
}

/// Registers every measurement endpoint.
///
/// The application must also provide `web::Data<Config>` and
/// `web::Data<dyn GeoResolver>`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, _req| ApiError::InvalidMetrics(err.to_string()).into());

    cfg.app_data(json_config)
        .service(ping)
        .service(download)
        .service(upload)
        .service(get_info)
        .service(compile_report)
        .service(test_plan);
}

/// Address of the connected peer. Forwarding headers are deliberately not
/// consulted.
fn peer_ip(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}

fn user_agent(req: &HttpRequest) -> String {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// HTTP GET endpoint `/ping` returns an empty 200 and does nothing else.
#[get("/ping")]
pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// HTTP GET endpoint `/download` streams `Config::download_bytes` of random
/// data.
///
/// Chunks are generated as the connection drains them; when the client goes
/// away actix drops the body and generation stops with it.
#[get("/download")]
pub async fn download(config: web::Data<Config>) -> Result<HttpResponse, ApiError> {
    let payload = RandomPayload::new(config.download_bytes, config.chunk_size)?;
    Ok(stream_response(payload.remaining(), payload))
}

/// Builds an uncacheable `application/octet-stream` response of exactly `len`
/// bytes whose body pulls `chunks` only as the connection drains.
pub fn stream_response<I>(len: u64, chunks: I) -> HttpResponse
where
    I: Iterator<Item = Bytes> + 'static,
{
    let body = SizedStream::new(len, futures::stream::iter(chunks.map(Ok::<Bytes, Infallible>)));

    HttpResponse::Ok()
        .content_type(ContentType::octet_stream())
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(body)
}

/// HTTP POST endpoint `/upload` reads the whole request body, discards it and
/// answers with an empty 200.
///
/// A client that disconnects mid-body ends the drain early; that is a normal
/// outcome for a throughput test, not an error.
#[post("/upload")]
pub async fn upload(mut body: web::Payload) -> HttpResponse {
    let mut received: u64 = 0;
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => received += bytes.len() as u64,
            Err(e) => {
                log::debug!("Upload ended after {} bytes: {}", received, e);
                break;
            }
        }
    }

    HttpResponse::Ok()
        .insert_header((UPLOAD_BYTES_HEADER, received.to_string()))
        .finish()
}

/// HTTP GET endpoint `/get_info` returns the caller's address and location.
#[get("/get_info")]
pub async fn get_info(
    req: HttpRequest,
    config: web::Data<Config>,
    resolver: web::Data<dyn GeoResolver>,
) -> impl Responder {
    let client_ip = peer_ip(&req);
    let location = match &client_ip {
        Some(ip) => resolve_location(resolver.get_ref(), ip, config.geo_timeout).await,
        None => LocationInfo::unknown(),
    };

    web::Json(ClientInfo {
        client_ip: client_ip.unwrap_or_else(|| UNKNOWN.to_string()),
        location,
    })
}

/// HTTP POST endpoint `/compile_report` turns submitted metrics into a
/// [`Report`].
///
/// Returns HTTP 400 when any metric is missing or not a non-negative number.
#[post("/compile_report")]
pub async fn compile_report(
    req: HttpRequest,
    metrics: web::Json<ClientMetrics>,
    config: web::Data<Config>,
    resolver: web::Data<dyn GeoResolver>,
) -> impl Responder {
    let report = report::compile(
        metrics.into_inner(),
        peer_ip(&req),
        user_agent(&req),
        resolver.get_ref(),
        config.geo_timeout,
    )
    .await;

    web::Json(report)
}

/// HTTP GET endpoint `/config` publishes the parameters clients should use.
#[get("/config")]
pub async fn test_plan(config: web::Data<Config>) -> impl Responder {
    web::Json(TestPlan::from(config.get_ref()))
}
