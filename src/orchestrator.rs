//! Client side of the measurement protocol.
//!
//! Runs the phases strictly in order, each one finishing before the next
//! starts: ping, packet loss, download, upload, then report submission.
//! Unlike the browser page, loss probes here enforce a real per-request
//! timeout.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, Response};

use crate::error::ProbeError;
use crate::measurement::{LatencyStats, loss_percent, throughput_mbps};
use crate::models::{ClientInfo, ClientMetrics, Metric, Report, TestPlan};
use crate::payload::RandomPayload;

/// Bytes moved during one transfer phase and how long it took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub bytes: u64,
    pub elapsed: Duration,
}

impl Throughput {
    pub fn mbps(&self) -> f64 {
        throughput_mbps(self.bytes, self.elapsed)
    }
}

fn http_error(endpoint: &'static str) -> impl FnOnce(reqwest::Error) -> ProbeError {
    move |source| ProbeError::Http { endpoint, source }
}

fn ensure_success(endpoint: &'static str, response: Response) -> Result<Response, ProbeError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ProbeError::Status {
            endpoint,
            status: response.status().as_u16(),
        })
    }
}

/// Drives a full test against one server.
pub struct Orchestrator {
    client: Client,
    base_url: String,
}

impl Orchestrator {
    /// Creates an orchestrator for the server at `base_url`
    /// (e.g. `http://127.0.0.1:3360`).
    pub fn new(base_url: &str) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .user_agent(concat!("speedscan-probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(http_error("client"))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, endpoint: &'static str) -> Result<Response, ProbeError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(http_error(endpoint))?;
        ensure_success(endpoint, response)
    }

    /// Fetches the server's test parameters.
    pub async fn fetch_plan(&self) -> Result<TestPlan, ProbeError> {
        self.get("/config")
            .await?
            .json()
            .await
            .map_err(http_error("/config"))
    }

    pub async fn client_info(&self) -> Result<ClientInfo, ProbeError> {
        self.get("/get_info")
            .await?
            .json()
            .await
            .map_err(http_error("/get_info"))
    }

    /// Times `count` sequential pings. Failed pings are left out of the
    /// statistics; an error is returned only if none succeeded.
    pub async fn measure_latency(&self, count: u32) -> Result<LatencyStats, ProbeError> {
        let mut samples = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let start = Instant::now();
            let outcome = match self.get("/ping").await {
                Ok(response) => response.bytes().await.map_err(http_error("/ping")),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(_) => samples.push(start.elapsed()),
                Err(e) => log::debug!("Ping failed: {}", e),
            }
        }

        LatencyStats::from_samples(&samples).ok_or(ProbeError::NoLatencySamples)
    }

    /// Sends `probes` pings, each bounded by `timeout`, and returns the
    /// percentage that failed or timed out.
    pub async fn measure_packet_loss(&self, probes: u32, timeout: Duration) -> f64 {
        let mut lost = 0;
        for _ in 0..probes {
            let outcome = self
                .client
                .get(self.url("/ping"))
                .timeout(timeout)
                .send()
                .await;
            match outcome {
                Ok(response) if response.status().is_success() => {}
                _ => lost += 1,
            }
        }
        loss_percent(lost, probes)
    }

    /// Downloads the full `/download` body, timing from request start to the
    /// last byte.
    pub async fn measure_download(&self) -> Result<Throughput, ProbeError> {
        let start = Instant::now();
        let mut response = self.get("/download").await?;

        let mut bytes = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(http_error("/download"))? {
            bytes += chunk.len() as u64;
        }

        Ok(Throughput {
            bytes,
            elapsed: start.elapsed(),
        })
    }

    /// Posts `chunk_bytes` bodies back to back until `window` has elapsed.
    pub async fn measure_upload(
        &self,
        window: Duration,
        chunk_bytes: usize,
    ) -> Result<Throughput, ProbeError> {
        let body: Bytes = RandomPayload::new(chunk_bytes as u64, chunk_bytes)?
            .next()
            .unwrap_or_default();

        let start = Instant::now();
        let mut bytes = 0u64;
        while start.elapsed() < window {
            let response = self
                .client
                .post(self.url("/upload"))
                .body(body.clone())
                .send()
                .await
                .map_err(http_error("/upload"))?;
            ensure_success("/upload", response)?;
            bytes += body.len() as u64;
        }

        Ok(Throughput {
            bytes,
            elapsed: start.elapsed(),
        })
    }

    pub async fn submit(&self, metrics: &ClientMetrics) -> Result<Report, ProbeError> {
        let response = self
            .client
            .post(self.url("/compile_report"))
            .json(metrics)
            .send()
            .await
            .map_err(http_error("/compile_report"))?;

        ensure_success("/compile_report", response)?
            .json()
            .await
            .map_err(http_error("/compile_report"))
    }

    /// Runs every phase and returns the server-compiled report.
    pub async fn run(&self) -> Result<Report, ProbeError> {
        let plan = self.fetch_plan().await?;
        let info = self.client_info().await?;
        log::info!("Testing from {} ({:?})", info.client_ip, info.location);

        let latency = self.measure_latency(plan.ping_count).await?;
        log::info!("Ping {:.2} ms, jitter {:.2} ms", latency.avg_ms, latency.jitter_ms);

        let loss = self
            .measure_packet_loss(
                plan.packet_loss_probes,
                Duration::from_millis(plan.packet_loss_timeout_ms),
            )
            .await;
        log::info!("Packet loss {:.2}%", loss);

        let download = self.measure_download().await?;
        log::info!("Download {:.2} Mbps ({} bytes)", download.mbps(), download.bytes);

        let upload = self
            .measure_upload(
                Duration::from_secs(plan.upload_duration_secs),
                plan.upload_chunk_bytes,
            )
            .await?;
        log::info!("Upload {:.2} Mbps ({} bytes)", upload.mbps(), upload.bytes);

        let metrics = ClientMetrics {
            dl_speed: Metric::fixed(download.mbps()),
            ul_speed: Metric::fixed(upload.mbps()),
            avg_ping: Metric::fixed(latency.avg_ms),
            jitter: Metric::fixed(latency.jitter_ms),
            packet_loss: Metric::fixed(loss),
        };
        self.submit(&metrics).await
    }
}
