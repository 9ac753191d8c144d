//! # speedscan-probe
//!
//! Command line client that runs the full test against a speedscan server and
//! prints the compiled report as JSON.
//!
//! Usage: `speedscan-probe [BASE_URL]`. The URL falls back to `PROBE_URL`, then
//! to `http://127.0.0.1:3360`.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::env;
use std::process::ExitCode;

use speedscan::orchestrator::Orchestrator;

const DEFAULT_URL: &str = "http://127.0.0.1:3360";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let base_url = env::args()
        .nth(1)
        .or_else(|| env::var("PROBE_URL").ok())
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let orchestrator = match Orchestrator::new(&base_url) {
        Ok(o) => o,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.run().await {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Failed to serialize report: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("Test against {} failed: {}", base_url, e);
            ExitCode::FAILURE
        }
    }
}
