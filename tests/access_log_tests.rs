//! Access log coverage of the measurement endpoints.
//!
//! Log records are captured by a process-wide `log::Log`, so this file holds a
//! single test.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

mod common;

use std::sync::Mutex;

use actix_web::{App, test};
use common::*;
use log::{LevelFilter, Log, Metadata, Record};
use speedscan::{access_logger, routes};

static LINES: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct Capture;

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.target().starts_with("actix_web::middleware::logger") {
            LINES.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;

#[actix_web::test]
async fn measurement_hot_paths_are_not_access_logged() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Info);

    let (config, resolver) = app_data(test_config(MIB), fixed());
    let app = test::init_service(
        App::new()
            .wrap(access_logger())
            .app_data(config)
            .app_data(resolver)
            .configure(routes),
    )
    .await;

    for _ in 0..3 {
        let req = test::TestRequest::get().uri("/ping").to_request();
        test::call_and_read_body(&app, req).await;
    }
    let req = test::TestRequest::post()
        .uri("/upload")
        .set_payload(vec![0u8; 64 * 1024])
        .to_request();
    test::call_and_read_body(&app, req).await;
    let req = test::TestRequest::get().uri("/config").to_request();
    test::call_and_read_body(&app, req).await;

    let lines = LINES.lock().unwrap();
    assert!(
        lines.iter().all(|line| !line.contains("/ping") && !line.contains("/upload")),
        "{lines:?}"
    );
    assert!(lines.iter().any(|line| line.contains("GET /config")), "{lines:?}");
}
