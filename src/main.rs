//! # speedscan
//!
//! A self-hosted link quality test server.

// Copyright (c) 2025 Jak Bracegirdle
//
// This file is part of the speedscan crate.
//
// Licensed under the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <http://opensource.org/licenses/MIT>, at your option.
// This file may not be copied, modified, or distributed except according to those terms.

use std::io;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use speedscan::{Config, GeoResolver, IpApiResolver, access_logger, routes};

/// Main entrypoint loads configuration and starts the Actix-web server.
///
/// Binds to `BIND_ADDRESS` and `BIND_PORT` or their defaults (`0.0.0.0:3360`).
/// Invalid configuration aborts startup with an `InvalidInput` error.
#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let resolver = IpApiResolver::new(&config.geo_api_url, config.geo_timeout)
        .map_err(io::Error::other)?;
    let resolver: Arc<dyn GeoResolver> = Arc::new(resolver);

    log::info!(
        "Starting server at http://{}:{} (download {} bytes, chunk {} bytes)",
        config.bind_address,
        config.port,
        config.download_bytes,
        config.chunk_size
    );

    let bind = (config.bind_address.clone(), config.port);
    let config = web::Data::new(config);
    let resolver = web::Data::from(resolver);

    HttpServer::new(move || {
        App::new()
            .wrap(access_logger())
            .app_data(config.clone())
            .app_data(resolver.clone())
            .configure(routes)
    })
    .bind(bind)?
    .run()
    .await
}
