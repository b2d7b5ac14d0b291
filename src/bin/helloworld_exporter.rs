// helloworld_exporter - Prometheus exporter for outdoor temperature from api.weather.gov
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use helloworld_exporter::client::WeatherGovClient;
use helloworld_exporter::http::RequestContext;
use helloworld_exporter::metrics::{TemperatureMetrics, NAMESPACE};
use helloworld_exporter::poller::Poller;
use prometheus_client::registry::Registry;
use reqwest::{Client, Url};
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tokio::sync::watch;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 23456);
const DEFAULT_STATION: &str = "KBOS";
const DEFAULT_REFRESH_SECS: u64 = 300;
const DEFAULT_BACKOFF_SECS: u64 = 60;
const DEFAULT_TIMEOUT_MILLIS: u64 = 30_000;
const DEFAULT_API_URL: &str = "https://api.weather.gov/";

#[derive(Debug, Parser)]
#[clap(name = "helloworld_exporter", version = clap::crate_version!())]
struct HelloWorldExporterApplication {
    /// NWS weather station ID to fetch the temperature for
    #[clap(long, default_value_t = DEFAULT_STATION.into())]
    station: String,

    /// Base URL for the Weather.gov API
    #[clap(long, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Fetch the temperature from the Weather.gov API at this interval, in seconds.
    #[clap(long, default_value_t = DEFAULT_REFRESH_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    refresh_secs: u64,

    /// Wait this long before trying again after failing to fetch the temperature, in seconds.
    #[clap(long, default_value_t = DEFAULT_BACKOFF_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    backoff_secs: u64,

    /// Timeout for fetching the temperature from the Weather.gov API, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Address to bind to. By default, helloworld_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = HelloWorldExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let api_url = Url::parse(&opts.api_url).unwrap_or_else(|e| {
        tracing::error!(message = "invalid API URL", api_url = %opts.api_url, error = %e);
        process::exit(1)
    });

    let client = WeatherGovClient::new(http_client, api_url).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize API client", error = %e);
        process::exit(1)
    });

    let mut registry = Registry::with_prefix(NAMESPACE);
    let metrics = TemperatureMetrics::new(&mut registry);
    let context = Arc::new(RequestContext::new(registry));

    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = Poller::new(client, metrics, opts.station.clone()).with_intervals(
        Duration::from_secs(opts.refresh_secs),
        Duration::from_secs(opts.backoff_secs),
    );
    let polling = tokio::spawn(poller.run(shutdown_rx));

    tracing::info!(message = "server started", address = %opts.bind, api_url = %opts.api_url, station = %opts.station);

    server
        .serve(helloworld_exporter::http::app(context).into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    let _ = shutdown_tx.send(true);
    polling.await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
