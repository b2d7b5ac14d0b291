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

use crate::client::ClientError;
use crate::metrics::TemperatureMetrics;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{Instrument, Level};

/// Time to wait after a successful poll before the next one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Time to wait after a failed poll before the next one.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

/// Something that can provide the current temperature of a station in celsius.
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    async fn temperature(&self, station: &str) -> Result<f64, ClientError>;
}

/// Fetch the temperature of a single station forever, publishing it as metrics.
///
/// Each cycle counts a query attempt no matter the outcome. Successful fetches set the
/// temperature gauge and the next cycle runs after the normal interval. Failed fetches
/// are logged, leave the gauge at its last value, and the next cycle runs after the
/// (shorter) backoff interval. There is no limit on the number of retries.
pub struct Poller<S> {
    source: S,
    metrics: TemperatureMetrics,
    station: String,
    interval: Duration,
    backoff: Duration,
}

impl<S> Poller<S>
where
    S: TemperatureSource,
{
    pub fn new<T: Into<String>>(source: S, metrics: TemperatureMetrics, station: T) -> Self {
        Poller {
            source,
            metrics,
            station: station.into(),
            interval: DEFAULT_INTERVAL,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_intervals(self, interval: Duration, backoff: Duration) -> Self {
        Poller {
            interval,
            backoff,
            ..self
        }
    }

    /// Run a single fetch and update metrics, returning how long to wait before the next one.
    pub async fn poll_once(&self) -> Duration {
        let res = self.source.temperature(&self.station).await;
        self.metrics.increment_query_count(&self.station);

        match res {
            Ok(v) => {
                self.metrics.set_temperature(&self.station, v);
                tracing::info!(
                    message = "fetched new temperature",
                    station = %self.station,
                    temperature = v,
                    next_secs = self.interval.as_secs(),
                );

                self.interval
            }
            Err(e) => {
                tracing::error!(
                    message = "failed to fetch temperature, not updating metrics",
                    station = %self.station,
                    kind = %e.kind(),
                    error = %e,
                    backoff_secs = self.backoff.as_secs(),
                );

                self.backoff
            }
        }
    }

    /// Poll until any value is sent on `shutdown` or its sender is dropped.
    ///
    /// The first poll happens immediately. Shutdown is only observed while waiting
    /// between polls, a poll that has started always finishes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            message = "temperature polling started",
            station = %self.station,
            interval_secs = self.interval.as_secs(),
            backoff_secs = self.backoff.as_secs(),
        );

        loop {
            let delay = self
                .poll_once()
                .instrument(tracing::span!(Level::DEBUG, "nws_observation"))
                .await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!(message = "temperature polling stopped", station = %self.station);
    }
}
