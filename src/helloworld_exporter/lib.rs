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

//! Prometheus exporter for outdoor temperature from api.weather.gov
//!
//! ## Features
//!
//! `helloworld_exporter` fetches the latest observation for a particular [NWS station] using the
//! [api.weather.gov] API and emits the temperature as a Prometheus metric. The following metrics are
//! emitted.
//!
//! * `helloworld_outdoor_temperature_celsius{station=$STATION}` - Last temperature fetched, in degrees celsius.
//! * `helloworld_nws_query_attempts_total{station=$STATION}` - Number of requests made to the API, successful
//!   or not.
//!
//! The temperature is fetched every five minutes. If a request fails (the API is down, returns something
//! that isn't an observation, or the observation doesn't include a temperature) the temperature metric keeps
//! its previous value and another request is made after one minute. An attempt count that keeps increasing
//! while the temperature doesn't change is a sign that requests are failing.
//!
//! [NWS station]: https://www.weather.gov/documentation/services-web-api#/default/obs_stations
//! [api.weather.gov]: https://www.weather.gov/documentation/services-web-api
//!
//! ## Usage
//!
//! By default, the station at Logan Airport in Boston (`KBOS`) is used. A different station can be picked
//! with the `--station` flag. You can get a list of the available stations in your state by using the API
//! itself, the `properties.stationIdentifier` field of each station is the ID to use.
//!
//! ```text
//! curl -sS 'https://api.weather.gov/stations?state=MA' | jq | less
//! ./helloworld_exporter --station KBOS
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `23456` at `/metrics`. Add the host running `helloworld_exporter`
//! as a target under the Prometheus `scrape_configs` section as described by the example below.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: helloworld_exporter
//!   static_configs:
//!   - targets: ['example:23456']
//! ```
//!

pub mod client;
pub mod http;
pub mod metrics;
pub mod poller;
