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

use crate::poller::TemperatureSource;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::error;
use std::fmt;

/// Broad category of a `ClientError`, used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Parse => write!(f, "parse"),
        }
    }
}

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    InvalidBaseUrl(Url),
    InvalidStation(String),
    Unexpected(StatusCode, Url),
    Decode(serde_json::Error),
    MissingValue(Url),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Internal(_) | Self::InvalidBaseUrl(_) | Self::InvalidStation(_) | Self::Unexpected(_, _) => {
                ErrorKind::Transport
            }
            Self::Decode(_) | Self::MissingValue(_) => ErrorKind::Parse,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::InvalidBaseUrl(u) => write!(f, "invalid base URL {}", u),
            Self::InvalidStation(s) => write!(f, "invalid station {}", s),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Decode(e) => write!(f, "unable to decode observation: {}", e),
            Self::MissingValue(url) => write!(f, "no temperature value in observation from {}", url),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Client for the latest observation of a station from the api.weather.gov API.
///
/// The request timeout is whatever the underlying `reqwest::Client` was built with.
/// No retries are performed, callers decide what to do about failures.
#[derive(Debug)]
pub struct WeatherGovClient {
    client: Client,
    base_url: Url,
}

impl WeatherGovClient {
    const USER_AGENT: &'static str = "helloworld_exporter (https://github.com/56quarters/nws_exporter)";
    const JSON_RESPONSE: &'static str = "application/geo+json";

    pub fn new(client: Client, base_url: Url) -> Result<Self, ClientError> {
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }

        Ok(WeatherGovClient { client, base_url })
    }

    /// Fetch and decode the latest observation for a station.
    pub async fn observation(&self, station: &str) -> Result<Observation, ClientError> {
        let request_url = self.observation_url(station);
        tracing::debug!(message = "making latest observation request", url = %request_url);

        let res = self.make_request(station, request_url).await?;
        let body = res.bytes().await.map_err(ClientError::Internal)?;
        serde_json::from_slice::<Observation>(&body).map_err(ClientError::Decode)
    }

    /// Fetch the current temperature for a station in degrees celsius.
    ///
    /// A `null` or absent temperature is treated as an error rather than a
    /// reading of zero.
    pub async fn temperature(&self, station: &str) -> Result<f64, ClientError> {
        let obs = self.observation(station).await?;
        let temperature = &obs.properties.temperature;
        tracing::trace!(message = "decoded temperature", value = ?temperature.value, unit = ?temperature.unit_code);

        temperature
            .value
            .ok_or_else(|| ClientError::MissingValue(self.observation_url(station)))
    }

    async fn make_request<S: Into<String>>(&self, station: S, url: Url) -> Result<Response, ClientError> {
        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        if status == StatusCode::OK {
            Ok(res)
        } else if status == StatusCode::NOT_FOUND {
            Err(ClientError::InvalidStation(station.into()))
        } else {
            Err(ClientError::Unexpected(status, url))
        }
    }

    fn observation_url(&self, station: &str) -> Url {
        let mut url = self.base_url.clone();
        // Base URLs that can't have path segments are rejected by `new()`
        if let Ok(mut p) = url.path_segments_mut() {
            p.clear()
                .push("stations")
                .push(station)
                .push("observations")
                .push("latest");
        }

        url
    }
}

#[async_trait]
impl TemperatureSource for WeatherGovClient {
    async fn temperature(&self, station: &str) -> Result<f64, ClientError> {
        WeatherGovClient::temperature(self, station).await
    }
}

#[derive(Deserialize, Debug)]
pub struct Observation {
    #[serde(alias = "properties")]
    pub properties: ObservationProperties,
}

#[derive(Deserialize, Debug)]
pub struct ObservationProperties {
    #[serde(alias = "temperature")]
    pub temperature: Measurement,
}

#[derive(Deserialize, Debug)]
pub struct Measurement {
    #[serde(alias = "unitCode")]
    pub unit_code: Option<String>,
    #[serde(alias = "value")]
    pub value: Option<f64>,
}
