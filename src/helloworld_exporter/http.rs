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

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const TEXT_FORMAT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Global state shared between all HTTP requests via `Arc`.
#[derive(Debug)]
pub struct RequestContext {
    registry: Registry,
}

impl RequestContext {
    pub fn new(registry: Registry) -> Self {
        RequestContext { registry }
    }
}

/// Build the router serving `GET /metrics`.
///
/// Other methods for `/metrics` get a 405 and any other path gets a 404.
pub fn app(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/metrics", get(text_metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

/// Encode every metric in the registry in the OpenMetrics text format.
pub async fn text_metrics_handler(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();

    match encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, TEXT_FORMAT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics to text format", error = %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{app, RequestContext, TEXT_FORMAT};
    use crate::metrics::{sample, TemperatureMetrics, NAMESPACE};
    use prometheus_client::registry::Registry;
    use reqwest::header::CONTENT_TYPE;
    use reqwest::{Client, StatusCode};
    use std::net::{SocketAddr, TcpListener};
    use std::sync::Arc;

    async fn serve() -> (SocketAddr, TemperatureMetrics) {
        let mut registry = Registry::with_prefix(NAMESPACE);
        let metrics = TemperatureMetrics::new(&mut registry);
        let context = Arc::new(RequestContext::new(registry));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(app(context).into_make_service())
                .await
                .unwrap();
        });

        (addr, metrics)
    }

    #[tokio::test]
    async fn test_metrics() {
        let (addr, metrics) = serve().await;
        metrics.increment_query_count("KBOS");
        metrics.set_temperature("KBOS", 21.5);

        let res = Client::new()
            .get(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap();

        assert_eq!(StatusCode::OK, res.status());
        assert_eq!(TEXT_FORMAT, res.headers()[CONTENT_TYPE].to_str().unwrap());

        let body = res.text().await.unwrap();
        assert_eq!(
            Some(21.5),
            sample(&body, "helloworld_outdoor_temperature_celsius", "KBOS")
        );
        assert_eq!(Some(1.0), sample(&body, "helloworld_nws_query_attempts_total", "KBOS"));
    }

    #[tokio::test]
    async fn test_metrics_repeated_scrapes_identical() {
        let (addr, metrics) = serve().await;
        metrics.increment_query_count("KBOS");
        metrics.set_temperature("KBOS", 3.0);

        let client = Client::new();
        let url = format!("http://{}/metrics", addr);
        let first = client.get(&url).send().await.unwrap().text().await.unwrap();
        let second = client.get(&url).send().await.unwrap().text().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_metrics_method_not_allowed() {
        let (addr, _metrics) = serve().await;
        let res = Client::new()
            .post(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap();

        assert_eq!(StatusCode::METHOD_NOT_ALLOWED, res.status());
    }

    #[tokio::test]
    async fn test_not_found() {
        let (addr, _metrics) = serve().await;
        let res = Client::new().get(format!("http://{}/", addr)).send().await.unwrap();

        assert_eq!(StatusCode::NOT_FOUND, res.status());
    }
}
