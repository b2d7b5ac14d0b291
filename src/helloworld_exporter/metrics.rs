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

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

/// Prefix for all metrics, expected to be used with `Registry::with_prefix()`
pub const NAMESPACE: &str = "helloworld";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StationLabels {
    station: String,
}

impl StationLabels {
    fn new(station: &str) -> Self {
        StationLabels {
            station: station.to_owned(),
        }
    }
}

/// Holder for the temperature gauge and the query attempt counter.
///
/// Both metrics are created and registered upon call to `TemperatureMetrics::new()` and have
/// a "station" label set to the station ID that was queried (e.g. `{station="KBOS"}`). Cloning
/// is cheap and clones share the same underlying metrics.
#[derive(Clone)]
pub struct TemperatureMetrics {
    temperature: Family<StationLabels, Gauge<f64, AtomicU64>>,
    queries: Family<StationLabels, Counter>,
}

impl TemperatureMetrics {
    /// Create a new `TemperatureMetrics` and register each metric with the provided `Registry`.
    ///
    /// The registry should be created with the `NAMESPACE` prefix, the metric names here
    /// don't include it.
    pub fn new(reg: &mut Registry) -> Self {
        let temperature = Family::<StationLabels, Gauge<f64, AtomicU64>>::default();
        let queries = Family::<StationLabels, Counter>::default();

        reg.register(
            "outdoor_temperature_celsius",
            "Outdoor temperature reported by the NWS",
            temperature.clone(),
        );
        // The `_total` suffix is added by prometheus-client for counters
        reg.register(
            "nws_query_attempts",
            "Number of times we've queried the NWS API",
            queries.clone(),
        );

        Self { temperature, queries }
    }

    /// Set the temperature for a station, in celsius, exactly as given.
    pub fn set_temperature(&self, station: &str, value: f64) {
        self.temperature.get_or_create(&StationLabels::new(station)).set(value);
    }

    /// Count one attempt to query the API for a station, successful or not.
    pub fn increment_query_count(&self, station: &str) {
        self.queries.get_or_create(&StationLabels::new(station)).inc();
    }
}

/// Find the value of the sample `name{station="<station>"}` in text exposition output.
#[cfg(test)]
pub(crate) fn sample(text: &str, name: &str, station: &str) -> Option<f64> {
    let prefix = format!("{}{{station=\"{}\"}} ", name, station);
    text.lines()
        .find_map(|l| l.strip_prefix(&prefix))
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::{sample, TemperatureMetrics, NAMESPACE};
    use prometheus_client::encoding::text::encode;
    use prometheus_client::registry::Registry;

    const GAUGE: &str = "helloworld_outdoor_temperature_celsius";
    const COUNTER: &str = "helloworld_nws_query_attempts_total";

    fn encoded(reg: &Registry) -> String {
        let mut buf = String::new();
        encode(&mut buf, reg).unwrap();
        buf
    }

    #[test]
    fn test_no_samples_before_first_update() {
        let mut reg = Registry::with_prefix(NAMESPACE);
        let _metrics = TemperatureMetrics::new(&mut reg);
        let text = encoded(&reg);

        assert!(text.contains("# TYPE helloworld_outdoor_temperature_celsius gauge"));
        assert!(text.contains("# TYPE helloworld_nws_query_attempts counter"));
        assert_eq!(None, sample(&text, GAUGE, "KBOS"));
        assert_eq!(None, sample(&text, COUNTER, "KBOS"));
    }

    #[test]
    fn test_set_temperature() {
        let mut reg = Registry::with_prefix(NAMESPACE);
        let metrics = TemperatureMetrics::new(&mut reg);

        metrics.set_temperature("KBOS", 21.5);
        assert_eq!(Some(21.5), sample(&encoded(&reg), GAUGE, "KBOS"));

        metrics.set_temperature("KBOS", -4.25);
        assert_eq!(Some(-4.25), sample(&encoded(&reg), GAUGE, "KBOS"));
    }

    #[test]
    fn test_increment_query_count() {
        let mut reg = Registry::with_prefix(NAMESPACE);
        let metrics = TemperatureMetrics::new(&mut reg);

        metrics.increment_query_count("KBOS");
        metrics.increment_query_count("KBOS");
        metrics.increment_query_count("KBOS");

        let text = encoded(&reg);
        assert_eq!(Some(3.0), sample(&text, COUNTER, "KBOS"));
        assert_eq!(None, sample(&text, GAUGE, "KBOS"));
    }

    #[test]
    fn test_clones_share_metrics() {
        let mut reg = Registry::with_prefix(NAMESPACE);
        let metrics = TemperatureMetrics::new(&mut reg);
        let other = metrics.clone();

        other.set_temperature("KBOS", 10.0);
        other.increment_query_count("KBOS");

        let text = encoded(&reg);
        assert_eq!(Some(10.0), sample(&text, GAUGE, "KBOS"));
        assert_eq!(Some(1.0), sample(&text, COUNTER, "KBOS"));
    }

    #[test]
    fn test_each_registry_gets_its_own_metrics() {
        let mut first = Registry::with_prefix(NAMESPACE);
        let mut second = Registry::with_prefix(NAMESPACE);
        let first_metrics = TemperatureMetrics::new(&mut first);
        let _second_metrics = TemperatureMetrics::new(&mut second);

        first_metrics.set_temperature("KBOS", 12.0);
        first_metrics.increment_query_count("KBOS");

        assert_eq!(Some(12.0), sample(&encoded(&first), GAUGE, "KBOS"));
        assert_eq!(Some(1.0), sample(&encoded(&first), COUNTER, "KBOS"));
        assert_eq!(None, sample(&encoded(&second), GAUGE, "KBOS"));
        assert_eq!(None, sample(&encoded(&second), COUNTER, "KBOS"));
    }

    #[test]
    fn test_stations_are_labeled() {
        let mut reg = Registry::with_prefix(NAMESPACE);
        let metrics = TemperatureMetrics::new(&mut reg);

        metrics.set_temperature("KBOS", 1.0);
        metrics.set_temperature("KJFK", 2.0);

        let text = encoded(&reg);
        assert_eq!(Some(1.0), sample(&text, GAUGE, "KBOS"));
        assert_eq!(Some(2.0), sample(&text, GAUGE, "KJFK"));
    }
}
