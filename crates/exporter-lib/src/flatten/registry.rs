//! Request-scoped metric registry
//!
//! A `ScrapeRegistry` is built empty for every scrape with all families of
//! [`FAMILIES`] declared, populated by the flattener and rendered once. It is
//! never shared between requests, so a slow or failing scrape cannot leak
//! values into another.

use super::families::{FsField, Scope, FAMILIES, METRICS_NAMESPACE};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Largest integer an `f64` holds without rounding (2^53)
pub const MAX_EXACT_F64_INTEGER: u64 = 1 << 53;

/// Widen a counter value to the exposition type.
///
/// Values up to 2^53 convert exactly. Larger values are rounded to the
/// nearest representable double, losing low-order bits; a byte count would
/// have to exceed 8 PiB for that to happen.
pub fn widen(value: u64) -> f64 {
    if value > MAX_EXACT_F64_INTEGER {
        debug!(value = value, "Value exceeds f64 precision, exported rounded");
    }
    value as f64
}

/// One rendered series, for inspection
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

/// Fresh set of gauge families for one scrape
pub struct ScrapeRegistry {
    registry: Registry,
    gauges: HashMap<(Scope, FsField), GaugeVec>,
}

impl ScrapeRegistry {
    /// Create a registry with every family declared and no series
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let mut gauges = HashMap::with_capacity(FAMILIES.len());

        for spec in FAMILIES.iter() {
            let opts = Opts::new(spec.name(), spec.help).namespace(METRICS_NAMESPACE);
            let gauge = GaugeVec::new(opts, spec.label_names())?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert((spec.scope, spec.field), gauge);
        }

        Ok(Self { registry, gauges })
    }

    /// Set the series of `(scope, field)` identified by `label_values`
    pub fn set(
        &self,
        scope: Scope,
        field: FsField,
        label_values: &[&str],
        value: u64,
    ) -> Result<(), prometheus::Error> {
        let gauge = self.gauges.get(&(scope, field)).ok_or_else(|| {
            prometheus::Error::Msg(format!("family {:?}/{:?} not declared", scope, field))
        })?;
        gauge
            .get_metric_with_label_values(label_values)?
            .set(widen(value));
        Ok(())
    }

    /// Families holding at least one series
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Every populated series, flattened out of its family
    pub fn series(&self) -> Vec<Series> {
        let mut series = Vec::new();
        for family in self.gather() {
            for metric in family.get_metric() {
                let labels = metric
                    .get_label()
                    .iter()
                    .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                    .collect();
                series.push(Series {
                    name: family.get_name().to_string(),
                    labels,
                    value: metric.get_gauge().get_value(),
                });
            }
        }
        series
    }

    pub fn series_count(&self) -> usize {
        self.gather().iter().map(|f| f.get_metric().len()).sum()
    }

    /// Render in the Prometheus text exposition format
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        Ok(buffer)
    }

    /// Content type of [`ScrapeRegistry::render`] output
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
