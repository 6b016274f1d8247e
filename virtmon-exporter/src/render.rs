//! Prometheus text exposition of collected measurements.
//!
//! Every scrape builds a fresh registry, so nothing survives between
//! cycles: a domain that disappears simply stops being exported.

use anyhow::{Context, Result};
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;

use virtmon_collector::{Measurement, MetricKind};

enum Family {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

impl Family {
    fn new(m: &Measurement) -> Result<Self> {
        let opts = Opts::new(m.name, m.help);
        let labels = m.label_names();
        Ok(match m.kind {
            MetricKind::Counter => Family::Counter(CounterVec::new(opts, &labels)?),
            MetricKind::Gauge => Family::Gauge(GaugeVec::new(opts, &labels)?),
        })
    }

    fn observe(&self, m: &Measurement) -> Result<()> {
        let values = m.label_values();
        match self {
            Family::Counter(vec) => vec.get_metric_with_label_values(&values)?.inc_by(m.value),
            Family::Gauge(vec) => vec.get_metric_with_label_values(&values)?.set(m.value),
        }
        Ok(())
    }

    fn register(self, registry: &Registry) -> prometheus::Result<()> {
        match self {
            Family::Counter(vec) => registry.register(Box::new(vec)),
            Family::Gauge(vec) => registry.register(Box::new(vec)),
        }
    }
}

/// Render measurements in the Prometheus text format.
pub fn render(measurements: &[Measurement]) -> Result<String> {
    let mut families: BTreeMap<&'static str, Family> = BTreeMap::new();
    for m in measurements {
        if !families.contains_key(m.name) {
            families.insert(m.name, Family::new(m)?);
        }
        families[m.name]
            .observe(m)
            .with_context(|| format!("Failed to record {}", m.name))?;
    }

    let registry = Registry::new();
    for (name, family) in families {
        family
            .register(&registry)
            .with_context(|| format!("Failed to register {}", name))?;
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::with_capacity(8192);
    encoder
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtmon_collector::{catalog, up};

    #[test]
    fn test_render_families() {
        let measurements = vec![
            up(true),
            catalog::DOMAIN_CPU_TIME.measure(["vm1"], 1.5),
            catalog::DOMAIN_CPU_TIME.measure(["vm2"], 3.0),
            catalog::POOL_CAPACITY.measure(["default"], 1024.0),
        ];
        let text = render(&measurements).unwrap();

        assert!(text.contains("# TYPE libvirt_up gauge"));
        assert!(text.contains("libvirt_up 1"));
        assert!(text.contains("# TYPE libvirt_domain_info_cpu_time_seconds_total counter"));
        assert!(text.contains("libvirt_domain_info_cpu_time_seconds_total{domain=\"vm1\"} 1.5"));
        assert!(text.contains("libvirt_domain_info_cpu_time_seconds_total{domain=\"vm2\"} 3"));
        assert!(text.contains("libvirt_pool_info_capacity_bytes{pool=\"default\"} 1024"));
    }

    #[test]
    fn test_render_metadata_labels() {
        let m = catalog::INTERFACE_META.measure(["vm", "br0", "vnet0", ""], 1.0);
        let text = render(&[m]).unwrap();
        assert!(text.contains("# TYPE libvirt_domain_interface_meta gauge"));
        assert!(text.contains("source_bridge=\"br0\""));
    }

    #[test]
    fn test_render_nothing() {
        assert_eq!(render(&[]).unwrap(), "");
    }
}
