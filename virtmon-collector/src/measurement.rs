//! Measurements and the sink they are emitted into.
//!
//! A [`Metric`] declares a name, help text, kind and label schema once. Its
//! label arity is part of the type, so every emission site has to supply
//! exactly as many label values as the schema declares.

/// Whether a metric is a monotonic counter or an instantaneous gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Static description of one metric name.
#[derive(Debug)]
pub struct Metric<const N: usize> {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: [&'static str; N],
}

impl<const N: usize> Metric<N> {
    pub const fn gauge(name: &'static str, help: &'static str, labels: [&'static str; N]) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
            labels,
        }
    }

    pub const fn counter(name: &'static str, help: &'static str, labels: [&'static str; N]) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
            labels,
        }
    }

    /// Build a measurement with one value per declared label.
    pub fn measure(&self, values: [&str; N], value: f64) -> Measurement {
        Measurement {
            name: self.name,
            help: self.help,
            kind: self.kind,
            labels: self
                .labels
                .iter()
                .zip(values)
                .map(|(name, value)| (*name, value.to_string()))
                .collect(),
            value,
        }
    }
}

/// One observed value of a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    /// `(label name, label value)` in schema order
    pub labels: Vec<(&'static str, String)>,
    pub value: f64,
}

impl Measurement {
    /// Value of a label by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn label_names(&self) -> Vec<&'static str> {
        self.labels.iter().map(|(n, _)| *n).collect()
    }

    pub fn label_values(&self) -> Vec<&str> {
        self.labels.iter().map(|(_, v)| v.as_str()).collect()
    }
}

/// Append-only consumer of measurements.
pub trait Sink {
    fn emit(&mut self, measurement: Measurement);
}

impl Sink for Vec<Measurement> {
    fn emit(&mut self, measurement: Measurement) {
        self.push(measurement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TEST_METRIC: Metric<2> = Metric::counter("test_total", "A test counter", ["domain", "vcpu"]);

    #[test]
    fn test_measure_pairs_labels_in_order() {
        let m = TEST_METRIC.measure(["vm1", "3"], 2.5);
        assert_eq!(m.name, "test_total");
        assert_eq!(m.kind, MetricKind::Counter);
        assert_eq!(m.label_names(), vec!["domain", "vcpu"]);
        assert_eq!(m.label_values(), vec!["vm1", "3"]);
        assert_eq!(m.label("vcpu"), Some("3"));
        assert_eq!(m.label("missing"), None);
        assert_eq!(m.value, 2.5);
    }

    #[test]
    fn test_vec_sink_appends() {
        let mut sink: Vec<Measurement> = Vec::new();
        sink.emit(TEST_METRIC.measure(["a", "0"], 1.0));
        sink.emit(TEST_METRIC.measure(["b", "1"], 2.0));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].label("domain"), Some("b"));
    }
}
