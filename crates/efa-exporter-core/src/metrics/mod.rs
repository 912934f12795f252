//! Metric samples and how they leave the collector.
//!
//! A scrape produces a flat stream of `Sample`s handed to a `MetricSink`.
//! Names follow the Prometheus `<namespace>_<subsystem>_<name>` convention and
//! every family is described once by a `Descriptor`.

mod descriptors;
mod exposition;

pub use descriptors::{
    DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM, Descriptor, Descriptors, counter_help, fq_name,
};
pub use exposition::{escape_label_value, render_text};

/// Prometheus value type of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic counter.
    Counter,
    /// Instantaneous value; also used for constant info series.
    Gauge,
}

impl MetricKind {
    /// Name used on `# TYPE` lines.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// One labeled value produced by a scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    pub value: u64,
    /// Label pairs in descriptor order.
    pub labels: Vec<(&'static str, String)>,
}

impl Sample {
    /// Returns the value of label `name`, if set.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Receiver of samples emitted during a scrape.
pub trait MetricSink {
    fn emit(&mut self, sample: Sample);
}

impl MetricSink for Vec<Sample> {
    fn emit(&mut self, sample: Sample) {
        self.push(sample);
    }
}

impl<S: MetricSink + ?Sized> MetricSink for &mut S {
    fn emit(&mut self, sample: Sample) {
        (**self).emit(sample);
    }
}
