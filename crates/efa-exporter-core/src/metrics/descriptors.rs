//! Static descriptions of every metric family the EFA collector exports.

use super::{MetricKind, Sample};
use crate::collector::Counter;

/// Default metric namespace, shared with node_exporter.
pub const DEFAULT_NAMESPACE: &str = "node";
/// Default metric subsystem for EFA counters.
pub const DEFAULT_SUBSYSTEM: &str = "amazonefa";

const DEVICE_LABELS: &[&str] = &["device"];
const PORT_LABELS: &[&str] = &["device", "port"];

const INFO_HELP: &str =
    "Non-numeric data from /sys/class/infiniband/<device>, value is always 1.";

/// Joins non-empty name parts with `_`, like Prometheus `BuildFQName`.
///
/// An empty `name` yields an empty string.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Documentation string for a hardware counter.
pub fn counter_help(counter: Counter) -> &'static str {
    match counter {
        Counter::AllocPdErr => "Number of allocations PD errors",
        Counter::AllocUcontextErr => "Number of allocations UContext errors",
        Counter::CmdsErr => "Number of commands errors",
        Counter::CompletedCmds => "Number of completed commands",
        Counter::CreateAhErr => "Number of create AH errors",
        Counter::CreateCqErr => "Number of create CQ errors",
        Counter::CreateQpErr => "Number of create qp errors",
        Counter::ImpairedRemoteConnEvents => "Number of impaired remote connection events",
        Counter::KeepAliveRcvd => "Number of keep-alive packets received",
        Counter::Lifespan => "Lifespan of the port",
        Counter::MmapErr => "Number of mmap errors",
        Counter::NoCompletionCmds => "Number of commands with no completion",
        Counter::RdmaReadBytes => "Number of bytes read with RDMA",
        Counter::RdmaReadRespBytes => "Number of read responses bytes with RDMA",
        Counter::RdmaReadWrErr => "Number of read work request errors with RDMA",
        Counter::RdmaReadWrs => "Number of read work requests with RDMA",
        Counter::RdmaWriteBytes => "Number of bytes written with RDMA",
        Counter::RdmaWriteRecvBytes => "Number of bytes written and received with RDMA",
        Counter::RdmaWriteWrErr => "Number of write work request errors with RDMA",
        Counter::RdmaWriteWrs => "Number of write work requests with RDMA",
        Counter::RecvBytes => "Number of bytes received by receive work requests",
        Counter::RecvWrs => "Number of receive work requests",
        Counter::RegMrErr => "Number of reg_mr errors",
        Counter::RetransBytes => "Number of bytes retransmitted",
        Counter::RetransPkts => "Number of packets retransmitted",
        Counter::RetransTimeoutEvents => "Number of retransmission timeout events",
        Counter::RxBytes => "Number of bytes received",
        Counter::RxDrops => "Number of packets dropped",
        Counter::RxPkts => "Number of packets received",
        Counter::SendBytes => "Number of bytes sent by send work requests",
        Counter::SendWrs => "Number of send work requests",
        Counter::SubmittedCmds => "Number of submitted commands",
        Counter::TxBytes => "Number of bytes transmitted",
        Counter::TxPkts => "Number of packets transmitted",
        Counter::UnresponsiveRemoteEvents => "Number of unresponsive remote events",
    }
}

/// Fully qualified name, documentation and label schema of one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub fq_name: String,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

impl Descriptor {
    /// Builds a sample; `label_values` must follow `labels` order.
    pub fn sample(&self, value: u64, label_values: &[&str]) -> Sample {
        debug_assert_eq!(label_values.len(), self.labels.len());
        Sample {
            name: self.fq_name.clone(),
            help: self.help,
            kind: self.kind,
            value,
            labels: self
                .labels
                .iter()
                .zip(label_values)
                .map(|(key, value)| (*key, (*value).to_string()))
                .collect(),
        }
    }
}

/// Descriptor table for the EFA collector, built once per collector.
#[derive(Debug, Clone)]
pub struct Descriptors {
    info: Descriptor,
    counters: Vec<Descriptor>,
}

impl Descriptors {
    pub fn new(namespace: &str, subsystem: &str) -> Self {
        let info = Descriptor {
            fq_name: fq_name(namespace, subsystem, "info"),
            help: INFO_HELP,
            kind: MetricKind::Gauge,
            labels: DEVICE_LABELS,
        };
        let counters = Counter::ALL
            .iter()
            .map(|&counter| Descriptor {
                fq_name: fq_name(namespace, subsystem, counter.name()),
                help: counter_help(counter),
                kind: MetricKind::Counter,
                labels: PORT_LABELS,
            })
            .collect();

        Self { info, counters }
    }

    /// Per-device presence series, labeled `{device}`.
    pub fn info(&self) -> &Descriptor {
        &self.info
    }

    /// Series for one hardware counter, labeled `{device, port}`.
    pub fn counter(&self, counter: Counter) -> &Descriptor {
        // `counters` is built from `Counter::ALL`, whose order matches the
        // enum discriminants.
        &self.counters[counter as usize]
    }

    /// Iterates every descriptor, info first.
    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        std::iter::once(&self.info).chain(self.counters.iter())
    }
}

impl Default for Descriptors {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM)
    }
}
