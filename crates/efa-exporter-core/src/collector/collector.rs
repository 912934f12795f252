//! Scrape entry point that turns the EFA sysfs tree into samples.
//!
//! `EfaCollector` re-reads sysfs on every `update` call and emits one
//! `<namespace>_<subsystem>_info` sample per device plus one counter sample
//! per present hardware counter of every port.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::collector::sysfs::{ClassError, EfaClass, EfaSysfs};
use crate::collector::traits::FileSystem;
use crate::metrics::{DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM, Descriptors, MetricSink};

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// Enumeration of devices, ports or counters failed.
    Class(ClassError),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Class(e) => write!(f, "error obtaining EFA class info: {}", e),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Class(e) => Some(e),
        }
    }
}

impl From<ClassError> for CollectError {
    fn from(e: ClassError) -> Self {
        CollectError::Class(e)
    }
}

/// Outcome of a successful `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Samples were emitted.
    Collected {
        devices: usize,
        ports: usize,
        samples: usize,
        elapsed: Duration,
    },
    /// This host has no EFA class directory; nothing was emitted.
    NoData,
}

/// Collector exposing Amazon EFA hardware counters.
///
/// Holds only the read-only filesystem handle, the sysfs root and the
/// descriptor table, so concurrent `update` calls are safe.
pub struct EfaCollector<F: FileSystem> {
    sysfs: EfaSysfs<F>,
    descriptors: Descriptors,
}

impl<F: FileSystem> EfaCollector<F> {
    /// Creates a collector using the default `node_amazonefa_` metric prefix.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `sys_path` - Sysfs mount point (usually "/sys")
    pub fn new(fs: F, sys_path: impl AsRef<Path>) -> Self {
        Self {
            sysfs: EfaSysfs::new(fs, sys_path),
            descriptors: Descriptors::new(DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM),
        }
    }

    /// Overrides the metric namespace and subsystem.
    pub fn with_namespace(mut self, namespace: &str, subsystem: &str) -> Self {
        self.descriptors = Descriptors::new(namespace, subsystem);
        self
    }

    /// Returns the descriptor table samples are built from.
    pub fn descriptors(&self) -> &Descriptors {
        &self.descriptors
    }

    /// Reads the current device topology without projecting it.
    pub fn read_class(&self) -> Result<EfaClass, ClassError> {
        self.sysfs.read_class()
    }

    /// Runs one scrape and emits its samples into `sink`.
    ///
    /// The whole tree is read before the first sample is emitted, so a fatal
    /// error leaves `sink` untouched. A missing class directory is reported as
    /// `Update::NoData`, not as an error.
    pub fn update<S: MetricSink + ?Sized>(&self, sink: &mut S) -> Result<Update, CollectError> {
        let start = Instant::now();

        let class = match self.sysfs.read_class() {
            Ok(class) => class,
            Err(e) if e.is_absent() => {
                debug!("Amazon EFA statistics not found, skipping: {}", e);
                return Ok(Update::NoData);
            }
            Err(e) => return Err(e.into()),
        };

        let mut ports = 0;
        let mut samples = 0;
        for device in class.values() {
            sink.emit(self.descriptors.info().sample(1, &[device.name.as_str()]));
            samples += 1;

            for port in device.ports.values() {
                ports += 1;
                let port_label = port.port.to_string();
                for (counter, value) in port.counters.iter() {
                    sink.emit(
                        self.descriptors
                            .counter(counter)
                            .sample(value, &[device.name.as_str(), port_label.as_str()]),
                    );
                    samples += 1;
                }
            }
        }

        let elapsed = start.elapsed();
        debug!(
            "EFA scrape: {} devices, {} ports, {} samples in {:?}",
            class.len(),
            ports,
            samples,
            elapsed
        );

        Ok(Update::Collected {
            devices: class.len(),
            ports,
            samples,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{Counter, MockFs};
    use crate::metrics::{MetricKind, Sample};

    fn scrape(fs: MockFs) -> (Result<Update, CollectError>, Vec<Sample>) {
        let collector = EfaCollector::new(fs, "/sys");
        let mut samples = Vec::new();
        let result = collector.update(&mut samples);
        (result, samples)
    }

    #[test]
    fn test_update_scenario() {
        let (result, samples) = scrape(MockFs::efa_no_pma());

        match result.unwrap() {
            Update::Collected {
                devices,
                ports,
                samples: count,
                ..
            } => {
                assert_eq!(devices, 1);
                assert_eq!(ports, 1);
                assert_eq!(count, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(samples.len(), 2);

        let info = &samples[0];
        assert_eq!(info.name, "node_amazonefa_info");
        assert_eq!(info.kind, MetricKind::Gauge);
        assert_eq!(info.value, 1);
        assert_eq!(info.labels, vec![("device", "efa0".to_string())]);

        let rx = &samples[1];
        assert_eq!(rx.name, "node_amazonefa_rx_bytes");
        assert_eq!(rx.kind, MetricKind::Counter);
        assert_eq!(rx.value, 12345);
        assert_eq!(
            rx.labels,
            vec![("device", "efa0".to_string()), ("port", "1".to_string())]
        );

        assert!(!samples.iter().any(|s| s.name.ends_with("rx_drops")));
    }

    #[test]
    fn test_update_malformed_counter_emits_nothing() {
        let mut fs = MockFs::efa_no_pma();
        fs.add_efa_port(
            "efa1",
            "1",
            "4: ACTIVE",
            "5: LinkUp",
            "100 Gb/sec",
            &[("rx_bytes", "not-a-number")],
        );

        let (result, samples) = scrape(fs);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not-a-number"));
        assert!(matches!(
            err,
            CollectError::Class(ClassError::ParseCounter { .. })
        ));
        assert!(samples.is_empty());
    }

    #[test]
    fn test_update_absent_subsystem_is_no_data() {
        let (result, samples) = scrape(MockFs::new());
        assert_eq!(result.unwrap(), Update::NoData);
        assert!(samples.is_empty());
    }

    #[test]
    fn test_update_empty_class_collects_nothing() {
        let (result, samples) = scrape(MockFs::efa_empty_class());
        assert!(matches!(
            result.unwrap(),
            Update::Collected {
                devices: 0,
                samples: 0,
                ..
            }
        ));
        assert!(samples.is_empty());
    }

    #[test]
    fn test_update_round_trip() {
        let mut fs = MockFs::new();
        fs.add_efa_port(
            "efa0",
            "1",
            "4: ACTIVE",
            "5: LinkUp",
            "100 Gb/sec",
            &[
                ("rx_bytes", "100"),
                ("tx_bytes", "200"),
                ("rx_drops", "N/A (no PMA)"),
            ],
        );
        fs.add_efa_port(
            "efa0",
            "3",
            "4: ACTIVE",
            "5: LinkUp",
            "100 Gb/sec",
            &[("send_wrs", "0x20")],
        );
        fs.add_efa_port("efa1", "1", "1: DOWN", "3: Disabled", "0 Gb/sec", &[]);
        fs.add_failing_file(
            "/sys/class/infiniband/efa1/ports/1/hw_counters/lifespan",
            libc::EOPNOTSUPP,
        );

        let (result, samples) = scrape(fs);
        result.unwrap();

        let info: Vec<_> = samples
            .iter()
            .filter(|s| s.name == "node_amazonefa_info")
            .map(|s| s.label("device").unwrap())
            .collect();
        assert_eq!(info, vec!["efa0", "efa1"]);

        let counters: Vec<_> = samples
            .iter()
            .filter(|s| s.kind == MetricKind::Counter)
            .map(|s| {
                (
                    s.name.as_str(),
                    s.label("device").unwrap(),
                    s.label("port").unwrap(),
                    s.value,
                )
            })
            .collect();
        assert_eq!(
            counters,
            vec![
                ("node_amazonefa_rx_bytes", "efa0", "1", 100),
                ("node_amazonefa_tx_bytes", "efa0", "1", 200),
                ("node_amazonefa_send_wrs", "efa0", "3", 32),
            ]
        );
    }

    #[test]
    fn test_update_efa_node_emits_every_counter() {
        let (result, samples) = scrape(MockFs::efa_node());
        result.unwrap();

        assert_eq!(samples.len(), 2 * (1 + Counter::COUNT));
        for counter in Counter::ALL {
            let name = format!("node_amazonefa_{}", counter.name());
            assert_eq!(samples.iter().filter(|s| s.name == name).count(), 2);
        }
    }

    #[test]
    fn test_update_custom_namespace() {
        let collector = EfaCollector::new(MockFs::efa_no_pma(), "/sys").with_namespace("efa", "");
        let mut samples = Vec::new();
        collector.update(&mut samples).unwrap();

        let names: Vec<_> = samples.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["efa_info", "efa_rx_bytes"]);
    }

    #[test]
    fn test_update_is_stateless_across_scrapes() {
        let collector = EfaCollector::new(MockFs::efa_node(), "/sys");
        let mut first = Vec::new();
        let mut second = Vec::new();
        collector.update(&mut first).unwrap();
        collector.update(&mut second).unwrap();
        assert_eq!(first, second);
    }
}
