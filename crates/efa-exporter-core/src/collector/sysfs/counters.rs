//! Hardware counters from `/sys/class/infiniband/<device>/ports/<port>/hw_counters`.

use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::trace;

use super::class::ClassError;
use super::parser::parse_counter;
use super::reader::{is_unavailable, read_sysfs_value};
use crate::collector::traits::FileSystem;

/// Name of the per-port counters directory.
pub const HW_COUNTERS_DIR: &str = "hw_counters";

/// One of the hardware counters the EFA driver exposes per port.
///
/// The set is closed: files in `hw_counters/` with other names are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Counter {
    AllocPdErr,
    AllocUcontextErr,
    CmdsErr,
    CompletedCmds,
    CreateAhErr,
    CreateCqErr,
    CreateQpErr,
    ImpairedRemoteConnEvents,
    KeepAliveRcvd,
    Lifespan,
    MmapErr,
    NoCompletionCmds,
    RdmaReadBytes,
    RdmaReadRespBytes,
    RdmaReadWrErr,
    RdmaReadWrs,
    RdmaWriteBytes,
    RdmaWriteRecvBytes,
    RdmaWriteWrErr,
    RdmaWriteWrs,
    RecvBytes,
    RecvWrs,
    RegMrErr,
    RetransBytes,
    RetransPkts,
    RetransTimeoutEvents,
    RxBytes,
    RxDrops,
    RxPkts,
    SendBytes,
    SendWrs,
    SubmittedCmds,
    TxBytes,
    TxPkts,
    UnresponsiveRemoteEvents,
}

impl Counter {
    /// Number of known counters.
    pub const COUNT: usize = 35;

    /// Every counter, in file-name order.
    pub const ALL: [Counter; Self::COUNT] = [
        Counter::AllocPdErr,
        Counter::AllocUcontextErr,
        Counter::CmdsErr,
        Counter::CompletedCmds,
        Counter::CreateAhErr,
        Counter::CreateCqErr,
        Counter::CreateQpErr,
        Counter::ImpairedRemoteConnEvents,
        Counter::KeepAliveRcvd,
        Counter::Lifespan,
        Counter::MmapErr,
        Counter::NoCompletionCmds,
        Counter::RdmaReadBytes,
        Counter::RdmaReadRespBytes,
        Counter::RdmaReadWrErr,
        Counter::RdmaReadWrs,
        Counter::RdmaWriteBytes,
        Counter::RdmaWriteRecvBytes,
        Counter::RdmaWriteWrErr,
        Counter::RdmaWriteWrs,
        Counter::RecvBytes,
        Counter::RecvWrs,
        Counter::RegMrErr,
        Counter::RetransBytes,
        Counter::RetransPkts,
        Counter::RetransTimeoutEvents,
        Counter::RxBytes,
        Counter::RxDrops,
        Counter::RxPkts,
        Counter::SendBytes,
        Counter::SendWrs,
        Counter::SubmittedCmds,
        Counter::TxBytes,
        Counter::TxPkts,
        Counter::UnresponsiveRemoteEvents,
    ];

    /// File name under `hw_counters/`, also used as the metric name suffix.
    pub const fn name(self) -> &'static str {
        match self {
            Counter::AllocPdErr => "alloc_pd_err",
            Counter::AllocUcontextErr => "alloc_ucontext_err",
            Counter::CmdsErr => "cmds_err",
            Counter::CompletedCmds => "completed_cmds",
            Counter::CreateAhErr => "create_ah_err",
            Counter::CreateCqErr => "create_cq_err",
            Counter::CreateQpErr => "create_qp_err",
            Counter::ImpairedRemoteConnEvents => "impaired_remote_conn_events",
            Counter::KeepAliveRcvd => "keep_alive_rcvd",
            Counter::Lifespan => "lifespan",
            Counter::MmapErr => "mmap_err",
            Counter::NoCompletionCmds => "no_completion_cmds",
            Counter::RdmaReadBytes => "rdma_read_bytes",
            Counter::RdmaReadRespBytes => "rdma_read_resp_bytes",
            Counter::RdmaReadWrErr => "rdma_read_wr_err",
            Counter::RdmaReadWrs => "rdma_read_wrs",
            Counter::RdmaWriteBytes => "rdma_write_bytes",
            Counter::RdmaWriteRecvBytes => "rdma_write_recv_bytes",
            Counter::RdmaWriteWrErr => "rdma_write_wr_err",
            Counter::RdmaWriteWrs => "rdma_write_wrs",
            Counter::RecvBytes => "recv_bytes",
            Counter::RecvWrs => "recv_wrs",
            Counter::RegMrErr => "reg_mr_err",
            Counter::RetransBytes => "retrans_bytes",
            Counter::RetransPkts => "retrans_pkts",
            Counter::RetransTimeoutEvents => "retrans_timeout_events",
            Counter::RxBytes => "rx_bytes",
            Counter::RxDrops => "rx_drops",
            Counter::RxPkts => "rx_pkts",
            Counter::SendBytes => "send_bytes",
            Counter::SendWrs => "send_wrs",
            Counter::SubmittedCmds => "submitted_cmds",
            Counter::TxBytes => "tx_bytes",
            Counter::TxPkts => "tx_pkts",
            Counter::UnresponsiveRemoteEvents => "unresponsive_remote_events",
        }
    }

    /// Looks up a counter by its `hw_counters/` file name.
    pub fn from_name(name: &str) -> Option<Counter> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Counter values of one port.
///
/// `None` means the file was absent, unreadable for a benign reason, or
/// reported as not available by the driver. It is never a stand-in for zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSet {
    values: [Option<u64>; Counter::COUNT],
}

impl Default for CounterSet {
    fn default() -> Self {
        Self {
            values: [None; Counter::COUNT],
        }
    }
}

impl CounterSet {
    /// Returns the value of `counter`, if present.
    pub fn get(&self, counter: Counter) -> Option<u64> {
        self.values[counter.index()]
    }

    /// Iterates present counters in `Counter::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Counter, u64)> + '_ {
        Counter::ALL
            .iter()
            .filter_map(|&c| self.get(c).map(|value| (c, value)))
    }

    /// Number of present counters.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set(&mut self, counter: Counter, value: Option<u64>) {
        self.values[counter.index()] = value;
    }
}

impl FromIterator<(Counter, u64)> for CounterSet {
    fn from_iter<I: IntoIterator<Item = (Counter, u64)>>(iter: I) -> Self {
        let mut set = CounterSet::default();
        for (counter, value) in iter {
            set.set(counter, Some(value));
        }
        set
    }
}

impl Serialize for CounterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (counter, value) in self.iter() {
            map.serialize_entry(counter.name(), &value)?;
        }
        map.end()
    }
}

/// Reads every regular file in `<port_path>/hw_counters` into a `CounterSet`.
///
/// Files that cannot be read because they are missing, not permitted, not
/// supported or rejected with `EINVAL` leave their counter absent, as does a
/// value of `N/A (no PMA)`. Unknown file names are ignored. Any other read
/// failure or unparseable value fails the whole port.
pub fn parse_counters<F: FileSystem + ?Sized>(
    fs: &F,
    port_path: &Path,
) -> Result<CounterSet, ClassError> {
    let dir = port_path.join(HW_COUNTERS_DIR);
    let entries = fs.read_dir(&dir).map_err(|source| ClassError::ListDir {
        path: dir.clone(),
        source,
    })?;

    let mut counters = CounterSet::default();
    for path in entries {
        if !fs.is_file(&path) {
            continue;
        }

        let value = match read_sysfs_value(fs, &path) {
            Ok(value) => value,
            Err(e) if is_unavailable(&e) => {
                trace!("skipping counter {}: {}", path.display(), e);
                continue;
            }
            Err(source) => return Err(ClassError::ReadFile { path, source }),
        };

        let Some(counter) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(Counter::from_name)
        else {
            continue;
        };

        let parsed = parse_counter(&value).map_err(|source| ClassError::ParseCounter {
            counter,
            path: path.clone(),
            value: value.clone(),
            source,
        })?;
        if parsed.is_none() {
            trace!("counter {} not available: {:?}", path.display(), value);
        }
        counters.set(counter, parsed);
    }

    Ok(counters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockFs;

    const PORT: &str = "/sys/class/infiniband/efa0/ports/1";

    fn port_with(counters: &[(&str, &str)]) -> MockFs {
        let mut fs = MockFs::new();
        fs.add_efa_port("efa0", "1", "4: ACTIVE", "5: LinkUp", "100 Gb/sec", counters);
        fs
    }

    #[test]
    fn test_counter_table_is_consistent() {
        for (i, counter) in Counter::ALL.iter().enumerate() {
            assert_eq!(counter.index(), i);
            assert_eq!(Counter::from_name(counter.name()), Some(*counter));
        }
        let mut names: Vec<_> = Counter::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Counter::COUNT);
        assert_eq!(Counter::from_name("rx_octets"), None);
    }

    #[test]
    fn test_parse_counters_values() {
        let fs = port_with(&[
            ("rx_bytes", "12345\n"),
            ("tx_bytes", "0x10\n"),
            ("lifespan", "010\n"),
            ("rdma_write_wrs", "18446744073709551615\n"),
        ]);

        let counters = parse_counters(&fs, Path::new(PORT)).unwrap();
        assert_eq!(counters.get(Counter::RxBytes), Some(12345));
        assert_eq!(counters.get(Counter::TxBytes), Some(16));
        assert_eq!(counters.get(Counter::Lifespan), Some(8));
        assert_eq!(counters.get(Counter::RdmaWriteWrs), Some(u64::MAX));
        assert_eq!(counters.get(Counter::RxDrops), None);
        assert_eq!(counters.len(), 4);
    }

    #[test]
    fn test_parse_counters_sentinel_is_absent_not_zero() {
        let fs = port_with(&[("rx_bytes", "12345"), ("rx_drops", "N/A (no PMA)")]);

        let counters = parse_counters(&fs, Path::new(PORT)).unwrap();
        assert_eq!(counters.get(Counter::RxBytes), Some(12345));
        assert_eq!(counters.get(Counter::RxDrops), None);
        assert_eq!(counters.len(), 1);
    }

    #[test]
    fn test_parse_counters_skips_unavailable_reads() {
        let mut fs = port_with(&[("rx_pkts", "7")]);
        let dir = format!("{PORT}/hw_counters");
        fs.add_failing_file(format!("{dir}/lifespan"), libc::EOPNOTSUPP);
        fs.add_failing_file(format!("{dir}/mmap_err"), libc::EACCES);
        fs.add_failing_file(format!("{dir}/cmds_err"), libc::EINVAL);
        fs.add_failing_file(format!("{dir}/reg_mr_err"), libc::ENOENT);

        let counters = parse_counters(&fs, Path::new(PORT)).unwrap();
        assert_eq!(counters.get(Counter::RxPkts), Some(7));
        assert_eq!(counters.get(Counter::Lifespan), None);
        assert_eq!(counters.get(Counter::MmapErr), None);
        assert_eq!(counters.get(Counter::CmdsErr), None);
        assert_eq!(counters.get(Counter::RegMrErr), None);
    }

    #[test]
    fn test_parse_counters_other_read_error_is_fatal() {
        let mut fs = port_with(&[("rx_pkts", "7")]);
        fs.add_failing_file(format!("{PORT}/hw_counters/tx_pkts"), libc::EIO);

        let err = parse_counters(&fs, Path::new(PORT)).unwrap_err();
        match err {
            ClassError::ReadFile { path, source } => {
                assert!(path.ends_with("hw_counters/tx_pkts"));
                assert_eq!(source.raw_os_error(), Some(libc::EIO));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_counters_malformed_value_is_fatal() {
        let fs = port_with(&[("rx_bytes", "not-a-number")]);

        let err = parse_counters(&fs, Path::new(PORT)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("rx_bytes"), "{msg}");
        assert!(msg.contains("not-a-number"), "{msg}");
        assert!(matches!(
            err,
            ClassError::ParseCounter {
                counter: Counter::RxBytes,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_counters_ignores_unknown_and_non_regular() {
        let mut fs = port_with(&[("rx_bytes", "1"), ("future_counter", "garbage")]);
        fs.add_dir(format!("{PORT}/hw_counters/tx_bytes"));

        let counters = parse_counters(&fs, Path::new(PORT)).unwrap();
        assert_eq!(counters.get(Counter::RxBytes), Some(1));
        assert_eq!(counters.get(Counter::TxBytes), None);
        assert_eq!(counters.len(), 1);
    }

    #[test]
    fn test_parse_counters_missing_dir_is_fatal() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{PORT}/state"), "4: ACTIVE");

        let err = parse_counters(&fs, Path::new(PORT)).unwrap_err();
        assert!(matches!(err, ClassError::ListDir { .. }));
    }

    #[test]
    fn test_counter_set_serializes_present_only() {
        let set: CounterSet = [(Counter::RxBytes, 10), (Counter::TxPkts, 3)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"rx_bytes":10,"tx_pkts":3}"#);
    }
}
