//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/sys/class/infiniband` states
//! for testing various adapter conditions.

use super::filesystem::MockFs;

/// Sysfs mount point used by every scenario.
const MOCK_SYS_PATH: &str = "/sys";

#[allow(dead_code)]
impl MockFs {
    /// Adds one port with its `state`, `phys_state` and `rate` files and the
    /// given `hw_counters` entries.
    ///
    /// # Arguments
    /// * `device` - Device directory name (e.g. `rdmap16s27`)
    /// * `port` - Port directory name, normally numeric
    /// * `state` - Content of `ports/<port>/state`
    /// * `phys_state` - Content of `ports/<port>/phys_state`
    /// * `rate` - Content of `ports/<port>/rate`
    /// * `counters` - `(file name, content)` pairs for `hw_counters/`
    pub fn add_efa_port(
        &mut self,
        device: &str,
        port: &str,
        state: &str,
        phys_state: &str,
        rate: &str,
        counters: &[(&str, &str)],
    ) {
        let base = format!("{MOCK_SYS_PATH}/class/infiniband/{device}/ports/{port}");
        self.add_file(format!("{base}/state"), state);
        self.add_file(format!("{base}/phys_state"), phys_state);
        self.add_file(format!("{base}/rate"), rate);
        self.add_dir(format!("{base}/hw_counters"));
        for (name, value) in counters {
            self.add_file(format!("{base}/hw_counters/{name}"), *value);
        }
    }

    /// Creates a node with two healthy EFA devices, one port each.
    ///
    /// Mirrors a p4d-class host: every counter the driver knows about is
    /// present, plus an unrelated file under the device directory.
    pub fn efa_node() -> Self {
        let mut fs = Self::new();

        for (device, scale) in [("rdmap16s27", 1u64), ("rdmap32s27", 2u64)] {
            let rx_bytes = (123_456_789 * scale).to_string();
            let tx_bytes = (987_654_321 * scale).to_string();
            let counters: Vec<(&str, &str)> = vec![
                ("alloc_pd_err", "0\n"),
                ("alloc_ucontext_err", "0\n"),
                ("cmds_err", "0\n"),
                ("completed_cmds", "1532\n"),
                ("create_ah_err", "0\n"),
                ("create_cq_err", "0\n"),
                ("create_qp_err", "0\n"),
                ("impaired_remote_conn_events", "0\n"),
                ("keep_alive_rcvd", "86311\n"),
                ("lifespan", "12\n"),
                ("mmap_err", "0\n"),
                ("no_completion_cmds", "0\n"),
                ("rdma_read_bytes", "40960\n"),
                ("rdma_read_resp_bytes", "40960\n"),
                ("rdma_read_wr_err", "0\n"),
                ("rdma_read_wrs", "10\n"),
                ("rdma_write_bytes", "0\n"),
                ("rdma_write_recv_bytes", "0\n"),
                ("rdma_write_wr_err", "0\n"),
                ("rdma_write_wrs", "0\n"),
                ("recv_bytes", "8192\n"),
                ("recv_wrs", "4\n"),
                ("reg_mr_err", "0\n"),
                ("retrans_bytes", "0\n"),
                ("retrans_pkts", "0\n"),
                ("retrans_timeout_events", "0\n"),
                ("rx_bytes", rx_bytes.as_str()),
                ("rx_drops", "0\n"),
                ("rx_pkts", "65432\n"),
                ("send_bytes", "16384\n"),
                ("send_wrs", "8\n"),
                ("submitted_cmds", "1532\n"),
                ("tx_bytes", tx_bytes.as_str()),
                ("tx_pkts", "76543\n"),
                ("unresponsive_remote_events", "0\n"),
            ];
            fs.add_efa_port(
                device,
                "1",
                "4: ACTIVE\n",
                "5: LinkUp\n",
                "100 Gb/sec (4X EDR)\n",
                &counters,
            );
            fs.add_file(
                format!("{MOCK_SYS_PATH}/class/infiniband/{device}/node_type"),
                "1: CA\n",
            );
        }

        fs
    }

    /// Creates the single-device layout of an adapter whose management
    /// agent cannot report drops: `efa0` port `1` with `rx_bytes` and an
    /// `rx_drops` file reading `N/A (no PMA)`.
    pub fn efa_no_pma() -> Self {
        let mut fs = Self::new();
        fs.add_efa_port(
            "efa0",
            "1",
            "4: ACTIVE\n",
            "5: LINK_UP\n",
            "100 Gb/sec\n",
            &[("rx_bytes", "12345\n"), ("rx_drops", "N/A (no PMA)\n")],
        );
        fs
    }

    /// Creates a host with the infiniband class directory but no devices.
    pub fn efa_empty_class() -> Self {
        let mut fs = Self::new();
        fs.add_dir(format!("{MOCK_SYS_PATH}/class/infiniband"));
        fs
    }
}
