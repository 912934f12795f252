//! Amazon EFA metrics collector for Linux.
//!
//! This module discovers Elastic Fabric Adapter devices under
//! `/sys/class/infiniband`, reads their per-port state and hardware counters,
//! and projects them onto Prometheus-style samples. All filesystem access goes
//! through the `FileSystem` trait so the whole pipeline runs against `MockFs`
//! in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        EfaCollector                         │
//! │  ┌─────────────────────┐   ┌─────────────────────────────┐  │
//! │  │      EfaSysfs       │   │        Descriptors          │  │
//! │  │  - <dev>/ports/<n>  │   │  - <ns>_<sub>_info          │  │
//! │  │  - state/phys_state │   │  - <ns>_<sub>_<counter>     │  │
//! │  │  - rate/hw_counters │   └──────────────┬──────────────┘  │
//! │  └──────────┬──────────┘                  │                 │
//! │             │                      ┌──────▼──────┐          │
//! │             │                      │ MetricSink  │ (trait)  │
//! │      ┌──────▼──────┐               └─────────────┘          │
//! │      │  FileSystem │ (trait)                                │
//! │      └──────┬──────┘                                        │
//! └─────────────┼───────────────────────────────────────────────┘
//!               │
//!       ┌───────┴───────┬───────────────┐
//!       │               │               │
//! ┌─────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//! │   RealFs   │ │   MockFs    │ │  Scenarios  │
//! │  (Linux)   │ │ (Testing)   │ │ (Fixtures)  │
//! └────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use efa_exporter_core::collector::{EfaCollector, RealFs};
//!
//! let collector = EfaCollector::new(RealFs::new(), "/sys");
//! let mut samples = Vec::new();
//! collector.update(&mut samples)?;
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use efa_exporter_core::collector::{EfaCollector, MockFs, Update};
//!
//! let collector = EfaCollector::new(MockFs::efa_node(), "/sys");
//! let mut samples = Vec::new();
//! let update = collector.update(&mut samples).unwrap();
//! assert!(matches!(update, Update::Collected { .. }));
//! assert!(!samples.is_empty());
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod sysfs;
pub mod traits;

pub use collector::{CollectError, EfaCollector, Update};
pub use mock::MockFs;
pub use sysfs::{ClassError, Counter, CounterSet, EfaClass, EfaDevice, EfaPort, EfaSysfs};
pub use traits::{FileSystem, RealFs};
