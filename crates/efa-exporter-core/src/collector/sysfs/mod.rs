//! Readers for the `/sys/class/infiniband` hierarchy of Amazon EFA devices.
//!
//! This module provides the bounded file reader, pure parsers for the port
//! attribute files, the hardware counter set and the device/port enumerator.

pub mod class;
pub mod counters;
pub mod parser;
pub mod reader;

pub use class::{ClassError, EfaClass, EfaDevice, EfaPort, EfaSysfs, PortState};
pub use counters::{Counter, CounterSet, parse_counters};
pub use parser::ParseError;
pub use reader::read_sysfs_value;
